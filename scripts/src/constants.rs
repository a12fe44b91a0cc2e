//! Constants used in the deploy scripts

/// The network deployed to when none is given
pub const DEFAULT_NETWORK: &str = "kovan";

/// The directory holding the migration ledger
pub const DEFAULT_LEDGER_DIR: &str = ".oz-migrate";

/// The directory in which the OpenZeppelin CLI keeps its network files
pub const OPENZEPPELIN_DIR: &str = ".openzeppelin";

/// The extension of an OpenZeppelin network file
pub const NETWORK_FILE_EXTENSION: &str = "json";

/// The prefix the OpenZeppelin CLI gives networks it does not know by id
pub const DEV_NETWORK_PREFIX: &str = "dev-";

/// The public networks the OpenZeppelin CLI names after themselves, by network id
pub const KNOWN_NETWORKS: [(u64, &str); 6] = [
    (1, "mainnet"),
    (2, "morden"),
    (3, "ropsten"),
    (4, "rinkeby"),
    (5, "goerli"),
    (42, "kovan"),
];

/// The name of the OpenZeppelin CLI command
pub const OZ_COMMAND: &str = "oz";

/// The name of the session command
pub const SESSION_COMMAND: &str = "session";

/// The name of the create command
pub const CREATE_COMMAND: &str = "create";

/// How long, in seconds, the `oz` session stays valid
pub const SESSION_EXPIRES_SECS: u64 = 3600;

/// The transaction timeout, in seconds, for the `oz` session
pub const SESSION_TIMEOUT_SECS: u64 = 600;

/// The number of blocks `oz` waits for a transaction to be mined
pub const SESSION_BLOCK_TIMEOUT: u64 = 50;

/// Silences `oz` output
pub const SILENT_FLAG: &str = "-s";

/// Makes `oz` output verbose
pub const VERBOSE_FLAG: &str = "-v";

/// Skips `oz` validation prompts when creating a contract
pub const FORCE_FLAG: &str = "--force";

/// The flag naming the initializer method to call on creation
pub const INIT_FLAG: &str = "--init";

/// The flag passing arguments to the initializer method
pub const ARGS_FLAG: &str = "--args";

/// The initializer method of the upgradeable contracts
pub const INITIALIZE_METHOD: &str = "initialize";

// ------------------
// | CONTRACT NAMES |
// ------------------

/// The compound interest pool factory contract
pub const COMPOUND_INTEREST_POOL_FACTORY: &str = "CompoundInterestPoolFactory";

/// The periodic prize pool factory contract
pub const PERIODIC_PRIZE_POOL_FACTORY: &str = "PeriodicPrizePoolFactory";

/// The ticket factory contract
pub const TICKET_FACTORY: &str = "TicketFactory";

/// The controlled token factory contract
pub const CONTROLLED_TOKEN_FACTORY: &str = "ControlledTokenFactory";

/// The single random winner prize strategy factory contract
pub const SINGLE_RANDOM_WINNER_PRIZE_STRATEGY_FACTORY: &str =
    "SingleRandomWinnerPrizeStrategyFactory";

/// The blockhash-based random number generator contract
pub const RNG_BLOCKHASH: &str = "RNGBlockhash";

/// The compound interest pool builder contract
pub const COMPOUND_INTEREST_POOL_BUILDER: &str = "CompoundInterestPoolBuilder";

/// The prize pool builder contract
pub const PRIZE_POOL_BUILDER: &str = "PrizePoolBuilder";

/// The single random winner prize pool builder contract
pub const SINGLE_RANDOM_WINNER_PRIZE_POOL_BUILDER: &str = "SingleRandomWinnerPrizePoolBuilder";
