//! Definitions of CLI arguments and commands for deploy scripts

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::{
    commands::{start, status},
    constants::{DEFAULT_LEDGER_DIR, DEFAULT_NETWORK, OPENZEPPELIN_DIR, OZ_COMMAND},
    errors::ScriptError,
    types::DeployContext,
};

/// Deploys the PoolTogether smart contracts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// OpenZeppelin network to deploy to
    #[arg(short, long, env = "OZ_NETWORK", default_value = DEFAULT_NETWORK)]
    pub network: String,

    /// Id of the network, which determines the name `oz` records deployments
    /// under. Needed for networks other than the public testnets and mainnet.
    #[arg(long, env = "OZ_NETWORK_ID")]
    pub network_id: Option<u64>,

    /// Address to deploy from
    #[arg(short, long, env = "ADMIN_ADDRESS")]
    pub address: Option<String>,

    /// Pass verbose output flags to `oz` and log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding the migration ledger
    #[arg(long, default_value = DEFAULT_LEDGER_DIR)]
    pub ledger_dir: PathBuf,

    /// Directory in which `oz` keeps its project and network files
    #[arg(long, default_value = OPENZEPPELIN_DIR)]
    pub openzeppelin_dir: PathBuf,

    /// OpenZeppelin network file to read deployed addresses from,
    /// defaults to `<openzeppelin-dir>/<resolved network>.json`
    #[arg(long)]
    pub network_file: Option<PathBuf>,

    /// The `oz` executable
    #[arg(long, env = "OZ_BIN", default_value = OZ_COMMAND)]
    pub oz_bin: String,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The deploy script commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Deploy every contract not yet recorded in the ledger
    Start,
    /// Show which deployment steps have been applied, without running any
    Status,
}

impl Command {
    /// Run the command
    pub fn run(self, ctx: &DeployContext, ledger_dir: &Path) -> Result<(), ScriptError> {
        match self {
            Command::Start => start(ctx, ledger_dir).map(|_| ()),
            Command::Status => status(ctx, ledger_dir).map(|_| ()),
        }
    }
}
