//! Definitions of errors that can occur during the execution of the deploy scripts

use std::path::PathBuf;

use migrations::MigrationError;

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// An address could not be parsed
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    /// The deployer address was not provided
    #[error("no deployer address given, pass `--address` or set `ADMIN_ADDRESS`")]
    MissingAddress,
    /// The name `oz` files the network's deployments under could not be determined
    #[error(
        "cannot tell which network file `oz` uses for `{0}`, pass `--network-id` or `--network-file`"
    )]
    UnresolvedNetwork(String),
    /// An external command could not be started
    #[error("error running `{command}`: {reason}")]
    CommandExecution {
        /// The command that was run
        command: String,
        /// Why it could not be started
        reason: String,
    },
    /// An external command exited unsuccessfully
    #[error("`{command}` failed with {status}")]
    CommandFailed {
        /// The command that was run
        command: String,
        /// The exit status of the command
        status: String,
    },
    /// The OpenZeppelin network file could not be read
    #[error("error reading network file {}: {reason}", path.display())]
    ReadNetworkFile {
        /// The network file
        path: PathBuf,
        /// Why it could not be read
        reason: String,
    },
    /// A contract has no proxy in the network file
    #[error("no proxy of {contract} found in {}", path.display())]
    ContractNotFound {
        /// The contract looked up
        contract: String,
        /// The network file searched
        path: PathBuf,
    },
    /// A step needs the address of a contract no earlier step deployed
    #[error("{contract} depends on {dependency}, which has not been deployed")]
    MissingDependency {
        /// The contract being deployed
        contract: String,
        /// The contract it depends on
        dependency: String,
    },
    /// Error reading, writing, or running migrations
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
