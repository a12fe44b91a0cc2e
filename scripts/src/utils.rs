//! Utilities for the deploy scripts.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
};

use alloy_primitives::Address;
use itertools::Itertools;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{
    constants::{
        ARGS_FLAG, CREATE_COMMAND, DEV_NETWORK_PREFIX, FORCE_FLAG, INITIALIZE_METHOD, INIT_FLAG,
        KNOWN_NETWORKS, NETWORK_FILE_EXTENSION, SESSION_BLOCK_TIMEOUT, SESSION_COMMAND,
        SESSION_EXPIRES_SECS, SESSION_TIMEOUT_SECS,
    },
    errors::ScriptError,
    types::{DeployContext, NetworkFile},
};

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Parse a hex Ethereum address
pub fn parse_address(address: &str) -> Result<Address, ScriptError> {
    Address::from_str(address).map_err(|_| ScriptError::InvalidAddress(address.to_string()))
}

/// The name under which the `oz` CLI records deployments to `network`.
///
/// `oz` names a network after its network id: the public networks keep their
/// own names and any other id becomes `dev-<id>`. Without an id, a public
/// network name resolves to itself and any other name is taken from the stem
/// of an explicitly given network file.
pub fn resolve_network(
    network: &str,
    network_id: Option<u64>,
    network_file: Option<&Path>,
) -> Result<String, ScriptError> {
    if let Some(id) = network_id {
        let name = KNOWN_NETWORKS
            .iter()
            .find(|(known_id, _)| *known_id == id)
            .map_or_else(|| format!("{DEV_NETWORK_PREFIX}{id}"), |(_, name)| name.to_string());
        return Ok(name);
    }

    if KNOWN_NETWORKS.iter().any(|(_, name)| *name == network) {
        return Ok(network.to_string());
    }

    network_file
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| ScriptError::UnresolvedNetwork(network.to_string()))
}

/// The network file the `oz` CLI keeps in `openzeppelin_dir` for the resolved `network`
pub fn default_network_file(openzeppelin_dir: &Path, network: &str) -> PathBuf {
    openzeppelin_dir.join(format!("{network}.{NETWORK_FILE_EXTENSION}"))
}

/// Render a command the way it would be typed in a shell
fn describe_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .join(" ")
}

/// Execute a command with its output streamed to the terminal, failing if it
/// does not exit successfully
pub fn run_command(mut cmd: Command) -> Result<(), ScriptError> {
    let command = describe_command(&cmd);
    debug!(%command, "running command");

    cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    let status = cmd.status().map_err(|e| ScriptError::CommandExecution {
        command: command.clone(),
        reason: e.to_string(),
    })?;

    if !status.success() {
        return Err(ScriptError::CommandFailed {
            command,
            status: status.to_string(),
        });
    }

    Ok(())
}

/// Begin an `oz` session so that later commands default to the target network
/// and deployer
pub fn start_session(ctx: &DeployContext, deployer: Address) -> Result<(), ScriptError> {
    let mut cmd = Command::new(&ctx.oz_bin);
    cmd.arg(SESSION_COMMAND)
        .arg("--network")
        .arg(&ctx.network)
        .arg("--from")
        .arg(deployer.to_string())
        .arg("--expires")
        .arg(SESSION_EXPIRES_SECS.to_string())
        .arg("--timeout")
        .arg(SESSION_TIMEOUT_SECS.to_string())
        .arg("--blockTimeout")
        .arg(SESSION_BLOCK_TIMEOUT.to_string());

    run_command(cmd)
}

/// Create an instance of `contract` with `oz create`, returning its address.
///
/// If `initialize` is set, the instance's `initialize` method is called with
/// `args` as part of creation.
pub fn create_contract(
    ctx: &DeployContext,
    contract: &str,
    initialize: bool,
    args: &[Address],
) -> Result<Address, ScriptError> {
    let mut cmd = Command::new(&ctx.oz_bin);
    cmd.arg(CREATE_COMMAND)
        .arg(contract)
        .arg(FORCE_FLAG)
        .arg(ctx.verbosity_flag());

    if initialize {
        cmd.arg(INIT_FLAG).arg(INITIALIZE_METHOD);
    }
    if !args.is_empty() {
        cmd.arg(ARGS_FLAG).arg(args.iter().join(","));
    }

    run_command(cmd)?;
    read_deployed_address(&ctx.network_file, contract)
}

/// Read the address of the latest deployment of `contract` from an
/// OpenZeppelin network file
pub fn read_deployed_address(network_file: &Path, contract: &str) -> Result<Address, ScriptError> {
    let read_err = |reason: String| ScriptError::ReadNetworkFile {
        path: network_file.to_path_buf(),
        reason,
    };

    let contents = fs::read_to_string(network_file).map_err(|e| read_err(e.to_string()))?;
    let parsed: NetworkFile =
        serde_json::from_str(&contents).map_err(|e| read_err(e.to_string()))?;

    let address = parsed
        .latest_address(contract)
        .ok_or_else(|| ScriptError::ContractNotFound {
            contract: contract.to_string(),
            path: network_file.to_path_buf(),
        })?;

    parse_address(address)
}
