//! Type definitions used throughout the scripts

use std::{collections::BTreeMap, path::PathBuf};

use alloy_primitives::Address;
use serde::Deserialize;

use crate::{
    cli::Cli,
    constants::{SILENT_FLAG, VERBOSE_FLAG},
    errors::ScriptError,
    utils::{default_network_file, parse_address, resolve_network},
};

/// Everything a deployment step needs to invoke the `oz` CLI.
///
/// Passed explicitly to each step rather than held in globals.
#[derive(Clone, Debug)]
pub struct DeployContext {
    /// The network as configured for the `oz` CLI
    pub network: String,
    /// The name `oz` records the network's deployments under, also the ledger
    /// partition key
    pub resolved_network: String,
    /// The address to deploy from, parsed only when a deployment starts
    pub address: Option<String>,
    /// The `oz` executable
    pub oz_bin: String,
    /// Whether `oz` should produce verbose output
    pub verbose: bool,
    /// The OpenZeppelin network file that `oz` records deployments in
    pub network_file: PathBuf,
}

impl DeployContext {
    /// Build the context for the network selected on the command line
    pub fn from_cli(cli: &Cli) -> Result<Self, ScriptError> {
        let resolved_network =
            resolve_network(&cli.network, cli.network_id, cli.network_file.as_deref())?;
        let network_file = cli
            .network_file
            .clone()
            .unwrap_or_else(|| default_network_file(&cli.openzeppelin_dir, &resolved_network));

        Ok(Self {
            network: cli.network.clone(),
            resolved_network,
            address: cli.address.clone(),
            oz_bin: cli.oz_bin.clone(),
            verbose: cli.verbose,
            network_file,
        })
    }

    /// The output flag passed to `oz create`
    pub fn verbosity_flag(&self) -> &'static str {
        if self.verbose {
            VERBOSE_FLAG
        } else {
            SILENT_FLAG
        }
    }

    /// The deployer address, which must have been provided
    pub fn deployer(&self) -> Result<Address, ScriptError> {
        let address = self.address.as_deref().ok_or(ScriptError::MissingAddress)?;
        parse_address(address)
    }
}

/// The subset of an OpenZeppelin network file needed to find deployed proxies
#[derive(Debug, Default, Deserialize)]
pub struct NetworkFile {
    /// Upgradeable proxies, keyed by `<package>/<contract>`, oldest first
    #[serde(default)]
    pub proxies: BTreeMap<String, Vec<DeployedInstance>>,
    /// The packages the project links against, keyed by package name
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
}

/// A single deployed proxy in a network file
#[derive(Debug, Deserialize)]
pub struct DeployedInstance {
    /// The address of the deployment
    pub address: String,
}

impl NetworkFile {
    /// The most recently created proxy for `contract`.
    ///
    /// Proxies created from the project's own package take precedence over
    /// those of a linked dependency with a contract of the same name. Logic
    /// contracts are never returned, since their addresses are not usable as
    /// initializer arguments.
    pub fn latest_address(&self, contract: &str) -> Option<&str> {
        self.proxies
            .iter()
            .filter_map(|(key, instances)| {
                let (package, name) = key.rsplit_once('/')?;
                (name == contract).then_some((package, instances))
            })
            .filter_map(|(package, instances)| Some((package, instances.last()?)))
            .min_by_key(|(package, _)| self.dependencies.contains_key(*package))
            .map(|(_, instance)| instance.address.as_str())
    }
}
