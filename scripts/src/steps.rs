//! The fixed sequence of migration steps that deploys the PoolTogether contracts.
//!
//! Step ids leave gaps so that steps can later be inserted between existing ones
//! without renumbering what networks have already recorded.

use alloy_primitives::Address;
use migrations::{Step, StepId, StepOutputs, StepResults};
use tracing::info;

use crate::{
    constants::{
        COMPOUND_INTEREST_POOL_BUILDER, COMPOUND_INTEREST_POOL_FACTORY, CONTROLLED_TOKEN_FACTORY,
        PERIODIC_PRIZE_POOL_FACTORY, PRIZE_POOL_BUILDER, RNG_BLOCKHASH,
        SINGLE_RANDOM_WINNER_PRIZE_POOL_BUILDER, SINGLE_RANDOM_WINNER_PRIZE_STRATEGY_FACTORY,
        TICKET_FACTORY,
    },
    errors::ScriptError,
    types::DeployContext,
    utils::{create_contract, parse_address},
};

/// A single contract creation in the deployment sequence
#[derive(Clone, Copy, Debug)]
pub struct ContractDeployment {
    /// The migration step id
    pub step: u64,
    /// The name of the contract to create
    pub contract: &'static str,
    /// Whether to call `initialize` on creation
    pub initialize: bool,
    /// Contracts whose addresses are passed to `initialize`, in order
    pub dependencies: &'static [&'static str],
}

/// The contracts to deploy, in step order
pub const DEPLOYMENTS: [ContractDeployment; 9] = [
    ContractDeployment {
        step: 10,
        contract: COMPOUND_INTEREST_POOL_FACTORY,
        initialize: true,
        dependencies: &[],
    },
    ContractDeployment {
        step: 20,
        contract: PERIODIC_PRIZE_POOL_FACTORY,
        initialize: true,
        dependencies: &[],
    },
    ContractDeployment {
        step: 30,
        contract: TICKET_FACTORY,
        initialize: true,
        dependencies: &[],
    },
    ContractDeployment {
        step: 40,
        contract: CONTROLLED_TOKEN_FACTORY,
        initialize: true,
        dependencies: &[],
    },
    ContractDeployment {
        step: 50,
        contract: SINGLE_RANDOM_WINNER_PRIZE_STRATEGY_FACTORY,
        initialize: true,
        dependencies: &[],
    },
    ContractDeployment {
        step: 55,
        contract: RNG_BLOCKHASH,
        initialize: false,
        dependencies: &[],
    },
    ContractDeployment {
        step: 58,
        contract: COMPOUND_INTEREST_POOL_BUILDER,
        initialize: true,
        dependencies: &[COMPOUND_INTEREST_POOL_FACTORY],
    },
    ContractDeployment {
        step: 60,
        contract: PRIZE_POOL_BUILDER,
        initialize: true,
        dependencies: &[
            COMPOUND_INTEREST_POOL_BUILDER,
            PERIODIC_PRIZE_POOL_FACTORY,
            TICKET_FACTORY,
            CONTROLLED_TOKEN_FACTORY,
            RNG_BLOCKHASH,
        ],
    },
    ContractDeployment {
        step: 80,
        contract: SINGLE_RANDOM_WINNER_PRIZE_POOL_BUILDER,
        initialize: true,
        dependencies: &[
            PRIZE_POOL_BUILDER,
            SINGLE_RANDOM_WINNER_PRIZE_STRATEGY_FACTORY,
        ],
    },
];

/// Build the migration steps for [`DEPLOYMENTS`]
pub fn deployment_steps() -> Result<Vec<Step<DeployContext>>, ScriptError> {
    DEPLOYMENTS
        .iter()
        .copied()
        .map(|deployment| {
            let id = StepId::new(deployment.step)?;
            Ok::<_, ScriptError>(Step::new(
                id,
                deployment.contract,
                move |ctx: &DeployContext, results: &StepResults| {
                    deploy_contract(ctx, results, deployment).map_err(Into::into)
                },
            ))
        })
        .collect()
}

/// Create the contract, wiring in the addresses of its dependencies as
/// recorded by earlier steps
fn deploy_contract(
    ctx: &DeployContext,
    results: &StepResults,
    deployment: ContractDeployment,
) -> Result<StepOutputs, ScriptError> {
    let args = deployment
        .dependencies
        .iter()
        .map(|dependency| resolve_dependency(results, deployment.contract, dependency))
        .collect::<Result<Vec<_>, _>>()?;

    let address = create_contract(ctx, deployment.contract, deployment.initialize, &args)?;
    info!(contract = deployment.contract, %address, "contract created");

    Ok(StepOutputs::from([(
        deployment.contract.to_string(),
        address.to_string(),
    )]))
}

/// Look up the address a previous step recorded for `dependency`
fn resolve_dependency(
    results: &StepResults,
    contract: &str,
    dependency: &str,
) -> Result<Address, ScriptError> {
    let address = results
        .lookup(dependency)
        .ok_or_else(|| ScriptError::MissingDependency {
            contract: contract.to_string(),
            dependency: dependency.to_string(),
        })?;

    parse_address(address)
}
