//! Implementations of the deploy script commands

use std::path::Path;

use migrations::{plan, run, MigrationLedger, PlannedStep, RunSummary, StepStatus};
use tracing::info;

use crate::{
    errors::ScriptError, steps::deployment_steps, types::DeployContext, utils::start_session,
};

/// Deploy every contract the ledger does not yet record for the target network
pub fn start(ctx: &DeployContext, ledger_dir: &Path) -> Result<RunSummary, ScriptError> {
    info!(
        network_file = %ctx.network_file.display(),
        "Starting deployment to {} ({})....",
        ctx.network,
        ctx.resolved_network
    );

    let deployer = ctx.deployer()?;
    let mut ledger = MigrationLedger::open(ledger_dir)?;

    start_session(ctx, deployer)?;

    let mut steps = deployment_steps()?;
    let summary = run(&mut ledger, &ctx.resolved_network, ctx, &mut steps)?;

    info!(
        applied = summary.applied.len(),
        skipped = summary.skipped.len(),
        "Completed deployment."
    );
    Ok(summary)
}

/// Print which deployment steps have been applied to the target network
pub fn status(ctx: &DeployContext, ledger_dir: &Path) -> Result<Vec<PlannedStep>, ScriptError> {
    let ledger = MigrationLedger::open(ledger_dir)?;
    let steps = deployment_steps()?;
    let planned = plan(&ledger, &ctx.resolved_network, &steps)?;

    println!(
        "Deployment status for {} ({}):",
        ctx.network, ctx.resolved_network
    );
    for step in &planned {
        match step.status {
            StepStatus::Applied(at) => {
                println!("\t{:>4}  {:<40} applied {}", step.id, step.name, at.to_rfc3339())
            }
            StepStatus::Pending => println!("\t{:>4}  {:<40} pending", step.id, step.name),
        }
    }

    Ok(planned)
}
