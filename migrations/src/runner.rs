//! The step runner: applies the steps of a migration that the ledger has not
//! yet recorded, in ascending id order, halting on the first failure

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    errors::MigrationError,
    ledger::MigrationLedger,
    types::{MigrationRecord, Step, StepId, StepResults},
};

/// What happened to each step in a completed run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps whose actions ran and were recorded, in order
    pub applied: Vec<StepId>,
    /// Steps skipped because the ledger already recorded them, in order
    pub skipped: Vec<StepId>,
}

/// Whether a step has been applied on a network
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// The step was recorded at the given time
    Applied(DateTime<Utc>),
    /// The step will run on the next invocation
    Pending,
}

/// A step as it would be handled by the next run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedStep {
    /// The id of the step
    pub id: StepId,
    /// The name of the step
    pub name: String,
    /// Whether the step is already applied
    pub status: StepStatus,
}

/// Run `steps` against `network`, skipping any the ledger already records.
///
/// Each newly applied step is recorded before the next step starts. The first
/// failing action aborts the run and is not recorded, so invoking `run` again
/// with the same steps resumes from that step.
pub fn run<C>(
    ledger: &mut MigrationLedger,
    network: &str,
    context: &C,
    steps: &mut [Step<C>],
) -> Result<RunSummary, MigrationError> {
    let ordered = ordered_steps(steps)?;

    // Read the ledger once, before anything executes, so that a corrupt store
    // aborts the run early. Only this run appends to it afterwards.
    let recorded: BTreeMap<StepId, MigrationRecord> = ledger
        .records(network)?
        .into_iter()
        .map(|record| (record.step_id, record))
        .collect();

    let mut results = StepResults::default();
    let mut summary = RunSummary::default();

    for step in ordered {
        let step_id = step.id();

        if let Some(record) = recorded.get(&step_id) {
            info!(network, step = %step_id, name = step.name(), "skipping applied step");
            results.insert(step_id, record.outputs.clone());
            summary.skipped.push(step_id);
            continue;
        }

        info!(network, step = %step_id, name = step.name(), "applying step");
        let outputs = step.execute(context, &results).map_err(|source| {
            warn!(network, step = %step_id, name = step.name(), "step failed");
            MigrationError::StepAction {
                step_id,
                name: step.name().to_string(),
                source,
            }
        })?;

        ledger.record_applied_with_outputs(network, step_id, outputs.clone())?;
        results.insert(step_id, outputs);
        summary.applied.push(step_id);
    }

    info!(
        network,
        applied = summary.applied.len(),
        skipped = summary.skipped.len(),
        "migration complete"
    );
    Ok(summary)
}

/// Report which of `steps` the next run against `network` would skip or apply.
///
/// Nothing is executed and the ledger is not written.
pub fn plan<C>(
    ledger: &MigrationLedger,
    network: &str,
    steps: &[Step<C>],
) -> Result<Vec<PlannedStep>, MigrationError> {
    check_unique(steps)?;

    let recorded: BTreeMap<StepId, DateTime<Utc>> = ledger
        .records(network)?
        .into_iter()
        .map(|record| (record.step_id, record.applied_at))
        .collect();

    let mut planned: Vec<PlannedStep> = steps
        .iter()
        .map(|step| PlannedStep {
            id: step.id(),
            name: step.name().to_string(),
            status: recorded
                .get(&step.id())
                .map_or(StepStatus::Pending, |at| StepStatus::Applied(*at)),
        })
        .collect();
    planned.sort_by_key(|p| p.id);

    Ok(planned)
}

/// Sort the steps by ascending id without reordering the caller's slice
fn ordered_steps<C>(steps: &mut [Step<C>]) -> Result<Vec<&mut Step<C>>, MigrationError> {
    check_unique(steps)?;

    let mut ordered: Vec<&mut Step<C>> = steps.iter_mut().collect();
    ordered.sort_by_key(|step| step.id());
    Ok(ordered)
}

/// Ensure no step id appears twice
fn check_unique<C>(steps: &[Step<C>]) -> Result<(), MigrationError> {
    let mut seen = BTreeSet::new();
    match steps.iter().find(|step| !seen.insert(step.id())) {
        Some(dup) => Err(MigrationError::DuplicateStepDefinition(dup.id())),
        None => Ok(()),
    }
}
