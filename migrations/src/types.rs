//! Type definitions for migration steps and the records kept of them

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ActionError, MigrationError};

/// Named values produced by a step, e.g. the addresses of contracts it deployed
pub type StepOutputs = BTreeMap<String, String>;

/// The signature of a step's action
type StepFn<C> = dyn FnMut(&C, &StepResults) -> Result<StepOutputs, ActionError>;

// ------------
// | STEP IDS |
// ------------

/// The identifier of a migration step. Steps run in ascending id order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct StepId(u64);

impl StepId {
    /// Create a step id, rejecting zero
    pub fn new(id: u64) -> Result<Self, MigrationError> {
        if id == 0 {
            return Err(MigrationError::InvalidStepId(id));
        }

        Ok(Self(id))
    }

    /// The numeric value of the id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for StepId {
    type Error = MigrationError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<StepId> for u64 {
    fn from(id: StepId) -> Self {
        id.0
    }
}

impl Display for StepId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------
// | STEPS |
// ---------

/// A single, uniquely numbered unit of deployment work.
///
/// The action receives the caller's context and the outputs of every earlier
/// step, whether that step ran in this invocation or was recorded by a previous
/// one. It signals failure by returning an error, in which case the step is not
/// recorded and the run halts.
pub struct Step<C> {
    /// The id of the step
    id: StepId,
    /// A human readable name for the step, used in logs
    name: String,
    /// The side-effecting work the step performs
    action: Box<StepFn<C>>,
}

impl<C> Step<C> {
    /// Create a new step
    pub fn new<F>(id: StepId, name: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&C, &StepResults) -> Result<StepOutputs, ActionError> + 'static,
    {
        Self {
            id,
            name: name.into(),
            action: Box::new(action),
        }
    }

    /// The id of the step
    pub fn id(&self) -> StepId {
        self.id
    }

    /// The name of the step
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the step's action
    pub(crate) fn execute(
        &mut self,
        context: &C,
        results: &StepResults,
    ) -> Result<StepOutputs, ActionError> {
        (self.action)(context, results)
    }
}

impl<C> Debug for Step<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// -----------
// | RECORDS |
// -----------

/// The durable record that a step completed on a network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// The step that completed
    pub step_id: StepId,
    /// When the step's completion was recorded
    pub applied_at: DateTime<Utc>,
    /// The outputs the step produced
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: StepOutputs,
}

impl MigrationRecord {
    /// Create a record for a step completing now
    pub(crate) fn now(step_id: StepId, outputs: StepOutputs) -> Self {
        Self {
            step_id,
            applied_at: Utc::now(),
            outputs,
        }
    }
}

/// The outputs of the steps seen so far in a run, keyed by step id.
///
/// Entries are only ever added, so a step can rely on anything an earlier step
/// produced remaining visible for the rest of the run.
#[derive(Clone, Debug, Default)]
pub struct StepResults {
    /// The outputs of each step
    outputs: BTreeMap<StepId, StepOutputs>,
}

impl StepResults {
    /// The outputs of the given step, if it has been seen in this run
    pub fn get(&self, step_id: StepId) -> Option<&StepOutputs> {
        self.outputs.get(&step_id)
    }

    /// Find the value of `key`, preferring the most recent step that set it
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.outputs
            .values()
            .rev()
            .find_map(|outputs| outputs.get(key))
            .map(String::as_str)
    }

    /// The number of steps with recorded outputs
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether no step outputs have been recorded
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Add the outputs of a step. Outputs already present for the step are kept.
    pub(crate) fn insert(&mut self, step_id: StepId, outputs: StepOutputs) {
        self.outputs.entry(step_id).or_insert(outputs);
    }
}
