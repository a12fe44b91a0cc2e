//! Definitions of errors that can occur while applying migrations

use std::{error::Error, path::PathBuf};

use crate::types::StepId;

/// The error type returned by a step's action
pub type ActionError = Box<dyn Error + Send + Sync + 'static>;

/// Errors that can occur while reading or writing the ledger, or running steps
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The ledger store for a network is unreadable or malformed
    #[error("error reading migration ledger {}: {reason}", path.display())]
    LedgerRead {
        /// The ledger file that could not be read
        path: PathBuf,
        /// Why the read failed
        reason: String,
    },
    /// A completed step could not be durably recorded
    #[error("error writing migration ledger {}: {reason}", path.display())]
    LedgerWrite {
        /// The ledger file that could not be written
        path: PathBuf,
        /// Why the write failed
        reason: String,
    },
    /// The ledger already holds a record for this step
    #[error("step {step_id} is already recorded for network `{network}`")]
    DuplicateStep {
        /// The network the record belongs to
        network: String,
        /// The step that was already recorded
        step_id: StepId,
    },
    /// The same step id appears more than once in a step list
    #[error("step {0} is defined more than once")]
    DuplicateStepDefinition(StepId),
    /// A step's action failed; the step was not recorded
    #[error("step {step_id} ({name}) failed")]
    StepAction {
        /// The step whose action failed
        step_id: StepId,
        /// The step's name
        name: String,
        /// The error raised by the action
        #[source]
        source: ActionError,
    },
    /// The network name cannot be used as a ledger partition key
    #[error("invalid network name `{0}`")]
    InvalidNetwork(String),
    /// Step ids must be positive
    #[error("invalid step id {0}, step ids must be positive")]
    InvalidStepId(u64),
}
