//! Resumable, per-network migration bookkeeping for deployment scripts.
//!
//! A deployment is expressed as an ordered list of numbered [`Step`]s. The
//! [`MigrationLedger`] durably records which steps have completed on a given
//! network, and [`run`] executes only the steps that have not, so that a run
//! which failed partway through can simply be invoked again.

#![deny(missing_docs)]

pub mod errors;
pub mod ledger;
pub mod runner;
pub mod types;

pub use errors::{ActionError, MigrationError};
pub use ledger::MigrationLedger;
pub use runner::{plan, run, PlannedStep, RunSummary, StepStatus};
pub use types::{MigrationRecord, Step, StepId, StepOutputs, StepResults};
