//! The migration ledger: a durable, per-network record of applied steps.
//!
//! Each network's records live in `<dir>/<network>.json`. A missing file is an
//! empty ledger. Records are only ever appended; writes go to a temporary file
//! in the same directory which is then renamed over the ledger file.

use std::{
    collections::BTreeSet,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    errors::MigrationError,
    types::{MigrationRecord, StepId, StepOutputs},
};

/// The extension of a network's ledger file
const LEDGER_FILE_EXTENSION: &str = "json";

/// The on-disk representation of a single network's ledger
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    /// The network the records belong to
    network: String,
    /// The applied steps, in ascending step order
    migrations: Vec<MigrationRecord>,
}

/// A handle on the ledger store for the duration of a migration run.
///
/// The handle is the only writer within the process: it cannot be cloned and
/// writes require `&mut self`. Nothing is held open between calls, so dropping
/// the handle on any exit path leaves the store consistent. Callers must not
/// run two processes against the same network at once.
#[derive(Debug)]
pub struct MigrationLedger {
    /// The directory holding one ledger file per network
    dir: PathBuf,
}

impl MigrationLedger {
    /// Open the ledger stored under `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, MigrationError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| MigrationError::LedgerWrite {
            path: dir.clone(),
            reason: e.to_string(),
        })?;

        debug!(dir = %dir.display(), "opened migration ledger");
        Ok(Self { dir })
    }

    /// The directory the ledger is stored in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of the ledger file for `network`
    pub fn network_path(&self, network: &str) -> Result<PathBuf, MigrationError> {
        validate_network(network)?;
        Ok(self
            .dir
            .join(format!("{network}.{LEDGER_FILE_EXTENSION}")))
    }

    /// Whether `step_id` has been recorded as applied on `network`
    pub fn has_applied(&self, network: &str, step_id: StepId) -> Result<bool, MigrationError> {
        let file = self.load(network)?;
        Ok(file.migrations.iter().any(|r| r.step_id == step_id))
    }

    /// All records for `network`, in ascending step order
    pub fn records(&self, network: &str) -> Result<Vec<MigrationRecord>, MigrationError> {
        Ok(self.load(network)?.migrations)
    }

    /// The highest step recorded for `network`, if any
    pub fn last_applied(&self, network: &str) -> Result<Option<StepId>, MigrationError> {
        let file = self.load(network)?;
        Ok(file.migrations.last().map(|r| r.step_id))
    }

    /// Record that `step_id` was applied on `network`
    pub fn record_applied(
        &mut self,
        network: &str,
        step_id: StepId,
    ) -> Result<MigrationRecord, MigrationError> {
        self.record_applied_with_outputs(network, step_id, StepOutputs::new())
    }

    /// Record that `step_id` was applied on `network`, along with the outputs it produced
    pub fn record_applied_with_outputs(
        &mut self,
        network: &str,
        step_id: StepId,
        outputs: StepOutputs,
    ) -> Result<MigrationRecord, MigrationError> {
        let mut file = self.load(network)?;
        if file.migrations.iter().any(|r| r.step_id == step_id) {
            return Err(MigrationError::DuplicateStep {
                network: network.to_string(),
                step_id,
            });
        }

        let record = MigrationRecord::now(step_id, outputs);
        file.migrations.push(record.clone());
        file.migrations.sort_by_key(|r| r.step_id);

        self.store(network, &file)?;
        debug!(network, step = %step_id, "recorded migration");

        Ok(record)
    }

    // -----------
    // | HELPERS |
    // -----------

    /// Read and validate the ledger file for `network`
    fn load(&self, network: &str) -> Result<LedgerFile, MigrationError> {
        let path = self.network_path(network)?;
        let read_err = |reason: String| MigrationError::LedgerRead {
            path: path.clone(),
            reason,
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(LedgerFile {
                    network: network.to_string(),
                    migrations: Vec::new(),
                });
            }
            Err(e) => return Err(read_err(e.to_string())),
        };

        let mut file: LedgerFile =
            serde_json::from_str(&contents).map_err(|e| read_err(e.to_string()))?;

        if file.network != network {
            return Err(read_err(format!(
                "ledger belongs to network `{}`",
                file.network
            )));
        }

        let mut seen = BTreeSet::new();
        if let Some(dup) = file.migrations.iter().find(|r| !seen.insert(r.step_id)) {
            return Err(read_err(format!("step {} is recorded twice", dup.step_id)));
        }

        file.migrations.sort_by_key(|r| r.step_id);
        Ok(file)
    }

    /// Atomically replace the ledger file for `network`
    fn store(&self, network: &str, file: &LedgerFile) -> Result<(), MigrationError> {
        let path = self.network_path(network)?;
        let write_err = |reason: String| MigrationError::LedgerWrite {
            path: path.clone(),
            reason,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| write_err(e.to_string()))?;
        serde_json::to_writer_pretty(&mut tmp, file).map_err(|e| write_err(e.to_string()))?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| write_err(e.to_string()))?;
        tmp.persist(&path).map_err(|e| write_err(e.to_string()))?;

        Ok(())
    }
}

/// Network names become file names, so only allow a conservative character set
fn validate_network(network: &str) -> Result<(), MigrationError> {
    let valid_chars = network
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if network.is_empty() || network == "." || network == ".." || !valid_chars {
        return Err(MigrationError::InvalidNetwork(network.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn step(id: u64) -> StepId {
        StepId::new(id).unwrap()
    }

    fn setup_ledger() -> (TempDir, MigrationLedger) {
        let dir = TempDir::new().unwrap();
        let ledger = MigrationLedger::open(dir.path().join(".oz-migrate")).unwrap();
        (dir, ledger)
    }

    #[test]
    fn test_empty_ledger() {
        let (_dir, ledger) = setup_ledger();

        assert!(!ledger.has_applied("kovan", step(10)).unwrap());
        assert!(ledger.records("kovan").unwrap().is_empty());
        assert_eq!(ledger.last_applied("kovan").unwrap(), None);
    }

    #[test]
    fn test_record_and_reopen() {
        let (dir, mut ledger) = setup_ledger();
        ledger.record_applied("kovan", step(20)).unwrap();
        ledger.record_applied("kovan", step(10)).unwrap();
        drop(ledger);

        let ledger = MigrationLedger::open(dir.path().join(".oz-migrate")).unwrap();
        assert!(ledger.has_applied("kovan", step(10)).unwrap());
        assert!(ledger.has_applied("kovan", step(20)).unwrap());
        assert!(!ledger.has_applied("kovan", step(30)).unwrap());

        let ids: Vec<_> = ledger
            .records("kovan")
            .unwrap()
            .into_iter()
            .map(|r| r.step_id.get())
            .collect();
        assert_eq!(ids, vec![10, 20]);
        assert_eq!(ledger.last_applied("kovan").unwrap(), Some(step(20)));
    }

    #[test]
    fn test_networks_are_partitioned() {
        let (_dir, mut ledger) = setup_ledger();
        ledger.record_applied("kovan", step(10)).unwrap();

        assert!(ledger.has_applied("kovan", step(10)).unwrap());
        assert!(!ledger.has_applied("rinkeby", step(10)).unwrap());

        ledger.record_applied("rinkeby", step(10)).unwrap();
        assert!(ledger.has_applied("rinkeby", step(10)).unwrap());
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let (_dir, mut ledger) = setup_ledger();
        ledger.record_applied("kovan", step(10)).unwrap();

        let err = ledger.record_applied("kovan", step(10)).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::DuplicateStep { ref network, step_id } if network == "kovan" && step_id == step(10)
        ));
        assert_eq!(ledger.records("kovan").unwrap().len(), 1);
    }

    #[test]
    fn test_outputs_persisted() {
        let (_dir, mut ledger) = setup_ledger();
        let outputs = StepOutputs::from([("TicketFactory".to_string(), "0xabc".to_string())]);
        ledger
            .record_applied_with_outputs("kovan", step(30), outputs.clone())
            .unwrap();

        let records = ledger.records("kovan").unwrap();
        assert_eq!(records[0].outputs, outputs);
    }

    #[test]
    fn test_corrupt_ledger_is_read_error() {
        let (_dir, ledger) = setup_ledger();
        let path = ledger.network_path("kovan").unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ledger.has_applied("kovan", step(10)),
            Err(MigrationError::LedgerRead { .. })
        ));
    }

    #[test]
    fn test_duplicate_entries_on_disk_are_read_error() {
        let (_dir, ledger) = setup_ledger();
        let path = ledger.network_path("kovan").unwrap();
        let contents = r#"{
            "network": "kovan",
            "migrations": [
                { "step_id": 10, "applied_at": "2020-05-01T00:00:00Z" },
                { "step_id": 10, "applied_at": "2020-05-02T00:00:00Z" }
            ]
        }"#;
        fs::write(&path, contents).unwrap();

        assert!(matches!(
            ledger.records("kovan"),
            Err(MigrationError::LedgerRead { .. })
        ));
    }

    #[test]
    fn test_mismatched_network_is_read_error() {
        let (_dir, ledger) = setup_ledger();
        let path = ledger.network_path("kovan").unwrap();
        fs::write(&path, r#"{ "network": "mainnet", "migrations": [] }"#).unwrap();

        assert!(matches!(
            ledger.records("kovan"),
            Err(MigrationError::LedgerRead { .. })
        ));
    }

    #[test]
    fn test_invalid_network_names() {
        let (_dir, ledger) = setup_ledger();
        for network in ["", ".", "..", "../kovan", "a/b", "main net"] {
            assert!(
                matches!(
                    ledger.has_applied(network, step(10)),
                    Err(MigrationError::InvalidNetwork(_))
                ),
                "{network:?} should be rejected"
            );
        }

        assert!(ledger.has_applied("dev-1589373431470", step(10)).is_ok());
    }
}
