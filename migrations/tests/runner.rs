use std::{cell::RefCell, collections::BTreeSet, path::PathBuf, rc::Rc};

use eyre::Result;
use migrations::{
    plan, run, MigrationError, MigrationLedger, RunSummary, Step, StepId, StepOutputs,
    StepStatus,
};
use tempfile::TempDir;

/// The network all tests run against
const NETWORK: &str = "test";

/// The context handed to each step: where the ledger lives, so that actions
/// can observe what has been recorded before them
struct TestContext {
    ledger_dir: PathBuf,
}

/// Shared bookkeeping for the test steps
#[derive(Clone, Default)]
struct Harness {
    /// Ids of the steps whose actions ran, in order
    executed: Rc<RefCell<Vec<u64>>>,
    /// Ids of the steps whose actions should fail
    failing: Rc<RefCell<BTreeSet<u64>>>,
    /// Ids of earlier steps found unrecorded when a later step ran
    unrecorded_predecessors: Rc<RefCell<Vec<u64>>>,
}

impl Harness {
    fn executed(&self) -> Vec<u64> {
        self.executed.borrow().clone()
    }

    fn clear_executed(&self) {
        self.executed.borrow_mut().clear();
    }

    fn fail(&self, id: u64) {
        self.failing.borrow_mut().insert(id);
    }

    fn heal(&self, id: u64) {
        self.failing.borrow_mut().remove(&id);
    }

    /// Build steps with the given ids. Every step outputs `step<id> = <id>`.
    fn steps(&self, ids: &[u64]) -> Vec<Step<TestContext>> {
        ids.iter()
            .map(|&id| {
                let harness = self.clone();
                let earlier: Vec<u64> = ids.iter().copied().filter(|&i| i < id).collect();

                Step::new(
                    StepId::new(id).unwrap(),
                    format!("step-{id}"),
                    move |ctx: &TestContext, _results| {
                        harness.executed.borrow_mut().push(id);

                        let ledger = MigrationLedger::open(&ctx.ledger_dir)?;
                        for &prev in &earlier {
                            if !ledger.has_applied(NETWORK, StepId::new(prev)?)? {
                                harness.unrecorded_predecessors.borrow_mut().push(prev);
                            }
                        }

                        if harness.failing.borrow().contains(&id) {
                            return Err(format!("step {id} exploded").into());
                        }

                        Ok(StepOutputs::from([(format!("step{id}"), id.to_string())]))
                    },
                )
            })
            .collect()
    }
}

fn setup() -> Result<(TempDir, MigrationLedger, TestContext)> {
    let dir = TempDir::new()?;
    let ledger_dir = dir.path().join(".oz-migrate");
    let ledger = MigrationLedger::open(&ledger_dir)?;
    Ok((dir, ledger, TestContext { ledger_dir }))
}

fn recorded_ids(ledger: &MigrationLedger) -> Result<Vec<u64>> {
    Ok(ledger
        .records(NETWORK)?
        .into_iter()
        .map(|r| r.step_id.get())
        .collect())
}

#[test]
fn test_runs_all_steps_in_order() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[10, 20, 30]);

    let summary = run(&mut ledger, NETWORK, &ctx, &mut steps)?;

    assert_eq!(harness.executed(), vec![10, 20, 30]);
    assert_eq!(recorded_ids(&ledger)?, vec![10, 20, 30]);
    assert_eq!(summary.applied.len(), 3);
    assert!(summary.skipped.is_empty());

    Ok(())
}

#[test]
fn test_second_run_is_idempotent() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[10, 20, 30]);

    run(&mut ledger, NETWORK, &ctx, &mut steps)?;
    let records_after_first = ledger.records(NETWORK)?;
    harness.clear_executed();

    let summary = run(&mut ledger, NETWORK, &ctx, &mut steps)?;

    assert!(harness.executed().is_empty());
    assert!(summary.applied.is_empty());
    assert_eq!(summary.skipped.len(), 3);
    assert_eq!(ledger.records(NETWORK)?, records_after_first);

    Ok(())
}

#[test]
fn test_failure_halts_and_resumes() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[10, 20, 30]);

    harness.fail(20);
    let err = run(&mut ledger, NETWORK, &ctx, &mut steps).unwrap_err();
    assert!(matches!(
        err,
        MigrationError::StepAction { step_id, .. } if step_id.get() == 20
    ));
    assert_eq!(harness.executed(), vec![10, 20]);
    assert_eq!(recorded_ids(&ledger)?, vec![10]);

    harness.heal(20);
    harness.clear_executed();
    let summary = run(&mut ledger, NETWORK, &ctx, &mut steps)?;

    assert_eq!(harness.executed(), vec![20, 30]);
    assert_eq!(recorded_ids(&ledger)?, vec![10, 20, 30]);
    assert_eq!(summary.skipped, vec![StepId::new(10)?]);

    Ok(())
}

#[test]
fn test_steps_run_in_id_order_regardless_of_definition_order() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[80, 10, 55, 58, 20]);

    run(&mut ledger, NETWORK, &ctx, &mut steps)?;

    assert_eq!(harness.executed(), vec![10, 20, 55, 58, 80]);
    assert!(harness.unrecorded_predecessors.borrow().is_empty());

    Ok(())
}

#[test]
fn test_empty_step_list() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let mut steps: Vec<Step<TestContext>> = Vec::new();

    let summary = run(&mut ledger, NETWORK, &ctx, &mut steps)?;

    assert_eq!(summary, RunSummary::default());
    assert!(ledger.records(NETWORK)?.is_empty());
    assert!(!ledger.network_path(NETWORK)?.exists());

    Ok(())
}

#[test]
fn test_duplicate_step_ids_rejected_before_running() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[10, 20, 10]);

    let err = run(&mut ledger, NETWORK, &ctx, &mut steps).unwrap_err();

    assert!(matches!(err, MigrationError::DuplicateStepDefinition(id) if id.get() == 10));
    assert!(harness.executed().is_empty());

    Ok(())
}

#[test]
fn test_corrupt_ledger_aborts_before_any_step() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    std::fs::write(ledger.network_path(NETWORK)?, "[]")?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[10, 20]);

    let err = run(&mut ledger, NETWORK, &ctx, &mut steps).unwrap_err();

    assert!(matches!(err, MigrationError::LedgerRead { .. }));
    assert!(harness.executed().is_empty());

    Ok(())
}

#[test]
fn test_skipped_step_outputs_visible_to_later_steps() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let seen = Rc::new(RefCell::new(None));

    let build_steps = |seen: Rc<RefCell<Option<String>>>, fail: bool| {
        vec![
            Step::new(StepId::new(10).unwrap(), "factory", |_: &TestContext, _| {
                Ok(StepOutputs::from([(
                    "Factory".to_string(),
                    "0x0000000000000000000000000000000000000010".to_string(),
                )]))
            }),
            Step::new(StepId::new(20).unwrap(), "builder", move |_: &TestContext, results| {
                *seen.borrow_mut() = results.lookup("Factory").map(str::to_string);
                if fail {
                    return Err("builder failed".into());
                }
                Ok(StepOutputs::new())
            }),
        ]
    };

    let mut failing = build_steps(seen.clone(), true);
    assert!(run(&mut ledger, NETWORK, &ctx, &mut failing).is_err());

    seen.replace(None);
    let mut healed = build_steps(seen.clone(), false);
    let summary = run(&mut ledger, NETWORK, &ctx, &mut healed)?;

    assert_eq!(summary.skipped, vec![StepId::new(10)?]);
    assert_eq!(
        seen.borrow().as_deref(),
        Some("0x0000000000000000000000000000000000000010")
    );

    Ok(())
}

#[test]
fn test_networks_do_not_share_progress() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[10, 20]);

    run(&mut ledger, NETWORK, &ctx, &mut steps)?;
    harness.clear_executed();
    run(&mut ledger, "other", &ctx, &mut steps)?;

    assert_eq!(harness.executed(), vec![10, 20]);

    Ok(())
}

#[test]
fn test_plan_reports_without_executing() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();
    let mut steps = harness.steps(&[30, 10, 20]);

    harness.fail(20);
    assert!(run(&mut ledger, NETWORK, &ctx, &mut steps).is_err());
    harness.clear_executed();

    let planned = plan(&ledger, NETWORK, &steps)?;

    assert!(harness.executed().is_empty());
    let ids: Vec<u64> = planned.iter().map(|p| p.id.get()).collect();
    assert_eq!(ids, vec![10, 20, 30]);
    assert!(matches!(planned[0].status, StepStatus::Applied(_)));
    assert_eq!(planned[1].status, StepStatus::Pending);
    assert_eq!(planned[2].status, StepStatus::Pending);
    assert_eq!(recorded_ids(&ledger)?, vec![10]);

    Ok(())
}

#[cfg(unix)]
#[test]
fn test_failed_record_halts_run_without_recording() -> Result<()> {
    let (dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();

    // Once step 10 has run, the ledger directory is a dangling symlink: the
    // ledger still reads as empty but the record cannot be written
    let ledger_dir = ctx.ledger_dir.clone();
    let missing = dir.path().join("missing");
    let mut broken = false;

    let mut steps = harness.steps(&[20]);
    steps.push(Step::new(
        StepId::new(10)?,
        "break-ledger",
        move |_: &TestContext, _| {
            if !broken {
                broken = true;
                std::fs::remove_dir(&ledger_dir)?;
                std::os::unix::fs::symlink(&missing, &ledger_dir)?;
            }
            Ok(StepOutputs::new())
        },
    ));

    let err = run(&mut ledger, NETWORK, &ctx, &mut steps).unwrap_err();

    assert!(matches!(err, MigrationError::LedgerWrite { .. }), "{err}");
    assert!(harness.executed().is_empty());
    assert!(recorded_ids(&ledger)?.is_empty());

    std::fs::remove_file(&ctx.ledger_dir)?;
    std::fs::create_dir(&ctx.ledger_dir)?;
    let summary = run(&mut ledger, NETWORK, &ctx, &mut steps)?;

    assert_eq!(summary.applied, vec![StepId::new(10)?, StepId::new(20)?]);
    assert_eq!(harness.executed(), vec![20]);
    assert_eq!(recorded_ids(&ledger)?, vec![10, 20]);

    Ok(())
}

#[test]
fn test_applied_steps_decided_from_ledger_read_at_start() -> Result<()> {
    let (_dir, mut ledger, ctx) = setup()?;
    let harness = Harness::default();

    // Another writer records step 20 while step 10 runs
    let mut steps = harness.steps(&[20]);
    steps.push(Step::new(
        StepId::new(10)?,
        "interloper",
        |ctx: &TestContext, _| {
            let mut other = MigrationLedger::open(&ctx.ledger_dir)?;
            other.record_applied(NETWORK, StepId::new(20)?)?;
            Ok(StepOutputs::new())
        },
    ));

    let err = run(&mut ledger, NETWORK, &ctx, &mut steps).unwrap_err();

    assert!(matches!(
        err,
        MigrationError::DuplicateStep { step_id, .. } if step_id.get() == 20
    ));
    assert_eq!(harness.executed(), vec![20]);
    assert_eq!(recorded_ids(&ledger)?, vec![10, 20]);

    Ok(())
}
