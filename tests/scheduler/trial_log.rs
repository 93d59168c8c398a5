use budget_search::budget::VirtualClock;
use budget_search::log::{MemoryTrialLog, TrialKind, TrialLogRecord, TrialLogSink};
use budget_search::scheduler::{Candidate, Scheduler};
use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
use budget_search::trainer::{TrainOutcome, TrainRequest};
use budget_search::{Error, Result};

/// Runs the search and returns its summary with the number of failed log writes.
fn run_logged(log: impl TrialLogSink + 'static) -> (budget_search::SearchSummary, usize) {
    let x = HyperparameterSpec::int("x", 1, 512).init(1.0).complexity_related();
    let y = HyperparameterSpec::float("y", 0.01, 1.0).init(0.5);
    let space = ConfigurationSpace::new(vec![x.clone(), y.clone()]).unwrap();
    let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
        let a = req.config.get(&x).unwrap_or(1.0);
        let b = req.config.get(&y).unwrap_or(0.5);
        TrainOutcome::new((a.ln() - 3.0).abs() + (b - 0.2).abs(), 1.0).with_train_loss(0.0)
    };
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(40.0)
        .full_size(2_000)
        .clock(VirtualClock::new())
        .seed(17)
        .log_sink(log)
        .candidate(Candidate::new("a", space).initial_sample_size(250))
        .build(trainer)
        .unwrap();
    let summary = scheduler.run().unwrap();
    (summary, scheduler.log_failures())
}

#[test]
fn test_every_trainer_call_is_logged() {
    let log = MemoryTrialLog::new();
    let (summary, failures) = run_logged(log.clone());
    let records = log.records();

    assert_eq!(failures, 0);
    assert_eq!(records.len(), summary.trials);
    assert!(records.windows(2).all(|w| w[0].record_id < w[1].record_id));
    assert!(records.windows(2).all(|w| w[0].iteration <= w[1].iteration));
    assert!(records.windows(2).all(|w| w[0].total_time < w[1].total_time));
    assert!(records.iter().all(|r| r.candidate == "a"));
    assert_eq!(records[0].kind, TrialKind::Search);
    assert_eq!(records[0].sample_size, 250);
    assert!(records.iter().all(|r| r.train_loss == Some(0.0)));
    assert_eq!(records.last().map(|r| r.total_time), Some(summary.time_used));
}

#[test]
fn test_best_loss_in_log_never_increases() {
    let log = MemoryTrialLog::new();
    run_logged(log.clone());
    let records = log.records();
    assert!(records.windows(2).all(|w| w[1].best_loss <= w[0].best_loss));
}

#[test]
fn test_checkpoint_names_the_best_record() {
    let log = MemoryTrialLog::new();
    let (summary, _) = run_logged(log.clone());

    let best_id = log.checkpoint().flatten().unwrap();
    let records = log.records();
    let best: &TrialLogRecord = records.iter().find(|r| r.record_id == best_id).unwrap();
    assert_eq!(best.val_loss, summary.best_loss);
    assert_eq!(Some(&best.config), summary.best_config.as_ref());
}

struct FailingSink;

impl TrialLogSink for FailingSink {
    fn append(&mut self, _record: &TrialLogRecord) -> Result<()> {
        Err(Error::Log("disk full".to_string()))
    }
}

#[test]
fn test_sink_errors_do_not_stop_the_search() {
    let (summary, failures) = run_logged(FailingSink);
    assert_eq!(summary.time_used, 40.0);
    assert!(summary.best_config.is_some());
    // every append failed; the default checkpoint succeeds
    assert_eq!(failures, summary.trials);
}
