use budget_search::budget::VirtualClock;
use budget_search::log::{MemoryTrialLog, TrialKind};
use budget_search::scheduler::{Candidate, Scheduler};
use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
use budget_search::trainer::{TrainOutcome, TrainRequest};
use budget_search::RetrainPolicy;

fn candidate() -> Candidate {
    let x = HyperparameterSpec::float("x", 1.0, 100.0).init(2.0);
    Candidate::new("a", ConfigurationSpace::new(vec![x]).unwrap()).initial_sample_size(100)
}

/// Constant loss; time and model both follow the sample size.
fn trainer(req: &TrainRequest<'_>) -> TrainOutcome<usize> {
    TrainOutcome::new(1.0, req.sample_size as f64 / 100.0).with_model(req.sample_size)
}

#[test]
fn test_retrain_when_remaining_budget_just_fits() {
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<usize, _> = Scheduler::builder()
        .time_budget(12.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(1)
        .log_sink(log.clone())
        .candidate(candidate())
        .build(trainer)
        .unwrap();

    // 1 time unit on 100 rows; a retrain on 1000 rows needs 10 of the 11 left
    assert!(scheduler.step().unwrap());
    assert_eq!(scheduler.state("a").unwrap().best_config_sample_size(), 100);
    assert!(scheduler.step().unwrap());

    let records = log.records();
    assert_eq!(records[1].kind, TrialKind::Retrain);
    assert_eq!(records[1].sample_size, 1_000);
    let state = scheduler.state("a").unwrap();
    assert_eq!(state.best_config_sample_size(), 1_000);
    assert_eq!(state.trained_model(), Some(&1_000));

    scheduler.run().unwrap();
    let retrains = log.records().iter().filter(|r| r.kind == TrialKind::Retrain).count();
    assert_eq!(retrains, 1);
    assert_eq!(log.checkpoint(), Some(Some(records[1].record_id)));

    let best = scheduler.into_best().unwrap();
    assert_eq!(best.sample_size, 1_000);
    assert_eq!(best.model, Some(1_000));
}

#[test]
fn test_candidate_dropped_when_next_trial_no_longer_fits_after_retrain() {
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<usize, _> = Scheduler::builder()
        .time_budget(11.5)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(1)
        .log_sink(log.clone())
        .candidate(candidate())
        .build(trainer)
        .unwrap();
    let summary = scheduler.run().unwrap();

    // 1 on 100 rows, then 10 on 1000 rows; the next trial needs at least 1 of the 0.5 left
    let kinds: Vec<(TrialKind, usize)> = log.records().iter().map(|r| (r.kind, r.sample_size)).collect();
    assert_eq!(kinds, vec![(TrialKind::Search, 100), (TrialKind::Retrain, 1_000)]);
    assert_eq!(summary.time_used, 11.0);
    assert!(summary.time_used <= 11.5);
    assert_eq!(scheduler.state("a").unwrap().estimated_retrain_time(100), 1.0);
}

#[test]
fn test_retrain_never() {
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<usize, _> = Scheduler::builder()
        .time_budget(12.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(1)
        .retrain(RetrainPolicy::Never)
        .log_sink(log.clone())
        .candidate(candidate())
        .build(trainer)
        .unwrap();
    scheduler.run().unwrap();

    assert!(log.records().iter().all(|r| r.kind == TrialKind::Search));
    let best = scheduler.best().unwrap();
    assert!(best.sample_size < 1_000);
}

#[test]
fn test_retrain_always_at_termination() {
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<usize, _> = Scheduler::builder()
        .time_budget(1_000.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .max_iterations(1)
        .retrain(RetrainPolicy::Always)
        .log_sink(log.clone())
        .candidate(candidate())
        .build(trainer)
        .unwrap();
    let summary = scheduler.run().unwrap();

    let records = log.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, TrialKind::Search);
    assert_eq!(records[1].kind, TrialKind::Retrain);
    assert_eq!(records[1].config, records[0].config);
    assert_eq!(summary.time_used, 11.0);
    assert_eq!(scheduler.best().unwrap().model, Some(&1_000));
}

#[test]
fn test_no_retrain_when_search_already_on_full_data() {
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<usize, _> = Scheduler::builder()
        .time_budget(50.0)
        .full_size(100)
        .clock(VirtualClock::new())
        .seed(4)
        .retrain(RetrainPolicy::Always)
        .log_sink(log.clone())
        .candidate(candidate())
        .build(trainer)
        .unwrap();
    scheduler.run().unwrap();
    assert!(log.records().iter().all(|r| r.kind == TrialKind::Search));
}
