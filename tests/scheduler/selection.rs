use budget_search::budget::VirtualClock;
use budget_search::log::MemoryTrialLog;
use budget_search::scheduler::{Candidate, Scheduler};
use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
use budget_search::trainer::{TrainOutcome, TrainRequest};
use budget_search::SelectionMode;

fn space() -> (ConfigurationSpace, HyperparameterSpec) {
    let x = HyperparameterSpec::float("x", 1.0, 1_000.0).init(1.0);
    (ConfigurationSpace::new(vec![x.clone()]).unwrap(), x)
}

#[test]
fn test_failing_candidate_is_tried_once() {
    let (good_space, x) = space();
    let (failing_space, _) = space();
    let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
        if req.candidate == "failing" {
            return TrainOutcome::failed(1.0);
        }
        let v = req.config.get(&x).unwrap_or(1.0);
        TrainOutcome::new((v.ln() - 4.0).abs(), 1.0)
    };
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(60.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(5)
        .log_sink(log.clone())
        .candidate(Candidate::new("good", good_space).eci(1.0))
        .candidate(Candidate::new("failing", failing_space).eci(10.0))
        .build(trainer)
        .unwrap();

    let summary = scheduler.run().unwrap();
    assert_eq!(summary.best_candidate.as_deref(), Some("good"));
    assert_eq!(scheduler.state("failing").unwrap().trials(), 1);
    assert!(scheduler.state("good").unwrap().trials() > 10);

    let records = log.records();
    let failing: Vec<_> = records.iter().filter(|r| r.candidate == "failing").collect();
    assert_eq!(failing.len(), 1);
    assert!(failing[0].val_loss.is_infinite());
    // both candidates are tried first, then only the good one
    assert!(records.iter().skip(2).all(|r| r.candidate == "good"));
}

#[test]
fn test_same_seed_same_search() {
    let (space, x) = space();
    let candidate = Candidate::new("a", space);
    let run = |seed: u64| {
        let x = x.clone();
        let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
            let v = req.config.get(&x).unwrap_or(1.0);
            TrainOutcome::new((v - 300.0).abs(), 1.0)
        };
        let log = MemoryTrialLog::new();
        let mut scheduler: Scheduler<(), _> = Scheduler::builder()
            .time_budget(40.0)
            .full_size(1_000)
            .clock(VirtualClock::new())
            .seed(seed)
            .log_sink(log.clone())
            .candidate(candidate.clone())
            .build(trainer)
            .unwrap();
        scheduler.run().unwrap();
        log.records()
    };

    let first = run(11);
    assert_eq!(first.len(), 40);
    assert_eq!(first, run(11));
    assert_ne!(first, run(12));
}

#[test]
fn test_deterministic_selection_prefers_cheaper_candidate() {
    let (a, x) = space();
    let (b, _) = space();
    let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
        let v = req.config.get(&x).unwrap_or(1.0);
        let elapsed = if req.candidate == "slow" { 8.0 } else { 1.0 };
        TrainOutcome::new((v - 50.0).abs(), elapsed)
    };
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(200.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .selection(SelectionMode::Deterministic)
        .candidate(Candidate::new("fast", a).eci(1.0))
        .candidate(Candidate::new("slow", b).eci(8.0))
        .build(trainer)
        .unwrap();

    assert!(scheduler.step().unwrap());
    assert_eq!(scheduler.last_step().map(|(name, _)| name), Some("fast"));
    assert!(scheduler.step().unwrap());
    assert_eq!(scheduler.last_step().map(|(name, _)| name), Some("slow"));

    scheduler.run().unwrap();
    let fast = scheduler.state("fast").unwrap().trials();
    let slow = scheduler.state("slow").unwrap().trials();
    assert!(fast > slow, "fast: {fast}, slow: {slow}");
}
