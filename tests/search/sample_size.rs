use budget_search::budget::VirtualClock;
use budget_search::log::MemoryTrialLog;
use budget_search::scheduler::{Candidate, Scheduler};
use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
use budget_search::trainer::{TrainOutcome, TrainRequest};

fn run(initial: usize, full: usize, budget: f64) -> (Vec<(usize, i64)>, usize) {
    let n = HyperparameterSpec::int("n_estimators", 4, 1_000_000)
        .init(4.0)
        .complexity_related()
        .scales_with_sample_size();
    let lr = HyperparameterSpec::float("lr", 0.01, 1.0).init(0.1);
    let space = ConfigurationSpace::new(vec![n.clone(), lr]).unwrap();
    let trainer = |_: &TrainRequest<'_>| TrainOutcome::<()>::new(1.0, 1.0);
    let log = MemoryTrialLog::new();
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(budget)
        .full_size(full)
        .clock(VirtualClock::new())
        .seed(13)
        .log_sink(log.clone())
        .candidate(Candidate::new("a", space).initial_sample_size(initial))
        .build(trainer)
        .unwrap();
    scheduler.run().unwrap();
    let trials = log
        .records()
        .iter()
        .map(|r| (r.sample_size, r.config.get_int(&n).unwrap_or(0)))
        .collect();
    (trials, scheduler.state("a").unwrap().sample_size())
}

#[test]
fn test_sample_size_doubles_up_to_full() {
    let (trials, _) = run(100, 1_600, 60.0);
    assert_eq!(trials[0].0, 100);
    let ladder = [100, 200, 400, 800, 1_600];
    assert!(trials.iter().all(|(s, _)| ladder.contains(s)));
    assert!(trials.iter().any(|&(s, _)| s == 1_600));
}

#[test]
fn test_last_rung_is_capped_at_full_size() {
    let (trials, _) = run(300, 1_000, 60.0);
    let ladder = [300, 600, 1_000];
    assert!(trials.iter().all(|(s, _)| ladder.contains(s)));
    assert!(trials.iter().any(|&(s, _)| s == 1_000));
}

#[test]
fn test_size_like_values_stay_below_sample_size() {
    let (trials, sample_size) = run(16, 4_096, 120.0);
    assert!(sample_size <= 4_096);
    for (s, n) in trials {
        assert!(n as usize <= s, "n_estimators = {n} on {s} rows");
    }
}

#[test]
fn test_full_sized_candidate_never_escalates() {
    let (trials, sample_size) = run(10_000, 500, 30.0);
    assert_eq!(sample_size, 500);
    assert!(trials.iter().all(|&(s, _)| s == 500));
}
