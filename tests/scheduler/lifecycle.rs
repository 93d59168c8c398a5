use budget_search::budget::VirtualClock;
use budget_search::scheduler::{Candidate, Scheduler};
use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
use budget_search::trainer::{TrainOutcome, TrainRequest};

fn sphere_candidate(name: &str) -> (Candidate, HyperparameterSpec, HyperparameterSpec) {
    let x = HyperparameterSpec::float("x", 1.0, 64.0).init(1.0);
    let y = HyperparameterSpec::float("y", -8.0, 8.0).init(0.0);
    let space = ConfigurationSpace::new(vec![x.clone(), y.clone()]).unwrap();
    (Candidate::new(name, space), x, y)
}

#[test]
fn test_run_until_budget_is_spent() {
    let (candidate, x, y) = sphere_candidate("sphere");
    let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
        let (a, b) = (req.config.get(&x).unwrap_or(0.0), req.config.get(&y).unwrap_or(0.0));
        TrainOutcome::new((a - 20.0).powi(2) + (b - 3.0).powi(2), 0.5)
    };
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(25.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(9)
        .candidate(candidate)
        .build(trainer)
        .unwrap();

    let summary = scheduler.run().unwrap();
    assert!(scheduler.is_finished());
    assert!(scheduler.budget().is_exhausted());
    assert_eq!(summary.time_used, 25.0);
    assert_eq!(summary.trials, 50);
    assert_eq!(summary.best_candidate.as_deref(), Some("sphere"));
    // initial loss is 19^2 + 3^2
    assert!(summary.best_loss < 370.0);
    assert!(!scheduler.step().unwrap());
    assert_eq!(scheduler.summary(), summary);
}

#[test]
fn test_reports_cover_every_candidate() {
    let (a, ..) = sphere_candidate("a");
    let (b, ..) = sphere_candidate("b");
    let trainer = |req: &TrainRequest<'_>| -> TrainOutcome<()> {
        let loss = if req.candidate == "a" { 1.0 } else { 2.0 };
        TrainOutcome::new(loss, 1.0)
    };
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(30.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(2)
        .candidate(a)
        .candidate(b)
        .build(trainer)
        .unwrap();
    let summary = scheduler.run().unwrap();

    let reports = scheduler.reports();
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(reports[0].best_loss, 1.0);
    assert_eq!(reports[1].best_loss, 2.0);
    assert_eq!(reports.iter().map(|r| r.trials).sum::<usize>(), summary.trials);
    assert_eq!(summary.best_loss, 1.0);
}

#[test]
fn test_candidate_without_feasible_start_is_dropped() {
    let (small, ..) = sphere_candidate("small");
    let n = HyperparameterSpec::int("n", 10, 100).init(50.0).complexity_related();
    let large = Candidate::new("large", ConfigurationSpace::new(vec![n.clone()]).unwrap())
        .size_estimator(move |c| c.get(&n).unwrap_or(0.0));
    let trainer = |_: &TrainRequest<'_>| TrainOutcome::<()>::new(1.0, 1.0);
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(20.0)
        .full_size(1_000)
        .mem_threshold(5.0)
        .clock(VirtualClock::new())
        .seed(3)
        .candidate(small)
        .candidate(large)
        .build(trainer)
        .unwrap();
    scheduler.run().unwrap();

    let reports = scheduler.reports();
    assert!(!reports[1].eligible);
    assert_eq!(reports[1].trials, 0);
    assert!(reports[1].best_config.is_none());
    assert!(reports[0].trials > 0);
}

#[test]
fn test_max_trials_leaves_budget_unspent() {
    let (candidate, ..) = sphere_candidate("a");
    let trainer = |_: &TrainRequest<'_>| TrainOutcome::<()>::new(1.0, 1.0);
    let mut scheduler: Scheduler<(), _> = Scheduler::builder()
        .time_budget(100.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(6)
        .candidate(candidate.max_trials(3))
        .build(trainer)
        .unwrap();
    let summary = scheduler.run().unwrap();
    assert!(summary.time_used < 100.0);
    assert!(!scheduler.budget().is_exhausted());
    assert!(!scheduler.reports()[0].eligible);
}
