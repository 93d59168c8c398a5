use budget_search::budget::VirtualClock;
use budget_search::scheduler::{Candidate, Scheduler};
use budget_search::search::SearchPhase;
use budget_search::space::{ConfigurationSpace, Group, HyperparameterSpec};
use budget_search::trainer::{TrainOutcome, TrainRequest};
use budget_search::SearchSettings;

type FlatTrainer = fn(&TrainRequest<'_>) -> TrainOutcome<()>;

fn flat(_: &TrainRequest<'_>) -> TrainOutcome<()> {
    TrainOutcome::new(1.0, 1.0)
}

fn scheduler(space: ConfigurationSpace, settings: SearchSettings) -> Scheduler<(), FlatTrainer> {
    Scheduler::builder()
        .time_budget(1_000.0)
        .full_size(1_000)
        .clock(VirtualClock::new())
        .seed(21)
        .settings(settings)
        .candidate(Candidate::new("a", space))
        .build(flat as FlatTrainer)
        .unwrap()
}

fn one_dim() -> ConfigurationSpace {
    let x = HyperparameterSpec::float("x", 1.0, 1_000.0).init(10.0);
    ConfigurationSpace::new(vec![x]).unwrap()
}

#[test]
fn test_first_step_evaluates_initial_configuration() {
    let space = one_dim();
    let init = space.init_config();
    let mut scheduler = scheduler(space, SearchSettings::new());

    assert_eq!(scheduler.search("a").unwrap().phase(), SearchPhase::Init);
    assert!(scheduler.step().unwrap());

    let (name, outcome) = scheduler.last_step().unwrap();
    assert_eq!(name, "a");
    assert_eq!(outcome.trainer_calls, 1);
    assert!(outcome.improved);
    let search = scheduler.search("a").unwrap();
    assert_eq!(search.phase(), SearchPhase::Searching);
    assert_eq!(search.incumbent(), &init);
    assert_eq!(search.incumbent_loss(), 1.0);
    assert_eq!(search.history().len(), 1);
}

#[test]
fn test_stall_shrinks_step_base() {
    let mut scheduler = scheduler(one_dim(), SearchSettings::new());
    let base_ini = scheduler.search("a").unwrap().base_ini(Group::Secondary).unwrap();
    assert_eq!(scheduler.search("a").unwrap().base(Group::Primary), None);

    scheduler.step().unwrap();
    scheduler.step().unwrap();

    let search = scheduler.search("a").unwrap();
    assert_eq!(search.phase(), SearchPhase::Stalled);
    assert_eq!(search.shrinks(), 1);
    assert_eq!(search.resets(), 0);
    assert!(search.base(Group::Secondary).unwrap() < base_ini);
    assert!(search.base(Group::Secondary).unwrap() > 1.0);
}

#[test]
fn test_reset_widens_base_after_max_shrinks() {
    let mut scheduler = scheduler(one_dim(), SearchSettings::new().max_shrinks(1));
    scheduler.step().unwrap();
    scheduler.step().unwrap();

    let search = scheduler.search("a").unwrap();
    assert_eq!(search.resets(), 1);
    assert_eq!(search.phase(), SearchPhase::Reset);
    // doubled from 2, capped at 2^2 on the full sample
    let base = search.base(Group::Secondary).unwrap();
    assert!((base - 4.0).abs() < 1e-9, "base = {base}");
    assert_eq!(search.base_ini(Group::Secondary), Some(base));
}

#[test]
fn test_groups_alternate_on_stall() {
    let n = HyperparameterSpec::float("n", 1.0, 1_000.0).init(4.0).complexity_related();
    let lr = HyperparameterSpec::float("lr", 0.001, 1.0).init(0.1);
    let space = ConfigurationSpace::new(vec![n, lr]).unwrap();
    let mut scheduler = scheduler(space, SearchSettings::new());

    scheduler.step().unwrap();
    assert_eq!(scheduler.search("a").unwrap().active_group(), Group::Primary);

    let mut groups = Vec::new();
    let mut shrinks = Vec::new();
    for _ in 0..4 {
        scheduler.step().unwrap();
        let search = scheduler.search("a").unwrap();
        groups.push(search.active_group());
        shrinks.push(search.shrinks());
    }
    assert_eq!(
        groups,
        vec![Group::Secondary, Group::Primary, Group::Secondary, Group::Primary]
    );
    // two full primary/secondary cycles without improvement for dim 2
    assert_eq!(shrinks, vec![0, 0, 0, 1]);
}

#[test]
fn test_memo_table_never_retrains_a_key() {
    let x = HyperparameterSpec::int("x", 1, 4).init(2.0);
    let space = ConfigurationSpace::new(vec![x]).unwrap();
    let mut scheduler = scheduler(space, SearchSettings::new());
    for _ in 0..50 {
        scheduler.step().unwrap();
    }
    // four values on one sample size
    assert!(scheduler.state("a").unwrap().trials() <= 4);
    assert!(scheduler.search("a").unwrap().history().len() <= 4);
}
