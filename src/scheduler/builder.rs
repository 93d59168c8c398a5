use core::marker::PhantomData;

use fastrand::Rng;

use super::Scheduler;
use super::candidate::{Candidate, CandidateRun};
use crate::budget::{Clock, GlobalBudget, WallClock};
use crate::error::{Error, Result};
use crate::log::{TrialLog, TrialLogSink};
use crate::search::LocalSearch;
use crate::settings::SearchSettings;
use crate::state::SearchState;
use crate::trainer::Trainer;
use crate::types::{RetrainPolicy, SelectionMode};

/// Default cap on scheduler iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// A builder for constructing [`Scheduler`] instances with a fluent API.
///
/// Created via [`Scheduler::builder()`]. `time_budget`, `full_size` and at
/// least one candidate are required.
///
/// # Defaults
///
/// - memory threshold: unbounded
/// - selection: [`Randomized`](SelectionMode::Randomized), seeded from entropy
/// - retrain: [`WithinBudget`](RetrainPolicy::WithinBudget)
/// - clock: [`WallClock`] started at [`build`](Self::build)
/// - max iterations: [`DEFAULT_MAX_ITERATIONS`]
/// - no trial log
///
/// # Examples
///
/// ```
/// use budget_search::prelude::*;
///
/// let x = HyperparameterSpec::float("x", 1.0, 100.0).init(2.0);
/// let space = ConfigurationSpace::new(vec![x.clone()]).unwrap();
///
/// let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
///     let v = req.config.get(&x).unwrap_or(0.0);
///     TrainOutcome::new((v - 30.0).abs(), 1.0)
/// };
/// let mut scheduler: Scheduler<(), _> = Scheduler::builder()
///     .time_budget(20.0)
///     .full_size(1000)
///     .clock(VirtualClock::new())
///     .seed(42)
///     .candidate(Candidate::new("quadratic", space))
///     .build(trainer)
///     .unwrap();
///
/// let summary = scheduler.run().unwrap();
/// assert!(summary.best_loss < 28.0);
/// assert!(summary.time_used <= 20.0);
/// ```
pub struct SchedulerBuilder<M, T> {
    time_budget: Option<f64>,
    full_size: Option<usize>,
    mem_thres: f64,
    selection: SelectionMode,
    seed: Option<u64>,
    max_iterations: usize,
    retrain: RetrainPolicy,
    clock: Option<Box<dyn Clock>>,
    settings: SearchSettings,
    log_sink: Option<Box<dyn TrialLogSink>>,
    candidates: Vec<Candidate>,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M, T: Trainer<M>> SchedulerBuilder<M, T> {
    pub(super) fn new() -> Self {
        Self {
            time_budget: None,
            full_size: None,
            mem_thres: f64::INFINITY,
            selection: SelectionMode::default(),
            seed: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            retrain: RetrainPolicy::default(),
            clock: None,
            settings: SearchSettings::default(),
            log_sink: None,
            candidates: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Sets the total time budget, in the clock's units.
    #[must_use]
    pub fn time_budget(mut self, time_budget: f64) -> Self {
        self.time_budget = Some(time_budget);
        self
    }

    /// Sets the full training-data size (the top of every sample-size ladder).
    #[must_use]
    pub fn full_size(mut self, full_size: usize) -> Self {
        self.full_size = Some(full_size);
        self
    }

    /// Sets the largest acceptable estimated model size.
    #[must_use]
    pub fn mem_threshold(mut self, mem_thres: f64) -> Self {
        self.mem_thres = mem_thres;
        self
    }

    /// Sets how candidates are selected once all have been tried.
    #[must_use]
    pub fn selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    /// Seeds every random draw of the search.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Caps the number of scheduler iterations.
    #[must_use]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets when the best configuration is retrained on the full data.
    #[must_use]
    pub fn retrain(mut self, retrain: RetrainPolicy) -> Self {
        self.retrain = retrain;
        self
    }

    /// Sets the clock that measures the budget.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Replaces the local search settings.
    #[must_use]
    pub fn settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sends every trainer call to `sink`.
    #[must_use]
    pub fn log_sink(mut self, sink: impl TrialLogSink + 'static) -> Self {
        self.log_sink = Some(Box::new(sink));
        self
    }

    /// Registers a candidate.
    #[must_use]
    pub fn candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Validates the configuration and creates the scheduler.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBudget`] if the time budget is missing or not positive
    /// - [`Error::InvalidDataSize`] if the full size is missing or zero
    /// - [`Error::NoCandidates`] / [`Error::DuplicateCandidate`] for a bad candidate list
    /// - [`Error::InvalidSetting`] for invalid settings, memory threshold,
    ///   iteration cap or candidate options
    pub fn build(self, trainer: T) -> Result<Scheduler<M, T>> {
        let time_budget = self.time_budget.unwrap_or(f64::NAN);
        if time_budget.is_nan() || time_budget <= 0.0 {
            return Err(Error::InvalidBudget(time_budget));
        }
        let Some(full_size) = self.full_size.filter(|&n| n > 0) else {
            return Err(Error::InvalidDataSize);
        };
        if self.mem_thres.is_nan() {
            return Err(Error::InvalidSetting {
                name: "mem_threshold",
                reason: "must not be NaN".to_string(),
            });
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidSetting {
                name: "max_iterations",
                reason: "must be positive".to_string(),
            });
        }
        self.settings.validate()?;
        if self.candidates.is_empty() {
            return Err(Error::NoCandidates);
        }
        for (i, candidate) in self.candidates.iter().enumerate() {
            candidate.validate()?;
            if self.candidates[..i].iter().any(|c| c.name() == candidate.name()) {
                return Err(Error::DuplicateCandidate(candidate.name().to_string()));
            }
        }

        let mut rng = self.seed.map_or_else(Rng::new, Rng::with_seed);
        let runs = self
            .candidates
            .into_iter()
            .map(|candidate| {
                let sample_size =
                    candidate.first_sample_size(self.settings.initial_sample_size, full_size);
                let search = LocalSearch::new(
                    candidate.space().clone(),
                    self.settings.clone(),
                    full_size,
                    rng.u64(..),
                );
                CandidateRun {
                    state: SearchState::new(sample_size, self.settings.keep_model_history),
                    search,
                    candidate,
                    eligible: true,
                }
            })
            .collect();
        let clock = self.clock.unwrap_or_else(|| Box::new(WallClock::new()));

        Ok(Scheduler {
            trainer,
            runs,
            budget: GlobalBudget::new(time_budget, self.mem_thres, clock),
            log: TrialLog::new(self.log_sink),
            sample_multiply_factor: self.settings.sample_multiply_factor,
            full_size,
            selection: self.selection,
            retrain: self.retrain,
            max_iterations: self.max_iterations,
            rng,
            iteration: 0,
            pending_retrain: None,
            min_trial_time: None,
            last_step: None,
            finished: false,
            _marker: PhantomData,
        })
    }
}
