//! Cost-aware selection of the next candidate under a global time budget.
//!
//! The [`Scheduler`] owns one [`LocalSearch`] and one [`SearchState`] per
//! registered [`Candidate`]. Each iteration it:
//!
//! 1. runs a deferred full-data retrain of the global best once the remaining
//!    budget just fits it;
//! 2. drops candidates that can no longer afford a trial or hit their trial cap;
//! 3. picks an untried candidate if one is left, otherwise samples a
//!    candidate with probability proportional to its inverse estimated cost
//!    (or takes the cheapest one in [`SelectionMode::Deterministic`]);
//! 4. advances that candidate's local search by one step.
//!
//! The loop ends when the budget is spent, no eligible candidate remains, or
//! the iteration cap is reached. The trial log then receives a checkpoint
//! naming the record of the global best.

mod builder;
mod candidate;
mod cost;

use core::marker::PhantomData;

use fastrand::Rng;

pub use builder::{DEFAULT_MAX_ITERATIONS, SchedulerBuilder};
pub use candidate::{Candidate, CandidateReport, SizeEstimator};

use crate::budget::GlobalBudget;
use crate::error::{Error, Result};
use crate::log::TrialLog;
use crate::rng_util;
use crate::search::{LocalSearch, SearchPhase, StepOutcome, TrialContext};
use crate::space::Configuration;
use crate::state::SearchState;
use crate::trainer::Trainer;
use crate::types::{RetrainPolicy, SelectionMode};
use candidate::CandidateRun;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Borrowed view of the globally best candidate.
#[derive(Debug)]
pub struct BestCandidate<'a, M> {
    /// Candidate name.
    pub name: &'a str,
    /// Best validation loss.
    pub loss: f64,
    /// Best configuration.
    pub config: &'a Configuration,
    /// Sample size the held model was trained on.
    pub sample_size: usize,
    /// The held model, if the trainer returned one.
    pub model: Option<&'a M>,
}

/// Owned result of a finished search.
#[derive(Debug)]
pub struct BestModel<M> {
    /// Candidate name.
    pub name: String,
    /// Best validation loss.
    pub loss: f64,
    /// Best configuration.
    pub config: Configuration,
    /// Sample size the model was trained on.
    pub sample_size: usize,
    /// The trained model, if the trainer returned one.
    pub model: Option<M>,
}

/// Summary returned by [`Scheduler::run`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SearchSummary {
    /// Name of the best candidate, if any trial succeeded.
    pub best_candidate: Option<String>,
    /// Best validation loss (`+inf` if no trial succeeded).
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::log::serialize_loss"))]
    pub best_loss: f64,
    /// Best configuration.
    pub best_config: Option<Configuration>,
    /// Scheduler iterations run.
    pub iterations: usize,
    /// Time from start when the search ended.
    pub time_used: f64,
    /// Trainer calls over all candidates.
    pub trials: usize,
}

/// Multi-candidate search driver.
///
/// Construct one with [`Scheduler::builder()`]; see [`SchedulerBuilder`] for
/// an end-to-end example.
pub struct Scheduler<M, T> {
    trainer: T,
    runs: Vec<CandidateRun<M>>,
    budget: GlobalBudget,
    log: TrialLog,
    sample_multiply_factor: f64,
    full_size: usize,
    selection: SelectionMode,
    retrain: RetrainPolicy,
    max_iterations: usize,
    rng: Rng,
    iteration: usize,
    pending_retrain: Option<usize>,
    min_trial_time: Option<f64>,
    last_step: Option<(usize, StepOutcome)>,
    finished: bool,
    _marker: PhantomData<fn() -> M>,
}

impl<M, T: Trainer<M>> Scheduler<M, T> {
    /// Returns a builder for configuring a scheduler.
    #[must_use]
    pub fn builder() -> SchedulerBuilder<M, T> {
        SchedulerBuilder::new()
    }

    /// Runs iterations until the search terminates.
    ///
    /// # Errors
    ///
    /// Returns an error if an invalid configuration reaches the trainer;
    /// this signals a bug and aborts the search.
    pub fn run(&mut self) -> Result<SearchSummary> {
        while self.step()? {}
        Ok(self.summary())
    }

    /// Runs a single iteration. Returns `false` once the search has
    /// terminated.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn step(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        if self.budget.is_exhausted() || self.iteration >= self.max_iterations {
            self.finish()?;
            return Ok(false);
        }

        self.run_pending_retrain()?;
        self.drop_unaffordable();
        let Some(index) = self.select() else {
            self.finish()?;
            return Ok(false);
        };

        self.iteration += 1;
        let global_best = self.global_best_loss();
        let outcome = self.with_context(index, |search, ctx, state| search.step(ctx, state))?;

        let run = &mut self.runs[index];
        if outcome.trainer_calls > 0 {
            let time = run.search.last_trial_time();
            if time > 0.0 {
                self.min_trial_time = Some(self.min_trial_time.map_or(time, |t| t.min(time)));
            }
        }
        if run.search.phase() == SearchPhase::Terminated && !self.budget.is_exhausted() {
            trace_info!(candidate = run.candidate.name(), "dropping candidate without feasible start");
            run.eligible = false;
        }
        let best = run.state.best_loss();
        if best < global_best {
            trace_info!(candidate = run.candidate.name(), loss = best, "new global best");
            let on_sample = run.state.best_config_sample_size() < self.full_size;
            self.pending_retrain =
                (self.retrain != RetrainPolicy::Never && on_sample).then_some(index);
        }
        self.last_step = Some((index, outcome));
        Ok(true)
    }

    /// Builds the trial context for candidate `index` and runs `f` with it.
    fn with_context<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut LocalSearch, &mut TrialContext<'_, M>, &mut SearchState<M>) -> Result<R>,
    ) -> Result<R> {
        let global_best_loss = self.global_best_loss();
        let run = &mut self.runs[index];
        let mut ctx = TrialContext {
            candidate: run.candidate.name(),
            iteration: self.iteration,
            trainer: &mut self.trainer,
            budget: &mut self.budget,
            log: &mut self.log,
            estimator: run.candidate.estimator(),
            global_best_loss,
            retrain_on_reset: self.retrain != RetrainPolicy::Never,
        };
        f(&mut run.search, &mut ctx, &mut run.state)
    }

    fn run_pending_retrain(&mut self) -> Result<()> {
        let Some(index) = self.pending_retrain else {
            return Ok(());
        };
        let remaining = self.budget.remaining();
        if !self.runs[index].state.retrain_fits(remaining, self.full_size) {
            return Ok(());
        }
        self.pending_retrain = None;
        self.with_context(index, |search, ctx, state| search.retrain(ctx, state))?;
        Ok(())
    }

    fn drop_unaffordable(&mut self) {
        let remaining = self.budget.remaining();
        let min_trial_time = self.min_trial_time.unwrap_or(0.0);
        for run in self.runs.iter_mut().filter(|run| run.eligible) {
            let capped = run
                .candidate
                .trial_cap()
                .is_some_and(|cap| run.state.trials() >= cap);
            let next = cost::next_trial_time(&run.state, run.candidate.relative_cost(), min_trial_time);
            if capped || next > remaining {
                trace_info!(
                    candidate = run.candidate.name(),
                    capped,
                    next_trial_time = next,
                    remaining,
                    "dropping candidate"
                );
                run.eligible = false;
            }
        }
    }

    fn select(&mut self) -> Option<usize> {
        let untried: Vec<usize> = (0..self.runs.len())
            .filter(|&i| self.runs[i].eligible && !self.runs[i].is_tried())
            .collect();
        if !untried.is_empty() {
            return match self.selection {
                SelectionMode::Randomized => Some(untried[self.rng.usize(..untried.len())]),
                SelectionMode::Deterministic => untried.into_iter().min_by(|&a, &b| {
                    let eci = |i: usize| self.runs[i].candidate.relative_cost();
                    eci(a).total_cmp(&eci(b))
                }),
            };
        }

        let global_best = self.global_best_loss();
        let costs: Vec<f64> = self
            .runs
            .iter()
            .map(|run| {
                if run.eligible {
                    cost::estimated_cost(
                        &run.state,
                        self.full_size,
                        global_best,
                        self.sample_multiply_factor,
                    )
                } else {
                    f64::INFINITY
                }
            })
            .collect();
        match self.selection {
            SelectionMode::Randomized => {
                let weights: Vec<f64> = costs.iter().map(|c| 1.0 / c).collect();
                rng_util::weighted_index(&mut self.rng, &weights)
            }
            SelectionMode::Deterministic => costs
                .iter()
                .enumerate()
                .filter(|(_, c)| c.is_finite())
                .min_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, _)| i),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if self.retrain == RetrainPolicy::Always
            && !self.budget.is_exhausted()
            && let Some(index) = self.best_index()
            && self.runs[index].state.best_config_sample_size() < self.full_size
        {
            self.with_context(index, |search, ctx, state| search.retrain(ctx, state))?;
        }
        let best_record = self
            .best_index()
            .and_then(|i| self.runs[i].search.best_record());
        self.log.checkpoint(best_record);
        trace_info!(
            iterations = self.iteration,
            time_used = self.budget.time_from_start(),
            best_loss = self.global_best_loss(),
            "search finished"
        );
        Ok(())
    }

    fn best_index(&self) -> Option<usize> {
        self.runs
            .iter()
            .enumerate()
            .filter(|(_, run)| run.state.best_config().is_some())
            .min_by(|(_, a), (_, b)| a.state.best_loss().total_cmp(&b.state.best_loss()))
            .map(|(i, _)| i)
    }

    fn global_best_loss(&self) -> f64 {
        self.runs
            .iter()
            .map(|run| run.state.best_loss())
            .fold(f64::INFINITY, f64::min)
    }

    /// The globally best candidate so far.
    #[must_use]
    pub fn best(&self) -> Option<BestCandidate<'_, M>> {
        let run = &self.runs[self.best_index()?];
        Some(BestCandidate {
            name: run.candidate.name(),
            loss: run.state.best_loss(),
            config: run.state.best_config()?,
            sample_size: run.state.best_config_sample_size(),
            model: run.state.trained_model(),
        })
    }

    /// Consumes the scheduler and returns the best candidate with its model;
    /// every other model is dropped.
    #[must_use]
    pub fn into_best(mut self) -> Option<BestModel<M>> {
        let index = self.best_index()?;
        let mut run = self.runs.swap_remove(index);
        Some(BestModel {
            loss: run.state.best_loss(),
            config: run.state.best_config()?.clone(),
            sample_size: run.state.best_config_sample_size(),
            model: run.state.take_model(),
            name: run.candidate.name().to_string(),
        })
    }

    /// Summary of the search so far.
    #[must_use]
    pub fn summary(&self) -> SearchSummary {
        let best = self.best();
        SearchSummary {
            best_candidate: best.as_ref().map(|b| b.name.to_string()),
            best_loss: best.as_ref().map_or(f64::INFINITY, |b| b.loss),
            best_config: best.as_ref().map(|b| b.config.clone()),
            iterations: self.iteration,
            time_used: self.budget.time_from_start(),
            trials: self.runs.iter().map(|run| run.state.trials()).sum(),
        }
    }

    /// Per-candidate statistics, in registration order.
    #[must_use]
    pub fn reports(&self) -> Vec<CandidateReport> {
        self.runs.iter().map(CandidateRun::report).collect()
    }

    /// Running state of the named candidate.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&SearchState<M>> {
        self.find(name).map(|run| &run.state)
    }

    /// Local search of the named candidate.
    #[must_use]
    pub fn search(&self, name: &str) -> Option<&LocalSearch> {
        self.find(name).map(|run| &run.search)
    }

    fn find(&self, name: &str) -> Option<&CandidateRun<M>> {
        self.runs.iter().find(|run| run.candidate.name() == name)
    }

    /// Candidate advanced by the last iteration and what its step did.
    #[must_use]
    pub fn last_step(&self) -> Option<(&str, StepOutcome)> {
        self.last_step
            .map(|(i, outcome)| (self.runs[i].candidate.name(), outcome))
    }

    /// The global budget.
    #[must_use]
    pub fn budget(&self) -> &GlobalBudget {
        &self.budget
    }

    /// Time elapsed since the scheduler was built.
    #[must_use]
    pub fn time_from_start(&self) -> f64 {
        self.budget.time_from_start()
    }

    /// Iterations run so far.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Returns `true` once the search has terminated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of trial log writes that failed. Sink errors never stop the
    /// search.
    #[must_use]
    pub fn log_failures(&self) -> usize {
        self.log.failures()
    }

    /// The most recent trial log error, if any.
    #[must_use]
    pub fn last_log_error(&self) -> Option<&Error> {
        self.log.last_error()
    }
}
