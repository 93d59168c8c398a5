//! Randomized local search over one candidate's configuration space.
//!
//! Each candidate owns one [`LocalSearch`]. Every time the scheduler picks
//! the candidate, the search advances by one step:
//!
//! 1. grow the training sample if the last step did not improve, or if a
//!    larger sample looks cheaper than further refinement, and re-evaluate
//!    the best configuration at the new size;
//! 2. draw a random direction over the active hyperparameter group and
//!    propose one configuration on each side of the incumbent, skipping
//!    proposals whose estimated model size exceeds the memory threshold;
//! 3. evaluate the positive side, then the negative side, moving to the
//!    first one that beats the incumbent;
//! 4. on a stall, alternate between the primary and secondary groups and
//!    count full cycles without improvement;
//! 5. shrink the step base after `2^(dim-1)` such cycles, and reset to a
//!    gaussian draw around the initial configuration once the base can no
//!    longer produce meaningful moves.
//!
//! Every evaluation goes through a bounded memo table so the same
//! `(sample_size, configuration)` pair is never trained twice.

mod direction;
mod group;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use fastrand::Rng;

use crate::budget::GlobalBudget;
use crate::error::Result;
use crate::history::{TrialHistory, TrialKey, TrialRecord};
use crate::log::{TrialKind, TrialLog, TrialLogRecord};
use crate::settings::SearchSettings;
use crate::space::{Configuration, ConfigurationSpace, Group};
use crate::state::SearchState;
use crate::trainer::{TrainRequest, Trainer};

use direction::DrawKind;
use group::GroupState;

/// Where a [`LocalSearch`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchPhase {
    /// Created; the initial configuration has not been evaluated yet.
    Init,
    /// The last step moved the incumbent.
    Searching,
    /// The last step grew the training sample.
    IncreasingSample,
    /// The last step found no improving move.
    Stalled,
    /// The last step restarted from a fresh draw.
    Reset,
    /// The budget is exhausted or no feasible configuration exists.
    Terminated,
}

/// What one call into a [`LocalSearch`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Trainer calls issued, retrains included.
    pub trainer_calls: usize,
    /// Evaluations served from the memo table.
    pub memo_hits: usize,
    /// `true` if the candidate's best loss improved.
    pub improved: bool,
    /// `true` if the search can make no further progress.
    pub finished: bool,
}

/// Everything a search step borrows from the scheduler.
pub(crate) struct TrialContext<'a, M> {
    pub(crate) candidate: &'a str,
    pub(crate) iteration: usize,
    pub(crate) trainer: &'a mut dyn Trainer<M>,
    pub(crate) budget: &'a mut GlobalBudget,
    pub(crate) log: &'a mut TrialLog,
    pub(crate) estimator: &'a dyn Fn(&Configuration) -> f64,
    pub(crate) global_best_loss: f64,
    pub(crate) retrain_on_reset: bool,
}

impl<M> TrialContext<'_, M> {
    fn feasible(&self, config: &Configuration) -> bool {
        self.budget.fits_memory((self.estimator)(config))
    }
}

fn slot(group: Group) -> usize {
    match group {
        Group::Primary => 0,
        Group::Secondary => 1,
    }
}

/// Per-candidate local search state.
///
/// Created once per candidate by the scheduler and advanced one step at a
/// time; read-only accessors expose its internals for inspection.
#[derive(Debug)]
pub struct LocalSearch {
    space: ConfigurationSpace,
    settings: SearchSettings,
    full_size: usize,
    rng: Rng,
    history: TrialHistory,
    groups: [Option<GroupState>; 2],
    active: Group,
    phase: SearchPhase,
    incumbent: Configuration,
    incumbent_loss: f64,
    improved_last: bool,
    first_move: bool,
    after_reset: bool,
    no_improvement: usize,
    epo: usize,
    trials_since_shrink: usize,
    trials_since_reset: usize,
    old_k: Option<usize>,
    shrinks_since_reset: usize,
    shrinks: usize,
    resets: usize,
    last_trial_time: f64,
    best_by_sample: BTreeMap<usize, (f64, Configuration)>,
    best_record: Option<u64>,
}

impl LocalSearch {
    pub(crate) fn new(
        space: ConfigurationSpace,
        settings: SearchSettings,
        full_size: usize,
        seed: u64,
    ) -> Self {
        let dim = space.dim();
        let groups = [Group::Primary, Group::Secondary].map(|g| {
            let members = space.group(g);
            (!members.is_empty()).then(|| GroupState::new(members.to_vec(), settings.base_const))
        });
        let active = if groups[0].is_some() {
            Group::Primary
        } else {
            Group::Secondary
        };
        let incumbent = space.init_config();
        Self {
            history: TrialHistory::new(settings.history_size.saturating_mul(dim)),
            epo: 1 << dim.min(10).saturating_sub(1),
            space,
            settings,
            full_size,
            rng: Rng::with_seed(seed),
            groups,
            active,
            phase: SearchPhase::Init,
            incumbent,
            incumbent_loss: f64::INFINITY,
            improved_last: true,
            first_move: false,
            after_reset: false,
            no_improvement: 0,
            trials_since_shrink: 0,
            trials_since_reset: 0,
            old_k: None,
            shrinks_since_reset: 0,
            shrinks: 0,
            resets: 0,
            last_trial_time: 0.0,
            best_by_sample: BTreeMap::new(),
            best_record: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// The configuration space being searched.
    #[must_use]
    pub fn space(&self) -> &ConfigurationSpace {
        &self.space
    }

    /// Group perturbed by the next step.
    #[must_use]
    pub fn active_group(&self) -> Group {
        self.active
    }

    /// Current step base of `group`, or `None` if the group is empty.
    #[must_use]
    pub fn base(&self, group: Group) -> Option<f64> {
        self.groups[slot(group)].as_ref().map(GroupState::base)
    }

    /// Base restored at the next reset of `group`.
    #[must_use]
    pub fn base_ini(&self, group: Group) -> Option<f64> {
        self.groups[slot(group)].as_ref().map(GroupState::base_ini)
    }

    /// The current iterate.
    #[must_use]
    pub fn incumbent(&self) -> &Configuration {
        &self.incumbent
    }

    /// Loss of the current iterate at the sample size it was evaluated on.
    #[must_use]
    pub fn incumbent_loss(&self) -> f64 {
        self.incumbent_loss
    }

    /// Memo table of evaluated trials.
    #[must_use]
    pub fn history(&self) -> &TrialHistory {
        &self.history
    }

    /// Number of base shrinks so far.
    #[must_use]
    pub fn shrinks(&self) -> usize {
        self.shrinks
    }

    /// Number of resets so far.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets
    }

    pub(crate) fn last_trial_time(&self) -> f64 {
        self.last_trial_time
    }

    /// Trial log id of the record holding this candidate's best model.
    pub(crate) fn best_record(&self) -> Option<u64> {
        self.best_record
    }

    /// Advances the search by one step; the first call evaluates the
    /// initial configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueOutOfBounds`](crate::Error::ValueOutOfBounds) or
    /// [`Error::ConfigurationMismatch`](crate::Error::ConfigurationMismatch) if
    /// an invalid configuration reaches the trainer.
    pub(crate) fn step<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
    ) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::default();
        match self.phase {
            SearchPhase::Terminated => return Ok(self.finish(outcome)),
            SearchPhase::Init => {
                self.begin(ctx, state, &mut outcome)?;
                return Ok(outcome);
            }
            _ => {}
        }
        if ctx.budget.is_exhausted() {
            return Ok(self.finish(outcome));
        }

        let sample_size = state.sample_size();
        if sample_size < self.full_size
            && (!self.improved_last
                || 2.0 * self.last_trial_time < state.estimated_cost_to_improve())
            && !self.escalate(ctx, state, &mut outcome)?
        {
            return Ok(self.finish(outcome));
        }

        match self.explore(ctx, state, &mut outcome)? {
            None => return Ok(self.finish(outcome)),
            Some(true) => {
                self.phase = SearchPhase::Searching;
                self.no_improvement = 0;
            }
            Some(false) => {
                self.stall();
                if self.no_improvement >= self.epo {
                    self.shrink();
                    if self.should_reset() && !self.reset(ctx, state, &mut outcome)? {
                        return Ok(self.finish(outcome));
                    }
                }
            }
        }
        self.improved_last = outcome.improved;
        Ok(outcome)
    }

    fn finish(&mut self, mut outcome: StepOutcome) -> StepOutcome {
        self.phase = SearchPhase::Terminated;
        outcome.finished = true;
        outcome
    }

    fn begin<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
        outcome: &mut StepOutcome,
    ) -> Result<()> {
        let sample_size = state.sample_size();
        let mut start = self.space.clip_to_sample(&self.space.init_config(), sample_size);
        if !ctx.feasible(&start) {
            let fallback = self.space.clip_to_sample(&self.space.min_config(), sample_size);
            if !ctx.feasible(&fallback) {
                trace_info!(candidate = ctx.candidate, "no feasible initial configuration");
                *outcome = self.finish(*outcome);
                return Ok(());
            }
            start = fallback;
        }

        trace_info!(candidate = ctx.candidate, sample_size, "starting local search");
        let Some(loss) = self.evaluate(ctx, state, &start, sample_size, outcome)? else {
            *outcome = self.finish(*outcome);
            return Ok(());
        };
        self.incumbent = start;
        self.incumbent_loss = loss;
        self.improved_last = true;
        self.phase = SearchPhase::Searching;
        Ok(())
    }

    /// Grows the sample size and re-evaluates the best configuration on it.
    /// Returns `false` if the budget ran out first.
    fn escalate<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
        outcome: &mut StepOutcome,
    ) -> Result<bool> {
        let from = state.sample_size();
        let to = from
            .saturating_mul(self.settings.sample_growth_factor)
            .min(self.full_size);
        state.set_sample_size(to);
        self.phase = SearchPhase::IncreasingSample;
        self.first_move = true;
        trace_debug!(candidate = ctx.candidate, from, to, "increasing sample size");

        let best = state.best_config().unwrap_or(&self.incumbent);
        let best = self.space.clip_to_sample(best, to);
        let Some(loss) = self.evaluate(ctx, state, &best, to, outcome)? else {
            return Ok(false);
        };
        self.incumbent = best;
        self.incumbent_loss = loss;
        Ok(true)
    }

    /// Tries one direction over the active group. Returns `Some(true)` if the
    /// incumbent moved, `None` if the budget ran out.
    fn explore<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
        outcome: &mut StepOutcome,
    ) -> Result<Option<bool>> {
        let Some(group) = self.groups[slot(self.active)].as_ref() else {
            return Ok(Some(false));
        };
        let kind = if core::mem::take(&mut self.after_reset) {
            DrawKind::Gaussian
        } else {
            DrawKind::Sphere
        };
        let sample_size = state.sample_size();
        let proposal = direction::find_proposal(
            &mut self.rng,
            &self.space,
            &self.incumbent,
            group,
            kind,
            sample_size,
            self.settings.max_direction_draws,
            |config| ctx.feasible(config),
        );
        let Some(proposal) = proposal else {
            trace_debug!(candidate = ctx.candidate, "no feasible direction found");
            return Ok(Some(false));
        };

        for config in [proposal.positive, proposal.negative].into_iter().flatten() {
            let Some(loss) = self.evaluate(ctx, state, &config, sample_size, outcome)? else {
                return Ok(None);
            };
            if loss < self.incumbent_loss {
                self.incumbent = config;
                self.incumbent_loss = loss;
                return Ok(Some(true));
            }
        }
        Ok(Some(false))
    }

    fn stall(&mut self) {
        self.phase = SearchPhase::Stalled;
        let other = self.active.other();
        let has_other = self.groups[slot(other)].is_some();
        if self.first_move {
            self.first_move = false;
        } else if !has_other || self.active == Group::Secondary {
            self.no_improvement += 1;
        }
        if has_other {
            self.active = other;
        }
    }

    /// `base ^= min(sqrt(oldK / K), max_shrink_exponent)` on every group.
    #[allow(clippy::cast_precision_loss)]
    fn shrink(&mut self) {
        let k = self.trials_since_shrink.max(1);
        let old_k = self.old_k.unwrap_or(self.trials_since_reset).max(1);
        let exponent = (old_k as f64 / k as f64)
            .sqrt()
            .min(self.settings.max_shrink_exponent);
        for group in self.groups.iter_mut().flatten() {
            group.shrink(exponent);
        }
        trace_debug!(k, old_k, exponent, "shrinking step base");
        self.old_k = Some(k);
        self.trials_since_shrink = 0;
        self.no_improvement = 0;
        self.shrinks_since_reset += 1;
        self.shrinks += 1;
    }

    fn should_reset(&self) -> bool {
        let fallback = self.settings.base_lower_fallback;
        self.shrinks_since_reset >= self.settings.max_shrinks
            || self
                .groups
                .iter()
                .flatten()
                .all(|g| g.base() <= g.lower_bound(&self.space, &self.incumbent, fallback))
    }

    /// Restarts from a fresh draw around the initial configuration.
    /// Returns `false` if the budget ran out.
    fn reset<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
        outcome: &mut StepOutcome,
    ) -> Result<bool> {
        self.phase = SearchPhase::Reset;
        self.resets += 1;
        trace_info!(candidate = ctx.candidate, resets = self.resets, "resetting local search");

        if ctx.retrain_on_reset
            && state.best_loss() <= ctx.global_best_loss
            && state.retrain_fits(ctx.budget.remaining(), self.full_size)
            && self.retrain(ctx, state)?
        {
            outcome.trainer_calls += 1;
        }

        let sample_size = state.sample_size();
        let (base_const, full_size) = (self.settings.base_const, self.full_size);
        for group in self.groups.iter_mut().flatten() {
            let ceiling = group.ceiling(base_const, full_size, sample_size);
            group.widen(ceiling);
        }

        let origin = self.space.init_config();
        let groups: Vec<&GroupState> = self.groups.iter().flatten().collect();
        let mut restart = None;
        for _ in 0..self.settings.max_reset_draws {
            if ctx.budget.is_exhausted() {
                break;
            }
            let draw =
                direction::gaussian_perturbation(&mut self.rng, &self.space, &origin, &groups, sample_size);
            if !ctx.feasible(&draw) {
                continue;
            }
            let target = self.restart_sample_size((ctx.estimator)(&draw), sample_size, ctx.estimator);
            let draw = self.space.clip_to_sample(&draw, target);
            if !ctx.feasible(&draw) || self.history.contains(&TrialKey::new(target, &draw)) {
                continue;
            }
            restart = Some((draw, target));
            break;
        }
        let (start, target) =
            restart.unwrap_or_else(|| (self.incumbent.clone(), sample_size));

        state.set_sample_size(target);
        self.active = if self.groups[0].is_some() {
            Group::Primary
        } else {
            Group::Secondary
        };
        self.no_improvement = 0;
        self.shrinks_since_reset = 0;
        self.trials_since_reset = 0;
        self.trials_since_shrink = 0;
        self.old_k = None;
        self.first_move = false;
        self.after_reset = true;

        let Some(loss) = self.evaluate(ctx, state, &start, target, outcome)? else {
            return Ok(false);
        };
        self.incumbent = start;
        self.incumbent_loss = loss;
        Ok(true)
    }

    /// Smallest tried sample size whose best configuration is at least as
    /// large as a model of `size`; `current` if there is none.
    fn restart_sample_size(
        &self,
        size: f64,
        current: usize,
        estimator: &dyn Fn(&Configuration) -> f64,
    ) -> usize {
        self.best_by_sample
            .iter()
            .find(|(_, (_, best))| estimator(best) >= size)
            .map_or(current, |(&sample_size, _)| sample_size)
    }

    /// Retrains the best configuration on the full data size.
    ///
    /// Returns `false` without calling the trainer if there is no best
    /// configuration or the budget is exhausted.
    pub(crate) fn retrain<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
    ) -> Result<bool> {
        let Some(best) = state.best_config() else {
            return Ok(false);
        };
        if ctx.budget.is_exhausted() {
            return Ok(false);
        }
        let config = self.space.clip_to_sample(best, self.full_size);
        self.space.check(&config)?;
        trace_info!(
            candidate = ctx.candidate,
            from = state.best_config_sample_size(),
            to = self.full_size,
            "retraining best configuration on full data"
        );

        let trained = ctx.trainer.train(&TrainRequest {
            candidate: ctx.candidate,
            config: &config,
            sample_size: self.full_size,
            remaining_budget: ctx.budget.remaining(),
        });
        let (loss, time, train_loss) = (trained.loss(), trained.charged_time(), trained.train_loss);
        ctx.budget.charge(time);
        self.history.insert(
            TrialKey::new(self.full_size, &config),
            TrialRecord { loss, train_time: time },
        );
        state.record_retrain(loss, self.full_size, time, trained.model);
        self.note_sample_best(self.full_size, loss, &config);
        let id = Self::log_trial(ctx, state, TrialKind::Retrain, &config, self.full_size, loss, train_loss, time);
        self.best_record = Some(id);
        Ok(true)
    }

    /// Evaluates `config` on `sample_size` rows, from the memo table if
    /// possible. Returns `None` if the trainer would be needed but the budget
    /// is exhausted.
    fn evaluate<M>(
        &mut self,
        ctx: &mut TrialContext<'_, M>,
        state: &mut SearchState<M>,
        config: &Configuration,
        sample_size: usize,
        outcome: &mut StepOutcome,
    ) -> Result<Option<f64>> {
        let key = TrialKey::new(sample_size, config);
        if let Some(&TrialRecord { loss, .. }) = self.history.get(&key) {
            outcome.memo_hits += 1;
            self.count_trial();
            return Ok(Some(loss));
        }
        if ctx.budget.is_exhausted() {
            return Ok(None);
        }
        self.space.check(config)?;

        let trained = ctx.trainer.train(&TrainRequest {
            candidate: ctx.candidate,
            config,
            sample_size,
            remaining_budget: ctx.budget.remaining(),
        });
        let (loss, time, train_loss) = (trained.loss(), trained.charged_time(), trained.train_loss);
        ctx.budget.charge(time);
        self.history.insert(key, TrialRecord { loss, train_time: time });
        let improved = state.record(loss, config, sample_size, time, trained.model);
        self.note_sample_best(sample_size, loss, config);
        let id = Self::log_trial(ctx, state, TrialKind::Search, config, sample_size, loss, train_loss, time);
        if improved {
            self.best_record = Some(id);
            outcome.improved = true;
        }
        outcome.trainer_calls += 1;
        self.last_trial_time = time;
        self.count_trial();
        Ok(Some(loss))
    }

    fn count_trial(&mut self) {
        self.trials_since_shrink += 1;
        self.trials_since_reset += 1;
    }

    fn note_sample_best(&mut self, sample_size: usize, loss: f64, config: &Configuration) {
        if !loss.is_finite() {
            return;
        }
        match self.best_by_sample.entry(sample_size) {
            Entry::Vacant(entry) => {
                entry.insert((loss, config.clone()));
            }
            Entry::Occupied(mut entry) => {
                if loss < entry.get().0 {
                    entry.insert((loss, config.clone()));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn log_trial<M>(
        ctx: &mut TrialContext<'_, M>,
        state: &SearchState<M>,
        kind: TrialKind,
        config: &Configuration,
        sample_size: usize,
        val_loss: f64,
        train_loss: Option<f64>,
        trial_time: f64,
    ) -> u64 {
        ctx.log.append(TrialLogRecord {
            record_id: 0,
            iteration: ctx.iteration as u64,
            candidate: ctx.candidate.to_string(),
            kind,
            sample_size,
            config: config.clone(),
            val_loss,
            train_loss,
            trial_time,
            total_time: ctx.budget.time_from_start(),
            best_loss: state.best_loss(),
            best_config: state.best_config().cloned(),
        })
    }
}
