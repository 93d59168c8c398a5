//! Per-candidate running statistics.

use crate::space::Configuration;

/// Running statistics of one candidate: best loss and configuration found so
/// far, timing history, and the currently held trained model.
///
/// The state is created once per candidate when the scheduler starts and is
/// only ever mutated afterwards. `best_loss` never increases.
///
/// The trained model is exclusively owned: when a better model arrives the
/// previous one is dropped, or moved to [`model_history`](Self::model_history)
/// when history retention is enabled.
#[derive(Debug)]
pub struct SearchState<M> {
    best_loss: f64,
    best_loss_old: f64,
    best_config: Option<Configuration>,
    best_config_sample_size: usize,
    best_config_train_time: f64,
    total_time_used: f64,
    time_best_found: f64,
    time_best_found_old: f64,
    time2eval_best: f64,
    time2eval_best_old: f64,
    sample_size: usize,
    trials: usize,
    trained_model: Option<M>,
    model_history: Vec<M>,
    keep_history: bool,
}

impl<M> SearchState<M> {
    /// Creates an empty state starting at `sample_size`.
    #[must_use]
    pub fn new(sample_size: usize, keep_history: bool) -> Self {
        Self {
            best_loss: f64::INFINITY,
            best_loss_old: f64::INFINITY,
            best_config: None,
            best_config_sample_size: 0,
            best_config_train_time: 0.0,
            total_time_used: 0.0,
            time_best_found: 0.0,
            time_best_found_old: 0.0,
            time2eval_best: 0.0,
            time2eval_best_old: 0.0,
            sample_size,
            trials: 0,
            trained_model: None,
            model_history: Vec::new(),
            keep_history,
        }
    }

    /// Records the outcome of one trainer call.
    ///
    /// Charges `train_time`, and if `loss` beats the best loss so far shifts
    /// the improvement history, stores the configuration and takes ownership
    /// of `model`. Returns `true` on improvement.
    pub fn record(
        &mut self,
        loss: f64,
        config: &Configuration,
        sample_size: usize,
        train_time: f64,
        model: Option<M>,
    ) -> bool {
        self.trials += 1;
        self.total_time_used += train_time;
        if loss.is_nan() || loss >= self.best_loss {
            return false;
        }
        self.best_loss_old = if self.best_loss.is_infinite() {
            if loss > 0.0 { 2.0 * loss } else { loss + 1.0 }
        } else {
            self.best_loss
        };
        self.best_loss = loss;
        self.time_best_found_old = self.time_best_found;
        self.time_best_found = self.total_time_used;
        self.time2eval_best_old = self.time2eval_best;
        self.time2eval_best = train_time;
        self.best_config = Some(config.clone());
        self.best_config_sample_size = sample_size;
        self.best_config_train_time = train_time;
        self.replace_model(model);
        true
    }

    /// Records a retrain of the best configuration on `sample_size` rows.
    ///
    /// The retrained model always replaces the held one; the best loss only
    /// moves if the retrain improved it. The evaluation time of the best
    /// configuration follows the new sample size, so later extrapolations
    /// start from the retrain.
    pub fn record_retrain(&mut self, loss: f64, sample_size: usize, train_time: f64, model: Option<M>) {
        self.trials += 1;
        self.total_time_used += train_time;
        if loss < self.best_loss {
            self.best_loss_old = self.best_loss;
            self.best_loss = loss;
        }
        self.time2eval_best = train_time;
        self.best_config_sample_size = sample_size;
        self.best_config_train_time = train_time;
        self.replace_model(model);
    }

    fn replace_model(&mut self, model: Option<M>) {
        let Some(model) = model else {
            return;
        };
        if let Some(previous) = self.trained_model.replace(model)
            && self.keep_history
        {
            self.model_history.push(previous);
        }
    }

    /// Upper bound on the time expected before the next improvement:
    /// `max(time_best_found - time_best_found_old, total_time_used - time_best_found)`.
    #[must_use]
    pub fn estimated_cost_to_improve(&self) -> f64 {
        (self.time_best_found - self.time_best_found_old)
            .max(self.total_time_used - self.time_best_found)
    }

    /// Linear extrapolation of the best configuration's training time to
    /// `target_sample_size` rows.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimated_retrain_time(&self, target_sample_size: usize) -> f64 {
        if self.best_config_sample_size == 0 {
            return self.time2eval_best;
        }
        self.time2eval_best * target_sample_size as f64 / self.best_config_sample_size as f64
    }

    /// Loss decrease per unit of time between the two most recent improvements.
    ///
    /// Returns `None` before the first improvement.
    #[must_use]
    pub fn improvement_speed(&self) -> Option<f64> {
        if self.best_loss.is_infinite() {
            return None;
        }
        let dt = (self.time_best_found - self.time_best_found_old).max(f64::EPSILON);
        let speed = (self.best_loss_old - self.best_loss) / dt;
        speed.is_finite().then_some(speed)
    }

    /// Returns `true` when retraining the best configuration on `full_size`
    /// rows fits the window `[retrain_time, retrain_time + time2eval_best]`
    /// of the remaining budget.
    #[must_use]
    pub fn retrain_fits(&self, remaining: f64, full_size: usize) -> bool {
        if self.best_config.is_none() || self.best_config_sample_size >= full_size {
            return false;
        }
        let retrain = self.estimated_retrain_time(full_size);
        remaining >= retrain && remaining <= retrain + self.time2eval_best
    }

    /// Best validation loss so far (`+inf` before any successful trial).
    #[must_use]
    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    /// Best loss before the most recent improvement.
    #[must_use]
    pub fn best_loss_old(&self) -> f64 {
        self.best_loss_old
    }

    /// Best configuration so far.
    #[must_use]
    pub fn best_config(&self) -> Option<&Configuration> {
        self.best_config.as_ref()
    }

    /// Sample size the held model was trained on.
    #[must_use]
    pub fn best_config_sample_size(&self) -> usize {
        self.best_config_sample_size
    }

    /// Training time of the held model.
    #[must_use]
    pub fn best_config_train_time(&self) -> f64 {
        self.best_config_train_time
    }

    /// Total training time charged to this candidate.
    #[must_use]
    pub fn total_time_used(&self) -> f64 {
        self.total_time_used
    }

    /// Value of `total_time_used` when the best loss was found.
    #[must_use]
    pub fn time_best_found(&self) -> f64 {
        self.time_best_found
    }

    /// Value of `total_time_used` at the improvement before that.
    #[must_use]
    pub fn time_best_found_old(&self) -> f64 {
        self.time_best_found_old
    }

    /// Evaluation time of the best trial.
    #[must_use]
    pub fn time2eval_best(&self) -> f64 {
        self.time2eval_best
    }

    /// Evaluation time of the previous best trial.
    #[must_use]
    pub fn time2eval_best_old(&self) -> f64 {
        self.time2eval_best_old
    }

    /// Current rung of the sample-size ladder.
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub(crate) fn set_sample_size(&mut self, sample_size: usize) {
        self.sample_size = sample_size;
    }

    /// Number of trainer calls charged to this candidate.
    #[must_use]
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// The model trained for the best configuration.
    #[must_use]
    pub fn trained_model(&self) -> Option<&M> {
        self.trained_model.as_ref()
    }

    /// Takes the held model out of the state.
    pub fn take_model(&mut self) -> Option<M> {
        self.trained_model.take()
    }

    /// Superseded models (only filled when history retention is enabled).
    #[must_use]
    pub fn model_history(&self) -> &[M] {
        &self.model_history
    }
}
