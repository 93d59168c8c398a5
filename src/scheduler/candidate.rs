use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::{Error, Result};
use crate::search::{LocalSearch, SearchPhase};
use crate::space::{Configuration, ConfigurationSpace};
use crate::state::SearchState;

/// Estimated model size of a configuration, compared against the memory threshold.
pub type SizeEstimator = Arc<dyn Fn(&Configuration) -> f64 + Send + Sync>;

/// One competing model family registered with the scheduler.
///
/// # Defaults
///
/// - relative cost (`eci`): 1.0
/// - size estimator: every configuration has size 0 (always feasible)
/// - no trial cap
/// - initial sample size: [`SearchSettings::initial_sample_size`](crate::SearchSettings)
///
/// # Examples
///
/// ```
/// use budget_search::scheduler::Candidate;
/// use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
///
/// let n = HyperparameterSpec::int("n_estimators", 4, 1024).complexity_related();
/// let space = ConfigurationSpace::new(vec![n.clone()]).unwrap();
/// let forest = Candidate::new("forest", space)
///     .eci(3.0)
///     .size_estimator(move |c| c.get(&n).unwrap_or(0.0) * 1e4)
///     .max_trials(50);
///
/// assert_eq!(forest.name(), "forest");
/// assert_eq!(forest.relative_cost(), 3.0);
/// ```
#[derive(Clone)]
pub struct Candidate {
    name: String,
    space: ConfigurationSpace,
    eci: f64,
    estimator: SizeEstimator,
    max_trials: Option<usize>,
    initial_sample_size: Option<usize>,
}

impl core::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("dim", &self.space.dim())
            .field("eci", &self.eci)
            .field("max_trials", &self.max_trials)
            .field("initial_sample_size", &self.initial_sample_size)
            .finish_non_exhaustive()
    }
}

impl Candidate {
    /// Creates a candidate searching `space`.
    #[must_use]
    pub fn new(name: impl Into<String>, space: ConfigurationSpace) -> Self {
        Self {
            name: name.into(),
            space,
            eci: 1.0,
            estimator: Arc::new(|_: &Configuration| 0.0),
            max_trials: None,
            initial_sample_size: None,
        }
    }

    /// Sets the estimated cost of one trial relative to a reference candidate.
    #[must_use]
    pub fn eci(mut self, eci: f64) -> Self {
        self.eci = eci;
        self
    }

    /// Sets the model-size estimator.
    #[must_use]
    pub fn size_estimator(
        mut self,
        estimator: impl Fn(&Configuration) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.estimator = Arc::new(estimator);
        self
    }

    /// Caps the number of trainer calls charged to this candidate.
    #[must_use]
    pub fn max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = Some(max_trials);
        self
    }

    /// Overrides the first rung of this candidate's sample-size ladder.
    #[must_use]
    pub fn initial_sample_size(mut self, sample_size: usize) -> Self {
        self.initial_sample_size = Some(sample_size);
        self
    }

    /// Candidate name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The candidate's configuration space.
    #[must_use]
    pub fn space(&self) -> &ConfigurationSpace {
        &self.space
    }

    /// Estimated relative cost of one trial.
    #[must_use]
    pub fn relative_cost(&self) -> f64 {
        self.eci
    }

    /// Trial cap, if any.
    #[must_use]
    pub fn trial_cap(&self) -> Option<usize> {
        self.max_trials
    }

    /// Estimated model size of `config`.
    #[must_use]
    pub fn estimate_size(&self, config: &Configuration) -> f64 {
        (self.estimator)(config)
    }

    pub(crate) fn estimator(&self) -> &(dyn Fn(&Configuration) -> f64 + Send + Sync) {
        self.estimator.as_ref()
    }

    pub(crate) fn first_sample_size(&self, default: usize, full_size: usize) -> usize {
        self.initial_sample_size.unwrap_or(default).min(full_size)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.eci.is_finite() || self.eci <= 0.0 {
            return Err(Error::InvalidSetting {
                name: "eci",
                reason: format!("candidate '{}' needs a finite positive eci", self.name),
            });
        }
        if self.initial_sample_size == Some(0) {
            return Err(Error::InvalidSetting {
                name: "initial_sample_size",
                reason: format!("candidate '{}' needs a positive sample size", self.name),
            });
        }
        Ok(())
    }
}

/// A candidate together with its running state.
pub(crate) struct CandidateRun<M> {
    pub(crate) candidate: Candidate,
    pub(crate) state: SearchState<M>,
    pub(crate) search: LocalSearch,
    pub(crate) eligible: bool,
}

impl<M> CandidateRun<M> {
    pub(crate) fn is_tried(&self) -> bool {
        self.search.phase() != SearchPhase::Init
    }

    pub(crate) fn report(&self) -> CandidateReport {
        CandidateReport {
            name: self.candidate.name().to_string(),
            best_loss: self.state.best_loss(),
            best_config: self.state.best_config().cloned(),
            best_sample_size: self.state.best_config_sample_size(),
            trials: self.state.trials(),
            total_time: self.state.total_time_used(),
            sample_size: self.state.sample_size(),
            eligible: self.eligible,
        }
    }
}

/// Final statistics of one candidate, dropped candidates included.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CandidateReport {
    /// Candidate name.
    pub name: String,
    /// Best validation loss (`+inf` if no trial succeeded).
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::log::serialize_loss"))]
    pub best_loss: f64,
    /// Best configuration.
    pub best_config: Option<Configuration>,
    /// Sample size the held model was trained on.
    pub best_sample_size: usize,
    /// Trainer calls charged.
    pub trials: usize,
    /// Training time charged.
    pub total_time: f64,
    /// Final rung of the sample-size ladder.
    pub sample_size: usize,
    /// `false` once the candidate was dropped.
    pub eligible: bool,
}
