//! Tunable constants of the local search.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Constants controlling step sizes, the sample-size ladder, memoization and
/// the reset heuristics of local search.
///
/// All options have defaults matching the reference behavior:
///
/// | Option | Default | Description |
/// |--------|---------|-------------|
/// | `base_const` | 2.0 | Initial base is `base_const^sqrt(dim)` |
/// | `history_size` | 10 000 | Memo table holds `history_size * dim` records |
/// | `sample_growth_factor` | 2 | Sample-size escalation multiplier |
/// | `sample_multiply_factor` | 4.0 | Scheduler cap on the cost of growing the sample |
/// | `initial_sample_size` | 10 000 | First rung of the sample-size ladder |
/// | `max_shrinks` | 16 | Base shrinks allowed between resets |
/// | `max_shrink_exponent` | `1/sqrt(2)` | Largest exponent applied by a shrink |
/// | `base_lower_fallback` | 1.0001 | Base lower bound without finite `min_change` |
/// | `max_reset_draws` | 1000 | Gaussian draws tried when resetting |
/// | `max_direction_draws` | 1000 | Direction redraws per step before giving up |
/// | `keep_model_history` | `false` | Keep superseded models |
///
/// # Examples
///
/// ```
/// use budget_search::SearchSettings;
///
/// let settings = SearchSettings::new().base_const(3.0).initial_sample_size(5_000);
/// assert!(settings.validate().is_ok());
/// assert_eq!(settings.initial_sample_size, 5_000);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SearchSettings {
    /// `BASE_CONST` (> 1): initial step aggressiveness.
    pub base_const: f64,
    /// `HISTORY_SIZE`: memo table capacity per dimension.
    pub history_size: usize,
    /// Multiplier applied to the sample size on escalation.
    pub sample_growth_factor: usize,
    /// `SAMPLE_MULTIPLY_FACTOR` used by the scheduler cost cap.
    pub sample_multiply_factor: f64,
    /// First rung of the sample-size ladder (capped at the full size).
    pub initial_sample_size: usize,
    /// Number of base shrinks allowed between resets.
    pub max_shrinks: usize,
    /// Upper bound on the shrink exponent; keeps every shrink strict.
    pub max_shrink_exponent: f64,
    /// Base lower bound used when no group member has a finite `min_change`.
    pub base_lower_fallback: f64,
    /// Gaussian draws tried when reinitializing after a reset.
    pub max_reset_draws: usize,
    /// Direction redraws allowed per step while looking for a feasible move.
    pub max_direction_draws: usize,
    /// Keep superseded trained models instead of dropping them.
    pub keep_model_history: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_const: 2.0,
            history_size: 10_000,
            sample_growth_factor: 2,
            sample_multiply_factor: 4.0,
            initial_sample_size: 10_000,
            max_shrinks: 16,
            max_shrink_exponent: core::f64::consts::FRAC_1_SQRT_2,
            base_lower_fallback: 1.0001,
            max_reset_draws: 1000,
            max_direction_draws: 1000,
            keep_model_history: false,
        }
    }
}

impl SearchSettings {
    /// Creates the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `BASE_CONST`.
    #[must_use]
    pub fn base_const(mut self, base_const: f64) -> Self {
        self.base_const = base_const;
        self
    }

    /// Sets `HISTORY_SIZE`.
    #[must_use]
    pub fn history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    /// Sets the escalation multiplier.
    #[must_use]
    pub fn sample_growth_factor(mut self, factor: usize) -> Self {
        self.sample_growth_factor = factor;
        self
    }

    /// Sets `SAMPLE_MULTIPLY_FACTOR`.
    #[must_use]
    pub fn sample_multiply_factor(mut self, factor: f64) -> Self {
        self.sample_multiply_factor = factor;
        self
    }

    /// Sets the first rung of the sample-size ladder.
    #[must_use]
    pub fn initial_sample_size(mut self, size: usize) -> Self {
        self.initial_sample_size = size;
        self
    }

    /// Sets the number of shrinks allowed between resets.
    #[must_use]
    pub fn max_shrinks(mut self, max_shrinks: usize) -> Self {
        self.max_shrinks = max_shrinks;
        self
    }

    /// Sets the largest shrink exponent.
    #[must_use]
    pub fn max_shrink_exponent(mut self, exponent: f64) -> Self {
        self.max_shrink_exponent = exponent;
        self
    }

    /// Sets the fallback base lower bound.
    #[must_use]
    pub fn base_lower_fallback(mut self, bound: f64) -> Self {
        self.base_lower_fallback = bound;
        self
    }

    /// Sets the reset draw cap.
    #[must_use]
    pub fn max_reset_draws(mut self, attempts: usize) -> Self {
        self.max_reset_draws = attempts;
        self
    }

    /// Sets the direction redraw cap.
    #[must_use]
    pub fn max_direction_draws(mut self, draws: usize) -> Self {
        self.max_direction_draws = draws;
        self
    }

    /// Keeps superseded models.
    #[must_use]
    pub fn keep_model_history(mut self, keep: bool) -> Self {
        self.keep_model_history = keep;
        self
    }

    /// Checks every setting's range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: &str) -> Result<()> {
            Err(Error::InvalidSetting {
                name,
                reason: reason.to_string(),
            })
        }

        if !self.base_const.is_finite() || self.base_const <= 1.0 {
            return invalid("base_const", "must be finite and greater than 1");
        }
        if self.history_size == 0 {
            return invalid("history_size", "must be positive");
        }
        if self.sample_growth_factor < 2 {
            return invalid("sample_growth_factor", "must be at least 2");
        }
        if !self.sample_multiply_factor.is_finite() || self.sample_multiply_factor < 1.0 {
            return invalid("sample_multiply_factor", "must be finite and at least 1");
        }
        if self.initial_sample_size == 0 {
            return invalid("initial_sample_size", "must be positive");
        }
        if self.max_shrinks == 0 {
            return invalid("max_shrinks", "must be positive");
        }
        if !(self.max_shrink_exponent > 0.0 && self.max_shrink_exponent < 1.0) {
            return invalid("max_shrink_exponent", "must lie in (0, 1)");
        }
        if !self.base_lower_fallback.is_finite() || self.base_lower_fallback <= 1.0 {
            return invalid("base_lower_fallback", "must be finite and greater than 1");
        }
        if self.base_lower_fallback >= self.base_const {
            return invalid("base_lower_fallback", "must be smaller than base_const");
        }
        if self.max_reset_draws == 0 {
            return invalid("max_reset_draws", "must be positive");
        }
        if self.max_direction_draws == 0 {
            return invalid("max_direction_draws", "must be positive");
        }
        Ok(())
    }

    /// Parses settings from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if the text is not valid settings JSON
    /// or a value is out of range.
    #[cfg(feature = "serde")]
    pub fn from_json_str(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text).map_err(|e| Error::InvalidSetting {
            name: "settings",
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }
}
