#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound or a bound is not finite.
    #[error("invalid bounds for '{name}': low ({low}) must be finite and less than or equal to high ({high})")]
    InvalidBounds {
        /// The name of the hyperparameter.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a geometric step mode is used with a non-positive lower bound.
    #[error("invalid geometric bounds for '{name}': low must be positive for multiplicative steps")]
    InvalidGeometricBounds {
        /// The name of the hyperparameter.
        name: String,
    },

    /// Returned when the initial value lies outside the declared bounds.
    #[error("initial value {init} of '{name}' lies outside its bounds")]
    InitOutOfBounds {
        /// The name of the hyperparameter.
        name: String,
        /// The offending initial value.
        init: f64,
    },

    /// Returned when `min_change` is not strictly positive.
    #[error("invalid min_change for '{name}': must be positive")]
    InvalidMinChange {
        /// The name of the hyperparameter.
        name: String,
    },

    /// Returned when two hyperparameters in one space share a name.
    #[error("duplicate hyperparameter '{0}'")]
    DuplicateHyperparameter(String),

    /// Returned when a configuration space has no hyperparameters.
    #[error("configuration space must contain at least one hyperparameter")]
    EmptySpace,

    /// Returned when a hyperparameter does not belong to the configuration space.
    #[error("unknown hyperparameter '{0}'")]
    UnknownHyperparameter(String),

    /// Returned when a configuration value lies outside its declared bounds.
    ///
    /// Reaching the trial layer with such a value is a programming error and
    /// aborts the search.
    #[error("value {value} of '{name}' lies outside its bounds")]
    ValueOutOfBounds {
        /// The name of the hyperparameter.
        name: String,
        /// The offending value.
        value: f64,
    },

    /// Returned when a configuration was built for a different space.
    #[error("configuration does not belong to this configuration space")]
    ConfigurationMismatch,

    /// Returned when the time budget is not positive and finite.
    #[error("invalid time budget: {0} must be positive and finite")]
    InvalidBudget(f64),

    /// Returned when the full training-data size is zero or missing.
    #[error("full data size must be positive")]
    InvalidDataSize,

    /// Returned when a scheduler is built without candidates.
    #[error("scheduler requires at least one candidate")]
    NoCandidates,

    /// Returned when two candidates share a name.
    #[error("duplicate candidate '{0}'")]
    DuplicateCandidate(String),

    /// Returned when a search setting is out of range.
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// The name of the setting.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Returned when a trial log sink fails to persist a record.
    #[error("trial log error: {0}")]
    Log(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Returns `true` for errors that signal a broken invariant rather than bad input.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::ValueOutOfBounds { .. } | Error::ConfigurationMismatch | Error::Internal(_)
        )
    }
}
