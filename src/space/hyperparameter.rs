//! Per-hyperparameter domain descriptions.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::space::Value;
use crate::types::{NumericKind, StepMode};

static NEXT_HYPERPARAMETER_ID: AtomicU64 = AtomicU64::new(0);

/// A unique identifier for a hyperparameter definition.
///
/// Each [`HyperparameterSpec`] is assigned a unique id at creation time.
/// Cloning a spec copies its id, so clones refer to the same logical
/// hyperparameter and can be used to read values back out of a
/// [`Configuration`](crate::space::Configuration).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HyperparameterId(u64);

impl HyperparameterId {
    fn next() -> Self {
        Self(NEXT_HYPERPARAMETER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl core::fmt::Display for HyperparameterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "hp_{}", self.0)
    }
}

/// Domain, initial value and step semantics of one hyperparameter.
///
/// # Defaults
///
/// - step mode: [`Geometric`](StepMode::Geometric) when `lower > 0`, otherwise
///   [`Additive`](StepMode::Additive)
/// - initial value: `lower`
/// - `min_change`: `1` for integers, unbounded for floats
/// - not complexity related, does not scale with the sample size
///
/// # Examples
///
/// ```
/// use budget_search::space::HyperparameterSpec;
///
/// let n_estimators = HyperparameterSpec::int("n_estimators", 4, 32_768)
///     .init(4.0)
///     .complexity_related()
///     .scales_with_sample_size();
/// let learning_rate = HyperparameterSpec::float("learning_rate", 0.01, 1.0).init(0.1);
///
/// assert_eq!(n_estimators.name(), "n_estimators");
/// assert!(n_estimators.is_complexity_related());
/// assert_eq!(learning_rate.init_value(), 0.1);
/// ```
#[derive(Clone, Debug)]
pub struct HyperparameterSpec {
    id: HyperparameterId,
    name: String,
    kind: NumericKind,
    lower: f64,
    upper: f64,
    init: Option<f64>,
    step_mode: Option<StepMode>,
    complexity_related: bool,
    scales_with_sample_size: bool,
    min_change: Option<f64>,
}

impl HyperparameterSpec {
    /// Creates an integer hyperparameter with inclusive bounds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn int(name: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self::new(name.into(), NumericKind::Int, lower as f64, upper as f64)
    }

    /// Creates a real-valued hyperparameter with inclusive bounds.
    #[must_use]
    pub fn float(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self::new(name.into(), NumericKind::Float, lower, upper)
    }

    fn new(name: String, kind: NumericKind, lower: f64, upper: f64) -> Self {
        Self {
            id: HyperparameterId::next(),
            name,
            kind,
            lower,
            upper,
            init: None,
            step_mode: None,
            complexity_related: false,
            scales_with_sample_size: false,
            min_change: None,
        }
    }

    /// Sets the initial value. Integer hyperparameters round it.
    #[must_use]
    pub fn init(mut self, init: f64) -> Self {
        self.init = Some(init);
        self
    }

    /// Uses multiplicative moves (`value * base^r`).
    #[must_use]
    pub fn geometric(mut self) -> Self {
        self.step_mode = Some(StepMode::Geometric);
        self
    }

    /// Uses additive moves (`value + base * r`).
    #[must_use]
    pub fn additive(mut self) -> Self {
        self.step_mode = Some(StepMode::Additive);
        self
    }

    /// Marks the hyperparameter as changing the model's size (primary group).
    #[must_use]
    pub fn complexity_related(mut self) -> Self {
        self.complexity_related = true;
        self
    }

    /// Caps the hyperparameter's upper bound at the current sample size.
    #[must_use]
    pub fn scales_with_sample_size(mut self) -> Self {
        self.scales_with_sample_size = true;
        self
    }

    /// Sets the smallest perturbation that is not considered a no-op.
    #[must_use]
    pub fn min_change(mut self, min_change: f64) -> Self {
        self.min_change = Some(min_change);
        self
    }

    /// Returns the unique id of this hyperparameter.
    #[must_use]
    pub fn id(&self) -> HyperparameterId {
        self.id
    }

    /// Returns the name of this hyperparameter.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the numeric kind.
    #[must_use]
    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    /// Returns the inclusive lower bound.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Returns the inclusive upper bound.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Returns the initial value, defaulting to the lower bound.
    #[must_use]
    pub fn init_value(&self) -> f64 {
        self.init.unwrap_or(self.lower)
    }

    /// Returns the effective step mode.
    #[must_use]
    pub fn step_mode(&self) -> StepMode {
        self.step_mode.unwrap_or(if self.lower > 0.0 {
            StepMode::Geometric
        } else {
            StepMode::Additive
        })
    }

    /// Returns `true` if moving this hyperparameter changes the model's size.
    #[must_use]
    pub fn is_complexity_related(&self) -> bool {
        self.complexity_related
    }

    /// Returns `true` if the upper bound is capped by the sample size.
    #[must_use]
    pub fn is_size_like(&self) -> bool {
        self.scales_with_sample_size
    }

    /// Returns the effective minimum change (`+inf` means unbounded).
    #[must_use]
    pub fn min_change_value(&self) -> f64 {
        self.min_change.unwrap_or(match self.kind {
            NumericKind::Int => 1.0,
            NumericKind::Float => f64::INFINITY,
        })
    }

    /// Validates bounds, initial value, step mode and `min_change`.
    ///
    /// # Errors
    ///
    /// Returns the matching [`Error`] variant for the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if !self.lower.is_finite() || !self.upper.is_finite() || self.lower > self.upper {
            return Err(Error::InvalidBounds {
                name: self.name.clone(),
                low: self.lower,
                high: self.upper,
            });
        }
        if self.step_mode() == StepMode::Geometric && self.lower <= 0.0 {
            return Err(Error::InvalidGeometricBounds {
                name: self.name.clone(),
            });
        }
        let init = self.normalize(self.init_value());
        if !init.is_finite() || init < self.lower || init > self.upper {
            return Err(Error::InitOutOfBounds {
                name: self.name.clone(),
                init: self.init_value(),
            });
        }
        let min_change = self.min_change_value();
        if min_change.is_nan() || min_change <= 0.0 {
            return Err(Error::InvalidMinChange {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Upper bound in effect at the given sample size.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn upper_at(&self, sample_size: Option<usize>) -> f64 {
        match sample_size {
            Some(n) if self.scales_with_sample_size => self.upper.min(n as f64).max(self.lower),
            _ => self.upper,
        }
    }

    /// Rounds integer values; floats pass through.
    fn normalize(&self, raw: f64) -> f64 {
        match self.kind {
            NumericKind::Int => raw.round(),
            NumericKind::Float => raw,
        }
    }

    /// Rounds (integers) and clips `raw` into the bounds in effect at `sample_size`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn clip(&self, raw: f64, sample_size: Option<usize>) -> Value {
        let upper = self.upper_at(sample_size);
        let v = if raw.is_nan() { self.lower } else { raw };
        let v = self.normalize(v).clamp(self.lower, upper);
        match self.kind {
            NumericKind::Int => Value::Int(v as i64),
            NumericKind::Float => Value::Float(v),
        }
    }

    /// Applies one signed move of size `r` with the given base.
    pub(crate) fn shift(&self, value: f64, base: f64, r: f64) -> f64 {
        match self.step_mode() {
            StepMode::Geometric => value * base.powf(r),
            StepMode::Additive => value + base * r,
        }
    }

    /// Returns `true` if `value` has the right kind and lies within the declared bounds.
    pub(crate) fn contains(&self, value: Value) -> bool {
        let kind_ok = matches!(
            (self.kind, value),
            (NumericKind::Int, Value::Int(_)) | (NumericKind::Float, Value::Float(_))
        );
        let v = value.as_f64();
        kind_ok && v >= self.lower && v <= self.upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let n = HyperparameterSpec::int("n", 4, 100);
        assert_eq!(n.step_mode(), StepMode::Geometric);
        assert_eq!(n.init_value(), 4.0);
        assert_eq!(n.min_change_value(), 1.0);

        let shift = HyperparameterSpec::float("shift", -1.0, 1.0);
        assert_eq!(shift.step_mode(), StepMode::Additive);
        assert!(shift.min_change_value().is_infinite());
    }

    #[test]
    fn test_clones_share_id() {
        let a = HyperparameterSpec::float("a", 0.1, 1.0);
        let b = a.clone();
        let c = HyperparameterSpec::float("a", 0.1, 1.0);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        assert!(matches!(
            HyperparameterSpec::float("x", 2.0, 1.0).validate(),
            Err(Error::InvalidBounds { .. })
        ));
        assert!(matches!(
            HyperparameterSpec::float("x", 0.0, 1.0).geometric().validate(),
            Err(Error::InvalidGeometricBounds { .. })
        ));
        assert!(matches!(
            HyperparameterSpec::int("n", 1, 10).init(11.0).validate(),
            Err(Error::InitOutOfBounds { .. })
        ));
        assert!(matches!(
            HyperparameterSpec::int("n", 1, 10).min_change(0.0).validate(),
            Err(Error::InvalidMinChange { .. })
        ));
        assert!(HyperparameterSpec::int("n", 1, 10).init(3.0).validate().is_ok());
    }

    #[test]
    fn test_clip_rounds_and_caps_at_sample_size() {
        let n = HyperparameterSpec::int("n", 4, 1000).scales_with_sample_size();
        assert!(n.is_size_like());
        assert!(!HyperparameterSpec::int("m", 4, 1000).is_size_like());
        assert_eq!(n.clip(5.6, None), Value::Int(6));
        assert_eq!(n.clip(5000.0, None), Value::Int(1000));
        assert_eq!(n.clip(5000.0, Some(64)), Value::Int(64));
        // never below the lower bound, even for tiny samples
        assert_eq!(n.clip(5000.0, Some(2)), Value::Int(4));
        assert_eq!(n.clip(f64::NAN, None), Value::Int(4));
    }

    #[test]
    fn test_shift_modes() {
        let g = HyperparameterSpec::float("g", 0.5, 8.0).geometric();
        assert!((g.shift(2.0, 2.0, 1.0) - 4.0).abs() < 1e-12);
        assert!((g.shift(2.0, 2.0, -1.0) - 1.0).abs() < 1e-12);

        let a = HyperparameterSpec::float("a", -5.0, 5.0).additive();
        assert!((a.shift(1.0, 2.0, 0.5) - 2.0).abs() < 1e-12);
        assert!((a.shift(1.0, 2.0, -0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_contains_checks_kind_and_bounds() {
        let n = HyperparameterSpec::int("n", 1, 10);
        assert!(n.contains(Value::Int(10)));
        assert!(!n.contains(Value::Int(11)));
        assert!(!n.contains(Value::Float(5.0)));
    }
}
