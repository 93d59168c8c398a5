//! Core enums shared across the search engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric domain of a hyperparameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NumericKind {
    /// Integer-valued; moves are rounded to the nearest integer.
    Int,
    /// Real-valued.
    Float,
}

/// How a perturbation is applied to a hyperparameter value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StepMode {
    /// `value * base^r`, for multiplicative scales such as counts and learning rates.
    Geometric,
    /// `value + base * r`, for linear scales.
    Additive,
}

/// How the scheduler picks the next candidate once every candidate has been tried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionMode {
    /// Roulette-wheel sampling proportional to inverse estimated cost.
    #[default]
    Randomized,
    /// Always pick the minimum estimated cost; ties go to the earliest registered candidate.
    Deterministic,
}

/// When the globally best configuration is retrained on the full data size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RetrainPolicy {
    /// Never retrain; the best model stays the one trained on its sample.
    Never,
    /// Retrain once the remaining budget falls inside the window where the
    /// retrain just fits.
    #[default]
    WithinBudget,
    /// Like [`WithinBudget`](RetrainPolicy::WithinBudget), and additionally
    /// retrain at termination if the best model is still a sample model and
    /// budget remains.
    Always,
}
