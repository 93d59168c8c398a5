//! Memoization of evaluated trials.
//!
//! Every trainer call is stored under its [`TrialKey`] so that proposing the
//! same `(sample_size, configuration)` again is served from memory instead
//! of retraining. Float values are quantized to a fixed number of
//! significant digits before hashing so that keys are deterministic.

use std::collections::HashMap;

use crate::space::{Configuration, Value};

/// Significant decimal digits kept when quantizing float values.
const SIGNIFICANT_DIGITS: i32 = 10;

/// Memoization key: a sample size plus the quantized configuration values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrialKey {
    sample_size: usize,
    values: Vec<i64>,
}

impl TrialKey {
    /// Builds the key of `config` evaluated on `sample_size` rows.
    #[must_use]
    pub fn new(sample_size: usize, config: &Configuration) -> Self {
        Self {
            sample_size,
            values: config.values().iter().map(|&v| quantize(v)).collect(),
        }
    }

    /// Returns the sample size part of the key.
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

#[allow(clippy::cast_possible_wrap)]
fn quantize(value: Value) -> i64 {
    match value {
        Value::Int(v) => v,
        Value::Float(v) => {
            // folds -0.0 into 0.0; configuration values are always finite
            if v == 0.0 {
                return 0;
            }
            let magnitude = v.abs().log10().floor();
            let scale = 10f64.powf(f64::from(SIGNIFICANT_DIGITS - 1) - magnitude);
            let rounded = (v * scale).round() / scale;
            rounded.to_bits() as i64
        }
    }
}

/// Outcome of one trainer call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialRecord {
    /// Validation loss (`+inf` for failed trials).
    pub loss: f64,
    /// Training time charged for the trial.
    pub train_time: f64,
}

/// Bounded memo table of evaluated trials.
///
/// Retention stops growing once `capacity` entries are stored; existing
/// entries are never evicted, which favors the diversity of early trials.
#[derive(Clone, Debug)]
pub struct TrialHistory {
    records: HashMap<TrialKey, TrialRecord>,
    capacity: usize,
}

impl TrialHistory {
    /// Creates an empty table holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            capacity,
        }
    }

    /// Returns the record stored for `key`.
    #[must_use]
    pub fn get(&self, key: &TrialKey) -> Option<&TrialRecord> {
        self.records.get(key)
    }

    /// Returns `true` if `key` has been evaluated and retained.
    #[must_use]
    pub fn contains(&self, key: &TrialKey) -> bool {
        self.records.contains_key(key)
    }

    /// Stores `record` under `key`.
    ///
    /// Returns `false` without storing anything when the table is full or
    /// the key already has a record; the first record for a key always wins.
    pub fn insert(&mut self, key: TrialKey, record: TrialRecord) -> bool {
        if self.records.len() >= self.capacity || self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, record);
        true
    }

    /// Returns the number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the maximum number of retained records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
