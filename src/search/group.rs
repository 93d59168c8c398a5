//! Step-size bookkeeping for one hyperparameter group.

use crate::space::{Configuration, ConfigurationSpace};

/// Members, current base and reset base of a non-empty group.
#[derive(Clone, Debug)]
pub(crate) struct GroupState {
    members: Vec<usize>,
    dim_sqrt: f64,
    base: f64,
    base_ini: f64,
}

impl GroupState {
    /// Starts at `base_const^sqrt(dim)` where `dim` is the group size.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn new(members: Vec<usize>, base_const: f64) -> Self {
        let dim_sqrt = (members.len() as f64).sqrt();
        let base = base_const.powf(dim_sqrt);
        Self {
            members,
            dim_sqrt,
            base,
            base_ini: base,
        }
    }

    pub(crate) fn members(&self) -> &[usize] {
        &self.members
    }

    pub(crate) fn dim(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn base(&self) -> f64 {
        self.base
    }

    pub(crate) fn base_ini(&self) -> f64 {
        self.base_ini
    }

    /// `base ^= exponent`; the base stays above 1 for any exponent in (0, 1).
    pub(crate) fn shrink(&mut self, exponent: f64) {
        self.base = self.base.powf(exponent);
    }

    /// Smallest useful base around `incumbent`:
    /// `min_i (1 + min_change_i / |value_i|)^sqrt(dim)`.
    ///
    /// Members with unbounded `min_change` or a zero value do not constrain
    /// the bound; if none does, `fallback` is returned.
    pub(crate) fn lower_bound(
        &self,
        space: &ConfigurationSpace,
        incumbent: &Configuration,
        fallback: f64,
    ) -> f64 {
        let specs = space.specs();
        let values = incumbent.values();
        let bound = self
            .members
            .iter()
            .filter_map(|&i| {
                let min_change = specs[i].min_change_value();
                let value = values[i].as_f64().abs();
                (min_change.is_finite() && value > 0.0)
                    .then(|| (1.0 + min_change / value).powf(self.dim_sqrt))
            })
            .fold(f64::INFINITY, f64::min);
        if bound.is_finite() { bound } else { fallback }
    }

    /// Largest reset base allowed at `sample_size`:
    /// `base_const^(2 sqrt(dim)) * sqrt(full_size / sample_size)`.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn ceiling(&self, base_const: f64, full_size: usize, sample_size: usize) -> f64 {
        let ratio = full_size as f64 / sample_size.max(1) as f64;
        base_const.powf(2.0 * self.dim_sqrt) * ratio.max(1.0).sqrt()
    }

    /// Doubles the reset base up to `ceiling` and restarts from it.
    pub(crate) fn widen(&mut self, ceiling: f64) {
        self.base_ini = (2.0 * self.base_ini).min(ceiling);
        self.base = self.base_ini;
    }
}
