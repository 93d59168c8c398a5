//! Random directions and the configurations they propose.

use fastrand::Rng;

use super::group::GroupState;
use crate::rng_util;
use crate::space::{Configuration, ConfigurationSpace, Value};

/// Distribution of a direction vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DrawKind {
    /// Uniform point on the unit hypersphere.
    Sphere,
    /// Independent standard normals.
    Gaussian,
}

/// The two configurations obtained by moving along `+r` and `-r`.
///
/// A side is `None` when it is infeasible or does not move away from the
/// incumbent after rounding and clipping.
#[derive(Debug)]
pub(crate) struct Proposal {
    pub(crate) positive: Option<Configuration>,
    pub(crate) negative: Option<Configuration>,
}

pub(crate) fn draw(rng: &mut Rng, dim: usize, kind: DrawKind) -> Vec<f64> {
    match kind {
        DrawKind::Sphere => rng_util::unit_sphere(rng, dim),
        DrawKind::Gaussian => rng_util::gaussian_vector(rng, dim),
    }
}

/// Moves the group's members of `origin` by `sign * direction`.
pub(crate) fn shifted(
    space: &ConfigurationSpace,
    origin: &Configuration,
    group: &GroupState,
    direction: &[f64],
    sign: f64,
    sample_size: usize,
) -> Configuration {
    let specs = space.specs();
    let mut raw: Vec<f64> = origin.values().iter().copied().map(Value::as_f64).collect();
    for (&i, &r) in group.members().iter().zip(direction) {
        raw[i] = specs[i].shift(raw[i], group.base(), sign * r);
    }
    space.build(raw, Some(sample_size))
}

/// Draws directions until one side is usable, giving up after `max_draws`.
///
/// `usable` decides whether a proposed configuration may be evaluated.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_proposal(
    rng: &mut Rng,
    space: &ConfigurationSpace,
    incumbent: &Configuration,
    group: &GroupState,
    kind: DrawKind,
    sample_size: usize,
    max_draws: usize,
    mut usable: impl FnMut(&Configuration) -> bool,
) -> Option<Proposal> {
    for _ in 0..max_draws {
        let direction = draw(rng, group.dim(), kind);
        let positive = shifted(space, incumbent, group, &direction, 1.0, sample_size);
        let negative = shifted(space, incumbent, group, &direction, -1.0, sample_size);
        let positive = (positive != *incumbent && usable(&positive)).then_some(positive);
        let negative = (negative != *incumbent && usable(&negative)).then_some(negative);
        if positive.is_some() || negative.is_some() {
            return Some(Proposal { positive, negative });
        }
    }
    None
}

/// Perturbs every hyperparameter of `origin` by a standard-normal move scaled
/// by its group's reset base.
pub(crate) fn gaussian_perturbation(
    rng: &mut Rng,
    space: &ConfigurationSpace,
    origin: &Configuration,
    groups: &[&GroupState],
    sample_size: usize,
) -> Configuration {
    let specs = space.specs();
    let mut raw: Vec<f64> = origin.values().iter().copied().map(Value::as_f64).collect();
    for group in groups {
        for &i in group.members() {
            let z = rng_util::standard_normal(rng);
            raw[i] = specs[i].shift(raw[i], group.base_ini(), z);
        }
    }
    space.build(raw, Some(sample_size))
}
