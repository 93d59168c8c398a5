//! Cost model used to pick the next candidate.

use crate::state::SearchState;

/// Smallest cost a candidate can have.
pub(crate) const MIN_COST: f64 = 1e-9;

/// Estimated time until `state` improves, or `+inf` if the candidate should
/// not be selected.
///
/// Starts from the candidate's own estimate; a candidate that has not
/// reached the full sample size is capped at the cost of growing its
/// sample, and a candidate behind the global best is inflated to at least
/// `2 * gap / improvement_speed`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn estimated_cost<M>(
    state: &SearchState<M>,
    full_size: usize,
    global_best: f64,
    sample_multiply_factor: f64,
) -> f64 {
    let mut cost = state.estimated_cost_to_improve();
    let sample_size = state.sample_size();
    if sample_size < full_size {
        let growth = sample_multiply_factor.min(full_size as f64 / sample_size.max(1) as f64);
        cost = cost.min(state.estimated_retrain_time(sample_size) * growth);
    }
    let gap = state.best_loss() - global_best;
    if gap > 0.0 {
        let inflated = match state.improvement_speed() {
            Some(speed) if speed > 0.0 => 2.0 * gap / speed,
            _ => f64::INFINITY,
        };
        cost = cost.max(inflated);
    }
    cost.max(MIN_COST)
}

/// Expected duration of the candidate's next trial.
///
/// Uses the best trial's time extrapolated to the current sample size, or
/// `eci * min_trial_time` while the candidate has no successful trial.
pub(crate) fn next_trial_time<M>(state: &SearchState<M>, eci: f64, min_trial_time: f64) -> f64 {
    if state.best_config().is_some() {
        state.estimated_retrain_time(state.sample_size())
    } else {
        eci * min_trial_time
    }
}
