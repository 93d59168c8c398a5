/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Sample a value from the standard normal distribution using Box-Muller transform.
pub(crate) fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    // 1 - u keeps u1 in (0, 1] so the log is finite
    let u1 = 1.0 - rng.f64();
    let u2 = f64_range(rng, 0.0, core::f64::consts::TAU);
    (-2.0 * u1.ln()).sqrt() * u2.cos()
}

/// Draw a vector of `dim` independent standard-normal components.
pub(crate) fn gaussian_vector(rng: &mut fastrand::Rng, dim: usize) -> Vec<f64> {
    (0..dim).map(|_| standard_normal(rng)).collect()
}

/// Draw a point uniformly on the unit hypersphere in `dim` dimensions.
///
/// Normalizes an isotropic gaussian draw; a (vanishingly rare) near-zero
/// draw is simply redrawn.
pub(crate) fn unit_sphere(rng: &mut fastrand::Rng, dim: usize) -> Vec<f64> {
    if dim == 0 {
        return Vec::new();
    }
    loop {
        let v = gaussian_vector(rng, dim);
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-12 {
            return v.into_iter().map(|x| x / norm).collect();
        }
    }
}

/// Roulette-wheel selection: returns an index with probability proportional
/// to its weight, or `None` when no weight is positive.
pub(crate) fn weighted_index(rng: &mut fastrand::Rng, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    let mut target = rng.f64() * total;
    let mut last = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        last = Some(i);
        if target < w {
            return Some(i);
        }
        target -= w;
    }
    // floating-point leftovers land on the last positive weight
    last
}
