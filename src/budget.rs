//! Global time budget and the clocks that measure it.
//!
//! The budget is soft: a trial that overruns the remaining time is never
//! cancelled, its elapsed time is simply charged afterwards and the search
//! stops at the next check.

use std::time::Instant;

/// Source of `time_from_start`.
pub trait Clock: Send {
    /// Time units elapsed since the search started.
    fn elapsed(&self) -> f64;

    /// Called after every trainer call with the trial's reported elapsed time.
    fn charge(&mut self, elapsed: f64);
}

/// Real wall-clock time since construction, in seconds.
///
/// Reported trial times are ignored; the clock measures them itself.
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    /// Starts a clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn charge(&mut self, _elapsed: f64) {}
}

/// A clock that only advances by trainer-reported elapsed time.
///
/// Makes runs reproducible: the same trainer outputs always yield the same
/// budget decisions, regardless of how long the search itself takes.
///
/// # Examples
///
/// ```
/// use budget_search::budget::{Clock, VirtualClock};
///
/// let mut clock = VirtualClock::new();
/// clock.charge(1.5);
/// clock.charge(0.5);
/// assert_eq!(clock.elapsed(), 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: f64,
}

impl VirtualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for VirtualClock {
    fn elapsed(&self) -> f64 {
        self.now
    }

    fn charge(&mut self, elapsed: f64) {
        self.now += elapsed;
    }
}

/// Time budget, elapsed time and memory threshold shared by all candidates.
///
/// Candidates only read it; the scheduler owns it and charges trial time.
pub struct GlobalBudget {
    time_budget: f64,
    mem_thres: f64,
    clock: Box<dyn Clock>,
}

impl core::fmt::Debug for GlobalBudget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlobalBudget")
            .field("time_budget", &self.time_budget)
            .field("mem_thres", &self.mem_thres)
            .field("time_from_start", &self.time_from_start())
            .finish()
    }
}

impl GlobalBudget {
    /// Creates a budget of `time_budget` time units measured by `clock`.
    #[must_use]
    pub fn new(time_budget: f64, mem_thres: f64, clock: Box<dyn Clock>) -> Self {
        Self {
            time_budget,
            mem_thres,
            clock,
        }
    }

    /// Total time budget.
    #[must_use]
    pub fn time_budget(&self) -> f64 {
        self.time_budget
    }

    /// Maximum acceptable estimated model size.
    #[must_use]
    pub fn mem_threshold(&self) -> f64 {
        self.mem_thres
    }

    /// Time elapsed since the search started.
    #[must_use]
    pub fn time_from_start(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Budget left, never negative.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        (self.time_budget - self.time_from_start()).max(0.0)
    }

    /// Returns `true` once `time_from_start >= time_budget`.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.time_from_start() >= self.time_budget
    }

    /// Returns `true` if a model of estimated size `size` fits the memory threshold.
    #[must_use]
    pub fn fits_memory(&self, size: f64) -> bool {
        size <= self.mem_thres
    }

    pub(crate) fn charge(&mut self, elapsed: f64) {
        self.clock.charge(elapsed);
    }
}
