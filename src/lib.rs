#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Budget-constrained hyperparameter search over several competing model
//! families ("candidates").
//!
//! Every candidate runs its own randomized direct search over a bounded
//! numeric space, starting from cheap configurations and a small data sample.
//! A scheduler shares one global time budget between the candidates, handing
//! each iteration to the one expected to improve the global best loss the
//! fastest. The user supplies the training routine; the crate decides which
//! candidate, configuration and sample size it runs next.
//!
//! # Getting Started
//!
//! ```
//! use budget_search::prelude::*;
//!
//! let depth = HyperparameterSpec::int("depth", 1, 32).init(2.0).complexity_related();
//! let rate = HyperparameterSpec::float("rate", 1e-3, 1.0).init(0.1);
//! let space = ConfigurationSpace::new(vec![depth.clone(), rate.clone()]).unwrap();
//!
//! let trainer = move |req: &TrainRequest<'_>| -> TrainOutcome<()> {
//!     let d = req.config.get(&depth).unwrap_or(1.0);
//!     let r = req.config.get(&rate).unwrap_or(0.1);
//!     TrainOutcome::new((d - 12.0).abs() / 12.0 + (r.ln() + 3.0).abs(), d / 16.0)
//! };
//!
//! let mut scheduler: Scheduler<(), _> = Scheduler::builder()
//!     .time_budget(60.0)
//!     .full_size(50_000)
//!     .clock(VirtualClock::new())
//!     .seed(7)
//!     .candidate(Candidate::new("tree", space))
//!     .build(trainer)
//!     .unwrap();
//!
//! let summary = scheduler.run().unwrap();
//! println!("{:?}: {}", summary.best_config, summary.best_loss);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`HyperparameterSpec`](space::HyperparameterSpec) | One numeric dimension: bounds, initial value, step mode, sample-size scaling. |
//! | [`ConfigurationSpace`](space::ConfigurationSpace) | All dimensions of a candidate, split into primary (complexity) and secondary groups. |
//! | [`SearchState`](state::SearchState) | Per-candidate best loss, timing statistics and the held model. |
//! | [`LocalSearch`](search::LocalSearch) | Randomized direct search with step shrinking, resets and sample-size escalation. |
//! | [`Scheduler`](scheduler::Scheduler) | Cost-aware selection between candidates under the global budget. |
//! | [`Trainer`](trainer::Trainer) | The user-supplied training routine. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on public types, [`JsonlTrialLog`](log::JsonlTrialLog), [`SearchSettings::from_json_str`] | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key search points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod budget;
mod error;
pub mod history;
pub mod log;
mod rng_util;
pub mod scheduler;
pub mod search;
mod settings;
pub mod space;
pub mod state;
pub mod trainer;
mod types;

pub use error::{Error, Result};
pub use scheduler::{Scheduler, SchedulerBuilder, SearchSummary};
pub use settings::SearchSettings;
pub use types::{NumericKind, RetrainPolicy, SelectionMode, StepMode};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use budget_search::prelude::*;
/// ```
pub mod prelude {
    pub use crate::budget::{Clock, GlobalBudget, VirtualClock, WallClock};
    pub use crate::error::{Error, Result};
    #[cfg(feature = "serde")]
    pub use crate::log::JsonlTrialLog;
    pub use crate::log::{MemoryTrialLog, TrialKind, TrialLogRecord, TrialLogSink};
    pub use crate::scheduler::{
        BestCandidate, BestModel, Candidate, CandidateReport, Scheduler, SchedulerBuilder,
        SearchSummary,
    };
    pub use crate::search::{LocalSearch, SearchPhase, StepOutcome};
    pub use crate::settings::SearchSettings;
    pub use crate::space::{Configuration, ConfigurationSpace, Group, HyperparameterSpec, Value};
    pub use crate::state::SearchState;
    pub use crate::trainer::{TrainOutcome, TrainRequest, Trainer};
    pub use crate::types::{NumericKind, RetrainPolicy, SelectionMode, StepMode};
}
