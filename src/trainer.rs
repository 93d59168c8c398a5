//! The external training routine consumed by the search.
//!
//! The engine never fits models itself. Each trial is one blocking call to a
//! [`Trainer`], which trains on `sample_size` rows and reports a validation
//! loss plus the elapsed time. Any `FnMut(&TrainRequest) -> TrainOutcome`
//! closure is a trainer:
//!
//! ```
//! use budget_search::trainer::{TrainOutcome, TrainRequest, Trainer};
//!
//! let mut trainer = |req: &TrainRequest<'_>| -> TrainOutcome<()> {
//!     TrainOutcome::new(req.sample_size as f64 / 1000.0, 0.5)
//! };
//! # let _ = &mut trainer;
//! ```

use crate::space::Configuration;

/// One trial handed to the trainer.
#[derive(Debug, Clone, Copy)]
pub struct TrainRequest<'a> {
    /// Name of the candidate being trained.
    pub candidate: &'a str,
    /// Configuration to train.
    pub config: &'a Configuration,
    /// Number of training rows to use.
    pub sample_size: usize,
    /// Suggested time limit. Trainers may overrun it; the overrun is charged.
    pub remaining_budget: f64,
}

/// Result of one trainer call.
#[derive(Debug, Clone)]
pub struct TrainOutcome<M> {
    /// Trained model handle, if the trainer produced one.
    pub model: Option<M>,
    /// Validation loss; `+inf` (or any non-finite value) signals failure.
    pub val_loss: f64,
    /// Training loss, if measured.
    pub train_loss: Option<f64>,
    /// Time the call took.
    pub elapsed: f64,
}

impl<M> TrainOutcome<M> {
    /// Creates an outcome without a model or training loss.
    #[must_use]
    pub fn new(val_loss: f64, elapsed: f64) -> Self {
        Self {
            model: None,
            val_loss,
            train_loss: None,
            elapsed,
        }
    }

    /// Creates a failed outcome that still charges `elapsed`.
    #[must_use]
    pub fn failed(elapsed: f64) -> Self {
        Self::new(f64::INFINITY, elapsed)
    }

    /// Attaches the trained model.
    #[must_use]
    pub fn with_model(mut self, model: M) -> Self {
        self.model = Some(model);
        self
    }

    /// Attaches the training loss.
    #[must_use]
    pub fn with_train_loss(mut self, train_loss: f64) -> Self {
        self.train_loss = Some(train_loss);
        self
    }

    /// Validation loss with non-finite values mapped to `+inf`.
    pub(crate) fn loss(&self) -> f64 {
        if self.val_loss.is_finite() {
            self.val_loss
        } else {
            f64::INFINITY
        }
    }

    /// Elapsed time with negative or non-finite values mapped to zero.
    pub(crate) fn charged_time(&self) -> f64 {
        if self.elapsed.is_finite() && self.elapsed > 0.0 {
            self.elapsed
        } else {
            0.0
        }
    }
}

/// Trains and evaluates one configuration of one candidate.
pub trait Trainer<M> {
    /// Runs a single blocking trial.
    fn train(&mut self, request: &TrainRequest<'_>) -> TrainOutcome<M>;
}

impl<M, F> Trainer<M> for F
where
    F: FnMut(&TrainRequest<'_>) -> TrainOutcome<M>,
{
    fn train(&mut self, request: &TrainRequest<'_>) -> TrainOutcome<M> {
        self(request)
    }
}
