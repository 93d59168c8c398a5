#![allow(clippy::cast_precision_loss)]

mod lifecycle;
mod retrain;
mod selection;
mod trial_log;
