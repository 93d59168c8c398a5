#![allow(clippy::cast_precision_loss)]

mod phases;
mod sample_size;
