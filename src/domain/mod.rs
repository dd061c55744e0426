//! Domain types used throughout the pipeline.
//!
//! - the validated `(x, y, dy)` sample (`FitSample`)

pub mod sample;

pub use sample::*;
