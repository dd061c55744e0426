//! Monte Carlo estimation of parameter uncertainties.
//!
//! - run options (`config`)
//! - standard-normal streams and per-iteration seeding (`rng`)
//! - the phased fitter (`engine`)
//! - the completed run and its aggregates (`run`)

pub mod config;
pub mod engine;
pub mod rng;
pub mod run;

pub use config::*;
pub use engine::*;
pub use rng::{NormalSource, NormalStream};
pub use run::*;
