//! `mcfit` library crate.
//!
//! Fits parametrized model functions (ansätze) to `(x, y, dy)` data and
//! estimates parameter uncertainties by Monte Carlo resampling: perturb `y`
//! within `dy`, refit, and take the spread of the refits.
//!
//! The binary (`mcfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine is usable from other programs directly

pub mod app;
pub mod cli;
pub mod datasets;
pub mod domain;
pub mod error;
pub mod errorbar;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod stochastic;
