//! Ansatz (model function) implementations.
//!
//! - the `Ansatz` trait and shared helpers (`ansatz`)
//! - potential energy curves: harmonic, Morse (`pec`)
//! - elementary functions: constant, linear, exponential, Fermi-Dirac (`simple`)
//! - multi-dimensional polynomials (`poly`)
//! - name-based selection (`registry`)

pub mod ansatz;
pub mod pec;
pub mod poly;
pub mod registry;
pub mod simple;

pub use ansatz::Ansatz;
pub use pec::*;
pub use poly::*;
pub use registry::*;
pub use simple::*;
