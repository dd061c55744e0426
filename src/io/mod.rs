//! Input/output helpers.
//!
//! - sample ingest + validation (`ingest`)
//! - per-iteration parameter dump (`export`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
