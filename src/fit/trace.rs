//! Optional per-evaluation trace channel.
//!
//! The driver calls the observer on every residual evaluation with the
//! parameters, the model values and the weighted residuals. Observers are
//! shared across parallel iterations, so they must be `Sync` and do their
//! own synchronization.

use std::sync::{Mutex, PoisonError};

use nalgebra::DVector;

/// Receives every residual evaluation made by the fit driver.
pub trait EvalObserver: Sync {
    fn observe(&self, params: &DVector<f64>, model: &DVector<f64>, residuals: &DVector<f64>);
}

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub params: Vec<f64>,
    /// Weighted sum of squared residuals at `params`.
    pub chi_square: f64,
}

/// Collects evaluations in memory.
#[derive(Debug, Default)]
pub struct TraceCollector {
    records: Mutex<Vec<TraceRecord>>,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in arrival order.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EvalObserver for TraceCollector {
    fn observe(&self, params: &DVector<f64>, _model: &DVector<f64>, residuals: &DVector<f64>) {
        let record = TraceRecord {
            params: params.iter().copied().collect(),
            chi_square: residuals.norm_squared(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Emits each evaluation at `trace` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl EvalObserver for LogObserver {
    fn observe(&self, params: &DVector<f64>, _model: &DVector<f64>, residuals: &DVector<f64>) {
        log::trace!(
            "eval params={:?} chi2={:.10e}",
            params.as_slice(),
            residuals.norm_squared()
        );
    }
}
