//! Data-quality reporting for the segmentation engine.
//!
//! The engine never aborts on a malformed log entry. Anything suspicious is
//! reported as an [`Anomaly`] to a [`Diagnostics`] sink passed in by the caller
//! and the scan carries on. [`TracingDiagnostics`] forwards to `tracing`;
//! [`CollectingDiagnostics`] keeps anomalies in memory for tests and tooling.

use serde::Serialize;
use std::sync::Mutex;

/// A structural problem found in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum Anomaly {
    /// Two invocations share a correlation id; the later one is kept.
    DuplicateInvocation {
        correlation_id: String,
        first_index: usize,
        second_index: usize,
    },
    /// Two results share a correlation id; the first one is kept.
    DuplicateResult {
        correlation_id: String,
        first_index: usize,
        second_index: usize,
    },
    /// A result with no matching invocation anywhere in the log.
    OrphanResult { correlation_id: String, index: usize },
    /// Content that should have been structured data could not be read.
    MalformedPayload {
        index: usize,
        producer_name: String,
        reason: String,
    },
}

impl Anomaly {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anomaly::DuplicateInvocation { .. } => "duplicate_invocation",
            Anomaly::DuplicateResult { .. } => "duplicate_result",
            Anomaly::OrphanResult { .. } => "orphan_result",
            Anomaly::MalformedPayload { .. } => "malformed_payload",
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::DuplicateInvocation {
                correlation_id,
                first_index,
                second_index,
            } => write!(
                f,
                "invocation id {correlation_id} appears at {first_index} and {second_index}; keeping {second_index}"
            ),
            Anomaly::DuplicateResult {
                correlation_id,
                first_index,
                second_index,
            } => write!(
                f,
                "result id {correlation_id} appears at {first_index} and {second_index}; keeping {first_index}"
            ),
            Anomaly::OrphanResult {
                correlation_id,
                index,
            } => write!(f, "result {correlation_id} at {index} has no invocation"),
            Anomaly::MalformedPayload {
                index,
                producer_name,
                reason,
            } => write!(f, "unreadable {producer_name} payload at {index}: {reason}"),
        }
    }
}

/// Sink for anomalies found while segmenting a log.
pub trait Diagnostics: Send + Sync {
    fn report(&self, anomaly: Anomaly);
}

/// Reports anomalies as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, anomaly: Anomaly) {
        tracing::warn!(kind = anomaly.as_str(), "{}", anomaly);
    }
}

/// Discards anomalies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn report(&self, _anomaly: Anomaly) {}
}

/// Keeps every reported anomaly in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    anomalies: Mutex<Vec<Anomaly>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, in report order
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.anomalies
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies().is_empty()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, anomaly: Anomaly) {
        match self.anomalies.lock() {
            Ok(mut guard) => guard.push(anomaly),
            Err(poisoned) => poisoned.into_inner().push(anomaly),
        }
    }
}
