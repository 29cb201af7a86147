//! Monitoring hook
//!
//! Operations report success or failure with their duration to a
//! [`MonitoringSink`]. Recording is fire-and-forget: sinks must not block and
//! cannot fail the operation being observed.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Outcome of an observed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// One monitoring event
#[derive(Debug, Clone, PartialEq)]
pub struct OperationEvent {
    pub operation: String,
    pub outcome: Outcome,
    pub duration: Duration,
    pub error: Option<String>,
}

impl OperationEvent {
    pub fn success(operation: impl Into<String>, duration: Duration) -> Self {
        Self {
            operation: operation.into(),
            outcome: Outcome::Success,
            duration,
            error: None,
        }
    }

    pub fn failure(operation: impl Into<String>, duration: Duration, error: impl fmt::Display) -> Self {
        Self {
            operation: operation.into(),
            outcome: Outcome::Failure,
            duration,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failure
    }
}

/// Receiver of operation events
pub trait MonitoringSink: Send + Sync {
    fn record(&self, event: OperationEvent);
}

/// Shared handle to a monitoring sink
pub type SharedMonitor = Arc<dyn MonitoringSink>;

/// Sink that emits events as `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMonitor;

impl MonitoringSink for TracingMonitor {
    fn record(&self, event: OperationEvent) {
        let duration_ms = event.duration.as_millis() as u64;
        match event.outcome {
            Outcome::Success => {
                tracing::debug!(operation = %event.operation, duration_ms, "Operation succeeded")
            }
            Outcome::Failure => tracing::warn!(
                operation = %event.operation,
                duration_ms,
                error = event.error.as_deref().unwrap_or_default(),
                "Operation failed"
            ),
        }
    }
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl MonitoringSink for NoopMonitor {
    fn record(&self, _event: OperationEvent) {}
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    events: Mutex<Vec<OperationEvent>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OperationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events recorded for one operation name
    pub fn events_for(&self, operation: &str) -> Vec<OperationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.operation == operation)
            .collect()
    }
}

impl MonitoringSink for RecordingMonitor {
    fn record(&self, event: OperationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Run `future` and report its outcome and duration under `operation`
pub async fn observe<F, T, E>(sink: &dyn MonitoringSink, operation: &str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let started = Instant::now();
    let result = future.await;
    let elapsed = started.elapsed();

    match &result {
        Ok(_) => sink.record(OperationEvent::success(operation, elapsed)),
        Err(err) => sink.record(OperationEvent::failure(operation, elapsed, err)),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_observe_records_outcomes() {
        let monitor = RecordingMonitor::new();

        let ok: Result<u8, String> = observe(&monitor, "persist", async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));

        let err: Result<u8, String> =
            observe(&monitor, "persist", async { Err("backend down".to_string()) }).await;
        assert!(err.is_err());

        let events = monitor.events_for("persist");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome, Outcome::Success);
        assert!(events[1].is_failure());
        assert_eq!(events[1].error.as_deref(), Some("backend down"));
    }

    #[test]
    fn test_noop_and_tracing_sinks_accept_events() {
        let event = OperationEvent::failure("discover", Duration::from_millis(3), "timeout");
        NoopMonitor.record(event.clone());
        TracingMonitor.record(event);
    }
}
