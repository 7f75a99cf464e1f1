//! Test double for [`HealthReporter`] that records structured events for assertions.
//!
//! The recorder captures the worker lifecycle telemetry emitted during
//! bootstrap and the request loop so behaviour tests can validate
//! observable events.

use std::sync::Mutex;

use lector_config::Config;

use crate::bootstrap::BootstrapError;
use crate::engine::{EngineProfile, EngineStartupError};
use crate::health::HealthReporter;
use crate::protocol::{Termination, WorkerError};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// Engine construction initiated.
    EngineStarting,
    /// Engine started.
    EngineReady,
    /// Engine failed to start with a message.
    EngineUnavailable(String),
    /// Readiness line written.
    WorkerReady,
    /// Request loop ended cleanly.
    WorkerStopped(Termination),
    /// Request loop ended on a stream failure.
    WorkerFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn engine_starting(&self, _profile: &EngineProfile) {
        self.record(HealthEvent::EngineStarting);
    }

    fn engine_ready(&self, _profile: &EngineProfile) {
        self.record(HealthEvent::EngineReady);
    }

    fn engine_unavailable(&self, error: &EngineStartupError) {
        self.record(HealthEvent::EngineUnavailable(error.message().to_owned()));
    }

    fn worker_ready(&self) {
        self.record(HealthEvent::WorkerReady);
    }

    fn worker_stopped(&self, termination: Termination) {
        self.record(HealthEvent::WorkerStopped(termination));
    }

    fn worker_failed(&self, error: &WorkerError) {
        self.record(HealthEvent::WorkerFailed(error.to_string()));
    }
}
