//! Structured health reporting for worker lifecycle events.

use std::sync::Arc;

use crate::bootstrap::BootstrapError;
use crate::engine::{EngineProfile, EngineStartupError};
use crate::protocol::{Termination, WorkerError};

use lector_config::Config;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes, whether or not an engine started.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the recognition engine is constructed.
    fn engine_starting(&self, profile: &EngineProfile);

    /// Invoked after the recognition engine starts.
    fn engine_ready(&self, profile: &EngineProfile);

    /// Invoked when the engine could not be started and the worker falls
    /// back to degraded mode.
    fn engine_unavailable(&self, error: &EngineStartupError);

    /// Invoked once the readiness line has been written.
    fn worker_ready(&self);

    /// Invoked when the request loop ends cleanly.
    fn worker_stopped(&self, termination: Termination);

    /// Invoked when the request loop ends because a stream failed.
    fn worker_failed(&self, error: &WorkerError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn engine_starting(&self, profile: &EngineProfile) {
        (**self).engine_starting(profile);
    }

    fn engine_ready(&self, profile: &EngineProfile) {
        (**self).engine_ready(profile);
    }

    fn engine_unavailable(&self, error: &EngineStartupError) {
        (**self).engine_unavailable(error);
    }

    fn worker_ready(&self) {
        (**self).worker_ready();
    }

    fn worker_stopped(&self, termination: Termination) {
        (**self).worker_stopped(termination);
    }

    fn worker_failed(&self, error: &WorkerError) {
        (**self).worker_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "lectord::health",
            event = "bootstrap_starting",
            "starting worker bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "lectord::health",
            event = "bootstrap_succeeded",
            engine_program = %config.engine_program(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "worker bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "lectord::health",
            event = "bootstrap_failed",
            error = %error,
            "worker bootstrap failed"
        );
    }

    fn engine_starting(&self, profile: &EngineProfile) {
        tracing::info!(
            target: "lectord::health",
            event = "engine_starting",
            language = profile.language,
            angle_classification = profile.angle_classification,
            "starting recognition engine"
        );
    }

    fn engine_ready(&self, profile: &EngineProfile) {
        tracing::info!(
            target: "lectord::health",
            event = "engine_ready",
            language = profile.language,
            "recognition engine ready"
        );
    }

    fn engine_unavailable(&self, error: &EngineStartupError) {
        // The one degraded-mode line; must survive `LECTOR_LOG_FILTER=error`.
        tracing::error!(
            target: "lectord::health",
            event = "engine_unavailable",
            message = %error.message(),
            error = ?error,
            "recognition engine unavailable; ocr requests will return empty results"
        );
    }

    fn worker_ready(&self) {
        tracing::info!(
            target: "lectord::health",
            event = "worker_ready",
            "accepting requests"
        );
    }

    fn worker_stopped(&self, termination: Termination) {
        tracing::info!(
            target: "lectord::health",
            event = "worker_stopped",
            reason = %termination,
            "worker stopped"
        );
    }

    fn worker_failed(&self, error: &WorkerError) {
        tracing::error!(
            target: "lectord::health",
            event = "worker_failed",
            error = %error,
            "worker stopped on stream failure"
        );
    }
}
