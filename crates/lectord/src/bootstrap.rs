//! Worker bootstrap orchestration.
//!
//! Bootstrap loads configuration, installs telemetry, and makes exactly one
//! attempt to start the recognition engine. An engine that fails to start
//! does not fail bootstrap: the worker comes up in degraded mode with an
//! [`EngineHandle::Unavailable`].

use std::io::{BufRead, Write};
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use lector_config::Config;

use crate::engine::{EngineHandle, EngineProfile, EngineProvider, RecognitionEngine};
use crate::health::HealthReporter;
use crate::protocol::{ProtocolLoop, Termination, WorkerError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the worker configuration.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A bootstrapped worker, ready to serve a pair of streams.
pub struct Worker<E> {
    config: Config,
    engine: EngineHandle<E>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl<E> Worker<E> {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the engine handle.
    #[must_use]
    pub fn engine(&self) -> &EngineHandle<E> {
        &self.engine
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

impl<E> Worker<E>
where
    E: RecognitionEngine,
{
    /// Announces readiness on `output` and serves requests from `input`
    /// until shutdown or end of input.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when either stream fails.
    pub fn run<R, W>(&self, input: R, output: W) -> Result<Termination, WorkerError>
    where
        R: BufRead,
        W: Write,
    {
        let mut protocol = ProtocolLoop::new(&self.engine, &*self.reporter);
        let result = protocol.run(input, output);
        match &result {
            Ok(termination) => self.reporter.worker_stopped(*termination),
            Err(error) => self.reporter.worker_failed(error),
        }
        result
    }
}

/// Makes the single attempt to start the recognition engine.
///
/// Never fails: a provider error is reported once and turned into
/// [`EngineHandle::Unavailable`].
pub fn initialise_engine<P>(
    provider: &P,
    config: &Config,
    reporter: &dyn HealthReporter,
) -> EngineHandle<P::Engine>
where
    P: EngineProvider,
{
    let profile = EngineProfile::STANDARD;
    reporter.engine_starting(&profile);
    match provider.start_engine(&profile, config) {
        Ok(engine) => {
            reporter.engine_ready(&profile);
            EngineHandle::Available(engine)
        }
        Err(error) => {
            reporter.engine_unavailable(&error);
            EngineHandle::Unavailable
        }
    }
}

/// Bootstraps the worker using the supplied collaborators.
///
/// # Errors
///
/// Returns a [`BootstrapError`] when configuration or telemetry cannot be
/// set up. Engine failures are not errors.
pub fn bootstrap_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    provider: &P,
) -> Result<Worker<P::Engine>, BootstrapError>
where
    P: EngineProvider,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let engine = initialise_engine(provider, &config, &*reporter);
    reporter.bootstrap_succeeded(&config);

    Ok(Worker {
        config,
        engine,
        telemetry,
        reporter,
    })
}
