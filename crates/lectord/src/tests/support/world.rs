//! BDD test world: holds the loader, reporter, engine provider, worker and
//! captured session output for step functions.
use std::cell::RefCell;
use std::io::Cursor;
use std::sync::Arc;

use serde_json::Value;

use crate::bootstrap::{BootstrapError, ConfigLoader, Worker, bootstrap_with};
use crate::protocol::{Termination, WorkerError};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::engine_provider::{CannedEngine, RecordingEngineProvider};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub provider: RecordingEngineProvider,
    worker: Option<Worker<CannedEngine>>,
    bootstrap_error: Option<BootstrapError>,
    pending_input: Vec<String>,
    output: Vec<String>,
    session: Option<Result<Termination, WorkerError>>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader),
            reporter: Arc::new(RecordingHealthReporter::default()),
            provider: RecordingEngineProvider::default(),
            worker: None,
            bootstrap_error: None,
            pending_input: Vec::new(),
            output: Vec::new(),
            session: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.loader = Box::new(TestConfigLoader);
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.worker.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(&*self.loader, self.reporter.clone(), &self.provider) {
            Ok(worker) => self.worker = Some(worker),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns the bootstrap error, if any.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the bootstrapped worker, if any.
    #[must_use]
    pub fn worker(&self) -> Option<&Worker<CannedEngine>> {
        self.worker.as_ref()
    }

    /// Queues a raw line for the next session.
    pub fn queue_line(&mut self, line: impl Into<String>) {
        self.pending_input.push(line.into());
    }

    /// Feeds the queued lines to the worker and closes its input.
    ///
    /// # Panics
    ///
    /// Panics when the worker has not been bootstrapped.
    pub fn run_session(&mut self) {
        let worker = self.worker.as_ref().expect("worker not bootstrapped");
        let mut input = self.pending_input.join("\n");
        input.push('\n');
        let mut output = Vec::new();
        let result = worker.run(Cursor::new(input.into_bytes()), &mut output);
        let text = String::from_utf8(output).expect("worker output should be UTF-8");
        self.output = text.lines().map(str::to_owned).collect();
        self.pending_input.clear();
        self.session = Some(result);
    }

    /// Lines written by the last session, readiness line included.
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Parses the output line at `index` as JSON.
    pub fn output_json(&self, index: usize) -> Result<Value, String> {
        let line = self
            .output
            .get(index)
            .ok_or_else(|| format!("no output line {index}: {:?}", self.output))?;
        serde_json::from_str(line).map_err(|error| format!("line {index} is not JSON: {error}"))
    }

    /// How the last session ended.
    #[must_use]
    pub fn session(&self) -> Option<&Result<Termination, WorkerError>> {
        self.session.as_ref()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture constructor used by the behavioural suites.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

/// Removes one pair of surrounding double quotes captured by a step pattern.
#[must_use]
pub fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}
