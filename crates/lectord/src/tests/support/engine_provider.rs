//! Test engine provider: records start requests, supports injected
//! failures, and hands out engines that replay a canned reply.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use lector_config::Config;

use crate::engine::{
    EngineError, EngineProfile, EngineProvider, EngineStartupError, RecognitionEngine,
};

/// Engine that returns the same raw output for every image.
#[derive(Debug, Clone)]
pub struct CannedEngine {
    reply: Value,
    seen: Arc<Mutex<Vec<PathBuf>>>,
}

impl CannedEngine {
    /// Images passed to the engine so far.
    #[must_use]
    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().expect("canned engine mutex poisoned").clone()
    }
}

impl RecognitionEngine for CannedEngine {
    fn recognise(&self, image: &Path) -> Result<Value, EngineError> {
        self.seen
            .lock()
            .expect("canned engine mutex poisoned")
            .push(image.to_path_buf());
        Ok(self.reply.clone())
    }
}

/// Engine provider that records requests and supports injected failures.
#[derive(Clone, Default)]
pub struct RecordingEngineProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl RecordingEngineProvider {
    /// Configures the provider to fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        let mut state = self.state.lock().expect("provider state mutex poisoned");
        state.failure = Some(message.into());
    }

    /// Configures the raw output handed back by started engines.
    pub fn reply_with(&self, reply: Value) {
        let mut state = self.state.lock().expect("provider state mutex poisoned");
        state.reply = reply;
    }

    /// Profiles the provider was asked to start.
    #[must_use]
    pub fn recorded_starts(&self) -> Vec<EngineProfile> {
        let state = self.state.lock().expect("provider state mutex poisoned");
        state.starts.clone()
    }
}

impl EngineProvider for RecordingEngineProvider {
    type Engine = CannedEngine;

    fn start_engine(
        &self,
        profile: &EngineProfile,
        _config: &Config,
    ) -> Result<CannedEngine, EngineStartupError> {
        let mut state = self.state.lock().expect("provider state mutex poisoned");
        state.starts.push(profile.clone());
        if let Some(message) = state.failure.clone() {
            return Err(EngineStartupError::new(message));
        }
        Ok(CannedEngine {
            reply: state.reply.clone(),
            seen: Arc::default(),
        })
    }
}

#[derive(Default)]
struct ProviderState {
    starts: Vec<EngineProfile>,
    failure: Option<String>,
    reply: Value,
}
