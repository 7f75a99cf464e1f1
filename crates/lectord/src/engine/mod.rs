//! Recognition engine seam and the process-wide engine handle.
//!
//! The worker never talks to a recognition library directly. An
//! [`EngineProvider`] builds a [`RecognitionEngine`] once during bootstrap
//! and the result is frozen into an [`EngineHandle`], which the dispatcher
//! borrows for the rest of the process lifetime. Engines return their raw
//! per-image output untouched; shaping it into detection records is the job
//! of [`crate::transform`].

pub mod command;
mod wire;

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use lector_config::Config;

/// Fixed engine settings applied to every engine the worker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProfile {
    /// Whether text-angle classification runs before recognition.
    pub angle_classification: bool,
    /// Language model selector understood by the engine.
    pub language: &'static str,
    /// Whether the engine may emit its own progress logging.
    pub verbose: bool,
}

impl EngineProfile {
    /// The only profile the worker uses: angle classification on, Chinese
    /// and Latin language model, engine logging off.
    pub const STANDARD: Self = Self {
        angle_classification: true,
        language: "ch",
        verbose: false,
    };

    /// Renders the profile as command-line flags for an engine program.
    #[must_use]
    pub fn arguments(&self) -> [String; 6] {
        [
            "--lang".to_owned(),
            self.language.to_owned(),
            "--use-angle-cls".to_owned(),
            self.angle_classification.to_string(),
            "--show-log".to_owned(),
            self.verbose.to_string(),
        ]
    }
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A text-recognition capability.
pub trait RecognitionEngine {
    /// Runs recognition over a single image and returns the engine's raw
    /// per-image output.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the engine cannot be run or does not
    /// produce decodable output.
    fn recognise(&self, image: &Path) -> Result<Value, EngineError>;
}

impl<E> RecognitionEngine for &E
where
    E: RecognitionEngine + ?Sized,
{
    fn recognise(&self, image: &Path) -> Result<Value, EngineError> {
        (**self).recognise(image)
    }
}

/// Trait implemented by types capable of constructing an engine.
pub trait EngineProvider {
    /// Engine produced by this provider.
    type Engine: RecognitionEngine;

    /// Builds an engine for the given profile.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineStartupError`] when the engine cannot be made
    /// ready, for example because its program is not installed.
    fn start_engine(
        &self,
        profile: &EngineProfile,
        config: &Config,
    ) -> Result<Self::Engine, EngineStartupError>;
}

/// Process-wide view of the recognition engine.
///
/// Built exactly once during bootstrap and never mutated afterwards.
#[derive(Debug)]
pub enum EngineHandle<E> {
    /// The engine started and accepts work.
    Available(E),
    /// The engine could not be started; `ocr` requests run in degraded mode.
    Unavailable,
}

impl<E> EngineHandle<E> {
    /// Returns `true` when an engine is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Borrows the engine when one is available.
    #[must_use]
    pub fn engine(&self) -> Option<&E> {
        match self {
            Self::Available(engine) => Some(engine),
            Self::Unavailable => None,
        }
    }
}

/// Error raised when an engine fails to start.
#[derive(Debug, Error)]
#[error("recognition engine unavailable: {message}")]
pub struct EngineStartupError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineStartupError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Failures raised while running a recognition request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested image does not exist or is not a regular file.
    #[error("image not found: {}", path.display())]
    ImageNotFound {
        /// Path supplied by the caller.
        path: PathBuf,
    },
    /// Talking to the engine failed.
    #[error("lost contact with recognition engine: {source}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The engine closed its output instead of answering.
    #[error("recognition engine exited unexpectedly")]
    Closed,
    /// The request could not be encoded for the engine.
    #[error("failed to encode recognition request: {source}")]
    Encode {
        /// Underlying encode error.
        #[source]
        source: serde_json::Error,
    },
    /// The engine's reply was not valid JSON.
    #[error("recognition engine returned undecodable output: {source}")]
    Decode {
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// The engine's reply was JSON of the wrong shape.
    #[error("recognition engine sent an unexpected reply: {reply}")]
    UnexpectedReply {
        /// The offending line.
        reply: String,
    },
    /// The engine reported that recognition failed.
    #[error("recognition engine failed: {message}")]
    Failed {
        /// Message supplied by the engine.
        message: String,
    },
}
