//! Error types for request parsing and command dispatch.
//!
//! Every variant is recoverable: the protocol loop renders it into an error
//! response and keeps reading. The `Display` output is exactly what callers
//! see in the response's `error` field.

use std::str::Utf8Error;

use thiserror::Error;

use crate::engine::EngineError;
use crate::transform::EngineOutputError;

/// Errors surfaced while handling a single request line.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The line could not be decoded as JSON.
    #[error("Invalid JSON")]
    InvalidJson {
        /// Underlying decode error.
        #[source]
        source: MalformedLine,
    },

    /// The JSON value does not describe a well-formed request.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The `cmd` field names no known command.
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// The recognition engine failed while handling the request.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The recognition engine answered with output of the wrong shape.
    #[error(transparent)]
    EngineOutput(#[from] EngineOutputError),
}

impl DispatchError {
    /// Creates an invalid JSON error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::InvalidJson {
            source: MalformedLine::Syntax(source),
        }
    }

    /// Creates an invalid JSON error for a line that is not UTF-8.
    pub fn from_encoding_error(source: Utf8Error) -> Self {
        Self::InvalidJson {
            source: MalformedLine::Encoding(source),
        }
    }

    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Short label for the error category, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => "protocol",
            Self::Validation(_) => "validation",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::Engine(_) | Self::EngineOutput(_) => "command",
        }
    }

    /// Returns `true` for failures that happened inside the engine call.
    #[must_use]
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::EngineOutput(_))
    }
}

/// Why a line was rejected before any request could be decoded.
#[derive(Debug, Error)]
pub enum MalformedLine {
    /// The bytes are not UTF-8.
    #[error("line is not valid UTF-8: {0}")]
    Encoding(#[source] Utf8Error),
    /// The text is not JSON.
    #[error(transparent)]
    Syntax(serde_json::Error),
}

/// Structural problems found while validating a decoded request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request was valid JSON but not an object.
    #[error("request must be a JSON object")]
    NotAnObject,
    /// A required field was absent or `null`.
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    /// A field that must be a string had another type.
    #[error("field `{field}` must be a string")]
    NotAString { field: &'static str },
}
