//! Response serialization for the protocol loop.
//!
//! Responses are single JSONL lines. Optional payload fields are omitted
//! rather than written as `null`, so a request without an `id` gets a
//! response without an `id` key.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::transform::DetectionRecord;

use super::errors::DispatchError;

/// Outcome flag carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The request succeeded.
    Ok,
    /// The request failed; see `error`.
    Error,
}

/// A single response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Vec<DetectionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
}

impl Response {
    /// Bare success, used for readiness and `ping`.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            results: None,
            error: None,
            id: None,
        }
    }

    /// Success carrying recognition results.
    #[must_use]
    pub fn results(records: Vec<DetectionRecord>) -> Self {
        Self {
            results: Some(records),
            ..Self::ok()
        }
    }

    /// Failure with a human-readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            results: None,
            error: Some(message.into()),
            id: None,
        }
    }

    /// Failure rendered from a dispatch error.
    #[must_use]
    pub fn from_error(error: &DispatchError) -> Self {
        Self::error(error.to_string())
    }

    /// Attaches the caller's correlation id, if any.
    #[must_use]
    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }

    /// Outcome flag.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Echoed correlation id.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Recognition results, present on successful `ocr` responses.
    #[must_use]
    pub fn records(&self) -> Option<&[DetectionRecord]> {
        self.results.as_deref()
    }

    /// Error message, present on failures.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Errors raised while emitting a response line.
#[derive(Debug, Error)]
pub enum ResponseWriteError {
    /// Writing or flushing the output stream failed.
    #[error("failed to write response: {0}")]
    Io(#[from] io::Error),
    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writer that frames responses as JSONL and flushes after each line.
///
/// Flushing per line is the synchronisation contract with the host: a
/// response must be observable before the worker blocks on the next read.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response as a JSONL line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, writing, or flushing fails.
    pub fn write_response(&mut self, response: &Response) -> Result<(), ResponseWriteError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the readiness line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_ready(&mut self) -> Result<(), ResponseWriteError> {
        self.write_response(&Response::ok())
    }

    /// Recovers the wrapped stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
