//! Request decoding for the protocol loop.
//!
//! Decoding happens in two steps. [`decode_line`] frames and parses a raw
//! input line; [`Request::from_value`] then turns the JSON value into a
//! typed command. The second step never fails outright: structural problems
//! become [`Command::Invalid`] so the correlation id, when one could be
//! recovered, still reaches the error response.

use std::path::Path;
use std::str;

use serde_json::{Map, Value};

use super::errors::{DispatchError, ValidationError};

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlation id to echo, if the caller sent a non-null one.
    pub id: Option<Value>,
    /// The command to run.
    pub command: Command,
}

/// Commands understood by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Text recognition over one image.
    Ocr(OcrRequest),
    /// Stop the worker without replying.
    Shutdown,
    /// A command name the worker does not know.
    Unknown(String),
    /// A request that failed validation.
    Invalid(ValidationError),
}

/// Arguments of an `ocr` command.
///
/// The image path is kept raw and validated on use: degraded mode answers
/// `ocr` without looking at its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrRequest {
    image_path: Option<Value>,
}

impl OcrRequest {
    /// Builds a request for the given path.
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: Some(Value::String(image_path.into())),
        }
    }

    /// Returns the validated image path.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when `image_path` is absent, `null`, or
    /// not a string.
    pub fn image_path(&self) -> Result<&Path, ValidationError> {
        match &self.image_path {
            Some(Value::String(path)) => Ok(Path::new(path)),
            None | Some(Value::Null) => Err(ValidationError::MissingField {
                field: "image_path",
            }),
            Some(_) => Err(ValidationError::NotAString {
                field: "image_path",
            }),
        }
    }
}

impl Request {
    /// Interprets a decoded JSON value as a request.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self {
                id: None,
                command: Command::Invalid(ValidationError::NotAnObject),
            };
        };

        let id = fields.remove("id").filter(|id| !id.is_null());
        let command = Command::from_fields(&mut fields);
        Self { id, command }
    }

    /// Convenience for tests and callers holding a raw line.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidJson` when the line is not JSON.
    /// Blank lines yield `Ok(None)`.
    pub fn parse(line: &[u8]) -> Result<Option<Self>, DispatchError> {
        Ok(decode_line(line)?.map(Self::from_value))
    }
}

impl Command {
    fn from_fields(fields: &mut Map<String, Value>) -> Self {
        let name = match fields.remove("cmd") {
            Some(Value::String(name)) => name,
            None | Some(Value::Null) => {
                return Self::Invalid(ValidationError::MissingField { field: "cmd" });
            }
            Some(_) => return Self::Invalid(ValidationError::NotAString { field: "cmd" }),
        };

        match name.as_str() {
            "ping" => Self::Ping,
            "ocr" => Self::Ocr(OcrRequest {
                image_path: fields.remove("image_path"),
            }),
            "shutdown" => Self::Shutdown,
            _ => Self::Unknown(name),
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Ping => "ping",
            Self::Ocr(_) => "ocr",
            Self::Shutdown => "shutdown",
            Self::Unknown(name) => name.as_str(),
            Self::Invalid(_) => "<invalid>",
        }
    }
}

/// Frames and parses one input line.
///
/// Surrounding whitespace (including the newline delimiter and non-ASCII
/// spaces such as U+3000) is ignored.
///
/// # Errors
///
/// Returns `DispatchError::InvalidJson` if the line is not valid UTF-8 JSON.
/// Blank lines yield `Ok(None)`.
pub fn decode_line(line: &[u8]) -> Result<Option<Value>, DispatchError> {
    let text = str::from_utf8(line).map_err(DispatchError::from_encoding_error)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(DispatchError::from_json_error)
}
