//! Line format spoken between the worker and a long-lived engine program.
//!
//! The program announces itself once with `{"ready":true}` after loading its
//! models, or with `{"error":"…"}` before exiting if it cannot. Each request
//! is then one line `{"image_path":"…"}` answered by one line, either
//! `{"result":<raw output>}` or `{"error":"…"}`. Closing the program's
//! standard input asks it to exit.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use super::EngineError;

#[derive(Serialize)]
struct RecognitionRequest<'a> {
    image_path: &'a Path,
}

/// Encodes one recognition request, newline included.
///
/// The path travels as a JSON string, so names starting with `-` or
/// containing spaces reach the engine untouched.
pub(super) fn encode_request(image: &Path) -> Result<Vec<u8>, EngineError> {
    let mut line = serde_json::to_vec(&RecognitionRequest { image_path: image })
        .map_err(|source| EngineError::Encode { source })?;
    line.push(b'\n');
    Ok(line)
}

/// How an engine program opened the session.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Handshake {
    Ready,
    Refused(String),
    Unrecognised(String),
}

pub(super) fn parse_handshake(line: &str) -> Handshake {
    let trimmed = line.trim();
    let Some(mut fields) = decode_object(trimmed) else {
        return Handshake::Unrecognised(trimmed.to_owned());
    };
    if let Some(message) = fields.remove("error") {
        return Handshake::Refused(message_text(message));
    }
    match fields.get("ready") {
        Some(Value::Bool(true)) => Handshake::Ready,
        _ => Handshake::Unrecognised(trimmed.to_owned()),
    }
}

/// Decodes one reply line into the raw per-image output.
pub(super) fn parse_reply(line: &str) -> Result<Value, EngineError> {
    let trimmed = line.trim();
    let reply: Value =
        serde_json::from_str(trimmed).map_err(|source| EngineError::Decode { source })?;
    let Value::Object(mut fields) = reply else {
        return Err(EngineError::UnexpectedReply {
            reply: trimmed.to_owned(),
        });
    };
    if let Some(message) = fields.remove("error") {
        return Err(EngineError::Failed {
            message: message_text(message),
        });
    }
    fields
        .remove("result")
        .ok_or_else(|| EngineError::UnexpectedReply {
            reply: trimmed.to_owned(),
        })
}

fn decode_object(line: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(line) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

fn message_text(message: Value) -> String {
    match message {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
