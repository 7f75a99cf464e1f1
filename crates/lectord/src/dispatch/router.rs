//! Command routing.
//!
//! The [`Dispatcher`] maps a decoded [`Request`] to a handler and turns
//! whatever the handler produced into a [`Response`]. It never fails: every
//! error becomes an error response, and the correlation id is attached in
//! one place after the handler has run.

use tracing::{debug, error, warn};

use crate::engine::{EngineHandle, RecognitionEngine};
use crate::transform::{DetectionRecord, records_from_raw};

use super::errors::DispatchError;
use super::request::{Command, OcrRequest, Request};
use super::response::Response;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// What the protocol loop should do after a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Write this response and keep reading.
    Respond(Response),
    /// Stop without writing anything.
    Shutdown,
}

/// Routes requests to command handlers.
#[derive(Debug)]
pub struct Dispatcher<'a, E> {
    engine: &'a EngineHandle<E>,
}

impl<'a, E> Dispatcher<'a, E>
where
    E: RecognitionEngine,
{
    /// Creates a dispatcher over the process-wide engine handle.
    pub fn new(engine: &'a EngineHandle<E>) -> Self {
        Self { engine }
    }

    /// Handles one request.
    pub fn dispatch(&self, request: Request) -> Outcome {
        let Request { id, command } = request;

        debug!(
            target: DISPATCH_TARGET,
            command = command.name(),
            id = ?id,
            "dispatching request"
        );

        let result = match command {
            Command::Ping => Ok(Response::ok()),
            Command::Ocr(ocr) => self.recognise(&ocr).map(Response::results),
            Command::Shutdown => return Outcome::Shutdown,
            Command::Unknown(name) => Err(DispatchError::unknown_command(name)),
            Command::Invalid(problem) => Err(DispatchError::from(problem)),
        };

        let response = result.unwrap_or_else(|failure| {
            report_failure(&failure);
            Response::from_error(&failure)
        });
        Outcome::Respond(response.with_id(id))
    }

    fn recognise(&self, ocr: &OcrRequest) -> Result<Vec<DetectionRecord>, DispatchError> {
        let Some(engine) = self.engine.engine() else {
            debug!(
                target: DISPATCH_TARGET,
                "recognition engine unavailable; answering with empty results"
            );
            return Ok(Vec::new());
        };

        let image = ocr.image_path()?;
        let raw = engine.recognise(image)?;
        let records = records_from_raw(&raw)?;
        debug!(
            target: DISPATCH_TARGET,
            image = %image.display(),
            detections = records.len(),
            "recognition complete"
        );
        Ok(records)
    }
}

fn report_failure(failure: &DispatchError) {
    if failure.is_command_failure() {
        error!(
            target: DISPATCH_TARGET,
            kind = failure.kind(),
            error = ?failure,
            "command failed"
        );
    } else {
        warn!(
            target: DISPATCH_TARGET,
            kind = failure.kind(),
            %failure,
            "request rejected"
        );
    }
}
