//! The worker's read, dispatch, write loop.
//!
//! The loop moves through `Starting → Ready → Terminated`. It announces
//! readiness with a single `{"status":"ok"}` line, then handles one input
//! line at a time: the response to a line is written and flushed before the
//! next line is read. A `shutdown` command or end of input ends the loop
//! cleanly; only an I/O failure on the streams themselves is fatal.

use std::fmt;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::warn;

use crate::dispatch::{
    Dispatcher, Outcome, Request, Response, ResponseWriteError, ResponseWriter, decode_line,
};
use crate::engine::{EngineHandle, RecognitionEngine};
use crate::health::HealthReporter;

const PROTOCOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::protocol");

/// Lifecycle states of the protocol loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Readiness has not been announced yet.
    Starting,
    /// Accepting requests.
    Ready,
    /// The loop has exited.
    Terminated,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A `shutdown` command was received.
    Shutdown,
    /// Standard input was closed.
    EndOfInput,
}

impl fmt::Display for Termination {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Shutdown => "shutdown",
            Self::EndOfInput => "end_of_input",
        })
    }
}

/// Failures that stop the loop abnormally.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reading from the input stream failed.
    #[error("failed to read request: {source}")]
    Read {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a response failed, usually because the host went away.
    #[error(transparent)]
    Write(#[from] ResponseWriteError),
}

/// Drives the request loop over a pair of streams.
pub struct ProtocolLoop<'a, E> {
    dispatcher: Dispatcher<'a, E>,
    reporter: &'a dyn HealthReporter,
    state: WorkerState,
}

impl<'a, E> ProtocolLoop<'a, E>
where
    E: RecognitionEngine,
{
    /// Creates a loop over the given engine handle.
    pub fn new(engine: &'a EngineHandle<E>, reporter: &'a dyn HealthReporter) -> Self {
        Self {
            dispatcher: Dispatcher::new(engine),
            reporter,
            state: WorkerState::Starting,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Announces readiness and serves requests until shutdown or end of
    /// input.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when the input cannot be read or a response
    /// cannot be written.
    pub fn run<R, W>(&mut self, mut input: R, output: W) -> Result<Termination, WorkerError>
    where
        R: BufRead,
        W: Write,
    {
        let mut writer = ResponseWriter::new(output);
        let result = self.serve(&mut input, &mut writer);
        self.state = WorkerState::Terminated;
        result
    }

    fn serve<R, W>(
        &mut self,
        input: &mut R,
        writer: &mut ResponseWriter<W>,
    ) -> Result<Termination, WorkerError>
    where
        R: BufRead,
        W: Write,
    {
        writer.write_ready()?;
        self.state = WorkerState::Ready;
        self.reporter.worker_ready();

        let mut line = Vec::new();
        loop {
            line.clear();
            let read = input
                .read_until(b'\n', &mut line)
                .map_err(|source| WorkerError::Read { source })?;
            if read == 0 {
                return Ok(Termination::EndOfInput);
            }

            match self.handle_line(&line) {
                Some(Outcome::Respond(response)) => writer.write_response(&response)?,
                Some(Outcome::Shutdown) => return Ok(Termination::Shutdown),
                None => {}
            }
        }
    }

    fn handle_line(&self, line: &[u8]) -> Option<Outcome> {
        match decode_line(line) {
            Ok(None) => None,
            Ok(Some(value)) => Some(self.dispatcher.dispatch(Request::from_value(value))),
            Err(error) => {
                warn!(
                    target: PROTOCOL_TARGET,
                    kind = error.kind(),
                    error = ?error,
                    "malformed request line"
                );
                Some(Outcome::Respond(Response::from_error(&error)))
            }
        }
    }
}
