//! Line-delimited JSON worker that brokers text-recognition requests.
//!
//! A host process spawns `lectord`, waits for the `{"status":"ok"}` readiness
//! line on its standard output, and then exchanges one JSON request per line
//! for one JSON response per line. The worker handles a single request at a
//! time: it reads a line, dispatches it, writes and flushes the response,
//! and only then reads again.
//!
//! Startup makes one attempt to bring up the recognition engine through an
//! [`EngineProvider`]. If that fails the worker still announces readiness;
//! `ocr` requests then succeed with empty results. Per-request failures of
//! any kind become error responses, so only `shutdown`, end of input, or a
//! broken stream stop the process.
//!
//! Diagnostics go to standard error through `tracing`; standard output
//! carries protocol lines and nothing else.

mod bootstrap;
pub mod dispatch;
pub mod engine;
mod health;
pub mod protocol;
mod telemetry;
pub mod transform;

pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, Worker, bootstrap_with,
    initialise_engine,
};
pub use engine::command::{CommandEngine, CommandEngineProvider};
pub use engine::{
    EngineError, EngineHandle, EngineProfile, EngineProvider, EngineStartupError,
    RecognitionEngine,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use protocol::{ProtocolLoop, Termination, WorkerError, WorkerState};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transform::{DetectionRecord, EngineOutputError};

#[cfg(test)]
mod tests;
