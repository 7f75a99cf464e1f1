//! Test harness utilities for the worker behavioural suites.

mod config_loader;
mod engine_provider;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use engine_provider::RecordingEngineProvider;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, strip_quotes, world};
