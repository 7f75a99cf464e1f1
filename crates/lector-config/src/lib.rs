//! Shared configuration for the Lector recognition worker.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then an
//! optional `.lector.toml` file (or `--config-path`), then `LECTOR_*`
//! environment variables, then command-line flags. The host that spawns the
//! worker normally passes no arguments, so defaults and the environment
//! carry most deployments.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ENGINE_PROGRAM, DEFAULT_LOG_FILTER, default_engine_program, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LECTOR")]
pub struct Config {
    /// `tracing` filter expression applied to the diagnostic stream.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Rendering of diagnostic events on standard error.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Executable that performs text recognition.
    ///
    /// A bare name is looked up on `PATH`; anything containing a path
    /// separator is used as given.
    #[serde(default = "default_engine_program")]
    pub engine_program: String,
}

impl Config {
    /// Loads configuration from every layer, reading flags from the process
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is invalid.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration using `args` as the command line.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is invalid.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected diagnostic format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Configured recognition engine executable.
    #[must_use]
    pub fn engine_program(&self) -> &str {
        self.engine_program.as_str()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            engine_program: default_engine_program(),
        }
    }
}
