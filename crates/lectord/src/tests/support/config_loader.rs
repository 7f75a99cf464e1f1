//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;

use lector_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that returns defaults with a debug-level filter.
#[derive(Debug, Default)]
pub struct TestConfigLoader;

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            log_filter: "lectord=debug".to_owned(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("lectord"),
            OsString::from("--log-format"),
            OsString::from("pretty"),
        ];
        Config::load_from_iter(args)
    }
}
