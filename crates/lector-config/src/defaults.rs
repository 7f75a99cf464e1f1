use crate::logging::LogFormat;

/// Default log filter expression used by the worker.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default recognition engine executable, resolved against `PATH`.
pub const DEFAULT_ENGINE_PROGRAM: &str = "paddleocr-json";

/// Default log filter expression used by the worker.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the worker.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned engine program value used by serde when the field is absent.
pub fn default_engine_program() -> String {
    DEFAULT_ENGINE_PROGRAM.to_owned()
}
