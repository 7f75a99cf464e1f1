use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output formats for the worker's diagnostic stream.
///
/// Diagnostics always go to standard error; the format only changes how each
/// event is rendered there.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for hosts that collect worker stderr.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;
