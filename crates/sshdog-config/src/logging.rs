//! Diagnostic output settings: filter expression, format, and quiet mode.

use std::ffi::OsString;

use strum::{Display, EnumString};

use crate::defaults::{
    LOG_FILTER_ENV_VAR, LOG_FORMAT_ENV_VAR, default_log_filter, default_log_format,
};

/// Supported logging output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Diagnostic output settings for the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    filter: String,
    format: LogFormat,
    quiet: bool,
}

impl LoggingConfig {
    /// Builds settings from explicit values.
    #[must_use]
    pub fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
            quiet: false,
        }
    }

    /// Reads `SSHDOG_LOG` and `SSHDOG_LOG_FORMAT`, falling back to defaults
    /// for unset or unrecognised values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var_os(LOG_FILTER_ENV_VAR),
            std::env::var_os(LOG_FORMAT_ENV_VAR),
        )
    }

    fn from_values(filter: Option<OsString>, format: Option<OsString>) -> Self {
        let filter = filter
            .and_then(|value| value.into_string().ok())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_log_filter().to_owned());
        let format = format
            .and_then(|value| value.into_string().ok())
            .and_then(|value| value.trim().parse::<LogFormat>().ok())
            .unwrap_or_else(default_log_format);
        Self::new(filter, format)
    }

    /// Returns a copy that suppresses all diagnostics when `quiet` is set.
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Effective filter expression; `off` when quiet.
    #[must_use]
    pub fn filter(&self) -> &str {
        if self.quiet { "off" } else { self.filter.as_str() }
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Whether diagnostics are suppressed.
    #[must_use]
    pub const fn quiet(&self) -> bool {
        self.quiet
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(default_log_filter(), default_log_format())
    }
}
