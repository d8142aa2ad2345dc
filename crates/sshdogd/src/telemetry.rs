//! Structured telemetry initialisation for the daemon.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use sshdog_config::{DEFAULT_LOG_FILTER, LogFormat, LoggingConfig};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber and later ones return a fresh [`TelemetryHandle`] without
/// touching global state. A quiet configuration installs the `off` filter.
/// An unparsable filter expression is replaced by [`DEFAULT_LOG_FILTER`] and
/// reported once the subscriber is live.
///
/// # Errors
///
/// Returns a [`TelemetryError`] when another subscriber is already
/// installed.
pub fn initialise(config: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

/// Filter for `config`, plus the parse error when the default stood in.
fn select_filter(
    config: &LoggingConfig,
) -> Result<(EnvFilter, Option<String>), TelemetryError> {
    match EnvFilter::try_new(config.filter()) {
        Ok(filter) => Ok((filter, None)),
        Err(rejected) => EnvFilter::try_new(DEFAULT_LOG_FILTER)
            .map(|filter| (filter, Some(rejected.to_string())))
            .map_err(|error| TelemetryError::Filter(error.to_string())),
    }
}

fn install_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let (filter, rejected) = select_filter(config)?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            // No colour codes outside interactive terminals.
            .with_ansi(io::stderr().is_terminal())
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    if let Some(error) = rejected {
        warn!(
            target: TELEMETRY_TARGET,
            filter = config.filter(),
            fallback = DEFAULT_LOG_FILTER,
            error = %error,
            "ignoring invalid log filter"
        );
    }
    Ok(())
}
