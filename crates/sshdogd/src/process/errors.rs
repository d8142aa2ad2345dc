//! Defines the error surface for daemon launch and service start.

use std::io;

use thiserror::Error;

use sshdog_config::{BundleError, PortError};

use crate::credentials::CredentialError;
use crate::service::ListenerError;
use crate::telemetry::TelemetryError;

/// Errors that abort the start sequence before a handle exists.
#[derive(Debug, Error)]
pub enum StartError {
    /// Credential bootstrap hit a fatal condition.
    #[error("credential bootstrap failed: {source}")]
    Credentials {
        /// Underlying credential error.
        #[source]
        source: CredentialError,
    },
    /// The port handed off through the environment was missing.
    #[error("port handoff value is not set")]
    MissingPortHandoff,
    /// The port handed off through the environment was invalid.
    #[error("port handoff value is invalid: {source}")]
    PortHandoff {
        /// Validation error.
        #[source]
        source: PortError,
    },
    /// The listener could not be started.
    #[error("network service failed to start: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

impl From<CredentialError> for StartError {
    fn from(source: CredentialError) -> Self {
        Self::Credentials { source }
    }
}

impl From<ListenerError> for StartError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

/// Errors surfaced while launching the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Unbundled command-line arguments were rejected.
    #[error("invalid arguments: {source}")]
    Arguments {
        /// Parser error, carrying help and version output as well.
        #[source]
        source: clap::Error,
    },
    /// The working directory could not be determined.
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Bundled mode was selected but no bundle could be located.
    #[error("resource bundle unavailable: {source}")]
    BundleMissing {
        /// Locator error.
        #[source]
        source: BundleError,
    },
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

impl From<clap::Error> for LaunchError {
    fn from(source: clap::Error) -> Self {
        Self::Arguments { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}
