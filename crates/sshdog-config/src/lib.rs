//! Configuration inputs for the sshdog daemon.
//!
//! The daemon runs in one of two modes. When a `config` path exists in the
//! working directory it expects a [`ResourceBundle`] and reads its port,
//! daemon, and quiet settings from there; otherwise it takes `-d`/`-p` flags
//! and the `SSHDOG_PORT` environment variable. This crate owns the inputs for
//! both: bundle location, the command-line surface, port validation, and the
//! resolution rules that merge them into an [`EffectiveConfig`].

mod bundle;
mod cli;
mod defaults;
mod handoff;
mod logging;
mod port;
mod resolve;

use std::path::Path;

pub use bundle::{
    AppendedArchive, AttemptOutcome, BundleError, BundleLocator, BundleOrigin, EmbeddedBundle,
    LocateAttempt, LocateStrategy, ResourceBundle, WorkingDirectory,
};
pub use cli::{UnbundledArgs, bundled_positional};
pub use defaults::{
    BUNDLE_NAME, DEFAULT_BUNDLED_LISTEN_PORT, DEFAULT_BUNDLED_PORT, DEFAULT_LISTEN_PORT,
    DEFAULT_LOG_FILTER, DEFAULT_PORT, LOG_FILTER_ENV_VAR, LOG_FORMAT_ENV_VAR, PORT_ENV_VAR,
    default_log_filter, default_log_format,
};
pub use handoff::{EnvPortHandoff, PortHandoff};
pub use logging::{LogFormat, LogFormatParseError, LoggingConfig};
pub use port::{ListenPort, PortError};
pub use resolve::{
    DAEMON_ENTRY, EffectiveConfig, PORT_ENTRY, PortSource, QUIET_ENTRY, RejectedCandidate,
    Resolution, resolve_bundled, resolve_unbundled,
};

/// How the process sources its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Flags, environment, and `~/.ssh`.
    Unbundled,
    /// A located resource bundle.
    Bundled,
}

impl ExecutionMode {
    /// Bundled when `<workdir>/config` exists in any form.
    #[must_use]
    pub fn detect(workdir: &Path) -> Self {
        if workdir.join(BUNDLE_NAME).exists() {
            Self::Bundled
        } else {
            Self::Unbundled
        }
    }
}
