//! Implements the daemonisation backend for the `sshdog` process.

use std::ffi::OsStr;
use std::path::PathBuf;

use daemonize_me::Daemon;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;
use super::supervisor::SupervisionOutcome;

/// Work to run once the process has detached.
pub type DetachedRun = Box<dyn FnOnce() -> SupervisionOutcome + Send + 'static>;

/// Abstraction over daemonisation strategies.
///
/// Implementations detach the process and then run `run` in the surviving
/// process. When detaching fails `run` is dropped without being called.
pub trait Daemonizer: Send + Sync {
    /// Detaches into the background and runs `run` there, returning its
    /// outcome to the surviving process.
    ///
    /// # Errors
    ///
    /// Returns a [`DaemonizeError`] when the process could not detach.
    fn daemonize(&self, run: DetachedRun) -> Result<SupervisionOutcome, DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// Daemoniser that delegates to `daemonize-me`.
#[derive(Debug, Clone)]
pub struct SystemDaemonizer {
    work_dir: PathBuf,
}

impl SystemDaemonizer {
    /// Daemoniser that changes into `/` after detaching.
    #[must_use]
    pub fn new() -> Self {
        Self::with_work_dir("/")
    }

    /// Daemoniser that changes into `work_dir` after detaching.
    #[must_use]
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl Default for SystemDaemonizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self, run: DetachedRun) -> Result<SupervisionOutcome, DaemonizeError> {
        info!(
            target: PROCESS_TARGET,
            work_dir = %self.work_dir.display(),
            "daemonising into background"
        );
        let mut daemon = Daemon::new();
        daemon = daemon.work_dir(&self.work_dir);
        daemon = daemon.name(OsStr::new(env!("CARGO_PKG_NAME")));
        daemon.start()?;
        info!(
            target: PROCESS_TARGET,
            "daemon process detached; continuing in child"
        );
        Ok(run())
    }
}
