//! Supervises the service start sequence in the foreground or background.

use std::sync::Arc;
use std::thread;

use tracing::info;

use crate::health::HealthReporter;
use crate::service::{DaemonHandle, StopHandle};

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, DetachedRun};
use super::errors::StartError;
use super::shutdown::{ShutdownError, ShutdownSignal};

/// Deferred start sequence: credentials, port, then the listener.
pub type StartFn = Box<dyn FnOnce() -> Result<DaemonHandle, StartError> + Send + 'static>;

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal.
    Foreground,
}

impl LaunchMode {
    /// Background when `daemonize` is set.
    #[must_use]
    pub const fn from_daemonize(daemonize: bool) -> Self {
        if daemonize {
            Self::Background
        } else {
            Self::Foreground
        }
    }
}

/// How supervision ended, as seen by the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionOutcome {
    /// The service ran and stopped.
    Completed,
    /// The start sequence failed before a handle existed.
    Aborted,
    /// Detaching failed, so the start sequence never ran.
    Detached,
}

/// Runs a start sequence under the configured launch mode.
pub struct Supervisor<D, S> {
    mode: LaunchMode,
    daemonizer: D,
    shutdown: S,
    reporter: Arc<dyn HealthReporter>,
}

impl<D, S> Supervisor<D, S>
where
    D: Daemonizer,
    S: ShutdownSignal + 'static,
{
    /// Creates a supervisor.
    #[must_use]
    pub fn new(
        mode: LaunchMode,
        daemonizer: D,
        shutdown: S,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            mode,
            daemonizer,
            shutdown,
            reporter,
        }
    }

    /// Runs `start`, then waits for the service to stop.
    ///
    /// In foreground mode the calling thread blocks until the service stops.
    /// In background mode the same sequence is handed to the daemoniser and
    /// its outcome is returned in the detached process. A detach failure is
    /// reported, the sequence never runs, and the result is
    /// [`SupervisionOutcome::Detached`].
    pub fn supervise(self, start: StartFn) -> SupervisionOutcome {
        let Self {
            mode,
            daemonizer,
            shutdown,
            reporter,
        } = self;
        info!(target: PROCESS_TARGET, ?mode, "supervising service start");
        match mode {
            LaunchMode::Foreground => run_service(start, shutdown, &reporter),
            LaunchMode::Background => {
                let detached_reporter = Arc::clone(&reporter);
                let run: DetachedRun =
                    Box::new(move || run_service(start, shutdown, &detached_reporter));
                match daemonizer.daemonize(run) {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        reporter.daemonize_failed(&error);
                        SupervisionOutcome::Detached
                    }
                }
            }
        }
    }
}

fn run_service<S>(
    start: StartFn,
    shutdown: S,
    reporter: &Arc<dyn HealthReporter>,
) -> SupervisionOutcome
where
    S: ShutdownSignal + 'static,
{
    let handle = match start() {
        Ok(handle) => handle,
        Err(error) => {
            reporter.start_aborted(&error);
            return SupervisionOutcome::Aborted;
        }
    };
    watch_shutdown(shutdown, handle.stopper(), Arc::clone(reporter));
    handle.wait();
    reporter.service_stopped();
    SupervisionOutcome::Completed
}

// The watcher outlives supervision when the service stops on its own; it
// stays parked on the signal source until the process exits.
fn watch_shutdown<S>(shutdown: S, stopper: StopHandle, reporter: Arc<dyn HealthReporter>)
where
    S: ShutdownSignal + 'static,
{
    let spawn_reporter = Arc::clone(&reporter);
    let spawned = thread::Builder::new()
        .name("sshdog-shutdown".to_owned())
        .spawn(move || match shutdown.wait() {
            Ok(()) => stopper.stop(),
            Err(error) => reporter.shutdown_watch_failed(&error),
        });
    if let Err(source) = spawned {
        spawn_reporter.shutdown_watch_failed(&ShutdownError::Watcher { source });
    }
}
