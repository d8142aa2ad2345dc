//! Control handles shared between the accept loop and its callers.

use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Observable service states. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Accepting connections.
    Listening,
    /// Stop requested; the accept loop has not exited yet.
    Stopping,
    /// The accept loop has exited.
    Stopped,
}

/// State shared by every handle to one running service.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: Mutex<ServiceState>,
    changed: Condvar,
}

impl Lifecycle {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ServiceState::Listening),
            changed: Condvar::new(),
        })
    }

    // A poisoned lock still holds a valid state value; keep using it.
    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ServiceState {
        *self.lock()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state() == ServiceState::Listening
    }

    pub(crate) fn request_stop(&self) {
        let mut state = self.lock();
        if *state == ServiceState::Listening {
            *state = ServiceState::Stopping;
            self.changed.notify_all();
        }
    }

    pub(crate) fn finish(&self) {
        let mut state = self.lock();
        *state = ServiceState::Stopped;
        self.changed.notify_all();
    }

    pub(crate) fn wait_until(&self, done: impl Fn(ServiceState) -> bool) {
        let mut state = self.lock();
        while !done(*state) {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks the lifecycle stopped when dropped, including during unwinding, so
/// a panicking accept loop never leaves waiters blocked.
pub(crate) struct FinishOnDrop(pub(crate) Arc<Lifecycle>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Wait/stop control pair returned by a successful start.
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    lifecycle: Arc<Lifecycle>,
    local_addr: Option<SocketAddr>,
}

impl DaemonHandle {
    pub(crate) fn new(lifecycle: Arc<Lifecycle>, local_addr: Option<SocketAddr>) -> Self {
        Self {
            lifecycle,
            local_addr,
        }
    }

    /// Blocks until the service has stopped. Returns immediately if it
    /// already has.
    pub fn wait(&self) {
        self.lifecycle
            .wait_until(|state| state == ServiceState::Stopped);
    }

    /// Requests termination. Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        self.lifecycle.request_stop();
    }

    /// Detached stop capability for another thread.
    #[must_use]
    pub fn stopper(&self) -> StopHandle {
        StopHandle {
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    /// Address the listener is bound to, when known.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// Stop-only view of a [`DaemonHandle`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    lifecycle: Arc<Lifecycle>,
}

impl StopHandle {
    /// Requests termination; idempotent.
    pub fn stop(&self) {
        self.lifecycle.request_stop();
    }
}
