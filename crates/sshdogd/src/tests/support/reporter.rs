//! Test double for [`HealthReporter`] that records events for assertions.

use std::sync::Mutex;

use sshdog_config::{
    AttemptOutcome, BundleError, ExecutionMode, ListenPort, LocateAttempt, PortSource, Resolution,
};

use crate::credentials::{CredentialError, HostKey};
use crate::health::HealthReporter;
use crate::process::{DaemonizeError, ShutdownError, StartError};

/// Health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BundleAttempt {
        strategy: &'static str,
        found: bool,
    },
    BundleMissing,
    ConfigResolved {
        mode: ExecutionMode,
        port: u16,
        source: PortSource,
        rejected: usize,
    },
    HostKeyAdded(String),
    HostKeyGenerated,
    CredentialSkipped(String),
    AuthorizedKeysLoaded {
        source: String,
        count: usize,
    },
    ServiceListening(u16),
    StartAborted(String),
    ServiceStopped,
    DaemonizeFailed,
    ShutdownWatchFailed,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }

    pub fn count(&self, matches: impl Fn(&HealthEvent) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bundle_attempt(&self, attempt: &LocateAttempt) {
        self.record(HealthEvent::BundleAttempt {
            strategy: attempt.strategy,
            found: matches!(attempt.outcome, AttemptOutcome::Found(_)),
        });
    }

    fn bundle_missing(&self, _error: &BundleError) {
        self.record(HealthEvent::BundleMissing);
    }

    fn config_resolved(&self, mode: ExecutionMode, resolution: &Resolution) {
        self.record(HealthEvent::ConfigResolved {
            mode,
            port: resolution.config.port.get(),
            source: resolution.port_source,
            rejected: resolution.rejected.len(),
        });
    }

    fn host_key_added(&self, key: &HostKey) {
        self.record(HealthEvent::HostKeyAdded(key.label().to_owned()));
    }

    fn host_key_generated(&self, _key: &HostKey) {
        self.record(HealthEvent::HostKeyGenerated);
    }

    fn credential_skipped(&self, error: &CredentialError) {
        self.record(HealthEvent::CredentialSkipped(error.to_string()));
    }

    fn authorized_keys_loaded(&self, source: &str, count: usize) {
        self.record(HealthEvent::AuthorizedKeysLoaded {
            source: source.to_owned(),
            count,
        });
    }

    fn service_listening(&self, port: ListenPort) {
        self.record(HealthEvent::ServiceListening(port.get()));
    }

    fn start_aborted(&self, error: &StartError) {
        self.record(HealthEvent::StartAborted(error.to_string()));
    }

    fn service_stopped(&self) {
        self.record(HealthEvent::ServiceStopped);
    }

    fn daemonize_failed(&self, _error: &DaemonizeError) {
        self.record(HealthEvent::DaemonizeFailed);
    }

    fn shutdown_watch_failed(&self, _error: &ShutdownError) {
        self.record(HealthEvent::ShutdownWatchFailed);
    }
}
