//! Structured reporting for bootstrap and service lifecycle events.

use sshdog_config::{
    AttemptOutcome, BundleError, ExecutionMode, ListenPort, LocateAttempt, Resolution,
};

use crate::credentials::{CredentialError, HostKey};
use crate::process::{DaemonizeError, ShutdownError, StartError};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
///
/// Every diagnostic the daemon emits passes through this trait, so swapping
/// in [`SilentHealthReporter`] silences the process.
pub trait HealthReporter: Send + Sync {
    /// One bundle locate strategy finished.
    fn bundle_attempt(&self, attempt: &LocateAttempt);

    /// Every locate strategy came up empty.
    fn bundle_missing(&self, error: &BundleError);

    /// Configuration was resolved; rejected port candidates included.
    fn config_resolved(&self, mode: ExecutionMode, resolution: &Resolution);

    /// A host key candidate registered.
    fn host_key_added(&self, key: &HostKey);

    /// No candidate registered and a key was generated.
    fn host_key_generated(&self, key: &HostKey);

    /// A credential candidate was unusable and skipped.
    fn credential_skipped(&self, error: &CredentialError);

    /// Authorized keys were loaded from `source`.
    fn authorized_keys_loaded(&self, source: &str, count: usize);

    /// The listener is up.
    fn service_listening(&self, port: ListenPort);

    /// The start sequence failed; the process will not serve.
    fn start_aborted(&self, error: &StartError);

    /// The service stopped after running.
    fn service_stopped(&self);

    /// Detaching into the background failed.
    fn daemonize_failed(&self, error: &DaemonizeError);

    /// Shutdown signals will not be observed.
    fn shutdown_watch_failed(&self, error: &ShutdownError);
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bundle_attempt(&self, attempt: &LocateAttempt) {
        match &attempt.outcome {
            AttemptOutcome::Absent => tracing::debug!(
                target: HEALTH_TARGET,
                event = "bundle_attempt",
                strategy = attempt.strategy,
                "no bundle from strategy"
            ),
            AttemptOutcome::Failed(error) => tracing::warn!(
                target: HEALTH_TARGET,
                event = "bundle_attempt",
                strategy = attempt.strategy,
                error = %error,
                "bundle strategy failed"
            ),
            AttemptOutcome::Found(origin) => tracing::info!(
                target: HEALTH_TARGET,
                event = "bundle_attempt",
                strategy = attempt.strategy,
                origin = %origin,
                "resource bundle located"
            ),
        }
    }

    fn bundle_missing(&self, error: &BundleError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bundle_missing",
            error = %error,
            "resource bundle unavailable"
        );
    }

    fn config_resolved(&self, mode: ExecutionMode, resolution: &Resolution) {
        for rejected in &resolution.rejected {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "port_rejected",
                source = %rejected.source,
                error = %rejected.reason,
                "ignoring port candidate"
            );
        }
        tracing::info!(
            target: HEALTH_TARGET,
            event = "config_resolved",
            mode = ?mode,
            port = %resolution.config.port,
            port_source = %resolution.port_source,
            daemonize = resolution.config.daemonize,
            "configuration resolved"
        );
    }

    fn host_key_added(&self, key: &HostKey) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "host_key_added",
            source = key.label(),
            algorithm = %key.algorithm(),
            fingerprint = %key.fingerprint(),
            "host key registered"
        );
    }

    fn host_key_generated(&self, key: &HostKey) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "host_key_generated",
            algorithm = %key.algorithm(),
            fingerprint = %key.fingerprint(),
            "no host key registered; generated a random key"
        );
    }

    fn credential_skipped(&self, error: &CredentialError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "credential_skipped",
            error = %error,
            "skipping credential candidate"
        );
    }

    fn authorized_keys_loaded(&self, source: &str, count: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "authorized_keys_loaded",
            source,
            count,
            "authorized keys loaded"
        );
    }

    fn service_listening(&self, port: ListenPort) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_listening",
            port = %port,
            "listening"
        );
    }

    fn start_aborted(&self, error: &StartError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "start_aborted",
            error = %error,
            "service start aborted"
        );
    }

    fn service_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopped",
            "service stopped"
        );
    }

    fn daemonize_failed(&self, error: &DaemonizeError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "daemonize_failed",
            error = %error,
            "failed to detach into the background"
        );
    }

    fn shutdown_watch_failed(&self, error: &ShutdownError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "shutdown_watch_failed",
            error = %error,
            "shutdown signals will not be observed"
        );
    }
}

/// Reporter that discards every event. Selected by the bundle `quiet` entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentHealthReporter;

impl HealthReporter for SilentHealthReporter {
    fn bundle_attempt(&self, _attempt: &LocateAttempt) {}

    fn bundle_missing(&self, _error: &BundleError) {}

    fn config_resolved(&self, _mode: ExecutionMode, _resolution: &Resolution) {}

    fn host_key_added(&self, _key: &HostKey) {}

    fn host_key_generated(&self, _key: &HostKey) {}

    fn credential_skipped(&self, _error: &CredentialError) {}

    fn authorized_keys_loaded(&self, _source: &str, _count: usize) {}

    fn service_listening(&self, _port: ListenPort) {}

    fn start_aborted(&self, _error: &StartError) {}

    fn service_stopped(&self) {}

    fn daemonize_failed(&self, _error: &DaemonizeError) {}

    fn shutdown_watch_failed(&self, _error: &ShutdownError) {}
}
