//! Test doubles for the process and service seams.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use sshdog_config::{ListenPort, PortHandoff};

use crate::bootstrap::Diagnostics;
use crate::credentials::{CredentialError, CredentialSet, HostKey, HostKeyGenerator};
use crate::health::{HealthReporter, SilentHealthReporter};
use crate::process::{
    DaemonizeError, Daemonizer, DetachedRun, ShutdownError, ShutdownSignal, SupervisionOutcome,
};
use crate::service::{DaemonHandle, ListenerError, ServiceFactory, SshService};
use crate::telemetry::TelemetryError;

use super::RecordingHealthReporter;

/// Runs the detached work inline, or fails without running it.
#[derive(Clone, Default)]
pub struct TestDaemonizer {
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl TestDaemonizer {
    pub fn failing() -> Self {
        let daemonizer = Self::default();
        daemonizer.fail.store(true, Ordering::SeqCst);
        daemonizer
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for TestDaemonizer {
    fn daemonize(&self, run: DetachedRun) -> Result<SupervisionOutcome, DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DaemonizeError::System(daemonize_me::DaemonError::Fork));
        }
        Ok(run())
    }
}

#[derive(Clone)]
pub struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub fn triggered() -> Self {
        let signal = Self::new();
        signal.trigger();
        signal
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(())
    }
}

/// What a [`RecordingServiceFactory`] was asked to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedService {
    pub port: u16,
    pub host_keys: Vec<String>,
    pub authorized_keys: usize,
}

/// Records start requests and serves on an ephemeral loopback port instead
/// of the requested one.
#[derive(Clone, Default)]
pub struct RecordingServiceFactory {
    started: Arc<Mutex<Vec<StartedService>>>,
    fail: bool,
}

impl RecordingServiceFactory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn started(&self) -> Vec<StartedService> {
        self.started.lock().expect("factory mutex poisoned").clone()
    }
}

impl ServiceFactory for RecordingServiceFactory {
    fn listen_and_serve(
        &self,
        credentials: CredentialSet,
        port: ListenPort,
    ) -> Result<DaemonHandle, ListenerError> {
        if self.fail {
            return Err(ListenerError::BindTcp {
                addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port.get())),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            });
        }
        self.started
            .lock()
            .expect("factory mutex poisoned")
            .push(StartedService {
                port: port.get(),
                host_keys: credentials
                    .host_keys()
                    .iter()
                    .map(|key| key.label().to_owned())
                    .collect(),
                authorized_keys: credentials.authorized_keys().len(),
            });
        SshService::new(credentials).serve_on(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    }
}

/// Generator that always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingGenerator;

impl HostKeyGenerator for FailingGenerator {
    fn generate(&self) -> Result<HostKey, CredentialError> {
        Err(CredentialError::HostKeyGeneration {
            source: ssh_key::Error::AlgorithmUnknown,
        })
    }
}

/// Hands out the shared recorder, or a silent reporter when quiet.
#[derive(Clone)]
pub struct RecordingDiagnostics {
    reporter: Arc<RecordingHealthReporter>,
    requests: Arc<Mutex<Vec<bool>>>,
}

impl RecordingDiagnostics {
    pub fn new(reporter: Arc<RecordingHealthReporter>) -> Self {
        Self {
            reporter,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Quiet flags passed to `configure`, in call order.
    pub fn requests(&self) -> Vec<bool> {
        self.requests.lock().expect("diagnostics mutex poisoned").clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn configure(&self, quiet: bool) -> Result<Arc<dyn HealthReporter>, TelemetryError> {
        self.requests
            .lock()
            .expect("diagnostics mutex poisoned")
            .push(quiet);
        if quiet {
            Ok(Arc::new(SilentHealthReporter))
        } else {
            Ok(self.reporter.clone())
        }
    }
}

/// In-memory port handoff.
#[derive(Debug, Default)]
pub struct MemoryHandoff {
    value: Mutex<Option<String>>,
}

impl PortHandoff for MemoryHandoff {
    fn read(&self) -> Option<String> {
        self.value.lock().expect("handoff mutex poisoned").clone()
    }

    fn publish(&self, value: &str) {
        *self.value.lock().expect("handoff mutex poisoned") = Some(value.to_owned());
    }
}
