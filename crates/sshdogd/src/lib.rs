//! A portable SSH daemon that configures itself from what it can find.
//!
//! When the working directory contains a `config` path the daemon runs
//! bundled: it locates a resource bundle (appended to the executable,
//! embedded at build time, or on disk) and takes its port, background mode,
//! quiet mode, host keys, and authorized keys from there. Otherwise it reads
//! `-d`/`-p` flags, the `SSHDOG_PORT` variable, and the invoking user's
//! `~/.ssh`.
//!
//! Startup is split in two. Resolution runs in the invoking process and
//! produces an [`EffectiveConfig`](sshdog_config::EffectiveConfig). The start
//! sequence (credentials, port, listener) is deferred into a [`StartFn`] that
//! a [`Supervisor`] runs either in place or after detaching. All diagnostics
//! flow through a [`HealthReporter`], so quiet mode swaps in a silent one.

mod bootstrap;
mod credentials;
mod health;
mod process;
mod service;
mod telemetry;

pub use bootstrap::{Diagnostics, LaunchReport, TelemetryDiagnostics, run};
pub use credentials::{
    AuthorizedKeys, BUNDLE_AUTHORIZED_KEYS, BUNDLE_HOST_KEYS, BundleCredentials,
    CredentialBootstrapper, CredentialError, CredentialSet, CredentialSource, GENERATED_LABEL,
    HOME_AUTHORIZED_KEYS, HOME_HOST_KEYS, HomeCredentials, HostKey, HostKeyGenerator,
    RandomHostKeyGenerator,
};
pub use health::{HealthReporter, SilentHealthReporter, StructuredHealthReporter};
pub use process::{
    DaemonizeError, Daemonizer, DetachedRun, LaunchError, LaunchMode, ShutdownError,
    ShutdownSignal, StartError, StartFn, SupervisionOutcome, Supervisor, SystemDaemonizer,
    SystemShutdownSignal,
};
pub use service::{
    ConnectionHandler, DaemonHandle, IdentificationHandler, ListenerError, SERVER_IDENTIFICATION,
    ServiceFactory, ServiceState, SshService, SshServiceFactory, StopHandle,
};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
