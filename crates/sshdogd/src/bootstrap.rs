//! Daemon bootstrap orchestration.
//!
//! [`run`] wires the production collaborators and hands them to the same
//! sequence the tests drive through `run_with`: detect the mode, resolve the
//! configuration, select diagnostics, then supervise the deferred start.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use sshdog_config::{
    BUNDLE_NAME, BundleLocator, EffectiveConfig, EnvPortHandoff, ExecutionMode, ListenPort,
    LoggingConfig, PortHandoff, Resolution, UnbundledArgs, bundled_positional, resolve_bundled,
    resolve_unbundled,
};

use crate::credentials::{
    BundleCredentials, CredentialBootstrapper, CredentialSource, HomeCredentials,
    HostKeyGenerator, RandomHostKeyGenerator,
};
use crate::health::{HealthReporter, SilentHealthReporter, StructuredHealthReporter};
use crate::process::{
    Daemonizer, LaunchError, LaunchMode, PROCESS_TARGET, ShutdownSignal, StartError, StartFn,
    SupervisionOutcome, Supervisor, SystemDaemonizer, SystemShutdownSignal,
};
use crate::service::{ServiceFactory, SshServiceFactory};
use crate::telemetry::{self, TelemetryError};

/// Selects where diagnostics go once the quiet setting is known.
pub trait Diagnostics: Send + Sync {
    /// Initialises sinks and returns the reporter for the rest of the
    /// process.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError`] when the sinks cannot be installed.
    fn configure(&self, quiet: bool) -> Result<Arc<dyn HealthReporter>, TelemetryError>;
}

/// Diagnostics backed by the global `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryDiagnostics {
    logging: LoggingConfig,
}

impl TelemetryDiagnostics {
    /// Uses `logging` for the subscriber.
    #[must_use]
    pub const fn new(logging: LoggingConfig) -> Self {
        Self { logging }
    }
}

impl Diagnostics for TelemetryDiagnostics {
    fn configure(&self, quiet: bool) -> Result<Arc<dyn HealthReporter>, TelemetryError> {
        telemetry::initialise(&self.logging.clone().with_quiet(quiet))?;
        if quiet {
            Ok(Arc::new(SilentHealthReporter))
        } else {
            Ok(Arc::new(StructuredHealthReporter::new()))
        }
    }
}

/// Summary of a launch, used to pick the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchReport {
    /// Mode the process ran in.
    pub mode: ExecutionMode,
    /// Settings it ran with.
    pub config: EffectiveConfig,
    /// How supervision ended.
    pub outcome: SupervisionOutcome,
}

impl LaunchReport {
    /// Whether the process should exit unsuccessfully.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.outcome == SupervisionOutcome::Aborted
    }
}

/// Process inputs normally read from the environment.
pub(crate) struct LaunchInputs {
    pub(crate) args: Vec<OsString>,
    pub(crate) workdir: PathBuf,
    pub(crate) locator: BundleLocator,
    pub(crate) handoff: Arc<dyn PortHandoff>,
    pub(crate) ssh_dir: Option<PathBuf>,
}

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to start the network service.
pub(crate) struct ServiceDeps<F, G, T> {
    pub(crate) factory: F,
    pub(crate) generator: G,
    pub(crate) diagnostics: T,
}

/// Collaborators required to launch the daemon.
pub(crate) struct LaunchPlan<D, S, F, G, T> {
    pub(crate) inputs: LaunchInputs,
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<F, G, T>,
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when arguments are rejected, the working
/// directory is unreadable, a required bundle is missing, or telemetry cannot
/// be installed. A failed start sequence is not an error here; it shows up as
/// [`SupervisionOutcome::Aborted`] in the report.
pub fn run() -> Result<LaunchReport, LaunchError> {
    let workdir = env::current_dir().map_err(|source| LaunchError::WorkingDirectory { source })?;
    let plan = LaunchPlan {
        inputs: LaunchInputs {
            args: env::args_os().collect(),
            locator: BundleLocator::system(&workdir),
            workdir,
            handoff: Arc::new(EnvPortHandoff::default()),
            ssh_dir: HomeCredentials::default_dir(),
        },
        process: ProcessControl {
            daemonizer: SystemDaemonizer::new(),
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            factory: SshServiceFactory,
            generator: RandomHostKeyGenerator,
            diagnostics: TelemetryDiagnostics::new(LoggingConfig::from_env()),
        },
    };
    run_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_with<D, S, F, G, T>(
    plan: LaunchPlan<D, S, F, G, T>,
) -> Result<LaunchReport, LaunchError>
where
    D: Daemonizer,
    S: ShutdownSignal + 'static,
    F: ServiceFactory + 'static,
    G: HostKeyGenerator + 'static,
    T: Diagnostics,
{
    let LaunchPlan {
        inputs,
        process,
        services,
    } = plan;
    let ServiceDeps {
        factory,
        generator,
        diagnostics,
    } = services;

    let mode = ExecutionMode::detect(&inputs.workdir);
    let prepared = match mode {
        ExecutionMode::Unbundled => prepare_unbundled(&inputs, &diagnostics)?,
        ExecutionMode::Bundled => prepare_bundled(&inputs, &diagnostics)?,
    };
    let Prepared {
        resolution,
        reporter,
        source,
        port,
    } = prepared;
    info!(
        target: PROCESS_TARGET,
        ?mode,
        "starting sshdog"
    );

    let config = resolution.config;
    let start = start_sequence(source, port, factory, generator, Arc::clone(&reporter));
    let supervisor = Supervisor::new(
        LaunchMode::from_daemonize(config.daemonize),
        process.daemonizer,
        process.shutdown,
        reporter,
    );
    let outcome = supervisor.supervise(start);
    Ok(LaunchReport {
        mode,
        config,
        outcome,
    })
}

struct Prepared {
    resolution: Resolution,
    reporter: Arc<dyn HealthReporter>,
    source: Box<dyn CredentialSource>,
    port: PortPlan,
}

/// Where the start sequence takes its port from.
enum PortPlan {
    Fixed(ListenPort),
    // Read back after detaching so the child honours what the parent
    // resolved.
    Handoff(Arc<dyn PortHandoff>),
}

impl PortPlan {
    fn resolve(&self) -> Result<ListenPort, StartError> {
        match self {
            Self::Fixed(port) => Ok(*port),
            Self::Handoff(handoff) => {
                let value = handoff.read().ok_or(StartError::MissingPortHandoff)?;
                value
                    .parse()
                    .map_err(|source| StartError::PortHandoff { source })
            }
        }
    }
}

fn prepare_unbundled(
    inputs: &LaunchInputs,
    diagnostics: &impl Diagnostics,
) -> Result<Prepared, LaunchError> {
    let args = UnbundledArgs::try_parse_args(inputs.args.iter().cloned())?;
    let resolution = resolve_unbundled(&args, inputs.handoff.as_ref());
    let reporter = diagnostics.configure(false)?;
    reporter.config_resolved(ExecutionMode::Unbundled, &resolution);
    Ok(Prepared {
        resolution,
        reporter,
        source: Box::new(HomeCredentials::new(inputs.ssh_dir.clone())),
        port: PortPlan::Handoff(Arc::clone(&inputs.handoff)),
    })
}

fn prepare_bundled(
    inputs: &LaunchInputs,
    diagnostics: &impl Diagnostics,
) -> Result<Prepared, LaunchError> {
    // Attempts are held back until the quiet setting is known.
    let mut attempts = Vec::new();
    let located = inputs
        .locator
        .locate_with(BUNDLE_NAME, |attempt| attempts.push(attempt));
    let bundle = match located {
        Ok(bundle) => bundle,
        Err(source) => {
            let reporter = diagnostics.configure(false)?;
            for attempt in &attempts {
                reporter.bundle_attempt(attempt);
            }
            reporter.bundle_missing(&source);
            return Err(LaunchError::BundleMissing { source });
        }
    };

    let positional = bundled_positional(&inputs.args);
    let resolution = resolve_bundled(positional.as_deref(), &bundle);
    let reporter = diagnostics.configure(resolution.config.quiet)?;
    for attempt in &attempts {
        reporter.bundle_attempt(attempt);
    }
    reporter.config_resolved(ExecutionMode::Bundled, &resolution);
    let port = PortPlan::Fixed(resolution.config.port);
    Ok(Prepared {
        resolution,
        reporter,
        source: Box::new(BundleCredentials::new(bundle)),
        port,
    })
}

fn start_sequence<F, G>(
    source: Box<dyn CredentialSource>,
    port: PortPlan,
    factory: F,
    generator: G,
    reporter: Arc<dyn HealthReporter>,
) -> StartFn
where
    F: ServiceFactory + 'static,
    G: HostKeyGenerator + 'static,
{
    Box::new(move || {
        let credentials =
            CredentialBootstrapper::new(source.as_ref(), &generator, reporter.as_ref())
                .resolve()?;
        let port = port.resolve()?;
        let handle = factory.listen_and_serve(credentials, port)?;
        reporter.service_listening(port);
        Ok(handle)
    })
}
