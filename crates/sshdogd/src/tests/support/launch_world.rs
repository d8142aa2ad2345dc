//! Launch test world shared across BDD scenarios.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use sshdog_config::{BUNDLE_NAME, BundleLocator, PortHandoff, WorkingDirectory};

use crate::bootstrap::{
    LaunchInputs, LaunchPlan, LaunchReport, ProcessControl, ServiceDeps, run_with,
};
use crate::credentials::RandomHostKeyGenerator;
use crate::process::LaunchError;

use super::{
    MemoryHandoff, RecordingDiagnostics, RecordingHealthReporter, RecordingServiceFactory,
    TestDaemonizer, TestShutdownSignal, openssh_private_key, openssh_public_line,
};

pub type StepResult = Result<(), String>;

pub struct LaunchWorld {
    workdir: TempDir,
    ssh_dir: TempDir,
    handoff: Arc<MemoryHandoff>,
    reporter: Arc<RecordingHealthReporter>,
    diagnostics: RecordingDiagnostics,
    daemonizer: TestDaemonizer,
    factory: RecordingServiceFactory,
    result: Option<Result<LaunchReport, LaunchError>>,
}

impl Default for LaunchWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchWorld {
    pub fn new() -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        Self {
            workdir: TempDir::new().expect("create working directory"),
            ssh_dir: TempDir::new().expect("create ssh directory"),
            handoff: Arc::new(MemoryHandoff::default()),
            diagnostics: RecordingDiagnostics::new(Arc::clone(&reporter)),
            reporter,
            daemonizer: TestDaemonizer::default(),
            factory: RecordingServiceFactory::default(),
            result: None,
        }
    }

    pub fn write_ssh_file(&self, name: &str, contents: &str) -> StepResult {
        fs::write(self.ssh_dir.path().join(name), contents).map_err(|error| error.to_string())
    }

    pub fn write_bundle_entry(&self, name: &str, contents: &str) -> StepResult {
        let bundle = self.workdir.path().join(BUNDLE_NAME);
        fs::create_dir_all(&bundle).map_err(|error| error.to_string())?;
        fs::write(bundle.join(name), contents).map_err(|error| error.to_string())
    }

    pub fn write_bundle_host_key(&self, name: &str) -> StepResult {
        self.write_bundle_entry(name, &openssh_private_key())
    }

    pub fn write_bundle_authorized_key(&self) -> StepResult {
        self.write_bundle_entry("authorized_keys", &format!("{}\n", openssh_public_line()))
    }

    pub fn write_config_marker(&self) -> StepResult {
        fs::write(self.workdir.path().join(BUNDLE_NAME), b"").map_err(|error| error.to_string())
    }

    pub fn hand_off_port(&self, value: &str) {
        self.handoff.publish(value);
    }

    pub fn use_failing_daemonizer(&mut self) {
        self.daemonizer = TestDaemonizer::failing();
    }

    pub fn use_failing_factory(&mut self) {
        self.factory = RecordingServiceFactory::failing();
    }

    pub fn launch(&mut self, arguments: &str) -> StepResult {
        if self.result.is_some() {
            return Err("launch already recorded".to_owned());
        }
        let mut args = vec![OsString::from("sshdog")];
        args.extend(arguments.split_whitespace().map(OsString::from));
        let handoff: Arc<dyn PortHandoff> = self.handoff.clone();
        let plan = LaunchPlan {
            inputs: LaunchInputs {
                args,
                workdir: self.workdir.path().to_path_buf(),
                locator: BundleLocator::new(vec![Box::new(WorkingDirectory::new(
                    self.workdir.path(),
                ))]),
                handoff,
                ssh_dir: Some(self.ssh_dir.path().to_path_buf()),
            },
            process: ProcessControl {
                daemonizer: self.daemonizer.clone(),
                shutdown: TestShutdownSignal::triggered(),
            },
            services: ServiceDeps {
                factory: self.factory.clone(),
                generator: RandomHostKeyGenerator,
                diagnostics: self.diagnostics.clone(),
            },
        };
        self.result = Some(run_with(plan));
        Ok(())
    }

    pub fn report(&self) -> Result<&LaunchReport, String> {
        match &self.result {
            Some(Ok(report)) => Ok(report),
            Some(Err(error)) => Err(format!("launch failed: {error}")),
            None => Err("daemon was not launched".to_owned()),
        }
    }

    pub fn error(&self) -> Option<&LaunchError> {
        self.result.as_ref()?.as_ref().err()
    }

    pub fn reporter(&self) -> &RecordingHealthReporter {
        &self.reporter
    }

    pub fn diagnostics(&self) -> &RecordingDiagnostics {
        &self.diagnostics
    }

    pub fn daemonizer(&self) -> &TestDaemonizer {
        &self.daemonizer
    }

    pub fn factory(&self) -> &RecordingServiceFactory {
        &self.factory
    }
}
