//! Test harness utilities shared by the daemon suites.

mod doubles;
mod keys;
mod launch_world;
mod reporter;

pub use doubles::{
    FailingGenerator, MemoryHandoff, RecordingDiagnostics, RecordingServiceFactory,
    TestDaemonizer, TestShutdownSignal,
};
pub use keys::{credential_set, openssh_private_key, openssh_public_line};
pub use launch_world::{LaunchWorld, StepResult};
pub use reporter::{HealthEvent, RecordingHealthReporter};

use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
