//! Process control: daemonisation, shutdown signals, and supervision.

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod shutdown;
pub(crate) mod supervisor;

pub use daemonizer::{DaemonizeError, Daemonizer, DetachedRun, SystemDaemonizer};
pub use errors::{LaunchError, StartError};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use supervisor::{LaunchMode, StartFn, SupervisionOutcome, Supervisor};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
