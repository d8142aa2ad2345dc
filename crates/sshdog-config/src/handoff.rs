//! Carries the resolved listen port across the detach boundary.
//!
//! The resolver publishes the port before the process daemonises; the start
//! sequence, which may run in the detached child, reads it back instead of
//! resolving again.

use std::env;

use crate::defaults::PORT_ENV_VAR;

/// Channel holding the resolved port as text.
pub trait PortHandoff: Send + Sync {
    /// Current value, if any.
    fn read(&self) -> Option<String>;

    /// Replaces the current value.
    fn publish(&self, value: &str);
}

/// Handoff through an inherited environment variable.
#[derive(Debug, Clone, Copy)]
pub struct EnvPortHandoff {
    variable: &'static str,
}

impl EnvPortHandoff {
    /// Uses `variable` as the channel.
    #[must_use]
    pub const fn new(variable: &'static str) -> Self {
        Self { variable }
    }

    /// Variable backing this channel.
    #[must_use]
    pub const fn variable(&self) -> &'static str {
        self.variable
    }
}

impl Default for EnvPortHandoff {
    fn default() -> Self {
        Self::new(PORT_ENV_VAR)
    }
}

impl PortHandoff for EnvPortHandoff {
    fn read(&self) -> Option<String> {
        env::var(self.variable).ok()
    }

    fn publish(&self, value: &str) {
        // SAFETY: publishing happens during bootstrap, before the listener,
        // signal watcher, or any other thread is started.
        unsafe { env::set_var(self.variable, value) };
    }
}
