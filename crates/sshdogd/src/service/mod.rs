//! The network service: a TCP listener owning the resolved credentials.
//!
//! [`SshService::listen_and_serve`] binds the port and accepts connections on
//! a background thread, handing each one to a [`ConnectionHandler`]. Callers
//! control the running service through the returned [`DaemonHandle`].

mod errors;
mod handle;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

use crate::credentials::CredentialSet;
use sshdog_config::ListenPort;

pub use self::errors::ListenerError;
pub use self::handle::{DaemonHandle, ServiceState, StopHandle};
pub use self::handler::{ConnectionHandler, IdentificationHandler, SERVER_IDENTIFICATION};
pub use self::listener::SshService;
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Starts a network service for a credential set.
///
/// The production factory binds all interfaces; tests substitute their own.
pub trait ServiceFactory: Send + Sync {
    /// Binds `port` and begins serving in the background.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the listener cannot be started.
    fn listen_and_serve(
        &self,
        credentials: CredentialSet,
        port: ListenPort,
    ) -> Result<DaemonHandle, ListenerError>;
}

/// Factory for [`SshService`] listeners on `0.0.0.0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshServiceFactory;

impl ServiceFactory for SshServiceFactory {
    fn listen_and_serve(
        &self,
        credentials: CredentialSet,
        port: ListenPort,
    ) -> Result<DaemonHandle, ListenerError> {
        SshService::new(credentials).listen_and_serve(port)
    }
}
