//! Accept loop for the network service.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use sshdog_config::ListenPort;

use super::handle::{FinishOnDrop, Lifecycle};
use super::{
    ConnectionHandler, DaemonHandle, IdentificationHandler, ListenerError, SERVICE_TARGET,
};
use crate::credentials::CredentialSet;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
// Resource exhaustion clears once connections or memory are released.
const EXHAUSTION_ERRNOS: [i32; 4] = [libc::EMFILE, libc::ENFILE, libc::ENOBUFS, libc::ENOMEM];

/// Network service owning a credential set.
pub struct SshService {
    credentials: Arc<CredentialSet>,
    handler: Arc<dyn ConnectionHandler>,
}

impl SshService {
    /// Service using the default [`IdentificationHandler`].
    #[must_use]
    pub fn new(credentials: CredentialSet) -> Self {
        Self::with_handler(credentials, Arc::new(IdentificationHandler))
    }

    /// Service dispatching connections to `handler`.
    #[must_use]
    pub fn with_handler(credentials: CredentialSet, handler: Arc<dyn ConnectionHandler>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            handler,
        }
    }

    /// Credentials the service was built with.
    #[must_use]
    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    /// Binds `0.0.0.0:<port>` and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] if binding or thread creation fails.
    pub fn listen_and_serve(self, port: ListenPort) -> Result<DaemonHandle, ListenerError> {
        self.serve_on(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port.get())))
    }

    pub(crate) fn serve_on(self, addr: SocketAddr) -> Result<DaemonHandle, ListenerError> {
        let listener =
            TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let local_addr = listener.local_addr().ok();
        self.spawn_accept_loop(move || accept_connection(&listener), local_addr)
    }

    /// Runs the accept loop over `accept` on a dedicated thread.
    pub(crate) fn spawn_accept_loop<A>(
        self,
        accept: A,
        local_addr: Option<SocketAddr>,
    ) -> Result<DaemonHandle, ListenerError>
    where
        A: FnMut() -> io::Result<Option<TcpStream>> + Send + 'static,
    {
        let lifecycle = Lifecycle::new();
        let shared = Arc::clone(&lifecycle);
        thread::Builder::new()
            .name("sshdog-accept".to_owned())
            .spawn(move || {
                let _finish = FinishOnDrop(Arc::clone(&shared));
                self.run_accept_loop(accept, local_addr, &shared);
            })
            .map_err(|source| ListenerError::Spawn { source })?;

        Ok(DaemonHandle::new(lifecycle, local_addr))
    }

    fn run_accept_loop<A>(
        &self,
        mut accept: A,
        local_addr: Option<SocketAddr>,
        lifecycle: &Lifecycle,
    ) where
        A: FnMut() -> io::Result<Option<TcpStream>>,
    {
        info!(
            target: SERVICE_TARGET,
            addr = ?local_addr,
            host_keys = self.credentials.host_keys().len(),
            "service listening"
        );
        let mut last_error = None::<io::ErrorKind>;
        while lifecycle.is_running() {
            match accept() {
                Ok(Some(stream)) => {
                    last_error = None;
                    let handler = Arc::clone(&self.handler);
                    let credentials = Arc::clone(&self.credentials);
                    thread::spawn(move || handler.handle(stream, &credentials));
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(accept_error) if is_transient(&accept_error) => {
                    let kind = accept_error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: SERVICE_TARGET,
                            error = %accept_error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
                Err(accept_error) => {
                    error!(
                        target: SERVICE_TARGET,
                        error = %accept_error,
                        "unrecoverable accept error; stopping service"
                    );
                    break;
                }
            }
        }
        info!(target: SERVICE_TARGET, "service stopped accepting connections");
    }
}

/// Whether an accept failure is worth retrying.
pub(super) fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    ) || error
        .raw_os_error()
        .is_some_and(|code| EXHAUSTION_ERRNOS.contains(&code))
}

fn accept_connection(listener: &TcpListener) -> Result<Option<TcpStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
