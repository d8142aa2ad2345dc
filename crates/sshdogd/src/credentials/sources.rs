//! Where credential candidates are read from.

use std::fs;
use std::io;
use std::path::PathBuf;

use sshdog_config::ResourceBundle;

/// Bundle entries tried as host keys, in registration order.
pub const BUNDLE_HOST_KEYS: [&str; 4] = [
    "ssh_host_dsa_key",
    "ssh_host_ecdsa_key",
    "ssh_host_rsa_key",
    "ssh_host_ed25519_key",
];
/// Bundle entry holding authorized keys.
pub const BUNDLE_AUTHORIZED_KEYS: [&str; 1] = ["authorized_keys"];
/// Files under `~/.ssh` tried as host keys.
pub const HOME_HOST_KEYS: [&str; 1] = ["id_rsa"];
/// Files under `~/.ssh` tried for authorized keys; the first present wins.
pub const HOME_AUTHORIZED_KEYS: [&str; 2] = ["authorized_keys", "id_rsa.pub"];

/// Named credential candidates.
pub trait CredentialSource: Send + Sync {
    /// Host key candidates, in order.
    fn host_key_names(&self) -> &[&'static str];

    /// Authorized keys candidates, in order.
    fn authorized_key_names(&self) -> &[&'static str];

    /// Human readable label for a candidate.
    fn label(&self, name: &str) -> String;

    /// Reads a candidate. `Ok(None)` means it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the candidate exists but cannot be read.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, io::Error>;
}

/// Candidates inside a located resource bundle.
#[derive(Debug, Clone)]
pub struct BundleCredentials {
    bundle: ResourceBundle,
}

impl BundleCredentials {
    /// Reads from `bundle`.
    #[must_use]
    pub const fn new(bundle: ResourceBundle) -> Self {
        Self { bundle }
    }
}

impl CredentialSource for BundleCredentials {
    fn host_key_names(&self) -> &[&'static str] {
        &BUNDLE_HOST_KEYS
    }

    fn authorized_key_names(&self) -> &[&'static str] {
        &BUNDLE_AUTHORIZED_KEYS
    }

    fn label(&self, name: &str) -> String {
        format!("{}:{name}", self.bundle.origin())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, io::Error> {
        Ok(self.bundle.bytes(name).ok().map(<[u8]>::to_vec))
    }
}

/// Candidates in the invoking user's `~/.ssh`.
#[derive(Debug, Clone)]
pub struct HomeCredentials {
    dir: Option<PathBuf>,
}

impl HomeCredentials {
    /// Reads from `dir`; `None` means no home directory is known and every
    /// candidate is absent.
    #[must_use]
    pub const fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// `~/.ssh` for the current user.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ssh"))
    }
}

impl CredentialSource for HomeCredentials {
    fn host_key_names(&self) -> &[&'static str] {
        &HOME_HOST_KEYS
    }

    fn authorized_key_names(&self) -> &[&'static str] {
        &HOME_AUTHORIZED_KEYS
    }

    fn label(&self, name: &str) -> String {
        self.dir.as_ref().map_or_else(
            || format!("~/.ssh/{name}"),
            |dir| dir.join(name).display().to_string(),
        )
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, io::Error> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        match fs::read(dir.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}
