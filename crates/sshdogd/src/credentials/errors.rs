//! Credential bootstrap failures.

use std::io;
use std::str::Utf8Error;

use thiserror::Error;

/// Errors raised while loading or generating credentials.
///
/// `HostKeyGeneration`, `NoAuthorizedKeys`, and `EmptyAuthorizedKeys` abort
/// startup; the remaining variants are reported for one candidate and then
/// skipped.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A candidate exists but could not be read.
    #[error("failed to read {name}: {source}")]
    Read {
        /// Candidate label.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A host key candidate is not a usable OpenSSH private key.
    #[error("failed to parse host key {name}: {source}")]
    InvalidHostKey {
        /// Candidate label.
        name: String,
        /// Parser error.
        #[source]
        source: ssh_key::Error,
    },
    /// A host key candidate is passphrase protected.
    #[error("host key {name} is encrypted")]
    EncryptedHostKey {
        /// Candidate label.
        name: String,
    },
    /// Random host key generation failed.
    #[error("failed to generate a random host key: {source}")]
    HostKeyGeneration {
        /// Generator error.
        #[source]
        source: ssh_key::Error,
    },
    /// An authorized keys file is not valid UTF-8.
    #[error("authorized keys file {name} is not valid UTF-8: {source}")]
    AuthorizedKeysNotUtf8 {
        /// Candidate label.
        name: String,
        /// Decoding error.
        #[source]
        source: Utf8Error,
    },
    /// One line of an authorized keys file could not be parsed.
    #[error("skipping {name} line {line}: {source}")]
    InvalidAuthorizedKey {
        /// Candidate label.
        name: String,
        /// One-based line number.
        line: usize,
        /// Parser error.
        #[source]
        source: ssh_key::Error,
    },
    /// None of the authorized keys candidates exist.
    #[error("no authorized keys found (searched: {searched})")]
    NoAuthorizedKeys {
        /// Comma-separated candidate labels.
        searched: String,
    },
    /// The selected authorized keys file holds no valid key.
    #[error("authorized keys file {name} contains no valid keys")]
    EmptyAuthorizedKeys {
        /// Candidate label.
        name: String,
    },
    /// A credential set was assembled without a host key.
    #[error("credential set requires at least one host key")]
    NoHostKey,
}

impl CredentialError {
    /// Whether the failure stops startup rather than skipping a candidate.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HostKeyGeneration { .. }
                | Self::NoAuthorizedKeys { .. }
                | Self::EmptyAuthorizedKeys { .. }
                | Self::NoHostKey
        )
    }
}
