//! Host keys, authorized keys, and the set handed to the service.

use std::fmt;
use std::str;

use rand::rngs::OsRng;
use ssh_key::authorized_keys::Entry;
use ssh_key::{Algorithm, HashAlg, PrivateKey, PublicKey};

use super::CredentialError;

/// Label given to keys produced by a [`HostKeyGenerator`].
pub const GENERATED_LABEL: &str = "generated";

/// A private key the service presents to clients.
#[derive(Clone)]
pub struct HostKey {
    label: String,
    key: PrivateKey,
}

impl HostKey {
    /// Parses an unencrypted OpenSSH private key.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidHostKey`] for unparsable input and
    /// [`CredentialError::EncryptedHostKey`] for passphrase protected keys.
    pub fn parse(label: &str, bytes: &[u8]) -> Result<Self, CredentialError> {
        let key = PrivateKey::from_openssh(bytes).map_err(|source| {
            CredentialError::InvalidHostKey {
                name: label.to_owned(),
                source,
            }
        })?;
        if key.is_encrypted() {
            return Err(CredentialError::EncryptedHostKey {
                name: label.to_owned(),
            });
        }
        Ok(Self::from_private(label, key))
    }

    /// Wraps an already decoded key.
    #[must_use]
    pub fn from_private(label: &str, key: PrivateKey) -> Self {
        Self {
            label: label.to_owned(),
            key,
        }
    }

    /// Where the key came from.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Key algorithm, e.g. `ssh-ed25519`.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    /// SHA-256 fingerprint of the public half.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.key.public_key().fingerprint(HashAlg::Sha256).to_string()
    }

    /// The decoded private key.
    #[must_use]
    pub const fn private_key(&self) -> &PrivateKey {
        &self.key
    }
}

impl fmt::Debug for HostKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HostKey")
            .field("label", &self.label)
            .field("algorithm", &self.algorithm().as_str())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Public keys permitted to authenticate.
#[derive(Debug, Clone, Default)]
pub struct AuthorizedKeys {
    keys: Vec<PublicKey>,
}

impl AuthorizedKeys {
    /// Parses authorized_keys text, skipping blank lines and comments.
    ///
    /// Lines that fail to parse are returned alongside the keys that did so
    /// the caller can report them.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::AuthorizedKeysNotUtf8`] when `bytes` is not
    /// text.
    pub fn parse(
        label: &str,
        bytes: &[u8],
    ) -> Result<(Self, Vec<CredentialError>), CredentialError> {
        let text = str::from_utf8(bytes).map_err(|source| CredentialError::AuthorizedKeysNotUtf8 {
            name: label.to_owned(),
            source,
        })?;

        let mut keys = Vec::new();
        let mut skipped = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<Entry>() {
                Ok(entry) => keys.push(entry.public_key().clone()),
                Err(source) => skipped.push(CredentialError::InvalidAuthorizedKey {
                    name: label.to_owned(),
                    line: index + 1,
                    source,
                }),
            }
        }
        Ok((Self { keys }, skipped))
    }

    /// Whether `candidate` matches a listed key, ignoring comments.
    #[must_use]
    pub fn permits(&self, candidate: &PublicKey) -> bool {
        self.keys
            .iter()
            .any(|key| key.key_data() == candidate.key_data())
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over the keys.
    pub fn iter(&self) -> impl Iterator<Item = &PublicKey> {
        self.keys.iter()
    }
}

/// Host keys plus authorized keys for one service.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    host_keys: Vec<HostKey>,
    authorized_keys: AuthorizedKeys,
}

impl CredentialSet {
    /// Builds a set, refusing one that could never accept a session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NoHostKey`] for an empty host key list and
    /// [`CredentialError::EmptyAuthorizedKeys`] for an empty key set.
    pub fn new(
        host_keys: Vec<HostKey>,
        authorized_keys: AuthorizedKeys,
    ) -> Result<Self, CredentialError> {
        if host_keys.is_empty() {
            return Err(CredentialError::NoHostKey);
        }
        if authorized_keys.is_empty() {
            return Err(CredentialError::EmptyAuthorizedKeys {
                name: "credential set".to_owned(),
            });
        }
        Ok(Self {
            host_keys,
            authorized_keys,
        })
    }

    /// Registered host keys; never empty.
    #[must_use]
    pub fn host_keys(&self) -> &[HostKey] {
        &self.host_keys
    }

    /// Authorized client keys; never empty.
    #[must_use]
    pub const fn authorized_keys(&self) -> &AuthorizedKeys {
        &self.authorized_keys
    }
}

/// Produces a host key when no candidate registered.
pub trait HostKeyGenerator: Send + Sync {
    /// Generates a fresh key.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::HostKeyGeneration`] on failure.
    fn generate(&self) -> Result<HostKey, CredentialError>;
}

/// Ed25519 keys from the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomHostKeyGenerator;

impl HostKeyGenerator for RandomHostKeyGenerator {
    fn generate(&self) -> Result<HostKey, CredentialError> {
        let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
            .map_err(|source| CredentialError::HostKeyGeneration { source })?;
        Ok(HostKey::from_private(GENERATED_LABEL, key))
    }
}
