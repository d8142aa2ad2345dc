//! Host and client credentials for the network service.
//!
//! A [`CredentialBootstrapper`] walks the candidates of a
//! [`CredentialSource`]: every host key that parses is registered, with a
//! generated key standing in when none does, and the first authorized keys
//! candidate that exists supplies the client keys. Per-candidate problems are
//! reported and skipped; a missing or empty authorized keys file aborts.

mod errors;
mod keys;
mod sources;

pub use self::errors::CredentialError;
pub use self::keys::{
    AuthorizedKeys, CredentialSet, GENERATED_LABEL, HostKey, HostKeyGenerator,
    RandomHostKeyGenerator,
};
pub use self::sources::{
    BUNDLE_AUTHORIZED_KEYS, BUNDLE_HOST_KEYS, BundleCredentials, CredentialSource,
    HOME_AUTHORIZED_KEYS, HOME_HOST_KEYS, HomeCredentials,
};

use crate::health::HealthReporter;

/// Resolves a [`CredentialSet`] from one source.
pub struct CredentialBootstrapper<'a> {
    source: &'a dyn CredentialSource,
    generator: &'a dyn HostKeyGenerator,
    reporter: &'a dyn HealthReporter,
}

impl<'a> CredentialBootstrapper<'a> {
    /// Creates a bootstrapper.
    #[must_use]
    pub fn new(
        source: &'a dyn CredentialSource,
        generator: &'a dyn HostKeyGenerator,
        reporter: &'a dyn HealthReporter,
    ) -> Self {
        Self {
            source,
            generator,
            reporter,
        }
    }

    /// Loads host keys, then authorized keys.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`CredentialError`] when key generation fails or no
    /// usable authorized keys exist.
    pub fn resolve(&self) -> Result<CredentialSet, CredentialError> {
        let host_keys = self.host_keys()?;
        let authorized_keys = self.authorized_keys()?;
        CredentialSet::new(host_keys, authorized_keys)
    }

    fn host_keys(&self) -> Result<Vec<HostKey>, CredentialError> {
        let mut keys = Vec::new();
        for name in self.source.host_key_names() {
            let label = self.source.label(name);
            let Some(bytes) = self.read(name, &label) else {
                continue;
            };
            match HostKey::parse(&label, &bytes) {
                Ok(key) => {
                    self.reporter.host_key_added(&key);
                    keys.push(key);
                }
                Err(error) => self.reporter.credential_skipped(&error),
            }
        }

        if keys.is_empty() {
            let key = self.generator.generate()?;
            self.reporter.host_key_generated(&key);
            keys.push(key);
        }
        Ok(keys)
    }

    fn authorized_keys(&self) -> Result<AuthorizedKeys, CredentialError> {
        let names = self.source.authorized_key_names();
        for name in names {
            let label = self.source.label(name);
            let Some(bytes) = self.read(name, &label) else {
                continue;
            };
            let (keys, skipped) = match AuthorizedKeys::parse(&label, &bytes) {
                Ok(parsed) => parsed,
                Err(error) => {
                    self.reporter.credential_skipped(&error);
                    (AuthorizedKeys::default(), Vec::new())
                }
            };
            for error in &skipped {
                self.reporter.credential_skipped(error);
            }
            if keys.is_empty() {
                return Err(CredentialError::EmptyAuthorizedKeys { name: label });
            }
            self.reporter.authorized_keys_loaded(&label, keys.len());
            return Ok(keys);
        }

        let searched = names
            .iter()
            .map(|name| self.source.label(name))
            .collect::<Vec<_>>()
            .join(", ");
        Err(CredentialError::NoAuthorizedKeys { searched })
    }

    // Unreadable candidates count as absent once reported.
    fn read(&self, name: &str, label: &str) -> Option<Vec<u8>> {
        match self.source.read(name) {
            Ok(bytes) => bytes,
            Err(source) => {
                self.reporter.credential_skipped(&CredentialError::Read {
                    name: label.to_owned(),
                    source,
                });
                None
            }
        }
    }
}
