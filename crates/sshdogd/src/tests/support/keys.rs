//! Freshly generated key material for fixtures.

use rand::rngs::OsRng;
use ssh_key::{Algorithm, LineEnding, PrivateKey};

use crate::credentials::{AuthorizedKeys, CredentialSet, HostKey};

fn generate() -> PrivateKey {
    PrivateKey::random(&mut OsRng, Algorithm::Ed25519).expect("generate ed25519 key")
}

/// An unencrypted OpenSSH private key.
pub fn openssh_private_key() -> String {
    generate()
        .to_openssh(LineEnding::LF)
        .expect("encode private key")
        .to_string()
}

/// One authorized_keys line.
pub fn openssh_public_line() -> String {
    generate()
        .public_key()
        .to_openssh()
        .expect("encode public key")
}

/// A complete credential set with one host key and one client key.
pub fn credential_set() -> CredentialSet {
    let host = HostKey::from_private("fixture", generate());
    let (keys, _) = AuthorizedKeys::parse("fixture", openssh_public_line().as_bytes())
        .expect("parse authorized keys");
    CredentialSet::new(vec![host], keys).expect("complete credential set")
}
