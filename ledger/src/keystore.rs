//! RSA-2048 key pair lifecycle for a single node.
//!
//! The private key lives in a node-local PEM file named after the node's
//! stable identifier (never its listening port, see `DESIGN.md` §Open
//! Question 3); the public key is published into the shared
//! [`crate::user_directory::UserDirectory`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::user_directory::UserDirectory;

/// RSA modulus size mandated for every node key pair.
pub const RSA_KEY_BITS: usize = 2048;

#[derive(Debug)]
pub enum KeyStoreError {
    Rsa(rsa::Error),
    Pkcs8(rsa::pkcs8::Error),
    Io(std::io::Error),
    NoKeyLoaded,
    DirectoryUpdateFailed,
}

impl fmt::Display for KeyStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStoreError::Rsa(e) => write!(f, "rsa error: {e}"),
            KeyStoreError::Pkcs8(e) => write!(f, "key encoding error: {e}"),
            KeyStoreError::Io(e) => write!(f, "key file i/o error: {e}"),
            KeyStoreError::NoKeyLoaded => write!(f, "no key pair generated or loaded yet"),
            KeyStoreError::DirectoryUpdateFailed => write!(f, "user directory update failed"),
        }
    }
}

impl std::error::Error for KeyStoreError {}

impl From<rsa::Error> for KeyStoreError {
    fn from(e: rsa::Error) -> Self {
        KeyStoreError::Rsa(e)
    }
}

impl From<std::io::Error> for KeyStoreError {
    fn from(e: std::io::Error) -> Self {
        KeyStoreError::Io(e)
    }
}

/// Holds at most one RSA key pair in memory on behalf of the owning node.
#[derive(Default)]
pub struct KeyStore {
    private_key: Option<RsaPrivateKey>,
    public_key: Option<RsaPublicKey>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_file_path(data_dir: &Path, node_id: &str) -> PathBuf {
        data_dir.join(format!("private-{node_id}.pem"))
    }

    /// Generates a fresh key pair, retains it in memory, and returns the
    /// PEM-encoded public key.
    pub fn create_keys(&mut self) -> Result<String, KeyStoreError> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)?;
        let public_key = RsaPublicKey::from(&private_key);
        let pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(KeyStoreError::Pkcs8)?;
        self.private_key = Some(private_key);
        self.public_key = Some(public_key);
        Ok(pem)
    }

    /// Writes the in-memory private key to `data_dir/private-{node_id}.pem`
    /// atomically (write to a temp path, then rename) and publishes the
    /// public key into `user_dir`. Returns `false` on any I/O or directory
    /// update failure, per the boolean-success contract at this component's
    /// public edge.
    pub fn save_keys(&self, data_dir: &Path, email: &str, node_id: &str, user_dir: &dyn UserDirectory) -> bool {
        let (Some(private_key), Some(public_key)) = (&self.private_key, &self.public_key) else {
            return false;
        };
        let Ok(private_pem) = private_key.to_pkcs8_pem(LineEnding::LF) else {
            return false;
        };
        let Ok(public_pem) = public_key.to_public_key_pem(LineEnding::LF) else {
            return false;
        };

        let final_path = Self::key_file_path(data_dir, node_id);
        let tmp_path = final_path.with_extension("pem.tmp");
        if fs::write(&tmp_path, private_pem.as_bytes()).is_err() {
            return false;
        }
        if fs::rename(&tmp_path, &final_path).is_err() {
            return false;
        }

        user_dir.mark_has_wallet(email, &public_pem)
    }

    /// Reads the private key back from `data_dir/private-{node_id}.pem` and
    /// re-derives the public key. Returns `true` on success.
    pub fn load_keys(&mut self, data_dir: &Path, node_id: &str) -> bool {
        let path = Self::key_file_path(data_dir, node_id);
        let Ok(pem) = fs::read_to_string(&path) else {
            return false;
        };
        let Ok(private_key) = RsaPrivateKey::from_pkcs8_pem(&pem) else {
            return false;
        };
        let public_key = RsaPublicKey::from(&private_key);
        self.private_key = Some(private_key);
        self.public_key = Some(public_key);
        true
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    pub fn public_key_pem(&self) -> Result<String, KeyStoreError> {
        let public_key = self.public_key.as_ref().ok_or(KeyStoreError::NoKeyLoaded)?;
        public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(KeyStoreError::Pkcs8)
    }
}

/// Parses a PEM-encoded public key as published in the user directory.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, KeyStoreError> {
    RsaPublicKey::from_public_key_pem(pem).map_err(KeyStoreError::Pkcs8)
}
