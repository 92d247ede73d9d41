//! Loading of the Kafka cluster's public signing key.

use std::path::{Path, PathBuf};

use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use thiserror::Error;

/// Errors while loading the cluster public key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("unable to read key file {path}: {source}")]
    Io {
        /// Path of the key file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// The key file does not hold exactly one raw Ed25519 public key.
    #[error("key file {path} holds {len} bytes, expected {PUBLIC_KEY_LENGTH}")]
    InvalidLength {
        /// Path of the key file.
        path: PathBuf,
        /// Actual file size in bytes.
        len: usize,
    },

    /// The key bytes are not a valid Ed25519 public key.
    #[error("key file {path} does not hold a valid Ed25519 public key")]
    InvalidKey {
        /// Path of the key file.
        path: PathBuf,
    },
}

/// Reads a raw 32-byte Ed25519 public key file.
///
/// The file is read fully and closed before returning; callers cache the
/// parsed key for the lifetime of their verifier.
///
/// # Errors
///
/// Returns a [`KeyError`] when the file cannot be read, is not exactly 32
/// bytes long, or does not decode as an Ed25519 public key.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, KeyError> {
    let bytes = std::fs::read(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: [u8; PUBLIC_KEY_LENGTH] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength {
                path: path.to_path_buf(),
                len: bytes.len(),
            })?;

    VerifyingKey::from_bytes(&raw).map_err(|_| KeyError::InvalidKey {
        path: path.to_path_buf(),
    })
}
