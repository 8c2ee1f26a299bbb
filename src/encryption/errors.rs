//! Container error types

use thiserror::Error;

/// Errors that can occur while sealing or opening containers
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Missing or short header, wrong magic, or an unknown version byte
    #[error("Not a valid encrypted container")]
    CorruptFormat,

    /// Tag mismatch, bad padding, or undecodable plaintext. Deliberately
    /// indistinguishable from a wrong password.
    #[error("Wrong password or corrupted data")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Result type alias for container operations
pub type EncryptionResult<T> = Result<T, EncryptionError>;
