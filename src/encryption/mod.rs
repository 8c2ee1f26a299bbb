//! Encrypted container format for password-protected documents
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 password-based key derivation
//! - AES-256-CBC encryption with an encrypt-then-MAC HMAC-SHA256 tag
//! - The versioned `SCRB` on-disk container layout (v2 current, v1 legacy
//!   read-only)

pub mod crypto;
pub mod errors;
pub mod models;

// Re-export commonly used types
pub use crypto::{
    container_info, derive_key, derive_key_material, generate_iv, generate_salt, is_container,
    open, seal,
};
pub use errors::{EncryptionError, EncryptionResult};
pub use models::{
    ContainerInfo, KdfParams, KeyMaterial, CONTAINER_MAGIC, IV_LEN, MAC_LEN, SALT_LEN,
    VERSION_CURRENT, VERSION_LEGACY,
};
