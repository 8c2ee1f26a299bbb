//! Container format models and constants

use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Magic bytes identifying an encrypted container file
pub const CONTAINER_MAGIC: &[u8; 4] = b"SCRB";

/// Current container version: PBKDF2 + AES-256-CBC + HMAC-SHA256 (encrypt-then-MAC)
pub const VERSION_CURRENT: u8 = 2;

/// Legacy container version: PBKDF2 + AES-256-CBC, no authentication tag. Read-only.
pub const VERSION_LEGACY: u8 = 1;

/// AES-CBC initialization vector length in bytes
pub const IV_LEN: usize = 16;

/// Key derivation salt length in bytes
pub const SALT_LEN: usize = 32;

/// HMAC-SHA256 tag length in bytes
pub const MAC_LEN: usize = 32;

// On-disk layout. Both versions share the prefix; v2 inserts the tag
// between the salt and the ciphertext.
//
//   [0..4)    magic "SCRB"
//   [4]       version byte
//   [5..21)   IV
//   [21..53)  salt
//   [53..85)  HMAC tag              (v2 only)
//   [53..)    ciphertext for v1     [85..) for v2
pub(crate) const IV_START: usize = 5;
pub(crate) const SALT_START: usize = IV_START + IV_LEN;
pub(crate) const MAC_START: usize = SALT_START + SALT_LEN;
pub(crate) const V1_BODY_START: usize = SALT_START + SALT_LEN;
pub(crate) const V2_BODY_START: usize = MAC_START + MAC_LEN;

/// Shortest input that can carry magic plus version
pub(crate) const MIN_HEADER_LEN: usize = 5;
/// Shortest well-formed v1 container (header plus a non-empty body)
pub(crate) const V1_MIN_LEN: usize = V1_BODY_START + 1;
/// Shortest well-formed v2 container
pub(crate) const V2_MIN_LEN: usize = V2_BODY_START + 1;

/// PBKDF2-HMAC-SHA256 parameters for key derivation
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    /// Iteration count
    pub iterations: u32,
    /// Derived output length in bytes
    pub output_len: usize,
}

impl KdfParams {
    /// Parameters for the current format: one 64-byte derivation split into
    /// cipher and MAC halves
    pub fn current() -> Self {
        Self {
            iterations: 100_000,
            output_len: 64,
        }
    }

    /// Parameters for the legacy format: a single 32-byte cipher key
    pub fn legacy() -> Self {
        Self {
            iterations: 10_000,
            output_len: 32,
        }
    }
}

/// Derived key material for the current format with secure memory handling
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    /// 64 bytes: AES-256 key followed by HMAC key
    bytes: [u8; 64],
}

impl KeyMaterial {
    /// Wrap raw derived bytes
    pub fn new(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// The AES-256 cipher key half
    pub fn enc_key(&self) -> &[u8] {
        &self.bytes[..32]
    }

    /// The HMAC-SHA256 key half
    pub fn mac_key(&self) -> &[u8] {
        &self.bytes[32..]
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Parsed container header for diagnostics. Carries no key material.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    /// Format version byte
    pub version: u8,
    /// Whether this version carries an authentication tag
    pub authenticated: bool,
    /// IV as lowercase hex
    pub iv: String,
    /// Salt as lowercase hex
    pub salt: String,
    /// Ciphertext length in bytes
    pub ciphertext_len: usize,
}
