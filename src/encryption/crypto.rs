//! Cryptographic operations for sealing and opening containers

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::errors::{EncryptionError, EncryptionResult};
use super::models::{
    ContainerInfo, KdfParams, KeyMaterial, CONTAINER_MAGIC, IV_LEN, IV_START, MAC_START,
    MIN_HEADER_LEN, SALT_LEN, SALT_START, V1_BODY_START, V1_MIN_LEN, V2_BODY_START, V2_MIN_LEN,
    VERSION_CURRENT, VERSION_LEGACY,
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Generate a random IV for encryption
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// Generate a random salt for key derivation
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive raw key bytes from a password using PBKDF2-HMAC-SHA256
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; params.output_len]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, params.iterations, &mut key);
    key
}

/// Derive the current-format key material (cipher and MAC halves)
pub fn derive_key_material(password: &str, salt: &[u8]) -> KeyMaterial {
    let raw = derive_key(password, salt, &KdfParams::current());
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&raw);
    KeyMaterial::new(bytes)
}

/// HMAC-SHA256 over the authenticated container fields (encrypt-then-MAC).
/// The version byte is bound into the tag so a downgraded header fails to
/// verify.
fn compute_tag(
    mac_key: &[u8],
    version: u8,
    iv: &[u8],
    salt: &[u8],
    ciphertext: &[u8],
) -> EncryptionResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;
    mac.update(&[version]);
    mac.update(iv);
    mac.update(salt);
    mac.update(ciphertext);
    Ok(mac.finalize().into_bytes().into())
}

/// Encrypt plaintext into a current-version container.
///
/// Fresh IV and salt every call, so sealing the same document twice
/// produces different bytes.
pub fn seal(plaintext: &str, password: &str) -> EncryptionResult<Vec<u8>> {
    let iv = generate_iv();
    let salt = generate_salt();
    let keys = derive_key_material(password, &salt);

    let ciphertext = Aes256CbcEnc::new_from_slices(keys.enc_key(), &iv)
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    let tag = compute_tag(keys.mac_key(), VERSION_CURRENT, &iv, &salt, &ciphertext)?;

    let mut out = Vec::with_capacity(V2_BODY_START + ciphertext.len());
    out.extend_from_slice(CONTAINER_MAGIC);
    out.push(VERSION_CURRENT);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&tag);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a container with the given password.
///
/// Dispatches on the version byte: v2 verifies the tag before any
/// decryption; v1 is the legacy unauthenticated layout, accepted read-only.
pub fn open(data: &[u8], password: &str) -> EncryptionResult<String> {
    if data.len() < MIN_HEADER_LEN || data[..4] != CONTAINER_MAGIC[..] {
        return Err(EncryptionError::CorruptFormat);
    }
    match data[4] {
        VERSION_CURRENT => open_v2(data, password),
        VERSION_LEGACY => open_v1(data, password),
        _ => Err(EncryptionError::CorruptFormat),
    }
}

fn open_v2(data: &[u8], password: &str) -> EncryptionResult<String> {
    if data.len() < V2_MIN_LEN {
        return Err(EncryptionError::CorruptFormat);
    }
    let iv = &data[IV_START..SALT_START];
    let salt = &data[SALT_START..MAC_START];
    let tag = &data[MAC_START..V2_BODY_START];
    let ciphertext = &data[V2_BODY_START..];

    let keys = derive_key_material(password, salt);
    let expected = compute_tag(keys.mac_key(), VERSION_CURRENT, iv, salt, ciphertext)
        .map_err(|_| EncryptionError::AuthenticationFailed)?;
    if expected.as_slice().ct_eq(tag).unwrap_u8() != 1 {
        return Err(EncryptionError::AuthenticationFailed);
    }

    let plaintext = Aes256CbcDec::new_from_slices(keys.enc_key(), iv)
        .map_err(|_| EncryptionError::AuthenticationFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EncryptionError::AuthenticationFailed)?;
    String::from_utf8(plaintext).map_err(|_| EncryptionError::AuthenticationFailed)
}

// The v1 layout carries no tag, so a wrong password surfaces as a padding
// or UTF-8 failure. All of those collapse to AuthenticationFailed; a caller
// cannot tell tampering from a mistyped password on any version.
fn open_v1(data: &[u8], password: &str) -> EncryptionResult<String> {
    if data.len() < V1_MIN_LEN {
        return Err(EncryptionError::CorruptFormat);
    }
    let iv = &data[IV_START..SALT_START];
    let salt = &data[SALT_START..V1_BODY_START];
    let ciphertext = &data[V1_BODY_START..];

    let key = derive_key(password, salt, &KdfParams::legacy());
    let plaintext = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|_| EncryptionError::AuthenticationFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EncryptionError::AuthenticationFailed)?;
    String::from_utf8(plaintext).map_err(|_| EncryptionError::AuthenticationFailed)
}

/// Check whether bytes look like an encrypted container
pub fn is_container(data: &[u8]) -> bool {
    data.len() >= MIN_HEADER_LEN && data[..4] == CONTAINER_MAGIC[..]
}

/// Parse the public header fields of a container for diagnostics
pub fn container_info(data: &[u8]) -> EncryptionResult<ContainerInfo> {
    if !is_container(data) {
        return Err(EncryptionError::CorruptFormat);
    }
    match data[4] {
        VERSION_CURRENT if data.len() >= V2_MIN_LEN => Ok(ContainerInfo {
            version: VERSION_CURRENT,
            authenticated: true,
            iv: hex::encode(&data[IV_START..SALT_START]),
            salt: hex::encode(&data[SALT_START..MAC_START]),
            ciphertext_len: data.len() - V2_BODY_START,
        }),
        VERSION_LEGACY if data.len() >= V1_MIN_LEN => Ok(ContainerInfo {
            version: VERSION_LEGACY,
            authenticated: false,
            iv: hex::encode(&data[IV_START..SALT_START]),
            salt: hex::encode(&data[SALT_START..V1_BODY_START]),
            ciphertext_len: data.len() - V1_BODY_START,
        }),
        _ => Err(EncryptionError::CorruptFormat),
    }
}
