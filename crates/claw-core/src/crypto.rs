//! Primitive layer under the envelope format: Argon2id key derivation,
//! OS-backed salt/nonce generation and ChaCha20-Poly1305 seal/open.
//!
//! Nothing here touches the filesystem. Derived keys live in [`Zeroizing`]
//! buffers and are dropped at the end of the calling operation.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::StoreError;

pub const KDF_TIME_COST: u32 = 3;
pub const KDF_MEMORY_COST: u32 = 65536; // 64MB
pub const KDF_PARALLELISM: u32 = 4;
pub const DERIVED_KEY_LEN: usize = 32;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

pub type DerivedKey = Zeroizing<[u8; DERIVED_KEY_LEN]>;

/// Argon2id cost parameters. Validated once at construction.
#[derive(Debug, Clone)]
pub struct KdfParams {
    params: Params,
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, StoreError> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(DERIVED_KEY_LEN))
            .map_err(|e| StoreError::KeyDerivation(format!("argon2 params: {e}")))?;
        Ok(Self { params })
    }

    /// Weakest cost argon2 accepts (8 KiB, one pass, one lane). Offers no
    /// brute-force resistance; test fixtures only.
    pub fn minimum_cost_insecure() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, 1, 1, Some(DERIVED_KEY_LEN))
                .expect("static argon2 params are always valid"),
        }
    }

    pub fn memory_kib(&self) -> u32 {
        self.params.m_cost()
    }

    pub fn iterations(&self) -> u32 {
        self.params.t_cost()
    }

    pub fn parallelism(&self) -> u32 {
        self.params.p_cost()
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        let params = Params::new(
            KDF_MEMORY_COST,
            KDF_TIME_COST,
            KDF_PARALLELISM,
            Some(DERIVED_KEY_LEN),
        )
        .expect("static argon2 params are always valid");
        Self { params }
    }
}

/// Derives the 32-byte envelope key. Deterministic in (password, salt, params).
///
/// With a 16-byte salt and validated params argon2 has no failing input; the
/// error arm exists only to avoid a panic path.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<DerivedKey, StoreError> {
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.params.clone());
    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    argon
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| StoreError::KeyDerivation(format!("argon2 derive: {e}")))?;
    Ok(key)
}

pub fn generate_salt() -> Result<[u8; SALT_LEN], StoreError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| StoreError::RandomUnavailable(e.to_string()))?;
    Ok(salt)
}

pub fn generate_nonce() -> Result<[u8; NONCE_LEN], StoreError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| StoreError::RandomUnavailable(e.to_string()))?;
    Ok(nonce)
}

/// Returns ciphertext with the 16-byte tag appended. No associated data.
pub fn seal(key: &DerivedKey, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
    let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| StoreError::Cipher(format!("creating cipher: {e}")))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| StoreError::Cipher(format!("encrypt: {e}")))
}

pub fn open(key: &DerivedKey, nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
    let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| StoreError::Cipher(format!("creating cipher: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| StoreError::AuthenticationFailed)
}
