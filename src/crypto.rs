//! Passphrase-based sealing of the vault file.
//!
//! Layout of a sealed blob:
//!
//! ```text
//! tag "BLM1" | m_cost u32le | t_cost u32le | p_cost u32le | salt (16) | nonce (12) | ciphertext
//! ```
//!
//! Everything before the ciphertext is bound as associated data, so tampering
//! with the KDF parameters fails authentication like a wrong passphrase does.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const FORMAT_TAG: &[u8; 4] = b"BLM1";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = FORMAT_TAG.len() + 12 + SALT_LEN + NONCE_LEN;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed: wrong passphrase or corrupted vault")]
    Decryption,
    #[error("not a vault file")]
    InvalidFormat,
}

/// User passphrase, wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// Argon2id cost parameters, stored in every sealed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub const STANDARD: KdfParams = KdfParams {
        memory_kib: 65536,
        iterations: 3,
        parallelism: 1,
    };

    /// Cheap parameters for tests.
    pub const INSECURE_FAST: KdfParams = KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };

    /// Highest costs accepted from a vault header.
    pub const MAX_ACCEPTED: KdfParams = KdfParams {
        memory_kib: 1 << 20,
        iterations: 16,
        parallelism: 8,
    };

    fn within_limits(&self) -> bool {
        let max = Self::MAX_ACCEPTED;
        self.memory_kib <= max.memory_kib
            && self.iterations <= max.iterations
            && self.parallelism <= max.parallelism
    }

    fn derive(
        &self,
        passphrase: &Passphrase,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|_| CryptoError::KeyDerivation)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
            .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(key)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::STANDARD
    }
}

fn header(params: &KdfParams, salt: &[u8], nonce: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(FORMAT_TAG);
    out.extend_from_slice(&params.memory_kib.to_le_bytes());
    out.extend_from_slice(&params.iterations.to_le_bytes());
    out.extend_from_slice(&params.parallelism.to_le_bytes());
    out.extend_from_slice(salt);
    out.extend_from_slice(nonce);
    out
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, CryptoError> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(CryptoError::InvalidFormat)
}

pub fn seal(
    passphrase: &Passphrase,
    params: &KdfParams,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key = params.derive(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Encryption)?;

    let mut sealed = header(params, &salt, &nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &sealed,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// KDF parameters a blob was sealed with. Costs above
/// [`KdfParams::MAX_ACCEPTED`] are rejected before any key is derived.
pub fn sealed_params(sealed: &[u8]) -> Result<KdfParams, CryptoError> {
    if sealed.len() <= HEADER_LEN || &sealed[..FORMAT_TAG.len()] != FORMAT_TAG {
        return Err(CryptoError::InvalidFormat);
    }
    let params = KdfParams {
        memory_kib: read_u32(sealed, 4)?,
        iterations: read_u32(sealed, 8)?,
        parallelism: read_u32(sealed, 12)?,
    };
    if !params.within_limits() {
        return Err(CryptoError::InvalidFormat);
    }
    Ok(params)
}

/// Open a blob produced by [`seal`]. The returned buffer is wiped on drop.
pub fn open(passphrase: &Passphrase, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let params = sealed_params(sealed)?;
    let salt_at = FORMAT_TAG.len() + 12;
    let nonce_at = salt_at + SALT_LEN;
    let (head, ciphertext) = sealed.split_at(HEADER_LEN);

    let key = params.derive(passphrase, &head[salt_at..nonce_at])?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Decryption)?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&head[nonce_at..]),
            Payload {
                msg: ciphertext,
                aad: head,
            },
        )
        .map_err(|_| CryptoError::Decryption)?;
    Ok(Zeroizing::new(plaintext))
}
