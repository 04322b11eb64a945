//! NoteVault - Cipher Primitive
//!
//! Envelope format:
//! ```text
//! <hex nonce 24 chars>:<hex ciphertext+tag>
//! ```
//! The key is derived once per password with PBKDF2-HMAC-SHA256 over a fixed
//! salt, then reused for every chunk of a note's resources.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;

/// PBKDF2 iteration count
pub const KDF_ROUNDS: u32 = 100_000;

/// Length of the password verify-hash in hex characters
pub const VERIFY_HASH_LEN: usize = 32;

/// Fixed salt for PBKDF2 key derivation
const KDF_SALT: &[u8] = b"notevault:pbkdf2:v1";

/// Fixed nonce for the deterministic variant. Deterministic envelopes reveal
/// equality of repeated inputs, so this must never be used for content.
const FIXED_NONCE: [u8; NONCE_LEN] = [0x4e; NONCE_LEN];

/// Password-derived cipher for one note operation.
///
/// An empty password yields a no-op cipher: every encrypt/decrypt call
/// returns an empty string instead of an error.
pub struct PasswordCipher {
    /// Derived 256-bit key, zeroized on drop
    key: Zeroizing<[u8; KEY_LEN]>,
    /// Deterministic verify-hash of the password (32 lowercase hex chars)
    verify: String,
    /// Password was empty
    noop: bool,
}

impl PasswordCipher {
    /// Derive a cipher from a password.
    pub fn new(password: &str) -> Self {
        if password.is_empty() {
            return Self {
                key: Zeroizing::new([0u8; KEY_LEN]),
                verify: String::new(),
                noop: true,
            };
        }

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), KDF_SALT, KDF_ROUNDS, &mut *key);

        let mut cipher = Self {
            key,
            verify: String::new(),
            noop: false,
        };
        cipher.verify = cipher.compute_verify_hash(password);
        cipher
    }

    /// Deterministic 32-hex-char hash of the password, used as the outer
    /// marker on encrypted note bodies to verify password correctness
    /// without storing the password itself.
    pub fn verify_hash(&self) -> &str {
        &self.verify
    }

    /// Encrypt a text payload into a fresh-nonce envelope.
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        if self.noop || plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        self.encrypt_with_nonce(plaintext.as_bytes(), &nonce_bytes)
    }

    /// Decrypt and authenticate an envelope.
    pub fn decrypt(&self, envelope: &str) -> VaultResult<String> {
        if self.noop || envelope.is_empty() {
            return Ok(String::new());
        }

        let (nonce_hex, cipher_hex) = envelope
            .split_once(':')
            .ok_or_else(|| VaultError::InvalidEnvelope("missing ':' separator".into()))?;

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|e| VaultError::InvalidEnvelope(format!("bad nonce hex: {e}")))?;
        let ciphertext = hex::decode(cipher_hex)
            .map_err(|e| VaultError::InvalidEnvelope(format!("bad ciphertext hex: {e}")))?;

        if nonce_bytes.len() != NONCE_LEN {
            return Err(VaultError::InvalidEnvelope("invalid nonce length".into()));
        }

        let cipher = Aes256Gcm::new_from_slice(&*self.key)
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|_| VaultError::Authentication("wrong password or corrupted data".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| VaultError::InvalidEnvelope("decrypted payload is not UTF-8".into()))
    }

    /// Deterministic envelope over a payload using the fixed nonce.
    ///
    /// Only used for password verification hashing; never for content.
    fn encrypt_deterministic(&self, payload: &[u8]) -> VaultResult<String> {
        self.encrypt_with_nonce(payload, &FIXED_NONCE)
    }

    fn encrypt_with_nonce(&self, payload: &[u8], nonce_bytes: &[u8; NONCE_LEN]) -> VaultResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&*self.key)
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let nonce = Nonce::from_slice(nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, payload)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        Ok(format!("{}:{}", hex::encode(nonce_bytes), hex::encode(ciphertext)))
    }

    fn compute_verify_hash(&self, password: &str) -> String {
        // Deterministic envelope then SHA-256, truncated to 16 bytes.
        let envelope = self
            .encrypt_deterministic(password.as_bytes())
            .unwrap_or_default();
        let digest = Sha256::digest(envelope.as_bytes());
        hex::encode(&digest[..VERIFY_HASH_LEN / 2])
    }
}
