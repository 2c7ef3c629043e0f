// ABOUTME: AES-256-GCM symmetric encryption keyed by the 32-byte master key
// ABOUTME: Used for deploy keys, MFA secrets and the CA private key at rest

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::errors::AppError;

/// The server's single symmetric key, supplied at startup and never persisted.
///
/// Zeroized on drop so a crash dump or swapped page is less likely to carry
/// the raw key material.
pub struct MasterKey {
    bytes: [u8; 32],
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl MasterKey {
    /// Parse a 64-character hex string into a 32-byte master key.
    ///
    /// # Errors
    /// Returns `AppError::InvalidInput` if the string is not valid hex or
    /// does not decode to exactly 32 bytes.
    pub fn from_hex(hex_str: &str) -> Result<Self, AppError> {
        let decoded = hex::decode(hex_str.trim())
            .map_err(|_| AppError::invalid_input("master key must be hex-encoded"))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| AppError::invalid_input("master key must decode to exactly 32 bytes"))?;
        Ok(Self { bytes })
    }

    /// Hex-encoded SHA-256 fingerprint, stored alongside `ServerConfig` so a
    /// restart with a mismatched key is caught before it silently corrupts data.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes);
        hex::encode(digest)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }

    /// Encrypt `plaintext`, returning base64 of `nonce || ciphertext || tag`.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the underlying AEAD operation fails,
    /// which does not happen for well-formed inputs under this key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| AppError::internal("aes-gcm encryption failed"))?;
        let mut out = Vec::with_capacity(nonce.len() + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(out))
    }

    /// Decrypt a blob produced by [`Self::encrypt`].
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the blob is malformed or the GCM tag
    /// does not verify (wrong key or tampered ciphertext).
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, AppError> {
        let raw = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| AppError::internal("ciphertext is not valid base64"))?;
        if raw.len() < 12 {
            return Err(AppError::internal("ciphertext shorter than nonce"));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher()
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::internal("aes-gcm decryption failed: tag mismatch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MasterKey {
        MasterKey::from_hex(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = test_key();
        let plaintext = b"deploy key material".to_vec();
        let encrypted = key.encrypt(&plaintext).unwrap();
        let decrypted = key.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let key = test_key();
        let mut encrypted = key.encrypt(b"secret").unwrap();
        encrypted.push('A');
        assert!(key.decrypt(&encrypted).is_err());
    }

    #[test]
    fn rejects_wrong_length_key() {
        assert!(MasterKey::from_hex("abcd").is_err());
    }

    #[test]
    fn fingerprint_is_stable() {
        let key = test_key();
        assert_eq!(key.fingerprint(), test_key().fingerprint());
    }
}
