//! # Secret Cipher
//!
//! Authenticated encryption for TOTP shared secrets at rest.
//!
//! ## Construction
//!
//! ```text
//! configured key material ──┐
//!                           ▼
//!        PBKDF2-HMAC-SHA256(key, salt, 100k rounds) ──► 32-byte key
//!                           │
//! per-record random salt ───┘          ▼
//!                            AES-256-GCM(key, random nonce, AAD)
//! ```
//!
//! - The **salt** is random per record, so two users with the same
//!   authenticator secret (or the same user re-provisioning) never share
//!   ciphertext, and the derived key differs per record.
//! - The **AAD** is a constant service label: ciphertext lifted from this
//!   table cannot be replayed into a context using a different label.
//! - The **nonce** is random per encryption, never reused with a derived
//!   key (each record has its own key anyway).
//!
//! ## Wire Format
//!
//! `hex(salt).hex(nonce).hex(ciphertext)` - self-contained, so rotation
//! of stored records needs no side table.

use crate::errors::ApiError;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

// =============================================================================
// Constants
// =============================================================================

/// Constant service label bound into every ciphertext as AAD.
const AAD_LABEL: &[u8] = b"decode-auth-service:otp-secret";

/// PBKDF2 iteration count for key derivation.
const PBKDF2_ROUNDS: u32 = 100_000;

/// Per-record salt length in bytes.
const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

// =============================================================================
// Cipher
// =============================================================================

/// Encrypts and decrypts TOTP secrets with a key derived from
/// configuration.
///
/// Create once at startup and share via `Arc`.
#[derive(Clone)]
pub struct SecretCipher {
    /// Configured key material fed into PBKDF2
    key_material: Vec<u8>,
}

impl SecretCipher {
    /// Creates a cipher from the configured key material.
    pub fn new(encryption_key: &str) -> Self {
        Self {
            key_material: encryption_key.as_bytes().to_vec(),
        }
    }

    /// Encrypts a plaintext secret.
    ///
    /// Returns the self-contained `salt.nonce.ciphertext` hex format.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, ApiError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut nonce);

        let cipher = self.derive_cipher(&salt)?;

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload { msg: plaintext.as_bytes(), aad: AAD_LABEL },
            )
            .map_err(|_| ApiError::InternalError {
                message: "Secret encryption failed".to_string(),
            })?;

        Ok(format!(
            "{}.{}.{}",
            hex::encode(salt),
            hex::encode(nonce),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypts a stored secret.
    ///
    /// Fails for malformed records, tampered ciphertext, or ciphertext
    /// produced under a different AAD label or key.
    pub fn decrypt(&self, encoded: &str) -> Result<String, ApiError> {
        let mut parts = encoded.splitn(3, '.');
        let (salt, nonce, ciphertext) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(n), Some(c)) => (
                Self::decode_hex(s)?,
                Self::decode_hex(n)?,
                Self::decode_hex(c)?,
            ),
            _ => {
                return Err(ApiError::InternalError {
                    message: "Malformed encrypted secret".to_string(),
                })
            }
        };

        if salt.len() != SALT_LEN || nonce.len() != NONCE_LEN {
            return Err(ApiError::InternalError {
                message: "Malformed encrypted secret".to_string(),
            });
        }

        let cipher = self.derive_cipher(&salt)?;

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload { msg: ciphertext.as_slice(), aad: AAD_LABEL },
            )
            .map_err(|_| ApiError::InternalError {
                message: "Secret decryption failed".to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|_| ApiError::InternalError {
            message: "Decrypted secret is not valid UTF-8".to_string(),
        })
    }

    /// Derives the per-record AES-256 key and builds the cipher.
    fn derive_cipher(&self, salt: &[u8]) -> Result<Aes256Gcm, ApiError> {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(&self.key_material, salt, PBKDF2_ROUNDS, &mut key);

        Aes256Gcm::new_from_slice(&key).map_err(|_| ApiError::InternalError {
            message: "Key derivation failed".to_string(),
        })
    }

    fn decode_hex(part: &str) -> Result<Vec<u8>, ApiError> {
        hex::decode(part).map_err(|_| ApiError::InternalError {
            message: "Malformed encrypted secret".to_string(),
        })
    }
}

// Implement Debug manually to avoid exposing key material
impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::new("test_otp_encryption_key_32_chars_min")
    }

    #[test]
    fn test_roundtrip() {
        let cipher = test_cipher();
        let secret = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

        let encrypted = cipher.encrypt(secret).unwrap();
        assert_ne!(encrypted, secret);

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, secret);
    }

    #[test]
    fn test_equal_plaintexts_produce_distinct_ciphertexts() {
        let cipher = test_cipher();
        let secret = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

        // Random salt and nonce per record
        let e1 = cipher.encrypt(secret).unwrap();
        let e2 = cipher.encrypt(secret).unwrap();
        assert_ne!(e1, e2);

        assert_eq!(cipher.decrypt(&e1).unwrap(), secret);
        assert_eq!(cipher.decrypt(&e2).unwrap(), secret);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("JBSWY3DPEHPK3PXP").unwrap();

        // Flip the last ciphertext nibble
        let mut tampered = encrypted.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = test_cipher().encrypt("JBSWY3DPEHPK3PXP").unwrap();

        let other = SecretCipher::new("another_otp_encryption_key_32_char");
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_malformed_record_fails() {
        let cipher = test_cipher();
        assert!(cipher.decrypt("not-hex-at-all").is_err());
        assert!(cipher.decrypt("abcd.ef01").is_err());
        assert!(cipher.decrypt("zz.zz.zz").is_err());
    }
}
