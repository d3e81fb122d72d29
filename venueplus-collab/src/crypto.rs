use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "enc:";
const NONCE_SIZE: usize = 12;

/// Encryption contexts of the personal fields kept in the durable store.
pub mod context {
    pub const USERNAME: &str = "user.username";
    pub const VIP_CHARACTER: &str = "vip.character";
    pub const VIP_WORLD: &str = "vip.world";
    pub const CLUB_CREATOR: &str = "club.creator";
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption key is empty")]
    MissingKey,
    #[error("Invalid key length")]
    InvalidKey,
    #[error("Malformed ciphertext: {0}")]
    Malformed(String),
    #[error("Ciphertext failed authentication")]
    Authentication,
}

/// Reversible field encryption with nonces derived from the plaintext.
///
/// The same plaintext under the same context always yields the same ciphertext,
/// which lets the durable store look encrypted values up directly.
pub struct FieldCipher {
    key: [u8; 32],
}

impl FieldCipher {
    pub fn new(secret: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::MissingKey);
        }

        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Ok(Self { key })
    }

    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(PREFIX)
    }

    pub fn encrypt(&self, plaintext: &str, context: &str) -> Result<String, CryptoError> {
        let nonce_bytes = self.derive_nonce(plaintext, context)?;
        let cipher = self.cipher()?;

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Authentication)?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);

        Ok(format!("{}{}", PREFIX, BASE64.encode(payload)))
    }

    /// Decrypts a value. Values without the encryption prefix are returned as is.
    pub fn decrypt(&self, value: &str) -> Result<String, CryptoError> {
        let Some(encoded) = value.strip_prefix(PREFIX) else {
            return Ok(value.to_string());
        };

        let payload = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::Malformed(e.to_string()))?;

        // nonce plus the 16 byte tag
        if payload.len() < NONCE_SIZE + 16 {
            return Err(CryptoError::Malformed("payload too short".to_string()));
        }

        let (nonce_bytes, sealed) = payload.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CryptoError::Authentication)?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::Malformed(e.to_string()))
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        <Aes256Gcm as KeyInit>::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidKey)
    }

    fn derive_nonce(&self, plaintext: &str, context: &str) -> Result<[u8; NONCE_SIZE], CryptoError> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidKey)?;

        mac.update(context.as_bytes());
        mac.update(plaintext.as_bytes());

        let digest = mac.finalize().into_bytes();
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&digest[..NONCE_SIZE]);

        Ok(nonce)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let cipher = FieldCipher::new("secret").unwrap();
        let encrypted = cipher.encrypt("Alice", context::VIP_CHARACTER).unwrap();

        assert!(FieldCipher::is_encrypted(&encrypted));
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "Alice");
    }

    #[test]
    fn test_deterministic_per_context() {
        let cipher = FieldCipher::new("secret").unwrap();

        let first = cipher.encrypt("Alice", context::USERNAME).unwrap();
        let second = cipher.encrypt("Alice", context::USERNAME).unwrap();
        let other = cipher.encrypt("Alice", context::VIP_CHARACTER).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_plaintext_passes_through() {
        let cipher = FieldCipher::new("secret").unwrap();

        assert_eq!(cipher.decrypt("legacy name").unwrap(), "legacy name");
        assert!(!FieldCipher::is_encrypted("legacy name"));
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = FieldCipher::new("secret")
            .unwrap()
            .encrypt("Alice", "")
            .unwrap();
        let other = FieldCipher::new("another").unwrap();

        assert!(matches!(
            other.decrypt(&encrypted),
            Err(CryptoError::Authentication)
        ));
        assert!(matches!(
            other.decrypt("enc:AAAA"),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(matches!(FieldCipher::new(""), Err(CryptoError::MissingKey)));
    }
}
