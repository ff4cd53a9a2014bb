//! Randomized authenticated encryption plus the blind index, behind one key.
//!
//! Ciphertext tokens are `base64(nonce || ciphertext || tag)` so a token can be
//! decrypted with nothing but the key.

use crate::crypto::hashing::{blind_index, derive_index_key};
use crate::crypto::key::SecretKey;
use crate::crypto::{CryptoError, CryptoService};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};

/// XChaCha20 nonce length.
pub const NONCE_LEN: usize = 24;
/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

/// XChaCha20-Poly1305 for confidentiality, HMAC-SHA256 for the index.
pub struct CipherService {
    cipher: XChaCha20Poly1305,
    index_key: SecretKey,
}

impl CipherService {
    pub fn new(master: &SecretKey) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(master.as_bytes().into()),
            index_key: derive_index_key(master),
        }
    }

    fn fresh_nonce() -> [u8; NONCE_LEN] {
        let mut bytes = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        bytes
    }
}

impl CryptoService for CipherService {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Self::fresh_nonce();
        let sealed = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut token = Vec::with_capacity(NONCE_LEN + sealed.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&sealed);
        Ok(STANDARD.encode(token))
    }

    fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let raw = STANDARD
            .decode(token)
            .map_err(|e| CryptoError::MalformedToken(format!("invalid base64: {}", e)))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::MalformedToken(format!(
                "token too short: {} bytes",
                raw.len()
            )));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let opened = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        String::from_utf8(opened)
            .map_err(|_| CryptoError::MalformedToken("plaintext is not utf-8".to_string()))
    }

    fn blind_index(&self, plaintext: &str) -> String {
        blind_index(&self.index_key, plaintext)
    }
}
