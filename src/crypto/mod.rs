//! Confidentiality for identity data and a searchable index over it.

pub mod cipher;
pub mod hashing;
pub mod key;

pub use cipher::CipherService;
pub use key::SecretKey;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authentication check failed: wrong key or tampered token.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("malformed ciphertext token: {0}")]
    MalformedToken(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Encrypt/decrypt plus deterministic blind index under one process-wide key.
pub trait CryptoService: Send + Sync {
    /// Randomized authenticated encryption; equal inputs give different tokens.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Never returns unauthenticated or partial plaintext.
    fn decrypt(&self, token: &str) -> Result<String, CryptoError>;

    /// Keyed one-way hash for exact-match lookup. Not confidential.
    fn blind_index(&self, plaintext: &str) -> String;
}
