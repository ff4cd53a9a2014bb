//! 256-bit secret key material.

use crate::crypto::CryptoError;
use std::fmt;
use zeroize::Zeroize;

/// Length of the master key in bytes.
pub const KEY_LEN: usize = 32;

/// Secret key, wiped from memory on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a key from 64 hex characters.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("not valid hex: {}", e)))?;
        if decoded.len() != KEY_LEN {
            let got = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes ({} hex characters), got {} bytes",
                KEY_LEN,
                KEY_LEN * 2,
                got
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Generates a random key. Used by tests and the stress binary.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}
