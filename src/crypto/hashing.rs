// Keyed hashing used for the blind index.

use crate::crypto::key::SecretKey;
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// Domain separation labels so the index key never equals the encryption key.
const INDEX_KEY_DOMAIN: &[u8] = b"BLINDIDX-KEY-V1";
const INDEX_VALUE_DOMAIN: &[u8] = b"BLINDIDX-VAL";

/// Length in hex characters of every blind index.
pub const BLIND_INDEX_LEN: usize = 64;

// HMAC zero-pads keys shorter than its block, so keying with the padded
// block is the same MAC as keying with the raw 32 bytes.
fn mac_with(key: &SecretKey) -> HmacSha256 {
    let mut block = Key::<HmacSha256>::default();
    block[..key.as_bytes().len()].copy_from_slice(key.as_bytes());
    <HmacSha256 as KeyInit>::new(&block)
}

/// Derives the blind index sub-key from the master key.
pub fn derive_index_key(master: &SecretKey) -> SecretKey {
    let mut mac = mac_with(master);
    mac.update(INDEX_KEY_DOMAIN);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&mac.finalize().into_bytes());
    SecretKey::from_bytes(bytes)
}

/// Deterministic keyed one-way hash of `plaintext`, hex encoded.
pub fn blind_index(index_key: &SecretKey, plaintext: &str) -> String {
    let mut mac = mac_with(index_key);
    mac.update(INDEX_VALUE_DOMAIN);
    mac.update(plaintext.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
