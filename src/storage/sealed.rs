//! Encrypted at-rest forms of user data, shared by every backend.

use crate::crypto::CryptoService;
use crate::domain::{Identity, LedgerResult, Profile};

/// Profile as stored: both fields are ciphertext tokens.
#[derive(Debug, Clone)]
pub(crate) struct SealedProfile {
    pub username: String,
    pub display_name: String,
}

impl SealedProfile {
    pub fn seal(crypto: &dyn CryptoService, profile: &Profile) -> LedgerResult<Self> {
        Ok(Self {
            username: crypto.encrypt(&profile.username)?,
            display_name: crypto.encrypt(&profile.display_name)?,
        })
    }

    pub fn open(&self, crypto: &dyn CryptoService) -> LedgerResult<Profile> {
        Ok(Profile {
            username: crypto.decrypt(&self.username)?,
            display_name: crypto.decrypt(&self.display_name)?,
        })
    }
}

/// Identity as stored: provider in clear, external id encrypted and indexed.
#[derive(Debug, Clone)]
pub(crate) struct SealedIdentity {
    pub provider: String,
    pub external_id_ciphertext: String,
    pub external_id_hash: String,
}

impl SealedIdentity {
    pub fn seal(crypto: &dyn CryptoService, identity: &Identity) -> LedgerResult<Self> {
        Ok(Self {
            provider: identity.provider.clone(),
            external_id_ciphertext: crypto.encrypt(&identity.external_id)?,
            external_id_hash: crypto.blind_index(&identity.external_id),
        })
    }

    pub fn open(&self, crypto: &dyn CryptoService) -> LedgerResult<Identity> {
        Ok(Identity {
            provider: self.provider.clone(),
            external_id: crypto.decrypt(&self.external_id_ciphertext)?,
        })
    }

    /// Decrypts the candidate row and confirms it is exactly `wanted`.
    ///
    /// An index hit alone proves nothing; colliding hashes must be rejected here.
    pub fn matches(&self, crypto: &dyn CryptoService, wanted: &Identity) -> LedgerResult<bool> {
        if self.provider != wanted.provider {
            return Ok(false);
        }
        let external_id = crypto.decrypt(&self.external_id_ciphertext)?;
        Ok(external_id == wanted.external_id)
    }
}
