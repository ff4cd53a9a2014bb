use crate::crypto::CryptoService;
use crate::domain::{Conflict, Entity, Identity, LedgerError, LedgerResult, Profile, User};
use crate::storage::sealed::{SealedIdentity, SealedProfile};
use crate::storage::UserRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// (provider, blind index) -> identity row.
type IdentityKey = (String, String);

#[derive(Default)]
struct Tables {
    users: HashMap<String, SealedProfile>,
    identities: HashMap<IdentityKey, (SealedIdentity, String)>,
}

impl Tables {
    fn load_user(&self, crypto: &dyn CryptoService, user_id: &str) -> LedgerResult<User> {
        let sealed = self
            .users
            .get(user_id)
            .ok_or(LedgerError::NotFound(Entity::User))?;
        let profile = sealed.open(crypto)?;
        // Same order as the relational backend: provider, then blind index.
        let mut owned: Vec<_> = self
            .identities
            .iter()
            .filter(|(_, (_, owner))| owner.as_str() == user_id)
            .collect();
        owned.sort_by(|a, b| a.0.cmp(b.0));
        let identities = owned
            .into_iter()
            .map(|(_, (identity, _))| identity.open(crypto))
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(User::new(user_id.to_string(), profile, identities))
    }
}

/// Keeps only ciphertext and blind indexes, like the relational backend.
pub struct InMemoryUserRepository {
    crypto: Arc<dyn CryptoService>,
    tables: Mutex<Tables>,
}

impl InMemoryUserRepository {
    pub fn new(crypto: Arc<dyn CryptoService>) -> Self {
        Self {
            crypto,
            tables: Mutex::new(Tables::default()),
        }
    }

    fn key_of(sealed: &SealedIdentity) -> IdentityKey {
        (sealed.provider.clone(), sealed.external_id_hash.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user_id: &str, profile: &Profile, identity: &Identity) -> LedgerResult<()> {
        let sealed_profile = SealedProfile::seal(self.crypto.as_ref(), profile)?;
        let sealed_identity = SealedIdentity::seal(self.crypto.as_ref(), identity)?;
        let key = Self::key_of(&sealed_identity);

        let mut tables = self.tables.lock().await;
        if tables.identities.contains_key(&key) {
            return Err(LedgerError::Conflict(Conflict::IdentityClaimed));
        }
        tables.users.insert(user_id.to_string(), sealed_profile);
        tables
            .identities
            .insert(key, (sealed_identity, user_id.to_string()));
        Ok(())
    }

    async fn add_identity(&self, user_id: &str, identity: &Identity) -> LedgerResult<()> {
        let sealed_identity = SealedIdentity::seal(self.crypto.as_ref(), identity)?;
        let key = Self::key_of(&sealed_identity);

        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(user_id) {
            return Err(LedgerError::NotFound(Entity::User));
        }
        if tables.identities.contains_key(&key) {
            return Err(LedgerError::Conflict(Conflict::IdentityClaimed));
        }
        tables
            .identities
            .insert(key, (sealed_identity, user_id.to_string()));
        Ok(())
    }

    async fn get_by_id(&self, user_id: &str) -> LedgerResult<User> {
        let tables = self.tables.lock().await;
        tables.load_user(self.crypto.as_ref(), user_id)
    }

    async fn get_by_external_id(&self, identity: &Identity) -> LedgerResult<User> {
        let key = (
            identity.provider.clone(),
            self.crypto.blind_index(&identity.external_id),
        );
        let tables = self.tables.lock().await;
        let (candidate, owner) = tables
            .identities
            .get(&key)
            .ok_or(LedgerError::NotFound(Entity::User))?;
        if !candidate.matches(self.crypto.as_ref(), identity)? {
            return Err(LedgerError::NotFound(Entity::User));
        }
        tables.load_user(self.crypto.as_ref(), owner)
    }

    async fn delete(&self, user_id: &str) -> LedgerResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(user_id).is_none() {
            return Err(LedgerError::NotFound(Entity::User));
        }
        tables.identities.retain(|_, (_, owner)| owner.as_str() != user_id);
        Ok(())
    }

    async fn count(&self) -> LedgerResult<u64> {
        Ok(self.tables.lock().await.users.len() as u64)
    }
}
