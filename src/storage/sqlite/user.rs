use super::is_unique_violation;
use crate::crypto::CryptoService;
use crate::domain::{Conflict, Entity, Identity, LedgerError, LedgerResult, Profile, User};
use crate::storage::sealed::{SealedIdentity, SealedProfile};
use crate::storage::UserRepository;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, SqliteConnection};
use std::sync::Arc;

/// Users and identities with every sensitive column encrypted.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
    crypto: Arc<dyn CryptoService>,
}

fn claim_error(e: sqlx::Error, context: &'static str) -> LedgerError {
    if is_unique_violation(&e) {
        LedgerError::Conflict(Conflict::IdentityClaimed)
    } else {
        LedgerError::storage(context, e)
    }
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool, crypto: Arc<dyn CryptoService>) -> Self {
        Self { pool, crypto }
    }

    async fn insert_identity(
        conn: &mut SqliteConnection,
        user_id: &str,
        sealed: &SealedIdentity,
        context: &'static str,
    ) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO user_identities (provider, external_id_ciphertext, external_id_hash, user_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&sealed.provider)
        .bind(&sealed.external_id_ciphertext)
        .bind(&sealed.external_id_hash)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| claim_error(e, context))?;
        Ok(())
    }

    /// Loads and decrypts one user with all identities. Any decrypt failure aborts the read.
    async fn load_user(&self, user_id: &str) -> LedgerResult<User> {
        let row = sqlx::query(
            "SELECT username_ciphertext, display_name_ciphertext FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::storage("fetching user", e))?
        .ok_or(LedgerError::NotFound(Entity::User))?;

        let sealed_profile = SealedProfile {
            username: row
                .try_get("username_ciphertext")
                .map_err(|e| LedgerError::storage("fetching user", e))?,
            display_name: row
                .try_get("display_name_ciphertext")
                .map_err(|e| LedgerError::storage("fetching user", e))?,
        };
        let profile = sealed_profile.open(self.crypto.as_ref())?;

        let identity_rows = sqlx::query(
            "SELECT provider, external_id_ciphertext, external_id_hash
             FROM user_identities WHERE user_id = ? ORDER BY provider, external_id_hash",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::storage("fetching user identities", e))?;

        let mut identities = Vec::with_capacity(identity_rows.len());
        for row in identity_rows {
            let sealed = SealedIdentity {
                provider: row
                    .try_get("provider")
                    .map_err(|e| LedgerError::storage("fetching user identities", e))?,
                external_id_ciphertext: row
                    .try_get("external_id_ciphertext")
                    .map_err(|e| LedgerError::storage("fetching user identities", e))?,
                external_id_hash: row
                    .try_get("external_id_hash")
                    .map_err(|e| LedgerError::storage("fetching user identities", e))?,
            };
            identities.push(sealed.open(self.crypto.as_ref())?);
        }

        Ok(User::new(user_id.to_string(), profile, identities))
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn save(&self, user_id: &str, profile: &Profile, identity: &Identity) -> LedgerResult<()> {
        let sealed_profile = SealedProfile::seal(self.crypto.as_ref(), profile)?;
        let sealed_identity = SealedIdentity::seal(self.crypto.as_ref(), identity)?;

        // Dropping the transaction without commit rolls the user row back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::storage("saving user", e))?;

        sqlx::query(
            "INSERT INTO users (id, username_ciphertext, display_name_ciphertext) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(&sealed_profile.username)
        .bind(&sealed_profile.display_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| LedgerError::storage("saving user", e))?;

        Self::insert_identity(&mut tx, user_id, &sealed_identity, "claiming identity").await?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::storage("committing user", e))
    }

    async fn add_identity(&self, user_id: &str, identity: &Identity) -> LedgerResult<()> {
        let sealed_identity = SealedIdentity::seal(self.crypto.as_ref(), identity)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::storage("adding identity", e))?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| LedgerError::storage("adding identity", e))?;
        if exists.is_none() {
            return Err(LedgerError::NotFound(Entity::User));
        }

        Self::insert_identity(&mut tx, user_id, &sealed_identity, "adding identity").await?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::storage("committing identity", e))
    }

    async fn get_by_id(&self, user_id: &str) -> LedgerResult<User> {
        self.load_user(user_id).await
    }

    async fn get_by_external_id(&self, identity: &Identity) -> LedgerResult<User> {
        let hash = self.crypto.blind_index(&identity.external_id);
        let rows = sqlx::query(
            "SELECT provider, external_id_ciphertext, external_id_hash, user_id
             FROM user_identities WHERE provider = ? AND external_id_hash = ?",
        )
        .bind(&identity.provider)
        .bind(&hash)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::storage("looking up identity", e))?;

        for row in rows {
            let candidate = SealedIdentity {
                provider: row
                    .try_get("provider")
                    .map_err(|e| LedgerError::storage("looking up identity", e))?,
                external_id_ciphertext: row
                    .try_get("external_id_ciphertext")
                    .map_err(|e| LedgerError::storage("looking up identity", e))?,
                external_id_hash: row
                    .try_get("external_id_hash")
                    .map_err(|e| LedgerError::storage("looking up identity", e))?,
            };
            if candidate.matches(self.crypto.as_ref(), identity)? {
                let owner: String = row
                    .try_get("user_id")
                    .map_err(|e| LedgerError::storage("looking up identity", e))?;
                return self.load_user(&owner).await;
            }
        }
        Err(LedgerError::NotFound(Entity::User))
    }

    async fn delete(&self, user_id: &str) -> LedgerResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::storage("deleting user", e))?;

        sqlx::query("DELETE FROM user_identities WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| LedgerError::storage("deleting user identities", e))?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| LedgerError::storage("deleting user", e))?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(Entity::User));
        }

        tx.commit()
            .await
            .map_err(|e| LedgerError::storage("committing user delete", e))
    }

    async fn count(&self) -> LedgerResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("counting users", e))?;
        Ok(count.max(0) as u64)
    }
}
