//! Composition root: builds the crypto service, repositories and services
//! once and hands them out as cloneable handles.

use crate::app::{BetService, PollService, UserService};
use crate::crypto::{CipherService, CryptoService, SecretKey};
use crate::infra::config::Config;
use crate::storage::memory::{InMemoryBetRepository, InMemoryPollRepository, InMemoryUserRepository};
use crate::storage::sqlite::{self, SqliteBetRepository, SqlitePollRepository, SqliteUserRepository};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppContext {
    pub polls: PollService,
    pub bets: BetService,
    pub users: UserService,
}

impl AppContext {
    /// Wires services over the SQLite backend named by `config`.
    pub async fn connect(config: &Config) -> Result<(Self, SqlitePool), sqlx::Error> {
        let pool = sqlite::connect(&config.database_url, config.max_connections).await?;
        let crypto: Arc<dyn CryptoService> = Arc::new(CipherService::new(&config.encryption_key));
        info!(max_connections = config.max_connections, "relational backend ready");
        Ok((Self::with_pool(pool.clone(), crypto), pool))
    }

    pub fn with_pool(pool: SqlitePool, crypto: Arc<dyn CryptoService>) -> Self {
        let polls = PollService::new(Arc::new(SqlitePollRepository::new(pool.clone())));
        let bets = BetService::new(polls.clone(), Arc::new(SqliteBetRepository::new(pool.clone())));
        let users = UserService::new(
            Arc::new(SqliteUserRepository::new(pool, crypto)),
            bets.clone(),
        );
        Self { polls, bets, users }
    }

    /// Wires services over the non-persistent backend.
    pub fn in_memory(key: &SecretKey) -> Self {
        let crypto: Arc<dyn CryptoService> = Arc::new(CipherService::new(key));
        let polls = PollService::new(Arc::new(InMemoryPollRepository::new()));
        let bets = BetService::new(polls.clone(), Arc::new(InMemoryBetRepository::new()));
        let users = UserService::new(Arc::new(InMemoryUserRepository::new(crypto)), bets.clone());
        Self { polls, bets, users }
    }
}
