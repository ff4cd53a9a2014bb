//! Shared fixtures: every contract test runs once per backend.

#![allow(dead_code)]

use betting_ledger::crypto::{CipherService, CryptoError, CryptoService, SecretKey};
use betting_ledger::storage::memory::InMemoryPollRepository;
use betting_ledger::storage::sqlite::{self, SqlitePollRepository};
use betting_ledger::storage::PollRepository;
use betting_ledger::AppContext;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
}

pub const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

pub struct Harness {
    pub backend: Backend,
    pub ctx: AppContext,
    /// Present for the relational backend only.
    pub pool: Option<SqlitePool>,
}

pub async fn harness(backend: Backend) -> Harness {
    harness_with(backend, Arc::new(CipherService::new(&SecretKey::generate()))).await
}

pub async fn harness_with(backend: Backend, crypto: Arc<dyn CryptoService>) -> Harness {
    match backend {
        Backend::Memory => Harness {
            backend,
            ctx: in_memory_with(crypto),
            pool: None,
        },
        Backend::Sqlite => {
            let pool = sqlite::connect("sqlite::memory:", 1)
                .await
                .expect("in-memory sqlite");
            Harness {
                backend,
                ctx: AppContext::with_pool(pool.clone(), crypto),
                pool: Some(pool),
            }
        }
    }
}

fn in_memory_with(crypto: Arc<dyn CryptoService>) -> AppContext {
    use betting_ledger::storage::memory::{InMemoryBetRepository, InMemoryUserRepository};
    use betting_ledger::{BetService, PollService, UserService};

    let polls = PollService::new(Arc::new(InMemoryPollRepository::new()));
    let bets = BetService::new(polls.clone(), Arc::new(InMemoryBetRepository::new()));
    let users = UserService::new(Arc::new(InMemoryUserRepository::new(crypto)), bets.clone());
    AppContext { polls, bets, users }
}

/// A bare poll repository, bypassing the service rules.
pub async fn poll_repository(backend: Backend) -> Arc<dyn PollRepository> {
    match backend {
        Backend::Memory => Arc::new(InMemoryPollRepository::new()),
        Backend::Sqlite => {
            let pool = sqlite::connect("sqlite::memory:", 1)
                .await
                .expect("in-memory sqlite");
            Arc::new(SqlitePollRepository::new(pool))
        }
    }
}

pub fn two_options() -> Vec<String> {
    vec!["Option 1".to_string(), "Option 2".to_string()]
}

/// Real encryption with a blind index that maps every input to the same value,
/// so distinct identities collide on lookup.
pub struct CollidingIndex {
    inner: CipherService,
}

impl CollidingIndex {
    pub fn new(key: &SecretKey) -> Self {
        Self {
            inner: CipherService::new(key),
        }
    }
}

impl CryptoService for CollidingIndex {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        self.inner.decrypt(token)
    }

    fn blind_index(&self, _plaintext: &str) -> String {
        "0".repeat(64)
    }
}
