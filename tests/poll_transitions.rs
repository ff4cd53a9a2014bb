//! Once-only poll transitions under concurrent callers.

mod common;

use betting_ledger::storage::{sqlite, PollRepository};
use betting_ledger::{
    AppContext, CipherService, LedgerError, Poll, PollOutcome, PollStatus, SecretKey,
};
use common::{harness, two_options, BACKENDS};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

const CALLERS: usize = 4;
const ROUNDS: usize = 25;

/// A file-backed database with a multi-connection pool, as deployed.
struct FileDb {
    ctx: AppContext,
    pool: SqlitePool,
    path: PathBuf,
}

impl FileDb {
    async fn open() -> Self {
        let path = std::env::temp_dir().join(format!("ledger-{}.db", uuid::Uuid::new_v4()));
        let pool = sqlite::connect(&format!("sqlite://{}", path.display()), 8)
            .await
            .unwrap();
        let ctx = AppContext::with_pool(
            pool.clone(),
            Arc::new(CipherService::new(&SecretKey::generate())),
        );
        Self { ctx, pool, path }
    }

    async fn remove(self) {
        self.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

async fn race_round(ctx: &AppContext) {
    let poll = ctx.polls.create_poll("race", two_options()).await.unwrap();

    let mut closes = Vec::with_capacity(CALLERS);
    for _ in 0..CALLERS {
        let polls = ctx.polls.clone();
        let id = poll.id().to_string();
        closes.push(tokio::spawn(async move { polls.close_poll(&id).await }));
    }
    let mut closed = 0;
    for handle in closes {
        match handle.await.unwrap() {
            Ok(_) => closed += 1,
            Err(LedgerError::AlreadyClosed) => {}
            Err(other) => panic!("unexpected close error {:?}", other),
        }
    }
    assert_eq!(closed, 1, "exactly one close may win");

    let mut decides = Vec::with_capacity(CALLERS);
    for i in 0..CALLERS {
        let polls = ctx.polls.clone();
        let id = poll.id().to_string();
        let wanted = if i % 2 == 0 {
            PollOutcome::Option1
        } else {
            PollOutcome::Option2
        };
        decides.push(tokio::spawn(async move {
            (wanted, polls.select_outcome(&id, wanted).await)
        }));
    }
    let mut results = Vec::with_capacity(CALLERS);
    for handle in decides {
        results.push(handle.await.unwrap());
    }

    let stored = ctx.polls.get_poll_by_id(poll.id()).await.unwrap().outcome();
    assert_ne!(stored, PollOutcome::Pending);
    for (wanted, result) in results {
        if wanted == stored {
            assert_eq!(result.unwrap().outcome(), stored);
        } else {
            assert!(
                matches!(result, Err(LedgerError::OutcomeAlreadyDecided)),
                "{:?} was accepted after {:?}",
                wanted,
                stored
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transitions_on_a_file_database_happen_once() {
    let db = FileDb::open().await;
    for _ in 0..ROUNDS {
        race_round(&db.ctx).await;
    }
    db.remove().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transitions_happen_once_on_every_backend() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        for _ in 0..ROUNDS {
            race_round(&h.ctx).await;
        }
    }
}

#[tokio::test]
async fn update_keeps_options_fixed_on_every_backend() {
    for backend in BACKENDS {
        let repo = common::poll_repository(backend).await;
        let poll = Poll::open("p1".to_string(), "t".to_string(), two_options()).unwrap();
        repo.save(&poll).await.unwrap();

        let renamed = Poll::from_parts(
            "p1".to_string(),
            "renamed".to_string(),
            ["X".to_string(), "Y".to_string()],
            PollStatus::Closed,
            PollOutcome::Option2,
        );
        repo.update(&renamed).await.unwrap();

        let loaded = repo.get_by_id("p1").await.unwrap();
        assert_eq!(loaded.title(), "renamed", "{:?}", backend);
        assert_eq!(loaded.status(), PollStatus::Closed);
        assert_eq!(loaded.outcome(), PollOutcome::Option2);
        assert_eq!(loaded.options(), poll.options(), "{:?}", backend);
    }
}
