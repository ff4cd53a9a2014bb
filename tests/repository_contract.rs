//! The same behavioural contract, checked against every backend.

mod common;

use betting_ledger::domain::{Bet, BetKey};
use betting_ledger::storage::memory::{InMemoryBetRepository, InMemoryPollRepository};
use betting_ledger::storage::sqlite::{self, SqliteBetRepository, SqlitePollRepository};
use betting_ledger::storage::{BetRepository, PollRepository};
use betting_ledger::{
    BetStatus, Conflict, Entity, Identity, LedgerError, Poll, PollOutcome, PollStatus, Profile,
};
use common::{harness, two_options, Backend, BACKENDS};
use std::sync::Arc;

async fn raw_repos(backend: Backend) -> (Arc<dyn PollRepository>, Arc<dyn BetRepository>) {
    match backend {
        Backend::Memory => (
            Arc::new(InMemoryPollRepository::new()),
            Arc::new(InMemoryBetRepository::new()),
        ),
        Backend::Sqlite => {
            let pool = sqlite::connect("sqlite::memory:", 1).await.unwrap();
            (
                Arc::new(SqlitePollRepository::new(pool.clone())),
                Arc::new(SqliteBetRepository::new(pool)),
            )
        }
    }
}

#[tokio::test]
async fn poll_round_trips_with_ordered_options() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let poll = h
            .ctx
            .polls
            .create_poll(
                "Which team will win first map?",
                vec!["Team A".to_string(), "Team B".to_string()],
            )
            .await
            .unwrap();

        let loaded = h.ctx.polls.get_poll_by_id(poll.id()).await.unwrap();
        assert_eq!(loaded, poll, "{:?}", backend);
        assert_eq!(loaded.options()[0], "Team A");
        assert_eq!(loaded.options()[1], "Team B");
        assert_eq!(loaded.status(), PollStatus::Open);
        assert_eq!(loaded.outcome(), PollOutcome::Pending);
    }
}

#[tokio::test]
async fn poll_lifecycle_is_persisted() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let poll = h.ctx.polls.create_poll("t", two_options()).await.unwrap();
        h.ctx.polls.close_poll(poll.id()).await.unwrap();
        h.ctx
            .polls
            .select_outcome(poll.id(), PollOutcome::Option1)
            .await
            .unwrap();

        let loaded = h.ctx.polls.get_poll_by_id(poll.id()).await.unwrap();
        assert_eq!(loaded.status(), PollStatus::Closed, "{:?}", backend);
        assert_eq!(loaded.outcome(), PollOutcome::Option1, "{:?}", backend);
        assert!(h.ctx.polls.get_open_polls().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn missing_polls_are_not_found() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        for result in [
            h.ctx.polls.get_poll_by_id("missing").await.map(|_| ()),
            h.ctx.polls.close_poll("missing").await.map(|_| ()),
            h.ctx
                .polls
                .select_outcome("missing", PollOutcome::Option1)
                .await
                .map(|_| ()),
            h.ctx.polls.delete_poll("missing").await,
        ] {
            assert!(
                matches!(result, Err(LedgerError::NotFound(Entity::Poll))),
                "{:?}: {:?}",
                backend,
                result
            );
        }
    }
}

#[tokio::test]
async fn duplicate_poll_id_conflicts() {
    for backend in BACKENDS {
        let (polls, _) = raw_repos(backend).await;
        let poll = Poll::open("p1".to_string(), "t".to_string(), two_options()).unwrap();
        polls.save(&poll).await.unwrap();
        let err = polls.save(&poll).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::Conflict(Conflict::PollExists)),
            "{:?}: {:?}",
            backend,
            err
        );
    }
}

#[tokio::test]
async fn deleted_poll_is_gone() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let poll = h.ctx.polls.create_poll("t", two_options()).await.unwrap();
        h.ctx.polls.delete_poll(poll.id()).await.unwrap();
        assert!(h
            .ctx
            .polls
            .get_poll_by_id(poll.id())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(h.ctx.polls.get_open_polls().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn bet_queries_filter_by_user_and_poll() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let first = h.ctx.polls.create_poll("first", two_options()).await.unwrap();
        let second = h.ctx.polls.create_poll("second", two_options()).await.unwrap();
        h.ctx.bets.create_bet(first.id(), "u1", 0).await.unwrap();
        h.ctx.bets.create_bet(first.id(), "u2", 1).await.unwrap();
        h.ctx.bets.create_bet(second.id(), "u1", 1).await.unwrap();

        let by_user = h.ctx.bets.get_bets_from_user("u1").await.unwrap();
        assert_eq!(by_user.len(), 2, "{:?}", backend);
        assert!(by_user.iter().all(|b| b.user_id() == "u1"));

        let by_poll = h.ctx.bets.get_bets_by_poll(first.id()).await.unwrap();
        assert_eq!(by_poll.len(), 2, "{:?}", backend);
        assert!(by_poll.iter().all(|b| b.poll_id() == first.id()));

        assert!(h.ctx.bets.get_bets_from_user("nobody").await.unwrap().is_empty());
        assert!(matches!(
            h.ctx.bets.get_bet(second.id(), "u2").await,
            Err(LedgerError::NotFound(Entity::Bet))
        ));
    }
}

#[tokio::test]
async fn second_bet_from_same_user_conflicts() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let poll = h.ctx.polls.create_poll("t", two_options()).await.unwrap();
        h.ctx.bets.create_bet(poll.id(), "u1", 0).await.unwrap();
        let err = h.ctx.bets.create_bet(poll.id(), "u1", 1).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::Conflict(Conflict::UserAlreadyBet)),
            "{:?}: {:?}",
            backend,
            err
        );
        let stored = h.ctx.bets.get_bet(poll.id(), "u1").await.unwrap();
        assert_eq!(stored.selected_option_index(), 0);
    }
}

#[tokio::test]
async fn closed_poll_never_creates_a_bet_row() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let poll = h.ctx.polls.create_poll("t", two_options()).await.unwrap();
        h.ctx.polls.close_poll(poll.id()).await.unwrap();

        let err = h.ctx.bets.create_bet(poll.id(), "u1", 0).await.unwrap_err();
        assert!(matches!(err, LedgerError::PollClosed), "{:?}", backend);
        assert!(h.ctx.bets.get_bets_by_poll(poll.id()).await.unwrap().is_empty());
        if let Some(pool) = &h.pool {
            let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bets")
                .fetch_one(pool)
                .await
                .unwrap();
            assert_eq!(rows, 0);
        }
    }
}

#[tokio::test]
async fn updating_a_missing_bet_is_not_found() {
    for backend in BACKENDS {
        let (_, bets) = raw_repos(backend).await;
        let ghost = Bet::from_parts(BetKey::new("p", "u"), 0, BetStatus::Won);
        assert!(matches!(
            bets.update_bet(&ghost).await,
            Err(LedgerError::NotFound(Entity::Bet))
        ));
    }
}

#[tokio::test]
async fn user_round_trips_through_encryption() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let created = h
            .ctx
            .users
            .create_user_with_profile(
                &Identity::new("discord", "81234"),
                Profile::new("ana", "Ana Example"),
            )
            .await
            .unwrap();
        h.ctx
            .users
            .add_identity(created.id(), &Identity::new("github", "octo"))
            .await
            .unwrap();

        for lookup in [Identity::new("discord", "81234"), Identity::new("github", "octo")] {
            let user = h.ctx.users.get_user_by_external_id(&lookup).await.unwrap();
            assert_eq!(user.id(), created.id(), "{:?}", backend);
            assert_eq!(user.username(), "ana");
            assert_eq!(user.display_name(), "Ana Example");
            assert_eq!(user.identities().len(), 2);
            assert!(user.identities().contains(&lookup));
        }

        // Same external id under another provider is a different identity.
        assert!(h
            .ctx
            .users
            .get_user_by_external_id(&Identity::new("github", "81234"))
            .await
            .unwrap_err()
            .is_not_found());
    }
}

#[tokio::test]
async fn add_identity_requires_existing_user_and_free_identity() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let ana = h.ctx.users.create_user(&Identity::new("discord", "1")).await.unwrap();
        h.ctx.users.create_user(&Identity::new("discord", "2")).await.unwrap();

        assert!(matches!(
            h.ctx
                .users
                .add_identity("no-such-user", &Identity::new("github", "x"))
                .await,
            Err(LedgerError::NotFound(Entity::User))
        ));
        assert!(matches!(
            h.ctx
                .users
                .add_identity(ana.id(), &Identity::new("discord", "2"))
                .await,
            Err(LedgerError::Conflict(Conflict::IdentityClaimed))
        ));
    }
}

#[tokio::test]
async fn conflicting_create_leaves_user_count_unchanged() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let identity = Identity::new("discord", "81234");
        h.ctx.users.create_user(&identity).await.unwrap();
        let before = h.ctx.users.count_users().await.unwrap();

        let err = h.ctx.users.create_user(&identity).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::Conflict(Conflict::IdentityClaimed)),
            "{:?}: {:?}",
            backend,
            err
        );
        assert_eq!(h.ctx.users.count_users().await.unwrap(), before, "{:?}", backend);
        assert_eq!(before, 1);
    }
}

#[tokio::test]
async fn delete_user_removes_every_identity() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let user = h.ctx.users.create_user(&Identity::new("discord", "1")).await.unwrap();
        h.ctx
            .users
            .add_identity(user.id(), &Identity::new("github", "octo"))
            .await
            .unwrap();

        h.ctx.users.delete_user(&Identity::new("github", "octo")).await.unwrap();

        assert_eq!(h.ctx.users.count_users().await.unwrap(), 0, "{:?}", backend);
        assert!(h
            .ctx
            .users
            .get_user_by_external_id(&Identity::new("discord", "1"))
            .await
            .unwrap_err()
            .is_not_found());
        // The freed identity can be claimed again.
        h.ctx.users.create_user(&Identity::new("discord", "1")).await.unwrap();
    }
}
