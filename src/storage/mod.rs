//! Persistence contracts and their backends.
//!
//! Every backend must behave identically against these traits; the contract
//! tests under `tests/` run the same cases against each of them.

pub mod memory;
mod sealed;
pub mod sqlite;

use crate::domain::{
    Bet, BetKey, Identity, LedgerError, LedgerResult, Poll, PollOutcome, Profile, User, UserStats,
};
use async_trait::async_trait;

#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn save(&self, poll: &Poll) -> LedgerResult<()>;

    /// Overwrites title, status and outcome unconditionally. Options are
    /// fixed at creation. `NotFound` if absent.
    async fn update(&self, poll: &Poll) -> LedgerResult<()>;

    /// Open -> Closed as a single compare-and-set. Of any number of racing
    /// callers exactly one succeeds; the rest get `AlreadyClosed`.
    async fn close(&self, id: &str) -> LedgerResult<Poll>;

    /// Pending -> `outcome` on a closed poll as a single compare-and-set.
    ///
    /// Fails with `PollStillOpen` on an open poll and `OutcomeAlreadyDecided`
    /// once another outcome is stored. Requesting the stored outcome again
    /// returns the poll unchanged.
    async fn decide(&self, id: &str, outcome: PollOutcome) -> LedgerResult<Poll>;

    /// Administrative removal. `NotFound` if absent.
    async fn delete(&self, id: &str) -> LedgerResult<()>;

    async fn get_by_id(&self, id: &str) -> LedgerResult<Poll>;

    async fn get_open_polls(&self) -> LedgerResult<Vec<Poll>>;
}

#[async_trait]
pub trait BetRepository: Send + Sync {
    /// Inserts a new bet. The existence check and the insert are one
    /// indivisible step; a duplicate key yields `Conflict::UserAlreadyBet`.
    async fn save(&self, bet: &Bet) -> LedgerResult<()>;

    async fn get_by_key(&self, key: &BetKey) -> LedgerResult<Bet>;

    async fn get_bets_from_user(&self, user_id: &str) -> LedgerResult<Vec<Bet>>;

    async fn get_bets_by_poll(&self, poll_id: &str) -> LedgerResult<Vec<Bet>>;

    /// Overwrites the selection and status of an existing bet.
    async fn update_bet(&self, bet: &Bet) -> LedgerResult<()>;

    /// Won/lost counts grouped by user, one entry per user with any bet.
    async fn get_all_user_stats(&self) -> LedgerResult<Vec<UserStats>> {
        Err(LedgerError::Unimplemented("get_all_user_stats"))
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user and claims `identity` for it as one unit. If the
    /// identity is taken, fails with `Conflict::IdentityClaimed` and leaves
    /// no user behind.
    async fn save(&self, user_id: &str, profile: &Profile, identity: &Identity) -> LedgerResult<()>;

    /// Binds another identity to an existing user.
    async fn add_identity(&self, user_id: &str, identity: &Identity) -> LedgerResult<()>;

    async fn get_by_id(&self, user_id: &str) -> LedgerResult<User>;

    /// Blind-index lookup followed by decrypt-and-verify of every candidate.
    async fn get_by_external_id(&self, identity: &Identity) -> LedgerResult<User>;

    /// Removes the user and all of its identities together.
    async fn delete(&self, user_id: &str) -> LedgerResult<()>;

    async fn count(&self) -> LedgerResult<u64>;
}
