//! The closed set of failures surfaced by repositories and services.
//!
//! Callers branch on the variant, never on the rendered message.

use crate::crypto::CryptoError;
use std::fmt;
use thiserror::Error;

/// The kind of record an operation could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Poll,
    Bet,
    User,
    Identity,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Poll => "poll",
            Entity::Bet => "bet",
            Entity::User => "user",
            Entity::Identity => "identity",
        };
        f.write_str(name)
    }
}

/// Uniqueness rules that a write can collide with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// A bet already exists for this (poll, user) pair.
    UserAlreadyBet,
    /// The (provider, external id) pair is bound to a user already.
    IdentityClaimed,
    /// A poll with this identifier is already stored.
    PollExists,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::UserAlreadyBet => f.write_str("user already placed a bet on this poll"),
            Conflict::IdentityClaimed => f.write_str("identity is already bound to a user"),
            Conflict::PollExists => f.write_str("poll already exists"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("conflict: {0}")]
    Conflict(Conflict),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("poll is closed")]
    PollClosed,

    #[error("poll is already closed")]
    AlreadyClosed,

    #[error("poll is still open")]
    PollStillOpen,

    #[error("poll outcome was already decided")]
    OutcomeAlreadyDecided,

    #[error("poll outcome is still pending")]
    OutcomePending,

    /// A stored Won/Lost status contradicts the poll's outcome. Settled bets
    /// are terminal, so this is reported instead of rewritten.
    #[error("bet by {user_id} on poll {poll_id} was settled against a different outcome")]
    SettledBetMismatch { poll_id: String, user_id: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("{0} is not implemented by this backend")]
    Unimplemented(&'static str),

    #[error("storage failure while {context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl LedgerError {
    /// Wraps a backend failure with the operation that produced it.
    pub fn storage(context: &'static str, source: sqlx::Error) -> Self {
        LedgerError::Storage { context, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
