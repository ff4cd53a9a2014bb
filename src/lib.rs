pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;

// Convenience re-exports
pub use app::{AppContext, BetService, PollService, UserService};
pub use crypto::{CipherService, CryptoService, SecretKey};
pub use domain::{
    Bet, BetStatus, Conflict, Entity, Identity, LedgerError, LedgerResult, Poll, PollOutcome,
    PollStatus, Profile, User, UserStats, WinLoss,
};
pub use infra::config::Config;
