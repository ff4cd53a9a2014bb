//! Domain records for polls, bets and users, plus the shared error type.

pub mod bet;
pub mod error;
pub mod poll;
pub mod user;

pub use bet::{is_valid_option_index, Bet, BetKey, BetStatus, UserStats, WinLoss};
pub use error::{Conflict, Entity, LedgerError, LedgerResult};
pub use poll::{Poll, PollOutcome, PollStatus, OPTION_COUNT};
pub use user::{Identity, Profile, User};
