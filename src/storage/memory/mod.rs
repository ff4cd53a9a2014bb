//! Non-persistent backend. Each store serializes its check-and-insert steps
//! through a single lock acquisition.

mod bet;
mod poll;
mod user;

pub use bet::InMemoryBetRepository;
pub use poll::InMemoryPollRepository;
pub use user::InMemoryUserRepository;
