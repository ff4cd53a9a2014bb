pub mod bet_service;
pub mod context;
pub mod poll_service;
pub mod user_service;

pub use bet_service::{BetService, Settlement};
pub use context::AppContext;
pub use poll_service::PollService;
pub use user_service::{LeaderboardEntry, UserService};
