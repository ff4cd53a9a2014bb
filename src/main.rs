//! Long-running process: loads configuration, wires the services over the
//! relational backend and keeps them alive until Ctrl+C.
//!
//! The chat front end that drives the services lives outside this crate and
//! receives an `AppContext` from here.

use betting_ledger::infra::telemetry;
use betting_ledger::{AppContext, Config};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = Config::from_env()?;
    info!("> Connecting to {}", config.database_url);
    let (context, pool) = AppContext::connect(&config).await?;

    let open = context.polls.get_open_polls().await?;
    info!(open_polls = open.len(), "> Services initialized");
    match context.users.leaderboard().await {
        Ok(board) => {
            info!(bettors = board.len(), "> Leaderboard loaded");
            debug!(leaderboard = %serde_json::to_string(&board)?, "> Current standings");
        }
        Err(e) => warn!(error = %e, "> Could not load leaderboard"),
    }

    info!("> Press Ctrl+C to shut down");
    tokio::signal::ctrl_c().await?;
    info!("> Shutdown signal received, closing database pool");
    pool.close().await;
    info!("> Graceful shutdown complete.");
    Ok(())
}
