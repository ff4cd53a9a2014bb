// src/bet_contention.rs
// Races many concurrent bets from one user on one poll and reports how the backend resolved them.
use std::time::Instant;

use betting_ledger::crypto::SecretKey;
use betting_ledger::storage::sqlite;
use betting_ledger::{AppContext, CipherService, LedgerError};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let attempts: usize = std::env::args()
        .nth(1)
        .map(|s| s.parse::<usize>())
        .transpose()?
        .unwrap_or(64);
    let backend = std::env::args().nth(2).unwrap_or_else(|| "sqlite".to_string());

    println!(
        "--- Bet Contention Test: {} concurrent bets on the {} backend ---",
        attempts, backend
    );

    let key = SecretKey::generate();
    let context = match backend.as_str() {
        "memory" => AppContext::in_memory(&key),
        "sqlite" => {
            let pool = sqlite::connect("sqlite::memory:", 1).await?;
            AppContext::with_pool(pool, Arc::new(CipherService::new(&key)))
        }
        other => anyhow::bail!("unknown backend '{}', expected 'memory' or 'sqlite'", other),
    };

    let poll = context
        .polls
        .create_poll("Contended poll", vec!["Heads".to_string(), "Tails".to_string()])
        .await?;

    let start_time = Instant::now();

    let mut handles = Vec::with_capacity(attempts);
    for i in 0..attempts {
        let bets = context.bets.clone();
        let poll_id = poll.id().to_string();
        handles.push(tokio::spawn(async move {
            bets.create_bet(&poll_id, "contender", i % 2).await
        }));
    }

    let (mut placed, mut conflicts, mut other_errors) = (0usize, 0usize, 0usize);
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(LedgerError::Conflict(_)) => conflicts += 1,
            Err(err) => {
                eprintln!("unexpected error: {}", err);
                other_errors += 1;
            }
        }
    }

    let duration = start_time.elapsed();
    let stored = context.bets.get_bets_by_poll(poll.id()).await?.len();

    println!("\n--- Results ---");
    println!("Placed:       {}", placed);
    println!("Conflicts:    {}", conflicts);
    println!("Other errors: {}", other_errors);
    println!("Stored bets:  {}", stored);
    println!("\nTotal time: {} ms", duration.as_millis());

    if placed != 1 || stored != 1 || other_errors != 0 {
        anyhow::bail!("exactly one bet must win the race");
    }
    Ok(())
}
