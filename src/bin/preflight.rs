use betting_ledger::crypto::{CipherService, CryptoService};
use betting_ledger::infra::{config, telemetry};
use betting_ledger::storage::sqlite;
use betting_ledger::Config;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-db]\n\
         \n\
         Requires env vars:\n\
           {}, {}\n\
         Optional:\n\
           {}, RUST_LOG\n",
        config::DATABASE_URL,
        config::ENCRYPTION_KEY,
        config::DATABASE_MAX_CONNECTIONS
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_db = args.iter().any(|a| a == "--skip-db");

    // Force-read config (nice error messages if missing)
    let config = Config::from_env()?;
    println!("> Preflight:");
    println!("  DATABASE_URL={}", config.database_url);
    println!("  DATABASE_MAX_CONNECTIONS={}", config.max_connections);
    println!("  ENCRYPTION_KEY=<32 bytes>");

    // The key must round-trip and index deterministically before anything is stored under it.
    let crypto = CipherService::new(&config.encryption_key);
    let probe = "preflight-probe";
    let token = crypto.encrypt(probe)?;
    if crypto.decrypt(&token)? != probe {
        return Err(anyhow::anyhow!("decrypt(encrypt(x)) did not return x"));
    }
    if crypto.encrypt(probe)? == token {
        return Err(anyhow::anyhow!("encryption is not randomized"));
    }
    if crypto.blind_index(probe) != crypto.blind_index(probe) {
        return Err(anyhow::anyhow!("blind index is not deterministic"));
    }
    println!("  Crypto round-trip ok.");

    if skip_db {
        println!("> Preflight OK (database skipped).");
        return Ok(());
    }

    let pool = sqlite::connect(&config.database_url, config.max_connections)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", config.database_url, e))?;
    println!("  Schema is in place.");

    for table in ["polls", "poll_options", "bets", "users", "user_identities"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await?;
        println!("  {}: {} rows", table, count);
    }

    // Stored identities must decrypt under the configured key.
    let sample: Option<String> =
        sqlx::query_scalar("SELECT external_id_ciphertext FROM user_identities LIMIT 1")
            .fetch_optional(&pool)
            .await?;
    if let Some(token) = sample {
        crypto.decrypt(&token).map_err(|e| {
            anyhow::anyhow!("Stored identities do not decrypt with ENCRYPTION_KEY: {}", e)
        })?;
        println!("  Stored identities decrypt with the configured key.");
    }

    pool.close().await;
    println!("> Preflight OK.");
    Ok(())
}
