//! `dbkit ping`: connect with the environment configuration and report the server

use clap::ValueEnum;
use dbkit::DbResult;
use dbkit::clickhouse::{ClickHouseClient, ClickHouseConfig};
use dbkit::postgres::{PostgresClient, PostgresConfig};
use dbkit::redis::{RedisClient, RedisConfig};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Postgres,
    Redis,
    Clickhouse,
}

/// Connect, ask the server for a sign of life and disconnect.
///
/// Returns a one-line summary for the terminal.
pub async fn run_ping(target: Target) -> DbResult<String> {
    let started = Instant::now();

    let reply = match target {
        Target::Postgres => {
            let client = PostgresClient::connect(&PostgresConfig::from_env()?).await?;
            let health = client.health_check().await;
            client.stop();
            let health = health?;
            format!(
                "{} ({}/{} connections available)",
                health.server_version, health.available_connections, health.max_connections
            )
        }
        Target::Redis => {
            let client = RedisClient::connect(&RedisConfig::from_env()?).await?;
            let pong = client.ping().await;
            let mode = if client.is_cluster() { "cluster" } else { "single" };
            client.stop();
            format!("{} ({mode})", pong?)
        }
        Target::Clickhouse => {
            let client = ClickHouseClient::connect(&ClickHouseConfig::from_env()?).await?;
            let version = client.version().await;
            client.stop();
            format!("ClickHouse {}", version?)
        }
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(backend = ?target, elapsed_ms, "ping succeeded");

    Ok(format!("{target:?}: {reply} in {elapsed_ms:.2} ms"))
}
