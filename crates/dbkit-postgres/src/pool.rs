//! Connection pool construction and health reporting

use crate::config::PostgresConfig;
use dbkit_core::{DbError, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use std::time::Instant;
use tokio_postgres::NoTls;

/// Health status for the PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresPoolHealth {
    pub available_connections: usize,
    pub total_connections: usize,
    pub max_connections: usize,
    pub server_version: String,
    pub last_check: Instant,
}

/// Build the pool without opening any connection.
pub fn create_pool(config: &PostgresConfig) -> DbResult<Pool> {
    config.validate()?;

    let manager = Manager::from_config(
        config.build_pg_config()?,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    Pool::builder(manager)
        .max_size(config.pool_size.get())
        .build()
        .map_err(|e| DbError::invalid_config(format!("Failed to build PostgreSQL pool: {e}")))
}

/// Check out a connection and run `SELECT 1`.
pub async fn ping(pool: &Pool) -> DbResult<()> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    Ok(())
}

/// Pool status plus the server version string
pub async fn health_check(pool: &Pool) -> DbResult<PostgresPoolHealth> {
    let server_version = {
        let client = pool.get().await?;
        let row = client.query_one("SELECT version()", &[]).await?;
        row.try_get::<_, String>(0)?
    };

    let status = pool.status();
    Ok(PostgresPoolHealth {
        available_connections: status.available,
        total_connections: status.size,
        max_connections: status.max_size,
        server_version,
        last_check: Instant::now(),
    })
}
