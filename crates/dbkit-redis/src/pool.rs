//! Single-instance or cluster connection pool behind one type
//!
//! [`KvPool`] is chosen once from the deployment. The connections it hands
//! out implement [`ConnectionLike`], so every command, pipeline and script is
//! written once against [`KvConnection`] and the driver does the routing.

use crate::config::{RedisConfig, RedisDeployment};
use dbkit_core::{DbError, DbResult};
use deadpool_redis::Runtime;
use redis::aio::ConnectionLike;
use redis::{Cmd, Pipeline, RedisFuture, Value};

/// Pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    pub size: usize,
    pub available: usize,
}

/// Connection pool for either deployment
#[derive(Clone)]
pub enum KvPool {
    Single(deadpool_redis::Pool),
    Cluster(deadpool_redis::cluster::Pool),
}

impl std::fmt::Debug for KvPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.is_cluster() { "Cluster" } else { "Single" };
        f.debug_struct("KvPool")
            .field("mode", &mode)
            .field("status", &self.status())
            .finish()
    }
}

impl KvPool {
    /// Create the pool for the configured deployment. No connection is opened.
    pub fn create(config: &RedisConfig) -> DbResult<Self> {
        config.validate()?;

        let mut infos = config.connection_infos()?;
        let pool = match &config.deployment {
            RedisDeployment::Standalone { .. } => {
                let info = infos
                    .pop()
                    .ok_or_else(|| DbError::invalid_config("Redis host cannot be empty"))?;
                let mut pool_config = deadpool_redis::Config::from_connection_info(info);
                pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size.get()));
                let pool = pool_config
                    .create_pool(Some(Runtime::Tokio1))
                    .map_err(|e| {
                        DbError::invalid_config(format!("Failed to create connection pool: {e}"))
                    })?;
                KvPool::Single(pool)
            }
            RedisDeployment::Cluster { .. } => {
                if config.database != 0 {
                    tracing::warn!(
                        database = config.database,
                        "Redis cluster does not support database selection, using 0"
                    );
                }
                let mut pool_config = deadpool_redis::cluster::Config {
                    urls: None,
                    connections: Some(infos.into_iter().map(Into::into).collect()),
                    ..Default::default()
                };
                pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size.get()));
                let pool = pool_config
                    .create_pool(Some(Runtime::Tokio1))
                    .map_err(|e| {
                        DbError::invalid_config(format!("Failed to create cluster pool: {e}"))
                    })?;
                KvPool::Cluster(pool)
            }
        };

        Ok(pool)
    }

    /// Check out a connection
    pub async fn get(&self) -> DbResult<KvConnection> {
        Ok(match self {
            KvPool::Single(pool) => KvConnection::Single(pool.get().await?),
            KvPool::Cluster(pool) => KvConnection::Cluster(pool.get().await?),
        })
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, KvPool::Cluster(_))
    }

    pub fn status(&self) -> PoolStatus {
        let (max_size, size, available) = match self {
            KvPool::Single(pool) => {
                let s = pool.status();
                (s.max_size, s.size, s.available)
            }
            KvPool::Cluster(pool) => {
                let s = pool.status();
                (s.max_size, s.size, s.available)
            }
        };
        PoolStatus {
            max_size,
            size,
            available,
        }
    }

    /// Close the pool; checked out connections are dropped when returned.
    pub fn close(&self) {
        match self {
            KvPool::Single(pool) => pool.close(),
            KvPool::Cluster(pool) => pool.close(),
        }
    }
}

/// Pooled connection of either deployment
pub enum KvConnection {
    Single(deadpool_redis::Connection),
    Cluster(deadpool_redis::cluster::Connection),
}

impl ConnectionLike for KvConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            KvConnection::Single(conn) => conn.req_packed_command(cmd),
            KvConnection::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            KvConnection::Single(conn) => conn.req_packed_commands(cmd, offset, count),
            KvConnection::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            KvConnection::Single(conn) => conn.get_db(),
            KvConnection::Cluster(conn) => conn.get_db(),
        }
    }
}
