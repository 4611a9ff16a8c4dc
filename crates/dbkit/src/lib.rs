//! # dbkit
//!
//! Thin, logging façades over three database clients. Each backend lives in
//! its own crate and is enabled here through a cargo feature:
//!
//! - `postgres`: pooled PostgreSQL client with transactional writes and the
//!   differential UPDATE builder [`postgres::FieldValue`]
//! - `redis`: single-instance or cluster Redis client with lists, the
//!   conditional push script and stream consumer groups
//! - `clickhouse`: ClickHouse client and datetime literal helpers
//!
//! Every client times each call and reports it through an injected
//! [`QueryLogger`]; the default logger emits `tracing` debug events.
//!
//! ```rust,ignore
//! use dbkit::redis::{RedisClient, RedisConfig};
//!
//! let redis = RedisClient::connect(&RedisConfig::from_env()?).await?;
//! redis.set("greeting", "hello", 60).await?;
//! assert_eq!(redis.get("greeting", "").await?, "hello");
//! ```

// ============================================================================
// Backends
// ============================================================================

pub use dbkit_core;

#[cfg(feature = "postgres")]
pub use dbkit_postgres as postgres;

#[cfg(feature = "redis")]
pub use dbkit_redis as redis;

#[cfg(feature = "clickhouse")]
pub use dbkit_clickhouse as clickhouse;

// ============================================================================
// Shared types
// ============================================================================

pub use dbkit_core::{DbError, DbResult, PoolSize, PoolSizeError};

pub use dbkit_core::{
    Backend, MemoryLogger, QueryEvent, QueryLogger, QueryRecorder, TracingLogger, TxPhase,
};

pub use dbkit_core::{ArrayLiteral, array_to_string, escape, one_line, strings_to_string};

// ============================================================================
// Clients
// ============================================================================

#[cfg(feature = "postgres")]
pub use dbkit_postgres::{FieldValue, FromRow, PostgresClient, PostgresConfig};

#[cfg(feature = "redis")]
pub use dbkit_redis::{RedisClient, RedisConfig, Set};

#[cfg(feature = "clickhouse")]
pub use dbkit_clickhouse::{ClickHouseClient, ClickHouseConfig};
