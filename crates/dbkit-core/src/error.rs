//! Error vocabulary shared by every backend
//!
//! The named variants are the conditions callers are expected to branch on.
//! Driver errors are carried through unchanged (`#[error(transparent)]`) and
//! only exist when the matching cargo feature is enabled, so a crate that
//! talks to Redis never links the PostgreSQL driver and vice versa.

use thiserror::Error;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors returned by the database façades
#[derive(Error, Debug)]
pub enum DbError {
    /// Caller passed arguments the operation cannot work with
    #[error("incorrect parameters")]
    IncorrectParameters,

    /// Statement was executed but was not the kind of statement expected
    #[error("incorrect request")]
    IncorrectRequest,

    /// Generic database-side failure
    #[error("database error")]
    DatabaseError,

    /// Requested entity does not exist
    #[error("not found")]
    NotFound,

    /// Returned identifier could not be represented
    #[error("incorrect ID")]
    IncorrectId,

    /// Conditional push refused because the list already has elements
    #[error("list is not empty")]
    ListIsNotEmpty,

    /// Consumer group creation hit an existing group
    #[error("consumer group already exists")]
    GroupAlreadyExists,

    /// Configuration rejected before any connection was attempted
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Startup could not reach the server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// JSON encoding of a column value failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresPool(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[cfg(feature = "redis")]
    #[error(transparent)]
    RedisPool(#[from] deadpool_redis::PoolError),

    #[cfg(feature = "clickhouse")]
    #[error(transparent)]
    ClickHouse(#[from] clickhouse::error::Error),
}

impl DbError {
    /// Build a configuration error from any message
    pub fn invalid_config(message: impl Into<String>) -> Self {
        DbError::InvalidConfig(message.into())
    }

    /// Build a connection error from any message
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DbError::ConnectionFailed(message.into())
    }

    /// True for the `NotFound` sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound)
    }

    /// True for errors produced by this crate rather than a driver
    pub fn is_sentinel(&self) -> bool {
        matches!(
            self,
            DbError::IncorrectParameters
                | DbError::IncorrectRequest
                | DbError::DatabaseError
                | DbError::NotFound
                | DbError::IncorrectId
                | DbError::ListIsNotEmpty
                | DbError::GroupAlreadyExists
        )
    }
}
