//! # dbkit core
//!
//! Shared building blocks for the dbkit database façades: the error
//! vocabulary, SQL literal helpers, the query logging capability, environment
//! helpers and the validated pool size.
//!
//! Driver error conversions are enabled per backend through the `postgres`,
//! `redis` and `clickhouse` features.

pub mod env;
pub mod error;
pub mod literal;
pub mod logging;
pub mod pool_size;

pub use error::{DbError, DbResult};
pub use literal::{ArrayLiteral, array_to_string, escape, one_line, strings_to_string};
pub use logging::{
    Backend, MemoryLogger, QueryEvent, QueryLogger, QueryRecorder, TracingLogger, TxPhase,
};
pub use pool_size::{PoolSize, PoolSizeError};
