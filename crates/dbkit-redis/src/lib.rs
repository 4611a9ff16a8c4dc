//! # dbkit Redis
//!
//! A pooled Redis client that works the same against a single instance and a
//! cluster. Every call is timed and logged as a `Redis(<db>)` line; lists,
//! an atomic "push only if empty" script and consumer-group streams are
//! covered on top of plain strings.
//!
//! ```rust,no_run
//! use dbkit_redis::{RedisClient, RedisConfig, Set};
//!
//! # async fn example() -> dbkit_core::DbResult<()> {
//! // "a:7000,b:7001" would select cluster mode
//! let redis = RedisClient::connect(&RedisConfig::new("localhost:6379")).await?;
//!
//! redis.set("greeting", "hello", 60).await?;
//! assert_eq!(redis.get("greeting", "").await?, "hello");
//!
//! redis
//!     .multi_set(&[Set::new("{user:1}:name", "Ann", 0), Set::new("{user:1}:age", "31", 0)])
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod pool;
pub mod streams;

pub use client::{RedisClient, Set};
pub use config::{RedisConfig, RedisDeployment};
pub use pool::{KvConnection, KvPool, PoolStatus};
pub use redis::Direction;
pub use redis::streams::{StreamAutoClaimReply, StreamId, StreamKey};
pub use streams::{XAddArgs, XAutoClaimArgs, XReadGroupArgs};
