//! # dbkit ClickHouse
//!
//! A ClickHouse client that times and logs every statement as
//! `CH <model> <operation> (<ms>) <sql>`, plus helpers that render datetimes
//! as ClickHouse literals.
//!
//! ```rust,no_run
//! use dbkit_clickhouse::{ClickHouseClient, ClickHouseConfig, time_to_string};
//!
//! # async fn example() -> dbkit_core::DbResult<()> {
//! let ch = ClickHouseClient::connect(&ClickHouseConfig::from_env()?).await?;
//!
//! let now = chrono::Utc::now();
//! ch.insert(
//!     "Event",
//!     &format!("INSERT INTO events (name, at) VALUES ('login', {})", time_to_string(&now)),
//! )
//! .await?;
//! let total = ch.count("Event", "SELECT count() FROM events").await?;
//! # let _ = total;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod time;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use time::{time_to_string, time_to_string32};
