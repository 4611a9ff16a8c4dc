//! # dbkit PostgreSQL
//!
//! A pooled PostgreSQL client that times and logs every statement, wraps
//! mutating statements in explicit transactions and ships a differential
//! UPDATE builder ([`FieldValue`]).
//!
//! ```rust,no_run
//! use dbkit_postgres::{FieldValue, PostgresClient, PostgresConfig};
//!
//! # async fn example() -> dbkit_core::DbResult<()> {
//! let client = PostgresClient::connect(&PostgresConfig::from_env()?).await?;
//!
//! let ids = client
//!     .insert("User", "INSERT INTO users (name) VALUES ('Alice'), ('Bob')")
//!     .await?;
//!
//! let mut fv = FieldValue::new();
//! fv.set("Alice", "Alicia", "name");
//! let (query, _) = fv.update_query("users", &ids[0]);
//! client.update("User", &query).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod field_value;
pub mod pool;
pub mod row;

pub use client::PostgresClient;
pub use command::{StatementKind, statement_kind};
pub use config::PostgresConfig;
pub use field_value::{ArrayElement, FieldValue, SqlValue};
pub use pool::PostgresPoolHealth;
pub use row::FromRow;
