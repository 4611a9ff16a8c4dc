//! ClickHouse façade
//!
//! Statements are sent as written. The driver's query builder would read `?`
//! as a bind placeholder, so every statement passes through [`raw_query`].

use crate::config::ClickHouseConfig;
use dbkit_core::literal::one_line;
use dbkit_core::{Backend, DbError, DbResult, QueryLogger, QueryRecorder, TracingLogger};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;

/// ClickHouse client bound to the first reachable host
pub struct ClickHouseClient {
    client: clickhouse::Client,
    url: String,
    recorder: QueryRecorder,
}

impl std::fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseClient")
            .field("url", &self.url)
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

impl ClickHouseClient {
    pub async fn connect(config: &ClickHouseConfig) -> DbResult<Self> {
        Self::connect_with_logger(config, Arc::new(TracingLogger)).await
    }

    /// Try the configured hosts in order and keep the first that reports its version.
    pub async fn connect_with_logger(
        config: &ClickHouseConfig,
        logger: Arc<dyn QueryLogger>,
    ) -> DbResult<Self> {
        config.validate()?;
        let recorder = QueryRecorder::new(Backend::ClickHouse, logger);

        let mut last_error = None;
        for url in config.urls() {
            let client = config.client_for(&url);
            match server_version(&client).await {
                Ok(version) => {
                    recorder.info(&format!(
                        "Connected to ClickHouse Database: hosts - {}, database - {}, user - {}",
                        config.display_hosts(),
                        config.database,
                        config.user
                    ));
                    recorder.info(&format!("ClickHouse Server Version: {version}"));
                    return Ok(Self {
                        client,
                        url,
                        recorder,
                    });
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "ClickHouse host unavailable");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        recorder.error(&format!("ClickHouse connection error: {reason}"));
        Err(DbError::connection_failed(format!(
            "ClickHouse {}: {reason}",
            config.display_hosts()
        )))
    }

    /// Wrap a driver client without checking it.
    pub fn from_client(client: clickhouse::Client, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            client,
            url: String::new(),
            recorder: QueryRecorder::new(Backend::ClickHouse, logger),
        }
    }

    /// The HTTP client holds no sessions, so stopping only logs.
    pub fn stop(&self) {
        self.recorder.info("Disconnected from ClickHouse Database");
    }

    /// Underlying driver client, for inserts of typed rows and other raw access
    pub fn client(&self) -> &clickhouse::Client {
        &self.client
    }

    /// Endpoint in use; empty for clients built with [`Self::from_client`]
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.recorder.set_quiet(quiet);
    }

    pub fn last_query(&self) -> String {
        self.recorder.last_query()
    }

    pub async fn version(&self) -> DbResult<String> {
        server_version(&self.client).await
    }

    /// Execute an INSERT statement.
    pub async fn insert(&self, model: &str, query: &str) -> DbResult<()> {
        self.execute(model, "Create", query).await
    }

    /// Execute a mutation. ClickHouse does not report affected rows, so this is always 0.
    pub async fn update(&self, model: &str, query: &str) -> DbResult<u64> {
        self.execute(model, "Update", query).await?;
        Ok(0)
    }

    /// Execute a statement without result (DDL and the like).
    pub async fn exec(&self, model: &str, query: &str) -> DbResult<()> {
        self.execute(model, "Exec", query).await
    }

    /// Single-row `count()` query
    pub async fn count(&self, model: &str, query: &str) -> DbResult<u64> {
        let started = Instant::now();
        let result = raw_query(&self.client, query).fetch_one::<u64>().await;
        self.recorder
            .record(Some(model), "Count", started, &one_line(query));
        Ok(result?)
    }

    /// Run `query` and deserialize every row into `T`.
    pub async fn select<T>(&self, model: &str, query: &str) -> DbResult<Vec<T>>
    where
        T: clickhouse::Row + DeserializeOwned,
    {
        let started = Instant::now();
        let result = raw_query(&self.client, query).fetch_all::<T>().await;
        self.log_select(model, query, started);
        Ok(result?)
    }

    /// Log a `Load` line for a query the caller ran and timed itself.
    pub fn log_select(&self, model: &str, query: &str, started: Instant) {
        self.recorder
            .record(Some(model), "Load", started, &one_line(query));
    }

    async fn execute(&self, model: &str, operation: &str, query: &str) -> DbResult<()> {
        let started = Instant::now();
        let result = raw_query(&self.client, query).execute().await;
        self.recorder
            .record(Some(model), operation, started, &one_line(query));
        Ok(result?)
    }
}

async fn server_version(client: &clickhouse::Client) -> DbResult<String> {
    let version = raw_query(client, "SELECT version()")
        .fetch_one::<String>()
        .await?;
    Ok(version)
}

/// Query for SQL without bind arguments: `?` is doubled so the builder keeps it literal.
fn raw_query(client: &clickhouse::Client, sql: &str) -> clickhouse::query::Query {
    client.query(&escape_placeholders(sql))
}

fn escape_placeholders(sql: &str) -> String {
    sql.replace('?', "??")
}
