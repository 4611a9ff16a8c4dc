//! PostgreSQL façade
//!
//! Every call is timed and logged as `PG <model> <operation> (<ms>) <sql>`.
//! Mutating calls run in an explicit transaction that is rolled back on any
//! error; BEGIN, COMMIT and ROLLBACK are logged with their own timings.

use crate::command::{StatementKind, statement_kind};
use crate::config::PostgresConfig;
use crate::pool::{self, PostgresPoolHealth};
use crate::row::{FromRow, unsigned_column};
use dbkit_core::literal::one_line;
use dbkit_core::{Backend, DbError, DbResult, QueryLogger, QueryRecorder, TracingLogger, TxPhase};
use deadpool_postgres::{Object, Pool, Transaction};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Pooled PostgreSQL client with query timing
pub struct PostgresClient {
    pool: Pool,
    recorder: QueryRecorder,
}

impl std::fmt::Debug for PostgresClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresClient")
            .field("status", &self.pool.status())
            .field("recorder", &self.recorder)
            .finish()
    }
}

impl PostgresClient {
    /// Build the pool, ping the server and log the connection.
    pub async fn connect(config: &PostgresConfig) -> DbResult<Self> {
        Self::connect_with_logger(config, Arc::new(TracingLogger)).await
    }

    pub async fn connect_with_logger(
        config: &PostgresConfig,
        logger: Arc<dyn QueryLogger>,
    ) -> DbResult<Self> {
        let pool = pool::create_pool(config)?;
        let recorder = QueryRecorder::new(Backend::Postgres, logger);

        if let Err(e) = pool::ping(&pool).await {
            recorder.error(&format!("PostgreSQL connection error: {e}"));
            return Err(DbError::connection_failed(format!(
                "PostgreSQL {}: {e}",
                config.display_hosts()
            )));
        }

        recorder.info(&format!(
            "Connected to PostgreSQL Database: hosts - {}, database - {}, user - {}",
            config.display_hosts(),
            config.database,
            config.user
        ));

        Ok(Self { pool, recorder })
    }

    /// Wrap an existing pool without pinging it.
    pub fn from_pool(pool: Pool, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            pool,
            recorder: QueryRecorder::new(Backend::Postgres, logger),
        }
    }

    /// Close the pool. Checked out connections are dropped when returned.
    pub fn stop(&self) {
        self.pool.close();
        self.recorder.info("Disconnected from PostgreSQL Database");
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Suppress (or resume) query lines
    pub fn set_quiet(&self, quiet: bool) {
        self.recorder.set_quiet(quiet);
    }

    pub fn last_query(&self) -> String {
        self.recorder.last_query()
    }

    /// Run `query` and map every row through [`FromRow`].
    pub async fn select<T: FromRow>(&self, model: &str, query: &str) -> DbResult<Vec<T>> {
        let started = Instant::now();
        let result = self.fetch_rows(query).await;
        self.log_select(model, query, started);
        result
    }

    /// Log a `Load` line for a query the caller ran and timed itself.
    pub fn log_select(&self, model: &str, query: &str, started: Instant) {
        self.recorder
            .record(Some(model), "Load", started, &one_line(query));
    }

    /// Execute `<query> RETURNING id` and collect the integer ids in row order.
    pub async fn insert(&self, model: &str, query: &str) -> DbResult<Vec<u64>> {
        self.insert_returning(model, query, |row| {
            unsigned_column(row, 0)?.ok_or(DbError::IncorrectId)
        })
        .await
    }

    /// Execute `<query> RETURNING id` and collect the UUID ids in row order.
    pub async fn insert_uuid(&self, model: &str, query: &str) -> DbResult<Vec<Uuid>> {
        self.insert_returning(model, query, |row| Ok(row.try_get::<_, Uuid>(0)?))
            .await
    }

    /// Execute an UPDATE and return the number of affected rows.
    ///
    /// An empty query is a no-op returning 0. A statement that is not an
    /// UPDATE is rolled back with [`DbError::IncorrectRequest`].
    pub async fn update(&self, model: &str, query: &str) -> DbResult<u64> {
        if query.is_empty() {
            return Ok(0);
        }
        self.execute_checked(model, "Update", StatementKind::Update, query)
            .await
    }

    /// Execute a DELETE and return the number of affected rows.
    pub async fn delete(&self, model: &str, query: &str) -> DbResult<u64> {
        self.execute_checked(model, "Delete", StatementKind::Delete, query)
            .await
    }

    /// Single-row count query, outside of a transaction
    pub async fn count(&self, model: &str, query: &str) -> DbResult<u64> {
        self.scalar(model, "Count", query).await
    }

    /// Single-row maximum query, outside of a transaction. NULL reads as 0.
    pub async fn max(&self, model: &str, query: &str) -> DbResult<u64> {
        self.scalar(model, "MAX", query).await
    }

    /// Execute a statement outside of a transaction, discarding the result.
    pub async fn exec(&self, model: &str, query: &str) -> DbResult<()> {
        let started = Instant::now();
        let result = self.execute_plain(query).await;
        self.recorder
            .record(Some(model), "Exec", started, &one_line(query));
        result
    }

    pub async fn health_check(&self) -> DbResult<PostgresPoolHealth> {
        pool::health_check(&self.pool).await
    }

    async fn scalar(&self, model: &str, operation: &str, query: &str) -> DbResult<u64> {
        let started = Instant::now();
        let result = self.fetch_unsigned(query).await;
        self.recorder
            .record(Some(model), operation, started, &one_line(query));
        result
    }

    async fn fetch_rows<T: FromRow>(&self, query: &str) -> DbResult<Vec<T>> {
        let client = self.pool.get().await?;
        let rows = client.query(query, &[]).await?;
        rows.iter().map(T::from_row).collect()
    }

    async fn fetch_unsigned(&self, query: &str) -> DbResult<u64> {
        let client = self.pool.get().await?;
        let row = client.query_one(query, &[]).await?;
        Ok(unsigned_column(&row, 0)?.unwrap_or(0))
    }

    async fn execute_plain(&self, query: &str) -> DbResult<()> {
        let client = self.pool.get().await?;
        client.execute(query, &[]).await?;
        Ok(())
    }

    async fn insert_returning<T, F>(&self, model: &str, query: &str, read_id: F) -> DbResult<Vec<T>>
    where
        F: Fn(&tokio_postgres::Row) -> DbResult<T>,
    {
        let mut client = self.pool.get().await?;
        let tx = self.begin(&mut client).await?;

        let started = Instant::now();
        let statement = format!("{query} RETURNING id");
        let rows = tx.query(statement.as_str(), &[]).await;
        self.recorder
            .record(Some(model), "Create", started, &one_line(query));

        let ids = rows
            .map_err(DbError::from)
            .and_then(|rows| rows.iter().map(&read_id).collect::<DbResult<Vec<T>>>());

        match ids {
            Ok(ids) => {
                self.commit(tx).await?;
                Ok(ids)
            }
            Err(e) => {
                self.recorder.error(&e.to_string());
                self.rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn execute_checked(
        &self,
        model: &str,
        operation: &str,
        expected: StatementKind,
        query: &str,
    ) -> DbResult<u64> {
        let mut client = self.pool.get().await?;
        let tx = self.begin(&mut client).await?;

        let started = Instant::now();
        let result = tx.execute(query, &[]).await;
        self.recorder
            .record(Some(model), operation, started, &one_line(query));

        let affected = result.map_err(DbError::from).and_then(|affected| {
            if statement_kind(query) == expected {
                Ok(affected)
            } else {
                Err(DbError::IncorrectRequest)
            }
        });

        match affected {
            Ok(affected) => {
                self.commit(tx).await?;
                Ok(affected)
            }
            Err(e) => {
                self.recorder.error(&e.to_string());
                self.rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn begin<'a>(&self, client: &'a mut Object) -> DbResult<Transaction<'a>> {
        let started = Instant::now();
        let tx = client.transaction().await;
        self.recorder.phase(TxPhase::Begin, started);
        Ok(tx?)
    }

    async fn commit(&self, tx: Transaction<'_>) -> DbResult<()> {
        let started = Instant::now();
        let result = tx.commit().await;
        self.recorder.phase(TxPhase::Commit, started);
        Ok(result?)
    }

    /// Roll back, keeping the error that caused it as the one returned
    async fn rollback(&self, tx: Transaction<'_>) {
        let started = Instant::now();
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "PostgreSQL rollback failed");
        }
        self.recorder.phase(TxPhase::Rollback, started);
    }
}
