//! Query logging capability
//!
//! Every façade call times itself and hands a [`QueryEvent`] to a
//! [`QueryRecorder`]. The recorder keeps the rendered line as the client's
//! "last query" and forwards the event to an injected [`QueryLogger`] unless
//! logging has been switched off for that client.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Backend a query line is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    /// Redis lines carry the logical database number
    Redis { db: i64 },
    ClickHouse,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => write!(f, "PG"),
            Backend::Redis { db } => write!(f, "Redis({db})"),
            Backend::ClickHouse => write!(f, "CH"),
        }
    }
}

/// Phase of an explicit transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxPhase::Begin => write!(f, "BEGIN"),
            TxPhase::Commit => write!(f, "COMMIT"),
            TxPhase::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

/// One timed call against a backend
#[derive(Debug, Clone, Copy)]
pub struct QueryEvent<'a> {
    pub backend: &'a Backend,
    /// Caller-supplied label, e.g. the model being loaded
    pub model: Option<&'a str>,
    pub operation: &'a str,
    pub elapsed: Duration,
    pub statement: &'a str,
}

impl QueryEvent<'_> {
    /// Elapsed time in fractional milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

impl fmt::Display for QueryEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.backend)?;
        if let Some(model) = self.model {
            write!(f, " {model}")?;
        }
        write!(f, " {} ({:.2} ms)", self.operation, self.elapsed_ms())?;
        if !self.statement.is_empty() {
            write!(f, " {}", self.statement)?;
        }
        Ok(())
    }
}

/// Sink for query lines and lifecycle messages
pub trait QueryLogger: Send + Sync {
    /// A timed call finished
    fn query(&self, event: &QueryEvent<'_>);

    /// Connection lifecycle (connected, disconnected, server version)
    fn info(&self, message: &str);

    /// A failure worth surfacing even when query lines are suppressed
    fn error(&self, message: &str);
}

/// Default logger: structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl QueryLogger for TracingLogger {
    fn query(&self, event: &QueryEvent<'_>) {
        tracing::debug!(
            backend = %event.backend,
            model = event.model.unwrap_or_default(),
            operation = event.operation,
            elapsed_ms = event.elapsed_ms(),
            statement = event.statement,
            "{event}"
        );
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Logger that keeps every rendered line in memory. Handy in tests.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines logged so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

impl QueryLogger for MemoryLogger {
    fn query(&self, event: &QueryEvent<'_>) {
        self.push(event.to_string());
    }

    fn info(&self, message: &str) {
        self.push(format!("INFO {message}"));
    }

    fn error(&self, message: &str) {
        self.push(format!("ERROR {message}"));
    }
}

/// Per-client timing log with a "last query" slot and a mute switch
pub struct QueryRecorder {
    backend: Backend,
    logger: Arc<dyn QueryLogger>,
    quiet: AtomicBool,
    last_query: Mutex<String>,
}

impl fmt::Debug for QueryRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRecorder")
            .field("backend", &self.backend)
            .field("quiet", &self.is_quiet())
            .finish_non_exhaustive()
    }
}

impl QueryRecorder {
    pub fn new(backend: Backend, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            backend,
            logger,
            quiet: AtomicBool::new(false),
            last_query: Mutex::new(String::new()),
        }
    }

    /// Recorder that logs through [`TracingLogger`]
    pub fn with_tracing(backend: Backend) -> Self {
        Self::new(backend, Arc::new(TracingLogger))
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn logger(&self) -> &Arc<dyn QueryLogger> {
        &self.logger
    }

    /// Stop (or resume) forwarding query lines to the logger.
    /// The last query is still recorded while muted.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    /// Rendered line of the most recent call
    pub fn last_query(&self) -> String {
        self.last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a call that started at `started` and just finished.
    pub fn record(&self, model: Option<&str>, operation: &str, started: Instant, statement: &str) {
        let event = QueryEvent {
            backend: &self.backend,
            model,
            operation,
            elapsed: started.elapsed(),
            statement,
        };

        *self
            .last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = event.to_string();

        if !self.is_quiet() {
            self.logger.query(&event);
        }
    }

    /// Log a transaction phase. Phases do not replace the last query.
    pub fn phase(&self, phase: TxPhase, started: Instant) {
        if self.is_quiet() {
            return;
        }
        let statement = phase.to_string();
        let event = QueryEvent {
            backend: &self.backend,
            model: None,
            operation: "TRANSACTION",
            elapsed: started.elapsed(),
            statement: &statement,
        };
        self.logger.query(&event);
    }

    pub fn info(&self, message: &str) {
        self.logger.info(message);
    }

    pub fn error(&self, message: &str) {
        self.logger.error(message);
    }
}
