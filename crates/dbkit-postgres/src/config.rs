//! PostgreSQL connection configuration

use dbkit_core::env::{env_parse, env_required, env_string, split_hosts};
use dbkit_core::{DbError, DbResult, PoolSize};
use std::time::Duration;
use tokio_postgres::Config;

/// Port used for hosts given without one
pub const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// One or more `host[:port]` entries
    pub hosts: Vec<String>,
    /// Database name
    pub database: String,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: Option<String>,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Maximum number of pooled connections
    pub pool_size: PoolSize,
    /// Application name reported to the server
    pub application_name: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            hosts: vec![format!("localhost:{DEFAULT_PORT}")],
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: None,
            connect_timeout: 30,
            pool_size: PoolSize::default(),
            application_name: "dbkit".to_string(),
        }
    }
}

impl PostgresConfig {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            hosts: split_hosts(&host.into()),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Load from `PG_HOSTS`, `PG_USER`, `PG_PWD`, `PG_DB` and `PG_POOL_SIZE`.
    ///
    /// `PG_HOSTS` is required; the rest fall back to the defaults.
    pub fn from_env() -> DbResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            hosts: split_hosts(&env_required("PG_HOSTS")?),
            database: env_string("PG_DB").unwrap_or(defaults.database),
            user: env_string("PG_USER").unwrap_or(defaults.user),
            password: env_string("PG_PWD"),
            pool_size: env_parse("PG_POOL_SIZE")?.unwrap_or(defaults.pool_size),
            ..defaults
        })
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = Some(password.into());
        self
    }

    pub fn with_pool_size(mut self, pool_size: PoolSize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.hosts.is_empty() {
            return Err(DbError::invalid_config("Host cannot be empty"));
        }

        if self.database.is_empty() {
            return Err(DbError::invalid_config("Database name cannot be empty"));
        }

        if self.user.is_empty() {
            return Err(DbError::invalid_config("Username cannot be empty"));
        }

        for host in &self.hosts {
            let (name, _) = split_host_port(host)?;
            if name.is_empty() {
                return Err(DbError::invalid_config(format!("Invalid host '{host}'")));
            }
            if name.contains("..") || name.contains("//") {
                return Err(DbError::invalid_config(format!(
                    "Invalid host '{host}': potential path traversal detected"
                )));
            }
        }

        if !self
            .database
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DbError::invalid_config(
                "Database name contains invalid characters",
            ));
        }

        Ok(())
    }

    /// Build tokio_postgres Config
    pub fn build_pg_config(&self) -> DbResult<Config> {
        let mut config = Config::new();
        config
            .dbname(&self.database)
            .user(&self.user)
            .application_name(&self.application_name)
            .connect_timeout(Duration::from_secs(self.connect_timeout));

        for host in &self.hosts {
            let (name, port) = split_host_port(host)?;
            config.host(name).port(port);
        }

        if let Some(ref password) = self.password {
            config.password(password);
        }

        Ok(config)
    }

    /// Hosts joined for log lines
    pub fn display_hosts(&self) -> String {
        self.hosts.join(",")
    }
}

/// Split `host[:port]`, defaulting the port
fn split_host_port(entry: &str) -> DbResult<(&str, u16)> {
    match entry.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| DbError::invalid_config(format!("Invalid port in '{entry}'")))?;
            Ok((host, port))
        }
        None => Ok((entry, DEFAULT_PORT)),
    }
}
