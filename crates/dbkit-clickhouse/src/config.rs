//! ClickHouse connection configuration
//!
//! Hosts are `host[:port]` entries on the HTTP interface or full `http://` /
//! `https://` URLs. They are tried in the order given.

use dbkit_core::env::{env_bool, env_parse, env_required, env_string, split_hosts};
use dbkit_core::{DbError, DbResult};
use std::collections::BTreeMap;

/// HTTP interface port used for hosts given without one
pub const DEFAULT_PORT: u16 = 8123;

/// ClickHouse connection configuration
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub hosts: Vec<String>,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    /// Server side query limit in seconds
    pub max_execution_time: u64,
    /// Replicas that must acknowledge an insert
    pub insert_quorum: u32,
    /// Quorum wait in milliseconds
    pub insert_quorum_timeout: u64,
    /// LZ4 compression of request and response bodies
    pub lz4: bool,
    /// Additional server settings sent with every query
    pub settings: BTreeMap<String, String>,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            hosts: vec![format!("localhost:{DEFAULT_PORT}")],
            database: "default".to_string(),
            user: "default".to_string(),
            password: None,
            max_execution_time: 60,
            insert_quorum: 2,
            insert_quorum_timeout: 60_000,
            lz4: true,
            settings: BTreeMap::new(),
        }
    }
}

impl ClickHouseConfig {
    /// Config for a comma separated host list
    pub fn new(hosts: &str, database: impl Into<String>) -> Self {
        Self {
            hosts: split_hosts(hosts),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Load from `CH_HOSTS`, `CH_USER`, `CH_PWD` and `CH_DB`.
    ///
    /// `CH_MAX_EXECUTION_TIME`, `CH_INSERT_QUORUM`, `CH_INSERT_QUORUM_TIMEOUT`
    /// and `CH_LZ4` override the server settings.
    pub fn from_env() -> DbResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            hosts: split_hosts(&env_required("CH_HOSTS")?),
            database: env_string("CH_DB").unwrap_or(defaults.database),
            user: env_string("CH_USER").unwrap_or(defaults.user),
            password: env_string("CH_PWD"),
            max_execution_time: env_parse("CH_MAX_EXECUTION_TIME")?
                .unwrap_or(defaults.max_execution_time),
            insert_quorum: env_parse("CH_INSERT_QUORUM")?.unwrap_or(defaults.insert_quorum),
            insert_quorum_timeout: env_parse("CH_INSERT_QUORUM_TIMEOUT")?
                .unwrap_or(defaults.insert_quorum_timeout),
            lz4: env_bool("CH_LZ4")?.unwrap_or(defaults.lz4),
            settings: defaults.settings,
        })
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = Some(password.into());
        self
    }

    pub fn with_insert_quorum(mut self, quorum: u32, timeout_ms: u64) -> Self {
        self.insert_quorum = quorum;
        self.insert_quorum_timeout = timeout_ms;
        self
    }

    pub fn with_max_execution_time(mut self, seconds: u64) -> Self {
        self.max_execution_time = seconds;
        self
    }

    pub fn with_lz4(mut self, enabled: bool) -> Self {
        self.lz4 = enabled;
        self
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.hosts.is_empty() {
            return Err(DbError::invalid_config("ClickHouse hosts cannot be empty"));
        }
        if self.hosts.iter().any(|h| h.is_empty()) {
            return Err(DbError::invalid_config("ClickHouse host cannot be empty"));
        }
        if self.database.is_empty() {
            return Err(DbError::invalid_config("Database name cannot be empty"));
        }
        if self.user.is_empty() {
            return Err(DbError::invalid_config("Username cannot be empty"));
        }
        Ok(())
    }

    /// Server settings in the order they are sent
    pub fn server_settings(&self) -> Vec<(String, String)> {
        let mut settings = vec![
            (
                "max_execution_time".to_string(),
                self.max_execution_time.to_string(),
            ),
            ("insert_quorum".to_string(), self.insert_quorum.to_string()),
            (
                "insert_quorum_timeout".to_string(),
                self.insert_quorum_timeout.to_string(),
            ),
        ];
        settings.extend(
            self.settings
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        settings
    }

    /// One HTTP endpoint per host, in connection order
    pub fn urls(&self) -> Vec<String> {
        self.hosts.iter().map(|host| host_url(host)).collect()
    }

    pub fn display_hosts(&self) -> String {
        self.hosts.join(",")
    }

    /// Driver client for one endpoint with credentials, database and settings applied
    pub fn client_for(&self, url: &str) -> clickhouse::Client {
        let compression = if self.lz4 {
            clickhouse::Compression::Lz4
        } else {
            clickhouse::Compression::None
        };

        let mut client = clickhouse::Client::default()
            .with_url(url)
            .with_database(&self.database)
            .with_user(&self.user)
            .with_compression(compression);

        if let Some(password) = &self.password {
            client = client.with_password(password);
        }

        for (name, value) in self.server_settings() {
            client = client.with_option(name, value);
        }

        client
    }
}

fn host_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }
    if host.contains(':') {
        format!("http://{host}")
    } else {
        format!("http://{host}:{DEFAULT_PORT}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ch1", "http://ch1:8123")]
    #[case("ch1:9000", "http://ch1:9000")]
    #[case("https://ch.example.com:8443", "https://ch.example.com:8443")]
    fn test_host_url(#[case] host: &str, #[case] expected: &str) {
        assert_eq!(host_url(host), expected);
    }

    #[test]
    fn test_hosts_keep_order() {
        let config = ClickHouseConfig::new("b:8123, a:8123", "events");
        assert_eq!(config.urls(), vec!["http://b:8123", "http://a:8123"]);
        assert_eq!(config.display_hosts(), "b:8123,a:8123");
    }

    #[test]
    fn test_default_settings() {
        let config = ClickHouseConfig::default().with_setting("async_insert", "1");
        assert_eq!(
            config.server_settings(),
            vec![
                ("max_execution_time".to_string(), "60".to_string()),
                ("insert_quorum".to_string(), "2".to_string()),
                ("insert_quorum_timeout".to_string(), "60000".to_string()),
                ("async_insert".to_string(), "1".to_string()),
            ]
        );
        assert!(config.lz4);
    }

    #[test]
    fn test_validation() {
        assert!(ClickHouseConfig::default().validate().is_ok());
        assert!(ClickHouseConfig::new("", "db").validate().is_err());
        assert!(ClickHouseConfig::new("ch", "").validate().is_err());
    }
}
