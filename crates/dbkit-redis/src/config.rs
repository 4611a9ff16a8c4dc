//! Redis connection configuration
//!
//! A host string with a comma selects a cluster deployment, anything else a
//! single instance. Entries are `host[:port]` or full `redis://` URLs.

use dbkit_core::env::{env_parse, env_required, env_string, split_hosts};
use dbkit_core::{DbError, DbResult, PoolSize};
use redis::{ConnectionInfo, IntoConnectionInfo};

/// Port used for hosts given without one
pub const DEFAULT_PORT: u16 = 6379;

/// Redis deployment configuration types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisDeployment {
    /// Single Redis instance
    Standalone { host: String },
    /// Redis Cluster deployment, seeded from these nodes
    Cluster { nodes: Vec<String> },
}

impl RedisDeployment {
    /// Pick the deployment from a host string: a comma means cluster.
    pub fn from_hosts(hosts: &str) -> Self {
        if hosts.contains(',') {
            RedisDeployment::Cluster {
                nodes: split_hosts(hosts),
            }
        } else {
            RedisDeployment::Standalone {
                host: hosts.trim().to_string(),
            }
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, RedisDeployment::Cluster { .. })
    }
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub deployment: RedisDeployment,
    /// Password for AUTH
    pub password: Option<String>,
    /// Logical database; ignored by cluster deployments
    pub database: i64,
    /// Maximum number of pooled connections
    pub pool_size: PoolSize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            deployment: RedisDeployment::Standalone {
                host: format!("localhost:{DEFAULT_PORT}"),
            },
            password: None,
            database: 0,
            pool_size: PoolSize::default(),
        }
    }
}

impl RedisConfig {
    /// Config for a host string, detecting cluster mode.
    pub fn new(hosts: &str) -> Self {
        Self {
            deployment: RedisDeployment::from_hosts(hosts),
            ..Default::default()
        }
    }

    /// Create config for standalone Redis
    pub fn standalone(host: impl Into<String>) -> Self {
        Self {
            deployment: RedisDeployment::Standalone { host: host.into() },
            ..Default::default()
        }
    }

    /// Create config for Redis Cluster
    pub fn cluster(nodes: Vec<String>) -> Self {
        Self {
            deployment: RedisDeployment::Cluster { nodes },
            ..Default::default()
        }
    }

    /// Load from `REDIS_HOST`, `REDIS_PASSWORD`, `REDIS_DB` and `REDIS_POOL_SIZE`.
    pub fn from_env() -> DbResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            deployment: RedisDeployment::from_hosts(&env_required("REDIS_HOST")?),
            password: env_string("REDIS_PASSWORD"),
            database: env_parse("REDIS_DB")?.unwrap_or(defaults.database),
            pool_size: env_parse("REDIS_POOL_SIZE")?.unwrap_or(defaults.pool_size),
        })
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }

    pub fn with_pool_size(mut self, pool_size: PoolSize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn validate(&self) -> DbResult<()> {
        match &self.deployment {
            RedisDeployment::Standalone { host } => {
                if host.is_empty() {
                    return Err(DbError::invalid_config("Redis host cannot be empty"));
                }
            }
            RedisDeployment::Cluster { nodes } => {
                if nodes.is_empty() {
                    return Err(DbError::invalid_config(
                        "Redis cluster nodes cannot be empty",
                    ));
                }
            }
        }

        if self.database < 0 {
            return Err(DbError::invalid_config(format!(
                "Redis database {} cannot be negative",
                self.database
            )));
        }

        Ok(())
    }

    /// Connection info, one per node
    ///
    /// Entries are parsed as URLs, bare hosts as `redis://host`. The configured
    /// password and database are applied on top of what a URL carries. Cluster
    /// nodes always use database 0.
    pub fn connection_infos(&self) -> DbResult<Vec<ConnectionInfo>> {
        match &self.deployment {
            RedisDeployment::Standalone { host } => {
                let mut info = self.node_info(host)?;
                info.redis.db = merge_database(info.redis.db, self.database)?;
                Ok(vec![info])
            }
            RedisDeployment::Cluster { nodes } => nodes
                .iter()
                .map(|node| {
                    let mut info = self.node_info(node)?;
                    info.redis.db = 0;
                    Ok(info)
                })
                .collect(),
        }
    }

    /// Database the connections select: the configured one, or the one in a
    /// standalone URL. Always 0 for clusters.
    pub fn effective_database(&self) -> DbResult<i64> {
        match &self.deployment {
            RedisDeployment::Standalone { host } => {
                merge_database(self.node_info(host)?.redis.db, self.database)
            }
            RedisDeployment::Cluster { .. } => Ok(0),
        }
    }

    /// Hosts without credentials, for log lines
    pub fn display_hosts(&self) -> String {
        let nodes = match &self.deployment {
            RedisDeployment::Standalone { host } => std::slice::from_ref(host),
            RedisDeployment::Cluster { nodes } => nodes.as_slice(),
        };
        nodes
            .iter()
            .map(|node| match self.node_info(node) {
                Ok(info) => info.addr.to_string(),
                Err(_) => "<invalid>".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn node_info(&self, node: &str) -> DbResult<ConnectionInfo> {
        let mut info = if node.contains("://") {
            node.into_connection_info()
        } else {
            format!("redis://{node}").into_connection_info()
        }
        .map_err(|e| DbError::invalid_config(format!("Invalid Redis host '{node}': {e}")))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            info.redis.password = Some(password.to_string());
        }
        Ok(info)
    }
}

fn merge_database(from_url: i64, configured: i64) -> DbResult<i64> {
    match (from_url, configured) {
        (url, 0) => Ok(url),
        (0, db) => Ok(db),
        (url, db) if url == db => Ok(db),
        (url, db) => Err(DbError::invalid_config(format!(
            "Redis host selects database {url} but database {db} is configured"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("localhost:6379", false)]
    #[case("a:7000,b:7001,c:7002", true)]
    #[case("a:7000,", true)]
    fn test_mode_detection(#[case] hosts: &str, #[case] cluster: bool) {
        assert_eq!(RedisDeployment::from_hosts(hosts).is_cluster(), cluster);
    }

    #[test]
    fn test_cluster_nodes_are_trimmed() {
        assert_eq!(
            RedisDeployment::from_hosts("a:7000, b:7001"),
            RedisDeployment::Cluster {
                nodes: vec!["a:7000".to_string(), "b:7001".to_string()]
            }
        );
    }

    #[test]
    fn test_standalone_info() {
        let config = RedisConfig::new("cache")
            .with_password("p@ss:word")
            .with_database(3);
        let infos = config.connection_infos().unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].addr.to_string(), "cache:6379");
        assert_eq!(infos[0].redis.db, 3);
        assert_eq!(infos[0].redis.password.as_deref(), Some("p@ss:word"));
    }

    #[test]
    fn test_url_host_keeps_configured_database_and_password() {
        let config = RedisConfig::new("redis://cache:6379")
            .with_database(3)
            .with_password("s3cret");
        let info = &config.connection_infos().unwrap()[0];
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
        assert_eq!(config.effective_database().unwrap(), 3);
    }

    #[test]
    fn test_url_database_is_used_when_none_configured() {
        let config = RedisConfig::new("redis://user:pw@cache:6380/1");
        let info = &config.connection_infos().unwrap()[0];
        assert_eq!(info.redis.db, 1);
        assert_eq!(info.redis.username.as_deref(), Some("user"));
        assert_eq!(info.redis.password.as_deref(), Some("pw"));
        assert_eq!(config.effective_database().unwrap(), 1);
    }

    #[test]
    fn test_conflicting_databases_are_rejected() {
        let config = RedisConfig::new("redis://cache/1").with_database(2);
        assert!(matches!(
            config.connection_infos(),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(RedisConfig::new("redis://cache/2")
            .with_database(2)
            .connection_infos()
            .is_ok());
    }

    #[test]
    fn test_cluster_nodes_use_database_zero() {
        let config = RedisConfig::new("a:7000,redis://b:7001/4")
            .with_database(2)
            .with_password("pw");
        let infos = config.connection_infos().unwrap();
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|info| info.redis.db == 0));
        assert!(infos
            .iter()
            .all(|info| info.redis.password.as_deref() == Some("pw")));
        assert_eq!(config.effective_database().unwrap(), 0);
    }

    #[test]
    fn test_display_hosts_hide_credentials() {
        let config = RedisConfig::new("redis://:hunter2@cache:6390/1,b");
        assert_eq!(config.display_hosts(), "cache:6390,b:6379");
    }

    #[test]
    fn test_unparsable_host_is_invalid_config() {
        let config = RedisConfig::new("http://cache");
        assert!(matches!(
            config.connection_infos(),
            Err(DbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(RedisConfig::default().validate().is_ok());
        assert!(RedisConfig::standalone("").validate().is_err());
        assert!(RedisConfig::cluster(vec![]).validate().is_err());
        assert!(RedisConfig::default().with_database(-1).validate().is_err());
    }
}
