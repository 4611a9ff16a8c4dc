//! Redis façade
//!
//! Every call checks out a pooled connection, runs one command (or one
//! pipeline or script), and records a `Redis(<db>) <OP> (<ms>) <key/value>`
//! line.

use crate::config::RedisConfig;
use crate::pool::{KvConnection, KvPool, PoolStatus};
use crate::streams::{XAddArgs, XAutoClaimArgs, XReadGroupArgs};
use dbkit_core::literal::clip_for_log;
use dbkit_core::{Backend, DbError, DbResult, QueryLogger, QueryRecorder, TracingLogger};
use redis::streams::{StreamAutoClaimReply, StreamKey, StreamReadReply};
use redis::{AsyncCommands, Direction, LposOptions, RedisResult, Script, ToRedisArgs};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Pushes only onto an empty list; -1 otherwise
const SINGLE_PUSH_SCRIPT: &str = r#"
if redis.call("LLEN", KEYS[1]) == 0 then
    return redis.call("LPUSH", KEYS[1], ARGV[1])
else
    return -1
end
"#;

/// One key/value pair of a [`RedisClient::multi_set`] batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    pub key: String,
    pub value: Vec<u8>,
    /// Seconds; 0 keeps the key forever
    pub ttl: u64,
}

impl Set {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>, ttl: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }
}

/// Pooled Redis client for single-instance or cluster deployments
pub struct RedisClient {
    pool: KvPool,
    recorder: QueryRecorder,
    single_push: Script,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("pool", &self.pool)
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    /// Create the pool, ping the server and log the connection.
    pub async fn connect(config: &RedisConfig) -> DbResult<Self> {
        Self::connect_with_logger(config, Arc::new(TracingLogger)).await
    }

    pub async fn connect_with_logger(
        config: &RedisConfig,
        logger: Arc<dyn QueryLogger>,
    ) -> DbResult<Self> {
        let pool = KvPool::create(config)?;
        let db = config.effective_database()?;
        let client = Self::from_pool(pool, db, logger);

        if let Err(e) = client.ping().await {
            client
                .recorder
                .error(&format!("Failed to connect to Redis database: {e}"));
            return Err(DbError::connection_failed(format!(
                "Redis {}: {e}",
                config.display_hosts()
            )));
        }

        client.recorder.info(&format!(
            "Connected to Redis database: {} ({}), db {db}",
            config.display_hosts(),
            if client.pool.is_cluster() { "cluster" } else { "single" }
        ));
        Ok(client)
    }

    /// Wrap an existing pool without pinging it.
    pub fn from_pool(pool: KvPool, db: i64, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            pool,
            recorder: QueryRecorder::new(Backend::Redis { db }, logger),
            single_push: Script::new(SINGLE_PUSH_SCRIPT),
        }
    }

    pub fn stop(&self) {
        self.pool.close();
        self.recorder.info("Disconnected from Redis database");
    }

    pub fn is_cluster(&self) -> bool {
        self.pool.is_cluster()
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Check out a raw connection for commands the façade does not cover
    pub async fn connection(&self) -> DbResult<KvConnection> {
        self.pool.get().await
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.recorder.set_quiet(quiet);
    }

    pub fn last_query(&self) -> String {
        self.recorder.last_query()
    }

    pub async fn ping(&self) -> DbResult<String> {
        self.run("PING", String::new(), |mut conn| async move {
            redis::cmd("PING").query_async(&mut conn).await
        })
        .await
    }

    /// Value of `key`, or `default` when the key does not exist
    pub async fn get(&self, key: &str, default: &str) -> DbResult<String> {
        let value = self
            .run("GET", quoted(key), |mut conn| async move {
                conn.get::<_, Option<String>>(key).await
            })
            .await?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    /// Values of `keys` in order; missing keys read as empty strings
    pub async fn mget(&self, keys: &[&str]) -> DbResult<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let detail = keys.iter().map(|k| quoted(k)).collect::<Vec<_>>().join(", ");
        let values = self
            .run("MGET", detail, |mut conn| async move {
                conn.mget::<_, Vec<Option<String>>>(keys).await
            })
            .await?;
        Ok(values.into_iter().map(Option::unwrap_or_default).collect())
    }

    /// Set `key`, expiring after `ttl` seconds (0 keeps it forever)
    pub async fn set<V>(&self, key: &str, value: V, ttl: u64) -> DbResult<()>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let detail = format!("{}={}", quoted(key), quoted(&render(&value)));
        self.run("SET", detail, |mut conn| async move {
            if ttl > 0 {
                conn.set_ex::<_, _, ()>(key, value, ttl).await
            } else {
                conn.set::<_, _, ()>(key, value).await
            }
        })
        .await
    }

    /// Set every pair in one MULTI/EXEC transaction.
    ///
    /// In cluster mode all keys must hash to the same slot (use `{tag}` keys).
    pub async fn multi_set(&self, sets: &[Set]) -> DbResult<()> {
        if sets.is_empty() {
            return Ok(());
        }
        let detail = sets
            .iter()
            .map(|s| format!("{}={}", quoted(&s.key), quoted(&render(&s.value))))
            .collect::<Vec<_>>()
            .join(", ");

        let mut pipe = redis::pipe();
        pipe.atomic();
        for set in sets {
            if set.ttl > 0 {
                pipe.set_ex(&set.key, &set.value, set.ttl).ignore();
            } else {
                pipe.set(&set.key, &set.value).ignore();
            }
        }

        self.run("MULTISET", detail, |mut conn| async move {
            pipe.query_async(&mut conn).await
        })
        .await
    }

    /// Push onto the head of the list; returns the new length
    pub async fn lpush<V>(&self, key: &str, value: V) -> DbResult<i64>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let detail = format!("{}={}", quoted(key), quoted(&render(&value)));
        let started = Instant::now();
        let result = match self.pool.get().await {
            Ok(mut conn) => conn.lpush::<_, _, i64>(key, value).await.map_err(DbError::from),
            Err(e) => Err(e),
        };
        let op = match &result {
            Ok(len) => format!("LPUSH({len})"),
            Err(_) => "LPUSH".to_string(),
        };
        self.recorder.record(None, &op, started, &detail);
        result
    }

    /// Push onto `key` only while the list is empty.
    ///
    /// Fails with [`DbError::ListIsNotEmpty`] otherwise.
    pub async fn single_push<V>(&self, key: &str, value: V) -> DbResult<()>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let detail = format!("{}={}", quoted(key), quoted(&render(&value)));
        let script = &self.single_push;
        let res: i64 = self
            .run("SINGLEPUSH", detail, |mut conn| async move {
                script.key(key).arg(value).invoke_async(&mut conn).await
            })
            .await?;

        if res == -1 {
            return Err(DbError::ListIsNotEmpty);
        }
        Ok(())
    }

    /// Pop the head of the list, or `default` when it is empty
    pub async fn lpop(&self, key: &str, default: &str) -> DbResult<String> {
        let value = self
            .run("LPOP", quoted(key), |mut conn| async move {
                conn.lpop::<_, Option<String>>(key, None).await
            })
            .await?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    /// Blocking pop; `default` when nothing arrives within `timeout` seconds.
    ///
    /// A timeout of 0 blocks until an element arrives.
    pub async fn blpop(&self, key: &str, default: &str, timeout: u64) -> DbResult<String> {
        let value = self
            .run("BLPOP", quoted(key), |mut conn| async move {
                conn.blpop::<_, Option<(String, String)>>(key, timeout as f64)
                    .await
            })
            .await?;
        Ok(value.map_or_else(|| default.to_string(), |(_, v)| v))
    }

    /// Blocking move between lists; `default` on timeout
    pub async fn blmove(
        &self,
        source: &str,
        destination: &str,
        src_dir: Direction,
        dst_dir: Direction,
        default: &str,
        timeout: u64,
    ) -> DbResult<String> {
        let detail = format!(
            "{} ({}) -> {} ({})",
            quoted(source),
            direction_name(&src_dir),
            quoted(destination),
            direction_name(&dst_dir)
        );
        let value = self
            .run("BLMOVE", detail, |mut conn| async move {
                conn.blmove::<_, _, Option<String>>(
                    source,
                    destination,
                    src_dir,
                    dst_dir,
                    timeout as f64,
                )
                .await
            })
            .await?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    pub async fn llen(&self, key: &str) -> DbResult<i64> {
        self.run("LLEN", quoted(key), |mut conn| async move {
            conn.llen::<_, i64>(key).await
        })
        .await
    }

    /// Remove up to `count` occurrences of `value`; returns how many went
    pub async fn lrem(&self, key: &str, count: isize, value: &str) -> DbResult<i64> {
        let detail = format!("{} {count} {}", quoted(key), quoted(value));
        self.run("LREM", detail, |mut conn| async move {
            conn.lrem::<_, _, i64>(key, count, value).await
        })
        .await
    }

    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> DbResult<Vec<String>> {
        let detail = format!("{} {start} {stop}", quoted(key));
        self.run("LRANGE", detail, |mut conn| async move {
            conn.lrange::<_, Vec<String>>(key, start, stop).await
        })
        .await
    }

    /// Index of the first occurrence of `value`
    pub async fn lpos(&self, key: &str, value: &str) -> DbResult<Option<usize>> {
        let detail = format!("{} {}", quoted(key), quoted(value));
        self.run("LPOS", detail, |mut conn| async move {
            conn.lpos::<_, _, Option<usize>>(key, value, LposOptions::default())
                .await
        })
        .await
    }

    /// Set a TTL in seconds; false when the key does not exist
    pub async fn expire(&self, key: &str, ttl: u64) -> DbResult<bool> {
        let detail = format!("{} {ttl}", quoted(key));
        let seconds = i64::try_from(ttl).map_err(|_| DbError::IncorrectParameters)?;
        self.run("EXPIRE", detail, |mut conn| async move {
            conn.expire::<_, bool>(key, seconds).await
        })
        .await
    }

    /// Remaining TTL in seconds as the server reports it:
    /// -1 for keys without expiry, -2 for missing keys
    pub async fn ttl(&self, key: &str) -> DbResult<i64> {
        self.run("TTL", quoted(key), |mut conn| async move {
            conn.ttl::<_, i64>(key).await
        })
        .await
    }

    pub async fn keys(&self, pattern: &str) -> DbResult<Vec<String>> {
        self.run("KEYS", quoted(pattern), |mut conn| async move {
            conn.keys::<_, Vec<String>>(pattern).await
        })
        .await
    }

    /// Delete `key`; returns the number of keys removed
    pub async fn del(&self, key: &str) -> DbResult<i64> {
        self.run("DEL", quoted(key), |mut conn| async move {
            conn.del::<_, i64>(key).await
        })
        .await
    }

    /// Create a consumer group, creating the stream if needed.
    ///
    /// An existing group is [`DbError::GroupAlreadyExists`].
    pub async fn xgroup_create_mkstream(&self, stream: &str, group: &str, start: &str) -> DbResult<()> {
        let detail = format!("{} {} {start}", quoted(stream), quoted(group));
        self.run("XGROUP CREATE", detail, |mut conn| async move {
            conn.xgroup_create_mkstream::<_, _, _, ()>(stream, group, start)
                .await
        })
        .await
        .map_err(|e| match e {
            DbError::Redis(ref err) if err.code() == Some("BUSYGROUP") => {
                DbError::GroupAlreadyExists
            }
            other => other,
        })
    }

    /// Destroy a consumer group; false when it did not exist
    pub async fn xgroup_destroy(&self, stream: &str, group: &str) -> DbResult<bool> {
        let detail = format!("{} {}", quoted(stream), quoted(group));
        self.run("XGROUP DESTROY", detail, |mut conn| async move {
            conn.xgroup_destroy::<_, _, bool>(stream, group).await
        })
        .await
    }

    /// Remove a consumer; returns how many pending entries it had
    pub async fn xgroup_del_consumer(&self, stream: &str, group: &str, consumer: &str) -> DbResult<i64> {
        let detail = format!("{} {} {}", quoted(stream), quoted(group), quoted(consumer));
        self.run("XGROUP DELCONSUMER", detail, |mut conn| async move {
            conn.xgroup_delconsumer::<_, _, _, i64>(stream, group, consumer)
                .await
        })
        .await
    }

    /// Append an entry; returns its id.
    ///
    /// With `no_mkstream` a missing stream is [`DbError::NotFound`].
    pub async fn xadd(&self, args: &XAddArgs) -> DbResult<String> {
        let fields = args
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={}", quoted(v)))
            .collect::<Vec<_>>()
            .join(" ");
        let detail = format!("{} {fields}", quoted(&args.stream));
        let cmd = args.command();
        let id: Option<String> = self
            .run("XADD", detail, |mut conn| async move {
                cmd.query_async(&mut conn).await
            })
            .await?;
        id.ok_or(DbError::NotFound)
    }

    /// Read as a group member. A block timeout yields an empty result.
    pub async fn xread_group(&self, args: &XReadGroupArgs) -> DbResult<Vec<StreamKey>> {
        if args.streams.is_empty() {
            return Err(DbError::IncorrectParameters);
        }
        let detail = format!(
            "{} {} {}",
            quoted(&args.group),
            quoted(&args.consumer),
            args.streams.join(" ")
        );
        let ids = args.resolved_ids();
        let options = args.options();
        let streams = &args.streams;
        let reply = self
            .run("XREADGROUP", detail, |mut conn| async move {
                conn.xread_options::<_, _, Option<StreamReadReply>>(streams, &ids, &options)
                    .await
            })
            .await?;
        Ok(reply.map(|r| r.keys).unwrap_or_default())
    }

    /// Claim entries idle for at least `min_idle`
    pub async fn xautoclaim(&self, args: &XAutoClaimArgs) -> DbResult<StreamAutoClaimReply> {
        let detail = format!(
            "{} {} {} {}ms {}",
            quoted(&args.stream),
            quoted(&args.group),
            quoted(&args.consumer),
            args.min_idle.as_millis(),
            args.start
        );
        let min_idle = args.min_idle.as_millis() as u64;
        let options = args.options();
        self.run("XAUTOCLAIM", detail, |mut conn| async move {
            conn.xautoclaim_options::<_, _, _, _, _, StreamAutoClaimReply>(
                &args.stream,
                &args.group,
                &args.consumer,
                min_idle,
                &args.start,
                options,
            )
            .await
        })
        .await
    }

    /// Acknowledge entries; returns how many were acknowledged
    pub async fn xack(&self, stream: &str, group: &str, ids: &[&str]) -> DbResult<i64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let detail = format!("{} {} {}", quoted(stream), quoted(group), ids.join(" "));
        self.run("XACK", detail, |mut conn| async move {
            conn.xack::<_, _, _, i64>(stream, group, ids).await
        })
        .await
    }

    /// Check out a connection, run `call` on it and record the line
    async fn run<T, F, Fut>(&self, op: &str, detail: String, call: F) -> DbResult<T>
    where
        F: FnOnce(KvConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let started = Instant::now();
        let result = match self.pool.get().await {
            Ok(conn) => call(conn).await.map_err(DbError::from),
            Err(e) => Err(e),
        };
        self.recorder.record(None, op, started, &detail);
        result
    }
}

fn quoted(value: &str) -> String {
    format!("{:?}", clip_for_log(value))
}

/// Lossy text form of the arguments a value encodes to
fn render<V: ToRedisArgs + ?Sized>(value: &V) -> String {
    value
        .to_redis_args()
        .iter()
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn direction_name(direction: &Direction) -> &'static str {
    match direction {
        Direction::Left => "LEFT",
        Direction::Right => "RIGHT",
    }
}
