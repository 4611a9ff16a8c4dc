//! Tests against a real ClickHouse server, skipped unless `CH_HOSTS` is set

use chrono::Utc;
use dbkit_clickhouse::{ClickHouseClient, ClickHouseConfig, time_to_string};
use dbkit_core::MemoryLogger;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, clickhouse::Row, Deserialize)]
struct Event {
    id: u64,
    name: String,
}

async fn connect() -> Option<(ClickHouseClient, Arc<MemoryLogger>)> {
    if std::env::var("CH_HOSTS").is_err() {
        eprintln!("CH_HOSTS not set, skipping ClickHouse live test");
        return None;
    }
    // A single test server cannot satisfy a quorum of 2
    let config = ClickHouseConfig::from_env()
        .expect("valid ClickHouse environment")
        .with_insert_quorum(0, 60_000);
    let logger = Arc::new(MemoryLogger::new());
    let client = ClickHouseClient::connect_with_logger(&config, logger.clone())
        .await
        .expect("ClickHouse reachable");
    Some((client, logger))
}

#[tokio::test]
async fn test_connect_logs_server_version() {
    let Some((ch, logger)) = connect().await else {
        return;
    };

    let lines = logger.lines();
    assert!(lines[0].starts_with("INFO Connected to ClickHouse Database: hosts - "));
    assert!(lines[1].starts_with("INFO ClickHouse Server Version: "));
    assert!(!ch.version().await.unwrap().is_empty());

    ch.stop();
    assert_eq!(
        logger.lines().last().unwrap(),
        "INFO Disconnected from ClickHouse Database"
    );
}

#[tokio::test]
async fn test_insert_count_select_update() {
    let Some((ch, logger)) = connect().await else {
        return;
    };
    let table = format!("dbkit_events_{}", uuid::Uuid::new_v4().simple());

    ch.exec(
        "Event",
        &format!(
            "CREATE TABLE {table} (id UInt64, name String, at DateTime64(6, 'UTC')) \
             ENGINE = MergeTree ORDER BY id"
        ),
    )
    .await
    .unwrap();

    let now = time_to_string(&Utc::now());
    ch.insert(
        "Event",
        &format!(
            "INSERT INTO {table} (id, name, at) VALUES\n\t(1, 'login', {now}),\n\t(2, 'logout', {now})"
        ),
    )
    .await
    .unwrap();
    assert!(ch.last_query().starts_with("CH Event Create ("));
    assert!(!ch.last_query().contains('\n'));

    let count = ch
        .count("Event", &format!("SELECT count() FROM {table}"))
        .await
        .unwrap();
    assert_eq!(count, 2);

    let events: Vec<Event> = ch
        .select("Event", &format!("SELECT id, name FROM {table} ORDER BY id"))
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, 1);
    assert_eq!(events[1].name, "logout");

    let affected = ch
        .update(
            "Event",
            &format!("ALTER TABLE {table} UPDATE name = 'signin' WHERE id = 1 SETTINGS mutations_sync = 1"),
        )
        .await
        .unwrap();
    assert_eq!(affected, 0);

    ch.set_quiet(true);
    let before = logger.lines().len();
    let renamed: Vec<Event> = ch
        .select("Event", &format!("SELECT id, name FROM {table} WHERE id = 1"))
        .await
        .unwrap();
    assert_eq!(renamed[0].name, "signin");
    assert_eq!(logger.lines().len(), before);
    assert!(ch.last_query().starts_with("CH Event Load ("));
    ch.set_quiet(false);

    ch.exec("Event", &format!("DROP TABLE {table}")).await.unwrap();
}
