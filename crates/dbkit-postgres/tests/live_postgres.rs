//! Tests against a real PostgreSQL server
//!
//! Skipped unless `PG_HOSTS` is set (see `PostgresConfig::from_env`).

use dbkit_core::{DbError, DbResult, MemoryLogger};
use dbkit_postgres::{FieldValue, FromRow, PostgresClient, PostgresConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_postgres::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    age: i32,
    city: String,
    country: String,
}

#[derive(Debug)]
struct Model {
    id: i32,
    name: String,
    settings: Settings,
}

impl FromRow for Model {
    fn from_row(row: &Row) -> DbResult<Self> {
        let settings: serde_json::Value = row.try_get("settings")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            settings: serde_json::from_value(settings)?,
        })
    }
}

async fn connect() -> Option<(PostgresClient, Arc<MemoryLogger>)> {
    if std::env::var("PG_HOSTS").is_err() {
        eprintln!("PG_HOSTS not set, skipping PostgreSQL live test");
        return None;
    }
    let config = PostgresConfig::from_env().expect("valid PG_* environment");
    let logger = Arc::new(MemoryLogger::new());
    let client = PostgresClient::connect_with_logger(&config, logger.clone())
        .await
        .expect("PostgreSQL reachable");
    Some((client, logger))
}

fn table_name(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

async fn create_table(client: &PostgresClient, table: &str) {
    client
        .exec(
            "Setup",
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id SERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    settings JSON NOT NULL,
                    updated_at TIMESTAMPTZ
                )"
            ),
        )
        .await
        .expect("create table");
}

async fn drop_table(client: &PostgresClient, table: &str) {
    client
        .exec("Teardown", &format!("DROP TABLE IF EXISTS {table}"))
        .await
        .expect("drop table");
}

#[tokio::test]
async fn test_insert_select_update_delete() {
    let Some((client, logger)) = connect().await else {
        return;
    };
    let table = table_name("dbkit_models");
    create_table(&client, &table).await;

    let settings = Settings {
        age: 42,
        city: "Lisbon".to_string(),
        country: "Portugal".to_string(),
    };
    let json = serde_json::to_string(&settings).unwrap();

    let ids = client
        .insert(
            "Model",
            &format!(
                "INSERT INTO {table} (name, settings) VALUES ('first', '{json}'), ('second', '{json}')"
            ),
        )
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1], "ids come back in RETURNING order");

    let models: Vec<Model> = client
        .select(
            "Model",
            &format!("SELECT id, name, settings FROM {table} WHERE id = {}", ids[0]),
        )
        .await
        .unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id as u64, ids[0]);
    assert_eq!(models[0].name, "first");
    assert_eq!(models[0].settings, settings);

    let mut fv = FieldValue::new();
    fv.set("first", "renamed", "name");
    fv.json(&settings, &settings, "settings").unwrap();
    let (query, stamp) = fv.update_query(&table, &ids[0]);
    assert!(stamp.is_some());
    assert_eq!(client.update("Model", &query).await.unwrap(), 1);

    assert_eq!(client.update("Model", "").await.unwrap(), 0);

    let missing = format!("UPDATE {table} SET name = 'x' WHERE id = -1");
    assert_eq!(client.update("Model", &missing).await.unwrap(), 0);

    assert_eq!(
        client
            .count("Model", &format!("SELECT count(*) FROM {table}"))
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        client
            .max("Model", &format!("SELECT max(id) FROM {table}"))
            .await
            .unwrap(),
        ids[1]
    );

    let deleted = client
        .delete("Model", &format!("DELETE FROM {table} WHERE id = {}", ids[1]))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    assert!(client.last_query().contains("Delete"));
    assert!(logger.lines().iter().any(|l| l.ends_with("COMMIT")));

    drop_table(&client, &table).await;
    client.stop();
}

#[tokio::test]
async fn test_wrong_statement_kind_rolls_back() {
    let Some((client, logger)) = connect().await else {
        return;
    };
    let table = table_name("dbkit_wrong_kind");
    create_table(&client, &table).await;

    let result = client
        .update(
            "Model",
            &format!("INSERT INTO {table} (name, settings) VALUES ('x', '{{}}')"),
        )
        .await;
    assert!(matches!(result, Err(DbError::IncorrectRequest)));
    assert!(logger.lines().iter().any(|l| l.ends_with("ROLLBACK")));

    let count = client
        .count("Model", &format!("SELECT count(*) FROM {table}"))
        .await
        .unwrap();
    assert_eq!(count, 0, "rolled back insert must not be visible");

    assert_eq!(
        client
            .max("Model", &format!("SELECT max(id) FROM {table}"))
            .await
            .unwrap(),
        0
    );

    drop_table(&client, &table).await;
    client.stop();
}

#[tokio::test]
async fn test_health_check_and_quiet() {
    let Some((client, logger)) = connect().await else {
        return;
    };

    let health = client.health_check().await.unwrap();
    assert!(health.server_version.starts_with("PostgreSQL"));
    assert!(health.max_connections >= 1);

    client.set_quiet(true);
    let before = logger.lines().len();
    let rows: Vec<(i32,)> = client.select("Probe", "SELECT 1").await.unwrap();
    assert_eq!(rows, vec![(1,)]);
    assert_eq!(logger.lines().len(), before);
    assert!(client.last_query().contains("SELECT 1"));

    client.stop();
}
