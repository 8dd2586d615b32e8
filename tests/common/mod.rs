#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use pg_middleware::prelude::*;
use serde_json::json;
use tokio_postgres::error::SqlState;

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid timestamp literal")
}

pub async fn create_people_table(db: &dyn Database, table: &str) -> Result<(), DbError> {
    db.execute(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await?;
    db.execute(
        &format!(
            "CREATE TABLE {table} (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                score DOUBLE PRECISION,
                active BOOLEAN,
                created TIMESTAMP,
                meta JSONB
            )"
        ),
        &[],
    )
    .await?;
    Ok(())
}

pub fn person(id: i64, name: &str) -> Vec<RowValues> {
    vec![
        RowValues::Int(id),
        RowValues::Text(name.to_string()),
        RowValues::Float(1.5 * id as f64),
        RowValues::Bool(id % 2 == 0),
        RowValues::Timestamp(ts("2024-03-01 12:30:00")),
        RowValues::JSON(json!({ "tags": ["a", "b"], "id": id })),
    ]
}

pub fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (id, name, score, active, created, meta) VALUES ($1, $2, $3, $4, $5, $6)"
    )
}

pub async fn count_ids(db: &dyn Database, table: &str, lo: i64, hi: i64) -> Result<i64, DbError> {
    let row = db
        .fetch_one(
            &format!("SELECT COUNT(*) AS cnt FROM {table} WHERE id BETWEEN $1 AND $2"),
            &[RowValues::Int(lo), RowValues::Int(hi)],
        )
        .await?
        .expect("count always returns a row");
    Ok(*row.get("cnt").and_then(RowValues::as_int).expect("bigint count"))
}

fn sql_state(err: &DbError) -> Option<&SqlState> {
    err.as_postgres().and_then(tokio_postgres::Error::code)
}

/// Insert, read back, empty lookups, ordering and driver error passthrough.
pub async fn check_round_trip(db: &dyn Database, table: &str) -> Result<(), DbError> {
    let status = db.execute(&insert_sql(table), &person(1, "ada")).await?;
    assert!(!status.is_empty());

    let row = db
        .fetch_one(
            &format!("SELECT id, name, score, active, created, meta FROM {table} WHERE id = $1"),
            &[RowValues::Int(1)],
        )
        .await?
        .expect("inserted row is visible");
    assert_eq!(row.values(), person(1, "ada").as_slice());
    assert_eq!(row.get("name").and_then(RowValues::as_text), Some("ada"));

    let missing = db
        .fetch_one(
            &format!("SELECT id FROM {table} WHERE id = $1"),
            &[RowValues::Int(999)],
        )
        .await?;
    assert!(missing.is_none());

    db.execute(&insert_sql(table), &person(2, "grace")).await?;
    let rows = db
        .fetch(&format!("SELECT id, name FROM {table} ORDER BY id DESC"), &[])
        .await?;
    let ids: Vec<i64> = rows
        .iter()
        .filter_map(|r| r.get("id").and_then(RowValues::as_int).copied())
        .collect();
    assert_eq!(ids, vec![2, 1]);

    let empty = db
        .fetch(&format!("SELECT id FROM {table} WHERE id < 0"), &[])
        .await?;
    assert!(empty.is_empty());

    let err = db
        .fetch("SELEKT broken", &[])
        .await
        .expect_err("syntax error surfaces");
    assert_eq!(sql_state(&err), Some(&SqlState::SYNTAX_ERROR));

    let err = db
        .execute(&insert_sql(table), &person(1, "dup"))
        .await
        .expect_err("primary key violation surfaces");
    assert_eq!(sql_state(&err), Some(&SqlState::UNIQUE_VIOLATION));
    Ok(())
}

/// Commit on success, rollback on error, rollback on drop.
pub async fn check_transactions(db: &dyn Database, table: &str) -> Result<(), DbError> {
    let mut tx = db.transaction().await?;
    tx.execute(&insert_sql(table), &person(10, "t10")).await?;
    tx.execute(&insert_sql(table), &person(11, "t11")).await?;
    // own writes are visible inside the scope
    assert!(
        tx.fetch_one(&format!("SELECT id FROM {table} WHERE id = $1"), &[RowValues::Int(11)])
            .await?
            .is_some()
    );
    tx.commit().await?;
    assert_eq!(count_ids(db, table, 10, 11).await?, 2);

    let insert = insert_sql(table);
    let result = in_transaction(db, |tx| {
        Box::pin(async move {
            tx.execute(&insert, &person(20, "t20")).await?;
            tx.execute(&insert, &person(20, "t20 again")).await?;
            Ok::<_, DbError>(())
        })
    })
    .await;
    let err = result.expect_err("second insert violates the key");
    assert_eq!(sql_state(&err), Some(&SqlState::UNIQUE_VIOLATION));
    assert_eq!(count_ids(db, table, 20, 20).await?, 0);

    let insert = insert_sql(table);
    let value = in_transaction(db, |tx| {
        Box::pin(async move {
            tx.execute(&insert, &person(21, "t21")).await?;
            tx.execute(&insert, &person(22, "t22")).await?;
            Ok::<_, DbError>(7)
        })
    })
    .await?;
    assert_eq!(value, 7);
    assert_eq!(count_ids(db, table, 21, 22).await?, 2);

    let mut tx = db.transaction().await?;
    tx.execute(&insert_sql(table), &person(30, "t30")).await?;
    tx.rollback().await?;
    assert_eq!(count_ids(db, table, 30, 30).await?, 0);

    let mut tx = db.transaction().await?;
    tx.execute_many(&insert_sql(table), &[person(32, "t32"), person(33, "t33")])
        .await?;
    tx.commit().await?;
    assert_eq!(count_ids(db, table, 32, 33).await?, 2);

    let mut tx = db.transaction().await?;
    tx.execute_many(&insert_sql(table), &[person(34, "t34"), person(35, "t35")])
        .await?;
    tx.rollback().await?;
    assert_eq!(count_ids(db, table, 34, 35).await?, 0);

    {
        let mut tx = db.transaction().await?;
        tx.execute(&insert_sql(table), &person(31, "t31")).await?;
    }
    // waits on the row lock until the dropped scope has rolled back
    db.execute(&insert_sql(table), &person(31, "t31 outside")).await?;
    let row = db
        .fetch_one(&format!("SELECT name FROM {table} WHERE id = $1"), &[RowValues::Int(31)])
        .await?
        .expect("row inserted after rollback");
    assert_eq!(row.get("name").and_then(RowValues::as_text), Some("t31 outside"));
    Ok(())
}

/// Two open scopes use separate connections and do not share atomicity.
pub async fn check_independent_scopes(db: &dyn Database, table: &str) -> Result<(), DbError> {
    let lookup = format!("SELECT id FROM {table} WHERE id = $1");
    let mut first = db.transaction().await?;
    let mut second = db.transaction().await?;

    first.execute(&insert_sql(table), &person(60, "t60")).await?;
    assert!(second.fetch_one(&lookup, &[RowValues::Int(60)]).await?.is_none());

    first.commit().await?;
    assert!(second.fetch_one(&lookup, &[RowValues::Int(60)]).await?.is_some());

    second.execute(&insert_sql(table), &person(61, "t61")).await?;
    second.rollback().await?;
    assert_eq!(count_ids(db, table, 60, 61).await?, 1);
    Ok(())
}

/// Batches apply fully or not at all.
pub async fn check_execute_many(db: &dyn Database, table: &str) -> Result<(), DbError> {
    let good = vec![person(40, "b40"), person(41, "b41"), person(42, "b42")];
    db.execute_many(&insert_sql(table), &good).await?;
    assert_eq!(count_ids(db, table, 40, 42).await?, 3);

    let bad = vec![person(50, "b50"), person(51, "b51"), person(50, "b50 dup")];
    let err = db
        .execute_many(&insert_sql(table), &bad)
        .await
        .expect_err("duplicate key in batch");
    assert_eq!(sql_state(&err), Some(&SqlState::UNIQUE_VIOLATION));
    assert_eq!(count_ids(db, table, 50, 51).await?, 0);

    db.execute_many(&insert_sql(table), &[]).await?;
    Ok(())
}

/// `max_connections + 1` slow queries: all succeed, the extra one waits its turn.
pub async fn check_pool_saturation(db: Arc<Db>, max_connections: u32) -> Result<(), DbError> {
    let sleep = Duration::from_millis(500);
    let started = Instant::now();
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..=max_connections {
        let db = Arc::clone(&db);
        tasks.spawn(async move {
            db.fetch("SELECT 1::BIGINT AS done FROM pg_sleep(0.5)", &[])
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        let rows = joined.expect("query task panicked")?;
        assert_eq!(rows.len(), 1);
    }
    assert!(started.elapsed() >= sleep * 2 - Duration::from_millis(50));
    let status = db.pool_status().expect("connected");
    assert!(status.size <= max_connections as usize);
    Ok(())
}

/// Close makes every operation fail with `NotConnected`; connect recovers.
pub async fn check_close_and_reconnect(db: &mut Db, table: &str) -> Result<(), DbError> {
    db.close().await;
    assert!(!db.is_connected());
    assert!(matches!(
        db.fetch(&format!("SELECT id FROM {table}"), &[]).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(db.transaction().await, Err(DbError::NotConnected)));
    db.close().await;

    db.connect().await?;
    assert!(db.is_connected());
    assert_eq!(count_ids(&*db, table, 1, 1).await?, 1);
    Ok(())
}

async fn backend_pid(db: &dyn Database) -> Result<i64, DbError> {
    let row = db
        .fetch_one("SELECT pg_backend_pid() AS pid", &[])
        .await?
        .expect("pid row");
    Ok(*row.get("pid").and_then(RowValues::as_int).expect("int4 pid"))
}

/// A scope whose `COMMIT` fails hands its connection back closed, not reused.
///
/// `db` must allow a single connection so consecutive calls share it.
pub async fn check_failed_commit_discards_connection(db: &dyn Database) -> Result<(), DbError> {
    db.execute("DROP TABLE IF EXISTS deferred_keys", &[]).await?;
    db.execute(
        "CREATE TABLE deferred_keys (id BIGINT UNIQUE DEFERRABLE INITIALLY DEFERRED)",
        &[],
    )
    .await?;
    let before = backend_pid(db).await?;
    assert_eq!(backend_pid(db).await?, before, "single connection is reused");

    let mut tx = db.transaction().await?;
    tx.execute("INSERT INTO deferred_keys (id) VALUES ($1)", &[RowValues::Int(1)])
        .await?;
    tx.execute("INSERT INTO deferred_keys (id) VALUES ($1)", &[RowValues::Int(1)])
        .await?;
    let err = tx.commit().await.expect_err("deferred unique check fails at commit");
    assert_eq!(sql_state(&err), Some(&SqlState::UNIQUE_VIOLATION));

    assert_ne!(backend_pid(db).await?, before);
    let rows = db.fetch("SELECT id FROM deferred_keys", &[]).await?;
    assert!(rows.is_empty());
    Ok(())
}

/// Re-running `SELECT *` after the table gains a column sees the new shape.
pub async fn check_schema_change(db: &dyn Database, table: &str) -> Result<Vec<Row>, DbError> {
    db.execute(&format!("DROP TABLE IF EXISTS {table}"), &[]).await?;
    db.execute(&format!("CREATE TABLE {table} (id BIGINT)"), &[])
        .await?;
    db.execute(&format!("INSERT INTO {table} (id) VALUES ($1)"), &[RowValues::Int(1)])
        .await?;
    let select = format!("SELECT * FROM {table}");
    let first = db.fetch(&select, &[]).await?;
    assert_eq!(first[0].column_names(), ["id"]);

    db.execute(&format!("ALTER TABLE {table} ADD COLUMN name TEXT"), &[])
        .await?;
    let second = db.fetch(&select, &[]).await?;
    assert_eq!(second[0].column_names(), ["id", "name"]);
    assert_eq!(second[0].get("name"), Some(&RowValues::Null));
    Ok(second)
}

/// Binding a value of the wrong kind is a driver error and writes nothing.
pub async fn check_mismatched_bind(db: &dyn Database, table: &str) -> Result<(), DbError> {
    let mut params = person(70, "t70");
    params[0] = RowValues::Text("12345678".into());
    let err = db
        .execute(&insert_sql(table), &params)
        .await
        .expect_err("text is not bound to a bigint column");
    assert!(matches!(err, DbError::PostgresError(_)), "{err:?}");

    let err = db
        .fetch(
            &format!("SELECT id FROM {table} WHERE name = $1"),
            &[RowValues::Int(7)],
        )
        .await
        .expect_err("integer is not bound to a text column");
    assert!(matches!(err, DbError::PostgresError(_)), "{err:?}");

    let rows = db
        .fetch(
            &format!("SELECT id FROM {table} WHERE name = $1"),
            &[RowValues::Text("t70".into())],
        )
        .await?;
    assert!(rows.is_empty());
    Ok(())
}
