use async_trait::async_trait;
use deadpool_postgres::Object;
use tokio_postgres::error::SqlState;

use super::NativeDatabase;
use crate::database::Database;
use crate::error::DbError;
use crate::executor;
use crate::params::as_refs;
use crate::results::Row;
use crate::transaction::{PooledClient, Transaction};
use crate::types::RowValues;

/// PostgreSQL-style command tag for a statement that touched `rows` rows.
///
/// The tag is derived from the leading keyword only and is meant for logs.
#[must_use]
pub fn command_tag(query: &str, rows: u64) -> String {
    let verb = query
        .split_whitespace()
        .next()
        .map(str::to_ascii_uppercase)
        .unwrap_or_default();
    match verb.as_str() {
        "INSERT" => format!("INSERT 0 {rows}"),
        "UPDATE" | "DELETE" | "SELECT" | "MERGE" | "COPY" | "FETCH" | "MOVE" => {
            format!("{verb} {rows}")
        }
        "" => format!("EXECUTE {rows}"),
        _ => verb,
    }
}

// Raised when a cached statement's result columns changed under it (DDL since prepare).
fn is_stale_plan(err: &DbError) -> bool {
    err.as_postgres()
        .and_then(tokio_postgres::Error::as_db_error)
        .is_some_and(|db| {
            db.code() == &SqlState::FEATURE_NOT_SUPPORTED
                && db.routine() == Some("RevalidateCachedQuery")
        })
}

/// Run `query` through the connection's statement cache, re-preparing once if the
/// cached plan went stale.
async fn fetch_cached(
    client: &Object,
    query: &str,
    params: &[RowValues],
) -> Result<Vec<Row>, DbError> {
    let stmt = client.prepare_cached(query).await?;
    match executor::fetch_prepared(client, &stmt, params).await {
        Err(err) if is_stale_plan(&err) => {
            client.statement_cache.remove(query, &[]);
            let stmt = client.prepare_cached(query).await?;
            executor::fetch_prepared(client, &stmt, params).await
        }
        result => result,
    }
}

async fn execute_cached(
    client: &Object,
    query: &str,
    params: &[RowValues],
) -> Result<u64, DbError> {
    let stmt = client.prepare_cached(query).await?;
    match client.execute(&stmt, &as_refs(params)).await.map_err(DbError::from) {
        Err(err) if is_stale_plan(&err) => {
            client.statement_cache.remove(query, &[]);
            let stmt = client.prepare_cached(query).await?;
            Ok(client.execute(&stmt, &as_refs(params)).await?)
        }
        result => result,
    }
}

#[async_trait]
impl Database for NativeDatabase {
    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn connect(&mut self) -> Result<(), DbError> {
        self.open_pool().await
    }

    async fn close(&mut self) {
        self.close_pool();
    }

    async fn fetch(&self, query: &str, params: &[RowValues]) -> Result<Vec<Row>, DbError> {
        let client = self.acquire().await?;
        fetch_cached(&client, query, params).await
    }

    async fn fetch_one(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, DbError> {
        let client = self.acquire().await?;
        Ok(fetch_cached(&client, query, params).await?.into_iter().next())
    }

    async fn execute(&self, query: &str, params: &[RowValues]) -> Result<String, DbError> {
        let client = self.acquire().await?;
        let rows = execute_cached(&client, query, params).await?;
        Ok(command_tag(query, rows))
    }

    async fn execute_many(
        &self,
        query: &str,
        param_sets: &[Vec<RowValues>],
    ) -> Result<(), DbError> {
        let mut client = self.acquire().await?;
        // dropping `tx` on the error path rolls the whole batch back
        let tx = client.transaction().await?;
        // fresh statement per batch, outside the connection cache
        let stmt = tx.prepare(query).await?;
        for params in param_sets {
            tx.execute(&stmt, &as_refs(params)).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn transaction(&self) -> Result<Transaction, DbError> {
        let client = self.acquire().await?;
        Transaction::begin(PooledClient::Native(client)).await
    }
}
