use bb8::{Pool, PooledConnection};

use super::PgManager;
use crate::error::DbError;
use crate::executor;
use crate::results::Row;
use crate::transaction::{PooledClient, Transaction};
use crate::types::RowValues;

/// A short-lived engine checkout outside any explicit transaction.
///
/// Statements run in autocommit mode; [`begin`](Self::begin) turns the session into a
/// [`Transaction`] on the same connection.
pub(crate) struct Session {
    conn: PooledConnection<'static, PgManager>,
}

impl Session {
    /// Check a connection out of the engine, waiting while it is saturated.
    pub(crate) async fn open(pool: &Pool<PgManager>) -> Result<Self, DbError> {
        let conn = pool.get_owned().await?;
        Ok(Self { conn })
    }

    pub(crate) async fn fetch(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Vec<Row>, DbError> {
        executor::fetch_all(&self.conn, query, params).await
    }

    pub(crate) async fn fetch_one(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, DbError> {
        executor::fetch_first(&self.conn, query, params).await
    }

    pub(crate) async fn begin(self) -> Result<Transaction, DbError> {
        Transaction::begin(PooledClient::Engine(self.conn)).await
    }
}
