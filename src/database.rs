//! The query/transaction contract every backend implements.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::DbError;
use crate::results::Row;
use crate::transaction::Transaction;
use crate::types::RowValues;

/// Uniform, pooled access to a PostgreSQL database.
///
/// Query operations fail with [`DbError::NotConnected`] before [`connect`](Self::connect)
/// succeeds and after [`close`](Self::close). Driver errors are returned as-is; nothing
/// here retries.
#[async_trait]
pub trait Database: Send + Sync {
    /// True iff the pool handle exists.
    fn is_connected(&self) -> bool;

    /// Create the pool and verify the server is reachable. No-op when connected.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` if the handshake fails.
    async fn connect(&mut self) -> Result<(), DbError>;

    /// Release every pooled connection. Safe to call repeatedly.
    async fn close(&mut self);

    /// Run a read query and return every row.
    ///
    /// # Errors
    /// Returns `DbError::NotConnected`, a pool checkout error, or the driver error.
    async fn fetch(&self, query: &str, params: &[RowValues]) -> Result<Vec<Row>, DbError>;

    /// Run a read query and return the first row, `None` if there is none.
    ///
    /// # Errors
    /// Returns `DbError::NotConnected`, a pool checkout error, or the driver error.
    async fn fetch_one(&self, query: &str, params: &[RowValues])
    -> Result<Option<Row>, DbError>;

    /// Run a mutating statement; the returned status is for logging only.
    ///
    /// # Errors
    /// Returns `DbError::NotConnected`, a pool checkout error, or the driver error.
    async fn execute(&self, query: &str, params: &[RowValues]) -> Result<String, DbError>;

    /// Run one statement per parameter tuple, atomically across the batch.
    ///
    /// # Errors
    /// Returns `DbError::NotConnected`, a pool checkout error, or the first driver error;
    /// in the latter case no tuple of the batch is applied.
    async fn execute_many(&self, query: &str, param_sets: &[Vec<RowValues>])
    -> Result<(), DbError>;

    /// Check out one connection and open a transaction on it.
    ///
    /// Each call gets its own connection; scopes do not nest.
    ///
    /// # Errors
    /// Returns `DbError::NotConnected`, a pool checkout error, or the driver error from `BEGIN`.
    async fn transaction(&self) -> Result<Transaction, DbError>;
}

/// Boxed future returned by closures passed to [`in_transaction`].
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, DbError>> + Send + 't>>;

/// Run `work` inside a transaction scope.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err` and hands that
/// error back unchanged.
///
/// ```rust,no_run
/// use pg_middleware::prelude::*;
///
/// # async fn demo(db: &Db) -> Result<(), DbError> {
/// in_transaction(db, |tx| {
///     Box::pin(async move {
///         tx.execute("INSERT INTO users (name) VALUES ($1)", &["John".into()]).await?;
///         tx.execute("UPDATE users SET active = $1 WHERE name = $2", &[true.into(), "John".into()])
///             .await?;
///         Ok::<_, DbError>(())
///     })
/// })
/// .await?;
/// # Ok(()) }
/// ```
///
/// # Errors
/// Returns the error produced by `work`, or the error from `BEGIN`/`COMMIT`.
pub async fn in_transaction<D, T, F>(db: &D, work: F) -> Result<T, DbError>
where
    D: Database + ?Sized,
    F: for<'t> FnOnce(&'t mut Transaction) -> TxFuture<'t, T>,
{
    let mut tx = db.transaction().await?;
    match work(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            // the caller's error wins over a failed rollback
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}
