use tokio::runtime::Handle;
use tokio_postgres::Client;

use crate::error::DbError;
use crate::executor;
use crate::results::Row;
use crate::types::{BackendKind, RowValues};

#[cfg(feature = "engine")]
use crate::engine::PgManager;
#[cfg(feature = "engine")]
use bb8::PooledConnection;
#[cfg(feature = "native")]
use deadpool_postgres::Object;

/// A connection checked out of either backend's pool.
pub(crate) enum PooledClient {
    #[cfg(feature = "native")]
    Native(Object),
    #[cfg(feature = "engine")]
    Engine(PooledConnection<'static, PgManager>),
}

impl PooledClient {
    pub(crate) fn client(&self) -> &Client {
        match self {
            #[cfg(feature = "native")]
            PooledClient::Native(obj) => obj,
            #[cfg(feature = "engine")]
            PooledClient::Engine(conn) => conn,
        }
    }

    pub(crate) fn backend(&self) -> BackendKind {
        match self {
            #[cfg(feature = "native")]
            PooledClient::Native(_) => BackendKind::Native,
            #[cfg(feature = "engine")]
            PooledClient::Engine(_) => BackendKind::Engine,
        }
    }

    fn status(&self, query: &str, rows: u64) -> String {
        match self {
            #[cfg(feature = "native")]
            PooledClient::Native(_) => crate::native::command_tag(query, rows),
            #[cfg(feature = "engine")]
            PooledClient::Engine(_) => crate::engine::rows_status(rows),
        }
    }

    // Close the connection instead of returning it to the pool.
    fn discard(self) {
        match self {
            #[cfg(feature = "native")]
            PooledClient::Native(obj) => drop(Object::take(obj)),
            #[cfg(feature = "engine")]
            PooledClient::Engine(mut conn) => conn.mark_broken(),
        }
    }
}

/// A transaction scope holding one pooled connection until it ends.
///
/// Every statement issued through the scope runs on that connection, in call order.
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) end the scope; dropping it
/// without either rolls back before the connection goes back to the pool.
pub struct Transaction {
    conn: Option<PooledClient>,
    needs_rollback: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("backend", &self.conn.as_ref().map(PooledClient::backend))
            .field("needs_rollback", &self.needs_rollback)
            .finish()
    }
}

impl Transaction {
    /// Issue `BEGIN` on a freshly checked-out connection.
    pub(crate) async fn begin(conn: PooledClient) -> Result<Self, DbError> {
        conn.client().batch_execute("BEGIN").await?;
        Ok(Self {
            conn: Some(conn),
            needs_rollback: true,
        })
    }

    fn conn(&self) -> Result<&PooledClient, DbError> {
        self.conn.as_ref().ok_or(DbError::NotConnected)
    }

    /// Backend that owns the underlying connection.
    #[must_use]
    pub fn backend(&self) -> Option<BackendKind> {
        self.conn.as_ref().map(PooledClient::backend)
    }

    /// # Errors
    /// Returns the driver error.
    pub async fn fetch(&mut self, query: &str, params: &[RowValues]) -> Result<Vec<Row>, DbError> {
        executor::fetch_all(self.conn()?.client(), query, params).await
    }

    /// # Errors
    /// Returns the driver error.
    pub async fn fetch_one(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, DbError> {
        executor::fetch_first(self.conn()?.client(), query, params).await
    }

    /// # Errors
    /// Returns the driver error.
    pub async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<String, DbError> {
        let conn = self.conn()?;
        let rows = executor::execute_rows(conn.client(), query, params).await?;
        Ok(conn.status(query, rows))
    }

    /// # Errors
    /// Returns the driver error from the first failing tuple.
    pub async fn execute_many(
        &mut self,
        query: &str,
        param_sets: &[Vec<RowValues>],
    ) -> Result<(), DbError> {
        executor::execute_each(self.conn()?.client(), query, param_sets).await?;
        Ok(())
    }

    /// Commit and release the connection.
    ///
    /// # Errors
    /// Returns the driver error if `COMMIT` fails; the transaction is rolled back then.
    pub async fn commit(mut self) -> Result<(), DbError> {
        self.finish("COMMIT").await
    }

    /// Roll back and release the connection.
    ///
    /// # Errors
    /// Returns the driver error if `ROLLBACK` fails.
    pub async fn rollback(mut self) -> Result<(), DbError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, sql: &str) -> Result<(), DbError> {
        let conn = self.conn.take().ok_or(DbError::NotConnected)?;
        match conn.client().batch_execute(sql).await {
            Ok(()) => {
                self.needs_rollback = false;
                Ok(())
            }
            Err(err) => {
                // best effort; a connection in unknown state is not reused
                let _ = conn.client().batch_execute("ROLLBACK").await;
                self.needs_rollback = false;
                conn.discard();
                Err(err.into())
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.needs_rollback {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                if conn.client().batch_execute("ROLLBACK").await.is_err() {
                    conn.discard();
                }
            });
        } else {
            conn.discard();
        }
    }
}
