// Native-protocol backend: a deadpool-postgres pool handing out raw clients.
//
// - config: pool construction and warm-up
// - executor: per-call checkout, statement execution and command tags

mod config;
mod executor;

pub use executor::command_tag;

use deadpool_postgres::{Object, Pool};
use tracing::info;

use crate::config::ConnectionConfig;
use crate::error::DbError;
use crate::pool::PoolStatus;

/// [`Database`](crate::Database) implementation over a deadpool-postgres pool.
///
/// Every query checks out one connection for the duration of the call and returns
/// it on every exit path.
pub struct NativeDatabase {
    config: ConnectionConfig,
    pool: Option<Pool>,
}

impl std::fmt::Debug for NativeDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDatabase")
            .field("config", &self.config)
            .field("connected", &self.pool.is_some())
            .finish()
    }
}

impl NativeDatabase {
    /// A handle that is not connected yet; call `connect()` before querying.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config, pool: None }
    }

    /// Build and connect in one step.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` if the pool cannot reach the server.
    pub async fn create(config: ConnectionConfig) -> Result<Self, DbError> {
        let mut db = Self::new(config);
        db.open_pool().await?;
        Ok(db)
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current pool occupancy, `None` when not connected.
    #[must_use]
    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.pool.as_ref().map(|pool| {
            let status = pool.status();
            PoolStatus {
                max_size: status.max_size,
                size: status.size,
                idle: status.available,
            }
        })
    }

    pub(crate) async fn open_pool(&mut self) -> Result<(), DbError> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = config::build_pool(&self.config)?;
        config::warm_up(&pool, &self.config).await?;
        info!(
            backend = "native",
            host = %self.config.host(),
            database = %self.config.db_name(),
            min_connections = self.config.min_connections(),
            max_connections = self.config.max_connections(),
            "database pool connected"
        );
        self.pool = Some(pool);
        Ok(())
    }

    pub(crate) fn close_pool(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close();
            info!(backend = "native", database = %self.config.db_name(), "database pool closed");
        }
    }

    async fn acquire(&self) -> Result<Object, DbError> {
        let pool = self.pool.as_ref().ok_or(DbError::NotConnected)?;
        Ok(pool.get().await?)
    }
}
