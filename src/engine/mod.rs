//! Engine backend: a bb8 pool of `tokio_postgres` clients handed out as sessions.
//!
//! The engine keeps `pool_size` connections warm and opens up to `max_overflow`
//! more under load; overflow connections are reaped once idle.

mod manager;
mod session;

pub use manager::{EngineConnection, PgManager};

use std::time::Duration;

use async_trait::async_trait;
use bb8::{ManageConnection, Pool};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::database::Database;
use crate::error::DbError;
use crate::pool::PoolStatus;
use crate::results::Row;
use crate::transaction::Transaction;
use crate::types::RowValues;
use session::Session;

/// How long a checkout waits for a free connection before bb8 gives up.
pub const ENGINE_CHECKOUT_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Engine pool sizing derived from the connection bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePoolSizing {
    /// Connections kept open while idle
    pub pool_size: u32,
    /// Extra connections allowed under load
    pub max_overflow: u32,
}

impl EnginePoolSizing {
    #[must_use]
    pub fn from_config(config: &ConnectionConfig) -> Self {
        let pool_size = config.min_connections();
        Self {
            pool_size,
            max_overflow: config.max_connections().saturating_sub(pool_size),
        }
    }

    /// Hard cap on open connections, `pool_size + max_overflow`.
    #[must_use]
    pub fn max_size(&self) -> u32 {
        self.pool_size + self.max_overflow
    }
}

/// Status line returned by engine `execute` calls.
#[must_use]
pub fn rows_status(rows: u64) -> String {
    format!("ROWS {rows}")
}

/// [`Database`] implementation over a bb8 engine of `tokio_postgres` sessions.
///
/// Each call opens a session; mutating calls commit before returning.
pub struct EngineDatabase {
    config: ConnectionConfig,
    engine: Option<Pool<PgManager>>,
}

impl std::fmt::Debug for EngineDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDatabase")
            .field("config", &self.config)
            .field("connected", &self.engine.is_some())
            .finish()
    }
}

impl EngineDatabase {
    /// A handle that is not connected yet; call `connect()` before querying.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Build and connect in one step.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` if the server cannot be reached.
    pub async fn create(config: ConnectionConfig) -> Result<Self, DbError> {
        let mut db = Self::new(config);
        db.connect().await?;
        Ok(db)
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn sizing(&self) -> EnginePoolSizing {
        EnginePoolSizing::from_config(&self.config)
    }

    /// Current engine occupancy, `None` when not connected.
    #[must_use]
    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.engine.as_ref().map(|pool| {
            let state = pool.state();
            PoolStatus {
                max_size: self.sizing().max_size() as usize,
                size: state.connections as usize,
                idle: state.idle_connections as usize,
            }
        })
    }

    async fn session(&self) -> Result<Session, DbError> {
        let engine = self.engine.as_ref().ok_or(DbError::NotConnected)?;
        Session::open(engine).await
    }
}

#[async_trait]
impl Database for EngineDatabase {
    fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    async fn connect(&mut self) -> Result<(), DbError> {
        if self.engine.is_some() {
            return Ok(());
        }

        let pg_config: tokio_postgres::Config = self
            .config
            .engine_dsn()
            .parse()
            .map_err(|e| DbError::ConfigError(format!("invalid engine dsn: {e}")))?;
        let manager = PgManager::new(pg_config);

        // one handshake up front; the engine itself fills lazily
        manager.connect().await.map_err(|e| {
            DbError::ConnectionError(format!(
                "postgres handshake failed for {}:{}/{}: {e}",
                self.config.host(),
                self.config.port(),
                self.config.db_name()
            ))
        })?;

        let sizing = self.sizing();
        debug!(
            backend = "engine",
            pool_size = sizing.pool_size,
            max_overflow = sizing.max_overflow,
            "building engine"
        );
        let engine = Pool::builder()
            .max_size(sizing.max_size())
            .min_idle(Some(sizing.pool_size))
            .test_on_check_out(false)
            .retry_connection(false)
            .connection_timeout(ENGINE_CHECKOUT_WAIT)
            .build_unchecked(manager);

        info!(
            backend = "engine",
            host = %self.config.host(),
            database = %self.config.db_name(),
            min_connections = self.config.min_connections(),
            max_connections = self.config.max_connections(),
            "database pool connected"
        );
        self.engine = Some(engine);
        Ok(())
    }

    async fn close(&mut self) {
        if self.engine.take().is_some() {
            info!(backend = "engine", database = %self.config.db_name(), "database pool closed");
        }
    }

    async fn fetch(&self, query: &str, params: &[RowValues]) -> Result<Vec<Row>, DbError> {
        self.session().await?.fetch(query, params).await
    }

    async fn fetch_one(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, DbError> {
        self.session().await?.fetch_one(query, params).await
    }

    async fn execute(&self, query: &str, params: &[RowValues]) -> Result<String, DbError> {
        let mut tx = self.session().await?.begin().await?;
        match tx.execute(query, params).await {
            Ok(status) => {
                tx.commit().await?;
                Ok(status)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    async fn execute_many(
        &self,
        query: &str,
        param_sets: &[Vec<RowValues>],
    ) -> Result<(), DbError> {
        let mut tx = self.session().await?.begin().await?;
        for params in param_sets {
            if let Err(err) = tx.execute(query, params).await {
                let _ = tx.rollback().await;
                return Err(err);
            }
        }
        tx.commit().await
    }

    async fn transaction(&self) -> Result<Transaction, DbError> {
        self.session().await?.begin().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: u32, max: u32) -> ConnectionConfig {
        ConnectionConfig::builder("localhost", "app", "svc", "pw")
            .min_connections(min)
            .max_connections(max)
            .build()
            .unwrap()
    }

    #[test]
    fn overflow_fills_gap_between_bounds() {
        let sizing = EnginePoolSizing::from_config(&config(2, 10));
        assert_eq!(sizing.pool_size, 2);
        assert_eq!(sizing.max_overflow, 8);
        assert_eq!(sizing.max_size(), 10);
    }

    #[test]
    fn equal_bounds_mean_no_overflow() {
        let sizing = EnginePoolSizing::from_config(&config(4, 4));
        assert_eq!(sizing.max_overflow, 0);
        assert_eq!(sizing.max_size(), 4);
    }

    #[test]
    fn zero_minimum_is_all_overflow() {
        let sizing = EnginePoolSizing::from_config(&config(0, 3));
        assert_eq!(sizing.pool_size, 0);
        assert_eq!(sizing.max_size(), 3);
    }

    #[test]
    fn status_line_is_row_count() {
        assert_eq!(rows_status(3), "ROWS 3");
    }
}
