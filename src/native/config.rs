use deadpool_postgres::{Config as PgConfig, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::DbError;

/// Build a lazy deadpool-postgres pool from the wire-protocol URL.
///
/// The pool has no wait timeout: checkout suspends until a connection frees up.
///
/// # Errors
/// Returns `DbError::ConnectionError` if deadpool rejects the configuration.
pub(super) fn build_pool(config: &ConnectionConfig) -> Result<Pool, DbError> {
    let mut pg_config = PgConfig::new();
    pg_config.url = Some(config.connection_url());
    pg_config.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    pg_config.pool = Some(PoolConfig::new(config.max_connections() as usize));

    pg_config
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| DbError::ConnectionError(format!("Failed to create Postgres pool: {e}")))
}

/// Open `min_connections` connections (at least one) so a bad host or bad
/// credentials fail here instead of on the first query.
///
/// # Errors
/// Returns `DbError::ConnectionError` with the handshake failure; the pool is closed.
pub(super) async fn warm_up(pool: &Pool, config: &ConnectionConfig) -> Result<(), DbError> {
    let target = config.min_connections().max(1) as usize;
    let mut opened = Vec::with_capacity(target);
    for _ in 0..target {
        match pool.get().await {
            Ok(obj) => opened.push(obj),
            Err(e) => {
                pool.close();
                return Err(DbError::ConnectionError(format!(
                    "postgres handshake failed for {}:{}/{}: {e}",
                    config.host(),
                    config.port(),
                    config.db_name()
                )));
            }
        }
    }
    debug!(backend = "native", opened = opened.len(), "pool warmed");
    Ok(())
}
