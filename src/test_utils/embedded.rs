use postgresql_embedded::PostgreSQL;

use super::SHARED_RUNTIME;
use crate::config::ConnectionConfig;
use crate::error::DbError;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub username: String,
    pub password: String,
}

impl EmbeddedPostgres {
    /// Connection config for this server with the default pool bounds.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if the server settings do not form a valid config.
    pub fn config(&self) -> Result<ConnectionConfig, DbError> {
        self.config_with_bounds(1, 10)
    }

    /// Connection config for this server with explicit pool bounds.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if the bounds are invalid.
    pub fn config_with_bounds(
        &self,
        min_connections: u32,
        max_connections: u32,
    ) -> Result<ConnectionConfig, DbError> {
        ConnectionConfig::builder(
            self.host.clone(),
            self.db_name.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .port(self.port)
        .min_connections(min_connections)
        .max_connections(max_connections)
        .build()
    }
}

/// Set up an embedded `PostgreSQL` instance and create `db_name` on it.
///
/// Call this outside of any tokio runtime; it blocks on a shared one.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up, started, or the
/// database cannot be created.
pub fn setup_postgres_embedded(
    db_name: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(db_name).await?;

        let settings = postgresql.settings();
        let host = settings.host.clone();
        let port = settings.port;
        let username = settings.username.clone();
        let password = settings.password.clone();

        Ok(EmbeddedPostgres {
            postgresql,
            host,
            port,
            db_name: db_name.to_string(),
            username,
            password,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
