use std::future::Future;
use std::ops::Deref;

use bb8::ManageConnection;
use tokio_postgres::{Client, NoTls};
use tracing::debug;

/// A pooled engine client that can be flagged so bb8 drops it instead of reusing it.
pub struct EngineConnection {
    client: Client,
    broken: bool,
}

impl EngineConnection {
    /// Evict this connection when it goes back to the engine.
    pub(crate) fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Deref for EngineConnection {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }
}

impl std::fmt::Debug for PgManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgManager")
            .field("dbname", &self.config.get_dbname())
            .field("user", &self.config.get_user())
            .finish_non_exhaustive()
    }
}

impl ManageConnection for PgManager {
    type Connection = EngineConnection;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "engine connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    debug!(error = %e, "engine connection terminated");
                }
            });
            Ok(EngineConnection {
                client,
                broken: false,
            })
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.broken || conn.client.is_closed()
    }
}
