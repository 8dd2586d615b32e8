use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::database::Database;
#[cfg(feature = "engine")]
use crate::engine::EngineDatabase;
use crate::error::DbError;
#[cfg(feature = "native")]
use crate::native::NativeDatabase;
use crate::pool::PoolStatus;
use crate::results::Row;
use crate::transaction::Transaction;
use crate::types::{BackendKind, RowValues};

/// The concrete backend behind a [`Db`].
#[derive(Debug)]
pub enum AnyDatabase {
    #[cfg(feature = "native")]
    Native(NativeDatabase),
    #[cfg(feature = "engine")]
    Engine(EngineDatabase),
}

impl AnyDatabase {
    /// Construct the backend for `kind` without connecting it.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if `kind` is not compiled into this build.
    pub fn new(config: ConnectionConfig, kind: BackendKind) -> Result<Self, DbError> {
        match kind {
            #[cfg(feature = "native")]
            BackendKind::Native => Ok(AnyDatabase::Native(NativeDatabase::new(config))),
            #[cfg(feature = "engine")]
            BackendKind::Engine => Ok(AnyDatabase::Engine(EngineDatabase::new(config))),
            #[allow(unreachable_patterns)]
            other => Err(DbError::ConfigError(format!(
                "{other} backend is not enabled in the current build"
            ))),
        }
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            #[cfg(feature = "native")]
            AnyDatabase::Native(_) => BackendKind::Native,
            #[cfg(feature = "engine")]
            AnyDatabase::Engine(_) => BackendKind::Engine,
        }
    }

    #[must_use]
    pub fn pool_status(&self) -> Option<PoolStatus> {
        match self {
            #[cfg(feature = "native")]
            AnyDatabase::Native(db) => db.pool_status(),
            #[cfg(feature = "engine")]
            AnyDatabase::Engine(db) => db.pool_status(),
        }
    }

    fn as_database(&self) -> &dyn Database {
        match self {
            #[cfg(feature = "native")]
            AnyDatabase::Native(db) => db,
            #[cfg(feature = "engine")]
            AnyDatabase::Engine(db) => db,
        }
    }

    fn as_database_mut(&mut self) -> &mut dyn Database {
        match self {
            #[cfg(feature = "native")]
            AnyDatabase::Native(db) => db,
            #[cfg(feature = "engine")]
            AnyDatabase::Engine(db) => db,
        }
    }
}

/// Backend selector: builds, connects and then forwards to the chosen backend.
///
/// ```rust,no_run
/// use pg_middleware::prelude::*;
///
/// # async fn demo() -> Result<(), DbError> {
/// let config = ConnectionConfig::builder("localhost", "mydb", "user", "password").build()?;
/// let mut db = Db::create(config, BackendKind::Native).await?;
///
/// let rows = db.fetch("SELECT * FROM users WHERE age > $1", &[RowValues::Int(18)]).await?;
/// let users = vec![
///     vec![RowValues::Text("Alice".into()), RowValues::Int(25)],
///     vec![RowValues::Text("Bob".into()), RowValues::Int(30)],
/// ];
/// db.execute_many("INSERT INTO users (name, age) VALUES ($1, $2)", &users).await?;
/// db.close().await;
/// # let _ = rows;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Db {
    config: ConnectionConfig,
    kind: BackendKind,
    inner: Option<AnyDatabase>,
}

impl Db {
    /// Build the backend for `kind` and connect it.
    ///
    /// # Errors
    /// Returns whatever the backend's `connect()` returns, or `DbError::ConfigError`
    /// when `kind` is not compiled in.
    pub async fn create(config: ConnectionConfig, kind: BackendKind) -> Result<Self, DbError> {
        let mut backend = AnyDatabase::new(config.clone(), kind)?;
        backend.as_database_mut().connect().await?;
        Ok(Self {
            config,
            kind,
            inner: Some(backend),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// The wrapped backend.
    ///
    /// # Errors
    /// Returns `DbError::NotInitialized` if no backend is attached.
    pub fn database(&self) -> Result<&AnyDatabase, DbError> {
        self.inner.as_ref().ok_or(DbError::NotInitialized)
    }

    #[must_use]
    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.inner.as_ref().and_then(AnyDatabase::pool_status)
    }

    fn backend(&self) -> Result<&dyn Database, DbError> {
        self.database().map(AnyDatabase::as_database)
    }

    fn backend_mut(&mut self) -> Result<&mut dyn Database, DbError> {
        self.inner
            .as_mut()
            .map(AnyDatabase::as_database_mut)
            .ok_or(DbError::NotInitialized)
    }
}

#[async_trait]
impl Database for Db {
    fn is_connected(&self) -> bool {
        self.backend().is_ok_and(|db| db.is_connected())
    }

    async fn connect(&mut self) -> Result<(), DbError> {
        self.backend_mut()?.connect().await
    }

    async fn close(&mut self) {
        if let Ok(db) = self.backend_mut() {
            db.close().await;
        }
    }

    async fn fetch(&self, query: &str, params: &[RowValues]) -> Result<Vec<Row>, DbError> {
        self.backend()?.fetch(query, params).await
    }

    async fn fetch_one(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, DbError> {
        self.backend()?.fetch_one(query, params).await
    }

    async fn execute(&self, query: &str, params: &[RowValues]) -> Result<String, DbError> {
        self.backend()?.execute(query, params).await
    }

    async fn execute_many(
        &self,
        query: &str,
        param_sets: &[Vec<RowValues>],
    ) -> Result<(), DbError> {
        self.backend()?.execute_many(query, param_sets).await
    }

    async fn transaction(&self) -> Result<Transaction, DbError> {
        self.backend()?.transaction().await
    }
}
