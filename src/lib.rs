//! Pooled async PostgreSQL access behind one [`Database`] contract.
//!
//! Two interchangeable backends implement the contract:
//! - [`NativeDatabase`]: a deadpool-postgres pool of raw wire-protocol clients
//! - [`EngineDatabase`]: a bb8 engine handing out short-lived sessions
//!
//! [`Db`] picks one at construction time, connects it and forwards every call.

#[cfg(not(any(feature = "native", feature = "engine")))]
compile_error!("enable at least one backend feature: `native` or `engine`");

pub mod prelude;

pub mod config;
pub mod database;
pub mod error;
pub mod params;
pub mod pool;
pub mod results;
pub mod selector;
pub mod transaction;
pub mod types;

mod executor;

#[cfg(feature = "engine")]
pub mod engine;
#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use database::{Database, TxFuture, in_transaction};
#[cfg(feature = "engine")]
pub use engine::{EngineDatabase, EnginePoolSizing};
pub use error::DbError;
#[cfg(feature = "native")]
pub use native::NativeDatabase;
pub use pool::PoolStatus;
pub use results::Row;
pub use selector::{AnyDatabase, Db};
pub use transaction::Transaction;
pub use types::{BackendKind, RowValues};
