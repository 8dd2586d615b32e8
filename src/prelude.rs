//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::ConnectionConfig;
pub use crate::database::{Database, in_transaction};
pub use crate::error::DbError;
pub use crate::results::Row;
pub use crate::selector::Db;
pub use crate::transaction::Transaction;
pub use crate::types::{BackendKind, RowValues};

#[cfg(feature = "engine")]
pub use crate::engine::EngineDatabase;
#[cfg(feature = "native")]
pub use crate::native::NativeDatabase;
