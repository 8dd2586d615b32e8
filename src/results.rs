//! Driver-independent result rows.
//!
//! Both pools hand back `tokio_postgres::Row`s; everything above the pool layer
//! only ever sees [`Row`], so callers cannot tell which backend produced it.

mod extract;
mod fallback;
mod row;

pub use extract::{extract_value, rows_from_pg};
pub use row::Row;
