//! Statement helpers that run against a checked-out `tokio_postgres::Client`.
//!
//! Pool checkout, transaction state and status formatting belong to the callers;
//! these functions only bind parameters, run the statement and normalize rows.

use tokio_postgres::{Client, Statement};

use crate::error::DbError;
use crate::params::as_refs;
use crate::results::{Row, rows_from_pg};
use crate::types::RowValues;

/// Run a query and normalize every returned row.
///
/// # Errors
/// Returns the driver error.
pub(crate) async fn fetch_all(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<Vec<Row>, DbError> {
    let rows = client.query(query, &as_refs(params)).await?;
    rows_from_pg(&rows)
}

/// Same as [`fetch_all`] for an already prepared statement.
///
/// # Errors
/// Returns the driver error.
pub(crate) async fn fetch_prepared(
    client: &Client,
    stmt: &Statement,
    params: &[RowValues],
) -> Result<Vec<Row>, DbError> {
    let rows = client.query(stmt, &as_refs(params)).await?;
    rows_from_pg(&rows)
}

/// Run a query and keep only the first row.
///
/// # Errors
/// Returns the driver error.
pub(crate) async fn fetch_first(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<Option<Row>, DbError> {
    Ok(fetch_all(client, query, params).await?.into_iter().next())
}

/// Run a statement and return the affected row count.
///
/// # Errors
/// Returns the driver error.
pub(crate) async fn execute_rows(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<u64, DbError> {
    Ok(client.execute(query, &as_refs(params)).await?)
}

/// Prepare `query` once and execute it for every parameter tuple, in order.
///
/// Stops at the first failing tuple. Atomicity is up to the caller's transaction.
///
/// # Errors
/// Returns the driver error from preparing or from the first failing tuple.
pub(crate) async fn execute_each(
    client: &Client,
    query: &str,
    param_sets: &[Vec<RowValues>],
) -> Result<u64, DbError> {
    let stmt = client.prepare(query).await?;
    let mut total = 0;
    for params in param_sets {
        total += client.execute(&stmt, &as_refs(params)).await?;
    }
    Ok(total)
}
