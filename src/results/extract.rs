use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::types::Type;

use super::fallback::Fallback;
use super::row::{Columns, Row};
use crate::error::DbError;
use crate::types::RowValues;

/// Normalize driver rows into [`Row`]s that share one column list.
///
/// # Errors
/// Returns the driver error if a column cannot be decoded.
pub fn rows_from_pg(rows: &[tokio_postgres::Row]) -> Result<Vec<Row>, DbError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns = Arc::new(Columns::new(
        first
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
    ));

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let col_count = row.columns().len();
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            values.push(extract_value(row, idx)?);
        }
        out.push(Row::with_columns(Arc::clone(&columns), values));
    }
    Ok(out)
}

/// Decode one column of a `tokio_postgres` row into a [`RowValues`].
///
/// Types without a dedicated variant come back as text when they are text-like or a
/// well-known scalar (`numeric`, `uuid`, `time`, `inet`), and as raw bytes otherwise.
///
/// # Errors
/// Returns the driver error if the column cannot be read as the chosen type.
pub fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<RowValues, DbError> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)?
            .map_or(RowValues::Null, RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(RowValues::Null, RowValues::Float),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map_or(RowValues::Null, RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map_or(RowValues::Null, RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map_or(RowValues::Null, |v| {
                RowValues::Timestamp(v.and_time(chrono::NaiveTime::MIN))
            }),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .map_or(RowValues::Null, RowValues::JSON),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(RowValues::Null, RowValues::Blob),
        _ => row
            .try_get::<_, Option<Fallback>>(idx)?
            .map_or(RowValues::Null, |Fallback(value)| value),
    };
    Ok(value)
}
