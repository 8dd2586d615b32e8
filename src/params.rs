use std::error::Error;

use chrono::{DateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

/// Borrow a parameter slice in the form `tokio_postgres` binds.
#[must_use]
pub fn as_refs(params: &[RowValues]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match (self, ty) {
            (RowValues::Null, _) => Ok(IsNull::Yes),
            // narrow to the column's width; the wire format is fixed-size
            (RowValues::Int(i), &Type::INT2) => i16::try_from(*i)?.to_sql(ty, out),
            (RowValues::Int(i), &Type::INT4) => i32::try_from(*i)?.to_sql(ty, out),
            (RowValues::Int(i), &Type::INT8) => i.to_sql(ty, out),
            #[allow(clippy::cast_possible_truncation)]
            (RowValues::Float(f), &Type::FLOAT4) => (*f as f32).to_sql(ty, out),
            (RowValues::Float(f), &Type::FLOAT8) => f.to_sql(ty, out),
            (RowValues::Text(s), &Type::TEXT | &Type::VARCHAR | &Type::BPCHAR | &Type::NAME) => {
                s.to_sql(ty, out)
            }
            (RowValues::Bool(b), &Type::BOOL) => b.to_sql(ty, out),
            (RowValues::Timestamp(dt), &Type::TIMESTAMP) => dt.to_sql(ty, out),
            (RowValues::Timestamp(dt), &Type::TIMESTAMPTZ) => {
                DateTime::<Utc>::from_naive_utc_and_offset(*dt, Utc).to_sql(ty, out)
            }
            (RowValues::Timestamp(dt), &Type::DATE) => dt.date().to_sql(ty, out),
            (RowValues::JSON(jsval), &Type::JSON | &Type::JSONB) => jsval.to_sql(ty, out),
            (RowValues::Blob(bytes), &Type::BYTEA) => bytes.to_sql(ty, out),
            (value, _) => Err(format!(
                "cannot bind a {} value to a parameter of type {ty}",
                variant_name(value)
            )
            .into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

fn variant_name(value: &RowValues) -> &'static str {
    match value {
        RowValues::Int(_) => "integer",
        RowValues::Float(_) => "float",
        RowValues::Text(_) => "text",
        RowValues::Bool(_) => "boolean",
        RowValues::Timestamp(_) => "timestamp",
        RowValues::Null => "null",
        RowValues::JSON(_) => "json",
        RowValues::Blob(_) => "binary",
    }
}
