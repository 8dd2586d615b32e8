//! Decoding for column types without a dedicated [`RowValues`] variant.
//!
//! Text-like types, enums and a few scalar types whose binary form is easy to
//! render (`numeric`, `uuid`, `time`, `inet`, `oid`, `"char"`) come back as
//! [`RowValues::Text`] or [`RowValues::Int`]. Anything else (arrays, ranges,
//! geometric types, ...) is handed back as its raw binary payload in
//! [`RowValues::Blob`].

use std::error::Error;
use std::net::IpAddr;

use chrono::NaiveTime;
use tokio_postgres::types::{FromSql, Kind, Type};

use crate::types::RowValues;

type DecodeError = Box<dyn Error + Sync + Send>;

/// Wire-level fallback that accepts every column type.
pub(super) struct Fallback(pub(super) RowValues);

impl<'a> FromSql<'a> for Fallback {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        let value = match *ty {
            Type::NUMERIC => RowValues::Text(numeric_text(raw)?),
            Type::UUID => RowValues::Text(uuid_text(raw)?),
            Type::TIME => RowValues::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::INET => RowValues::Text(IpAddr::from_sql(ty, raw)?.to_string()),
            Type::OID => RowValues::Int(i64::from(u32::from_sql(ty, raw)?)),
            Type::CHAR => RowValues::Text(char::from(i8::from_sql(ty, raw)? as u8).to_string()),
            _ if <&str as FromSql>::accepts(ty) => {
                RowValues::Text(<&str as FromSql>::from_sql(ty, raw)?.to_owned())
            }
            _ if matches!(ty.kind(), Kind::Enum(_)) => {
                RowValues::Text(std::str::from_utf8(raw)?.to_owned())
            }
            _ => RowValues::Blob(raw.to_vec()),
        };
        Ok(Self(value))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

fn be_u16(raw: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([raw[at], raw[at + 1]])
}

/// Render the binary `numeric` format (base-10000 digit groups) as decimal text.
fn numeric_text(raw: &[u8]) -> Result<String, DecodeError> {
    if raw.len() < 8 {
        return Err("numeric payload shorter than its header".into());
    }
    let ndigits = usize::from(be_u16(raw, 0));
    #[allow(clippy::cast_possible_wrap)]
    let weight = be_u16(raw, 2) as i16;
    let sign = be_u16(raw, 4);
    let dscale = usize::from(be_u16(raw, 6));

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }
    if raw.len() != 8 + ndigits * 2 {
        return Err("numeric payload length does not match its digit count".into());
    }
    let digits: Vec<u16> = (0..ndigits).map(|i| be_u16(raw, 8 + i * 2)).collect();
    let group = |idx: i32| -> u16 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for idx in 0..=i32::from(weight) {
            if idx == 0 {
                out.push_str(&group(idx).to_string());
            } else {
                out.push_str(&format!("{:04}", group(idx)));
            }
        }
    }
    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut idx = i32::from(weight) + 1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", group(idx)));
            idx += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }
    Ok(out)
}

fn uuid_text(raw: &[u8]) -> Result<String, DecodeError> {
    if raw.len() != 16 {
        return Err("uuid payload must be 16 bytes".into());
    }
    let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}
