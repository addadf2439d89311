//! Decoding driver rows into [`agora_query::Row`].

use std::error::Error;
use std::fmt::Write as _;

use agora_query::{FilterValue, Row};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres_types::{FromSql, Kind, Type};
use uuid::Uuid;

use crate::error::{PgError, PgResult};

type DecodeError = Box<dyn Error + Sync + Send>;

/// Text of a value whose wire format is UTF-8, e.g. a PostgreSQL enum label.
struct Label(String);

impl<'a> FromSql<'a> for Label {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(Self(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

/// A `numeric` rendered as decimal text.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        numeric_to_string(raw).map(Self)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Render the binary `numeric` format: a header of ndigits, weight, sign
/// and dscale followed by base-10000 digits.
fn numeric_to_string(raw: &[u8]) -> Result<String, DecodeError> {
    if raw.len() < 8 {
        return Err("numeric value too short".into());
    }
    let read = |at: usize| u16::from_be_bytes([raw[at], raw[at + 1]]);

    let ndigits = usize::from(read(0));
    let weight = read(2) as i16;
    let sign = read(4);
    let dscale = usize::from(read(6));

    if sign == 0xC000 {
        return Ok("NaN".to_string());
    }
    if raw.len() < 8 + ndigits * 2 {
        return Err("numeric value truncated".into());
    }
    let digits: Vec<u16> = (0..ndigits).map(|i| read(8 + i * 2)).collect();
    let digit = |i: i32| -> u16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=i32::from(weight) {
            if i == 0 {
                write!(out, "{}", digit(i))?;
            } else {
                write!(out, "{:04}", digit(i))?;
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::new();
        let mut i = i32::from(weight) + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit(i))?;
            i += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> PgResult<Option<T>> {
    Ok(row.try_get::<_, Option<T>>(idx)?)
}

fn decode_column(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> PgResult<FilterValue> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(FilterValue::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(|v| FilterValue::Int(v.into())),
        Type::INT4 => get::<i32>(row, idx)?.map(|v| FilterValue::Int(v.into())),
        Type::INT8 => get::<i64>(row, idx)?.map(FilterValue::Int),
        Type::OID => get::<u32>(row, idx)?.map(|v| FilterValue::Int(v.into())),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(|v| FilterValue::Float(v.into())),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(FilterValue::Float),
        Type::NUMERIC => get::<NumericText>(row, idx)?.map(|v| FilterValue::String(v.0)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, idx)?.map(FilterValue::String)
        }
        Type::UUID => get::<Uuid>(row, idx)?.map(FilterValue::Uuid),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?.map(FilterValue::DateTime),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(|v| FilterValue::DateTime(v.and_utc())),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(|v| FilterValue::String(v.to_string())),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx)?.map(FilterValue::Json),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => get::<Vec<String>>(row, idx)?
            .map(|v| FilterValue::List(v.into_iter().map(FilterValue::String).collect())),
        Type::INT4_ARRAY => get::<Vec<i32>>(row, idx)?
            .map(|v| FilterValue::List(v.into_iter().map(|i| FilterValue::Int(i.into())).collect())),
        Type::INT8_ARRAY => get::<Vec<i64>>(row, idx)?
            .map(|v| FilterValue::List(v.into_iter().map(FilterValue::Int).collect())),
        Type::UUID_ARRAY => get::<Vec<Uuid>>(row, idx)?
            .map(|v| FilterValue::List(v.into_iter().map(FilterValue::Uuid).collect())),
        _ if matches!(ty.kind(), Kind::Enum(_)) => get::<Label>(row, idx)?.map(|v| FilterValue::String(v.0)),
        _ => {
            return Err(PgError::deserialization(format!(
                "column '{}' has unsupported type {}",
                row.columns()[idx].name(),
                ty
            )));
        }
    };
    Ok(value.unwrap_or(FilterValue::Null))
}

/// Decode every column of a driver row.
pub fn decode_row(row: &tokio_postgres::Row) -> PgResult<Row> {
    let mut decoded = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_())?;
        decoded.insert(column.name(), value);
    }
    Ok(decoded)
}

/// Decode a result set.
pub fn decode_rows(rows: &[tokio_postgres::Row]) -> PgResult<Vec<Row>> {
    rows.iter().map(decode_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numeric(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        for part in [ndigits, weight as u16, sign, dscale].iter().chain(digits) {
            raw.extend_from_slice(&part.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_numeric_with_fraction() {
        let raw = numeric(2, 0, 0, 2, &[123, 4500]);
        assert_eq!(numeric_to_string(&raw).unwrap(), "123.45");
    }

    #[test]
    fn test_numeric_large_integer() {
        let raw = numeric(2, 1, 0, 0, &[12, 3456]);
        assert_eq!(numeric_to_string(&raw).unwrap(), "123456");
    }

    #[test]
    fn test_numeric_small_negative() {
        let raw = numeric(1, -2, 0x4000, 8, &[1]);
        assert_eq!(numeric_to_string(&raw).unwrap(), "-0.00000001");
    }

    #[test]
    fn test_numeric_zero_and_nan() {
        assert_eq!(numeric_to_string(&numeric(0, 0, 0, 0, &[])).unwrap(), "0");
        assert_eq!(numeric_to_string(&numeric(0, 0, 0xC000, 0, &[])).unwrap(), "NaN");
    }

    #[test]
    fn test_numeric_rejects_truncated_input() {
        assert!(numeric_to_string(&[0, 1]).is_err());
        assert!(numeric_to_string(&numeric(3, 0, 0, 0, &[1])).is_err());
    }
}
