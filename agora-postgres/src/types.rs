//! Binding [`FilterValue`] parameters to PostgreSQL types.
//!
//! The server infers a type for every `$n` placeholder; [`PgValue`] converts
//! the client value to that type at bind time. Integers narrow to `int2` and
//! `int4` with a range check, strings parse into `uuid`, `timestamptz` and
//! `date` columns, and `NULL` binds to anything.

use std::error::Error;

use agora_query::FilterValue;
use chrono::{DateTime, NaiveDate, Utc};
use bytes::BytesMut;
use postgres_types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type BindResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

/// A parameter ready to be sent to PostgreSQL.
#[derive(Debug)]
pub struct PgValue<'a>(pub &'a FilterValue);

/// Wrap a parameter list for `query`/`execute`.
pub fn bind_params(params: &[FilterValue]) -> Vec<PgValue<'_>> {
    params.iter().map(PgValue).collect()
}

/// Borrow wrapped parameters as trait objects.
pub fn as_sql_params<'a>(values: &'a [PgValue<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn out_of_range(value: impl std::fmt::Display, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("{} is out of range for {}", value, ty).into()
}

fn bind_int(value: i64, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::INT2 => i16::try_from(value)
            .map_err(|_| out_of_range(value, ty))?
            .to_sql(ty, out),
        Type::INT4 => i32::try_from(value)
            .map_err(|_| out_of_range(value, ty))?
            .to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
        Type::NUMERIC => Err(format!("cannot bind {} to numeric; cast the parameter to float8", value).into()),
        _ => value.to_sql(ty, out),
    }
}

fn bind_float(value: f64, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
        Type::NUMERIC => Err(format!("cannot bind {} to numeric; cast the parameter to float8", value).into()),
        _ => value.to_sql(ty, out),
    }
}

fn bind_str(value: &str, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::UUID => Uuid::parse_str(value)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(value)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::TIMESTAMP => DateTime::parse_from_rfc3339(value)?
            .naive_utc()
            .to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(value, "%Y-%m-%d")?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::Value::String(value.to_string()).to_sql(ty, out),
        _ if matches!(ty.kind(), Kind::Enum(_)) => {
            out.extend_from_slice(value.as_bytes());
            Ok(IsNull::No)
        }
        _ => value.to_sql(ty, out),
    }
}

impl ToSql for PgValue<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> BindResult {
        match self.0 {
            FilterValue::Null => Ok(IsNull::Yes),
            FilterValue::Bool(b) => b.to_sql(ty, out),
            FilterValue::Int(i) => bind_int(*i, ty, out),
            FilterValue::Float(f) => bind_float(*f, ty, out),
            FilterValue::String(s) => bind_str(s, ty, out),
            FilterValue::Uuid(u) => match *ty {
                Type::TEXT | Type::VARCHAR => u.to_string().to_sql(ty, out),
                _ => u.to_sql(ty, out),
            },
            FilterValue::DateTime(dt) => match *ty {
                Type::TIMESTAMP => dt.naive_utc().to_sql(ty, out),
                Type::DATE => dt.date_naive().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => dt.to_rfc3339().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            FilterValue::Json(v) => match *ty {
                Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            FilterValue::List(items) => match ty.kind() {
                Kind::Array(_) => bind_params(items).to_sql(ty, out),
                _ => Err(format!("cannot bind a list to non-array type {}", ty).into()),
            },
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(value: FilterValue, ty: &Type) -> Result<(IsNull, Vec<u8>), String> {
        let mut out = BytesMut::new();
        PgValue(&value)
            .to_sql(ty, &mut out)
            .map(|is_null| (is_null, out.to_vec()))
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_null_binds_to_any_type() {
        for ty in [Type::INT4, Type::TEXT, Type::UUID, Type::JSONB] {
            let (is_null, bytes) = encode(FilterValue::Null, &ty).unwrap();
            assert!(matches!(is_null, IsNull::Yes));
            assert!(bytes.is_empty());
        }
    }

    #[test]
    fn test_int_narrows_to_column_width() {
        assert_eq!(encode(FilterValue::Int(7), &Type::INT4).unwrap().1, vec![0, 0, 0, 7]);
        assert_eq!(encode(FilterValue::Int(7), &Type::INT2).unwrap().1, vec![0, 7]);
        assert_eq!(encode(FilterValue::Int(7), &Type::INT8).unwrap().1.len(), 8);
    }

    #[test]
    fn test_int_overflow_is_rejected() {
        match encode(FilterValue::Int(i64::from(i32::MAX) + 1), &Type::INT4) {
            Err(err) => assert!(err.contains("out of range")),
            Ok(_) => panic!("expected an overflow error"),
        }
    }

    #[test]
    fn test_string_parses_into_uuid() {
        let id = Uuid::new_v4();
        let (_, bytes) = encode(FilterValue::String(id.to_string()), &Type::UUID).unwrap();
        assert_eq!(bytes, id.as_bytes().to_vec());
        assert!(encode(FilterValue::String("nope".into()), &Type::UUID).is_err());
    }

    #[test]
    fn test_string_to_enum_writes_label() {
        let ty = Type::new(
            "publish_status".into(),
            0,
            Kind::Enum(vec!["DRAFT".into(), "PUBLISHED".into()]),
            "public".into(),
        );
        let (_, bytes) = encode(FilterValue::String("DRAFT".into()), &ty).unwrap();
        assert_eq!(bytes, b"DRAFT".to_vec());
    }

    #[test]
    fn test_list_requires_array_type() {
        let list = FilterValue::List(vec![FilterValue::Int(1), FilterValue::Int(2)]);
        assert!(encode(list.clone(), &Type::INT4_ARRAY).is_ok());
        assert!(encode(list, &Type::INT4).is_err());
    }

    #[test]
    fn test_numeric_is_rejected() {
        assert!(encode(FilterValue::Float(1.5), &Type::NUMERIC).is_err());
    }
}
