//! Backend-neutral result rows.
//!
//! Drivers decode their native rows into a [`Row`]: an ordered map from
//! column name to [`FilterValue`]. Models read typed fields back out with
//! [`Row::get`], which goes through [`FromColumn`].
//!
//! ```rust
//! use agora_query::{FilterValue, Row};
//!
//! let row = Row::new()
//!     .with("slug", "climate")
//!     .with("position", 3)
//!     .with("summary", FilterValue::Null);
//!
//! let slug: String = row.get("slug").unwrap();
//! let position: i32 = row.get("position").unwrap();
//! let summary: Option<String> = row.get("summary").unwrap();
//! assert_eq!((slug.as_str(), position, summary), ("climate", 3, None));
//! ```

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::error::QueryError;
use crate::filter::FilterValue;

/// Error reading a column out of a row.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowError {
    /// Column not present in the row.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    /// Value could not be converted.
    #[error("type conversion error for '{column}': {message}")]
    TypeConversion {
        /// Column name.
        column: String,
        /// What went wrong.
        message: String,
    },
    /// Null in a non-nullable field.
    #[error("unexpected null in column '{0}'")]
    UnexpectedNull(String),
}

impl RowError {
    /// Conversion error with an expected/found message.
    pub fn mismatch(column: &str, expected: &str, found: &FilterValue) -> Self {
        Self::TypeConversion {
            column: column.to_string(),
            message: format!("expected {}, found {}", expected, found.type_name()),
        }
    }

    fn column(&self) -> &str {
        match self {
            Self::ColumnNotFound(c) | Self::UnexpectedNull(c) => c,
            Self::TypeConversion { column, .. } => column,
        }
    }
}

impl From<RowError> for QueryError {
    fn from(err: RowError) -> Self {
        match &err {
            RowError::TypeConversion { column, message } => {
                QueryError::invalid_type(column.as_str(), message.as_str()).with_source(err)
            }
            _ => {
                let column = err.column().to_string();
                QueryError::deserialization(err.to_string())
                    .with_field(column)
                    .with_source(err)
            }
        }
    }
}

/// One result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<String, FilterValue>,
}

impl Row {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert or replace a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Read a typed value.
    pub fn get<T: FromColumn>(&self, column: &str) -> Result<T, RowError> {
        match self.values.get(column) {
            Some(value) => T::from_column(column, value),
            None => T::missing(column),
        }
    }

    /// Raw value of a column.
    pub fn value(&self, column: &str) -> Option<&FilterValue> {
        self.values.get(column)
    }

    /// Value at a position.
    pub fn value_at(&self, index: usize) -> Option<(&str, &FilterValue)> {
        self.values.get_index(index).map(|(k, v)| (k.as_str(), v))
    }

    /// Column names in result order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, FilterValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, FilterValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Conversion from a row value into a Rust type.
pub trait FromColumn: Sized {
    /// Convert a present value.
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError>;

    /// Called when the column is absent from the row.
    fn missing(column: &str) -> Result<Self, RowError> {
        Err(RowError::ColumnNotFound(column.to_string()))
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Null => Ok(None),
            other => T::from_column(column, other).map(Some),
        }
    }
}

impl FromColumn for bool {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Bool(b) => Ok(*b),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Err(RowError::mismatch(column, "bool", other)),
        }
    }
}

impl FromColumn for i64 {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Int(i) => Ok(*i),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Err(RowError::mismatch(column, "int", other)),
        }
    }
}

impl FromColumn for i32 {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        let wide = i64::from_column(column, value)?;
        i32::try_from(wide).map_err(|_| RowError::TypeConversion {
            column: column.to_string(),
            message: format!("{} does not fit in i32", wide),
        })
    }
}

impl FromColumn for u64 {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        let wide = i64::from_column(column, value)?;
        u64::try_from(wide).map_err(|_| RowError::TypeConversion {
            column: column.to_string(),
            message: format!("{} is negative", wide),
        })
    }
}

impl FromColumn for f64 {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Float(f) => Ok(*f),
            FilterValue::Int(i) => Ok(*i as f64),
            FilterValue::String(s) => s.parse().map_err(|_| RowError::mismatch(column, "float", value)),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Err(RowError::mismatch(column, "float", other)),
        }
    }
}

impl FromColumn for String {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::String(s) => Ok(s.clone()),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Err(RowError::mismatch(column, "string", other)),
        }
    }
}

impl FromColumn for Uuid {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Uuid(u) => Ok(*u),
            FilterValue::String(s) => Uuid::parse_str(s).map_err(|e| RowError::TypeConversion {
                column: column.to_string(),
                message: e.to_string(),
            }),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Err(RowError::mismatch(column, "uuid", other)),
        }
    }
}

impl FromColumn for DateTime<Utc> {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::DateTime(dt) => Ok(*dt),
            FilterValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Err(RowError::mismatch(column, "timestamp", other)),
        }
    }
}

impl FromColumn for serde_json::Value {
    fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Json(v) => Ok(v.clone()),
            FilterValue::Null => Err(RowError::UnexpectedNull(column.to_string())),
            other => Ok(other.to_json()),
        }
    }
}

impl FromColumn for FilterValue {
    fn from_column(_column: &str, value: &FilterValue) -> Result<Self, RowError> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_typed() {
        let id = Uuid::new_v4();
        let row = Row::new()
            .with("id", id)
            .with("consent", true)
            .with("metadata", serde_json::json!({"a": 1}));

        assert_eq!(row.get::<Uuid>("id").unwrap(), id);
        assert!(row.get::<bool>("consent").unwrap());
        assert_eq!(row.get::<serde_json::Value>("metadata").unwrap()["a"], 1);
    }

    #[test]
    fn test_missing_and_null() {
        let row = Row::new().with("body", FilterValue::Null);

        assert_eq!(row.get::<Option<String>>("body").unwrap(), None);
        assert_eq!(
            row.get::<String>("body"),
            Err(RowError::UnexpectedNull("body".into()))
        );
        assert_eq!(
            row.get::<String>("title"),
            Err(RowError::ColumnNotFound("title".into()))
        );
    }

    #[test]
    fn test_uuid_and_timestamp_from_strings() {
        let row = Row::new()
            .with("id", "67e55044-10b1-426f-9247-bb680e5fe0c8")
            .with("created_at", "2024-03-01T12:00:00Z");

        assert!(row.get::<Uuid>("id").is_ok());
        let ts: DateTime<Utc> = row.get("created_at").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_i32_overflow() {
        let row = Row::new().with("position", i64::MAX);
        assert!(matches!(
            row.get::<i32>("position"),
            Err(RowError::TypeConversion { .. })
        ));
    }

    #[test]
    fn test_row_error_into_query_error() {
        let err: QueryError = RowError::UnexpectedNull("title".into()).into();
        assert_eq!(err.code, crate::error::ErrorCode::DeserializationError);
        assert_eq!(err.context.field.as_deref(), Some("title"));
    }

    #[test]
    fn test_conversion_error_is_invalid_data_type() {
        let row = Row::new().with("position", i64::MAX);
        let err: QueryError = row.get::<i32>("position").unwrap_err().into();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidDataType);
        assert_eq!(err.context.field.as_deref(), Some("position"));
        assert!(err.message.contains("position"));
    }

    #[test]
    fn test_column_order_preserved() {
        let row: Row = vec![("b", FilterValue::Int(1)), ("a", FilterValue::Int(2))]
            .into_iter()
            .collect();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.to_json(), serde_json::json!({"b": 1, "a": 2}));
    }
}
