//! Typed column handles.
//!
//! Model modules expose one function per column returning a handle; the
//! handle only offers operators that make sense for the column's type.
//!
//! ```rust
//! use agora_query::field::{NullableField, ScalarField};
//!
//! let slug = ScalarField::<String>::new("slug");
//! let summary = NullableField::<String>::new("summary");
//!
//! let (sql, params) = slug.starts_with("climate").to_sql(0);
//! assert_eq!(sql, "slug LIKE $1");
//! assert_eq!(params.len(), 1);
//!
//! let (sql, _) = summary.is_null().to_sql(0);
//! assert_eq!(sql, "summary IS NULL");
//! ```

use std::marker::PhantomData;

use crate::filter::{Filter, FilterValue, MatchKind, QueryMode};
use crate::types::{NullsOrder, OrderByField};

macro_rules! comparison_ops {
    ($ty:ident) => {
        impl<T: Into<FilterValue>> $ty<T> {
            /// Column name.
            pub const fn column(&self) -> &'static str {
                self.column
            }

            /// `column = value`
            pub fn equals(&self, value: impl Into<T>) -> Filter {
                Filter::Equals(self.column.into(), value.into().into())
            }

            /// `column <> value`
            pub fn not(&self, value: impl Into<T>) -> Filter {
                Filter::NotEquals(self.column.into(), value.into().into())
            }

            /// `column IN (...)`
            pub fn in_list<V: Into<T>>(&self, values: impl IntoIterator<Item = V>) -> Filter {
                Filter::In(
                    self.column.into(),
                    values.into_iter().map(|v| v.into().into()).collect(),
                )
            }

            /// `column NOT IN (...)`
            pub fn not_in<V: Into<T>>(&self, values: impl IntoIterator<Item = V>) -> Filter {
                Filter::NotIn(
                    self.column.into(),
                    values.into_iter().map(|v| v.into().into()).collect(),
                )
            }

            /// `column < value`
            pub fn lt(&self, value: impl Into<T>) -> Filter {
                Filter::Lt(self.column.into(), value.into().into())
            }

            /// `column <= value`
            pub fn lte(&self, value: impl Into<T>) -> Filter {
                Filter::Lte(self.column.into(), value.into().into())
            }

            /// `column > value`
            pub fn gt(&self, value: impl Into<T>) -> Filter {
                Filter::Gt(self.column.into(), value.into().into())
            }

            /// `column >= value`
            pub fn gte(&self, value: impl Into<T>) -> Filter {
                Filter::Gte(self.column.into(), value.into().into())
            }

            /// Ascending order on this column.
            pub fn asc(&self) -> OrderByField {
                OrderByField::asc(self.column)
            }

            /// Descending order on this column.
            pub fn desc(&self) -> OrderByField {
                OrderByField::desc(self.column)
            }
        }
    };
}

macro_rules! text_ops {
    ($ty:ident) => {
        impl $ty<String> {
            fn text_match(&self, kind: MatchKind, needle: impl Into<String>, mode: QueryMode) -> Filter {
                Filter::Like {
                    column: self.column.into(),
                    kind,
                    needle: needle.into(),
                    mode,
                }
            }

            /// Contains the text.
            pub fn contains(&self, needle: impl Into<String>) -> Filter {
                self.text_match(MatchKind::Contains, needle, QueryMode::Default)
            }

            /// Starts with the text.
            pub fn starts_with(&self, needle: impl Into<String>) -> Filter {
                self.text_match(MatchKind::StartsWith, needle, QueryMode::Default)
            }

            /// Ends with the text.
            pub fn ends_with(&self, needle: impl Into<String>) -> Filter {
                self.text_match(MatchKind::EndsWith, needle, QueryMode::Default)
            }

            /// Case-insensitive [`contains`](Self::contains).
            pub fn contains_insensitive(&self, needle: impl Into<String>) -> Filter {
                self.text_match(MatchKind::Contains, needle, QueryMode::Insensitive)
            }

            /// Case-insensitive [`starts_with`](Self::starts_with).
            pub fn starts_with_insensitive(&self, needle: impl Into<String>) -> Filter {
                self.text_match(MatchKind::StartsWith, needle, QueryMode::Insensitive)
            }

            /// Case-insensitive [`ends_with`](Self::ends_with).
            pub fn ends_with_insensitive(&self, needle: impl Into<String>) -> Filter {
                self.text_match(MatchKind::EndsWith, needle, QueryMode::Insensitive)
            }

            /// Case-insensitive equality.
            pub fn equals_insensitive(&self, value: impl Into<String>) -> Filter {
                Filter::Like {
                    column: self.column.into(),
                    kind: MatchKind::Exact,
                    needle: value.into(),
                    mode: QueryMode::Insensitive,
                }
            }
        }
    };
}

/// A non-nullable column of type `T`.
#[derive(Debug)]
pub struct ScalarField<T> {
    column: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> ScalarField<T> {
    /// Handle for `column`.
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            _type: PhantomData,
        }
    }
}

impl<T> Clone for ScalarField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScalarField<T> {}

comparison_ops!(ScalarField);
text_ops!(ScalarField);

/// A nullable column of type `T`.
#[derive(Debug)]
pub struct NullableField<T> {
    column: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> NullableField<T> {
    /// Handle for `column`.
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            _type: PhantomData,
        }
    }

    /// `column IS NULL`
    pub fn is_null(&self) -> Filter {
        Filter::IsNull(self.column.into())
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(&self) -> Filter {
        Filter::IsNotNull(self.column.into())
    }

    /// Ascending order with explicit null placement.
    pub fn asc_nulls(&self, nulls: NullsOrder) -> OrderByField {
        OrderByField::asc(self.column).nulls(nulls)
    }

    /// Descending order with explicit null placement.
    pub fn desc_nulls(&self, nulls: NullsOrder) -> OrderByField {
        OrderByField::desc(self.column).nulls(nulls)
    }
}

impl<T: Into<FilterValue>> NullableField<T> {
    /// `column = value`, or `IS NULL` for `None`.
    pub fn equals_opt(&self, value: Option<T>) -> Filter {
        Filter::Equals(self.column.into(), value.into())
    }
}

impl<T> Clone for NullableField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NullableField<T> {}

comparison_ops!(NullableField);
text_ops!(NullableField);

/// A JSONB column.
#[derive(Debug, Clone, Copy)]
pub struct JsonField {
    column: &'static str,
}

impl JsonField {
    /// Handle for `column`.
    pub const fn new(column: &'static str) -> Self {
        Self { column }
    }

    /// Column name.
    pub const fn column(&self) -> &'static str {
        self.column
    }

    /// Whole-document equality.
    pub fn equals(&self, value: serde_json::Value) -> Filter {
        Filter::Equals(self.column.into(), FilterValue::Json(value))
    }

    /// The document contains `value` (`@>`).
    pub fn contains(&self, value: serde_json::Value) -> Filter {
        Filter::JsonContains(self.column.into(), value)
    }

    /// The document has a top-level key.
    pub fn has_key(&self, key: impl Into<String>) -> Filter {
        Filter::JsonHasKey(self.column.into(), key.into())
    }

    /// `column IS NULL`
    pub fn is_null(&self) -> Filter {
        Filter::IsNull(self.column.into())
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(&self) -> Filter {
        Filter::IsNotNull(self.column.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_scalar_ops() {
        let position = ScalarField::<i32>::new("position");
        assert_eq!(position.gt(3), Filter::Gt("position".into(), FilterValue::Int(3)));
        assert_eq!(
            position.in_list([1, 2]),
            Filter::In("position".into(), vec![FilterValue::Int(1), FilterValue::Int(2)])
        );
        assert_eq!(position.desc().to_sql(), "position DESC");
    }

    #[test]
    fn test_string_accepts_str() {
        let slug = ScalarField::<String>::new("slug");
        assert_eq!(
            slug.equals("climate"),
            Filter::Equals("slug".into(), FilterValue::String("climate".into()))
        );
        let (sql, params) = slug.contains_insensitive("Clim").to_sql(0);
        assert_eq!(sql, "slug ILIKE $1");
        assert_eq!(params, vec![FilterValue::String("%Clim%".into())]);
    }

    #[test]
    fn test_equals_insensitive() {
        let email = ScalarField::<String>::new("email");
        let (sql, params) = email.equals_insensitive("A_B@x.ch").to_sql(0);
        assert_eq!(sql, "email ILIKE $1");
        assert_eq!(params, vec![FilterValue::String("A\\_B@x.ch".into())]);
    }

    #[test]
    fn test_nullable_ops() {
        let region = NullableField::<Uuid>::new("region_id");
        assert_eq!(region.is_null(), Filter::IsNull("region_id".into()));
        assert_eq!(
            region.equals_opt(None),
            Filter::Equals("region_id".into(), FilterValue::Null)
        );
        assert_eq!(
            region.asc_nulls(NullsOrder::First).to_sql(),
            "region_id ASC NULLS FIRST"
        );
    }

    #[test]
    fn test_json_ops() {
        let metadata = JsonField::new("metadata");
        let (sql, _) = metadata.has_key("source").to_sql(0);
        assert_eq!(sql, "metadata ? $1");
        assert_eq!(metadata.is_not_null(), Filter::IsNotNull("metadata".into()));
    }
}
