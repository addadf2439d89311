//! Ordering and column selection.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sql::{column_list, quote_identifier};

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// The opposite direction.
    pub fn reverse(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Null placement in sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Nulls first.
    First,
    /// Nulls last.
    Last,
}

impl NullsOrder {
    /// Get the SQL clause for this null order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// Order by specification for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: Cow<'static, str>,
    /// The sort order.
    pub order: SortOrder,
    /// Null handling.
    pub nulls: Option<NullsOrder>,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
            nulls: None,
        }
    }

    /// Set null handling.
    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Ascending order.
    pub fn asc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Descending order.
    pub fn desc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Write `column DIR [NULLS ...]` to a buffer.
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&quote_identifier(&self.column));
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
        if let Some(nulls) = self.nulls {
            buffer.push(' ');
            buffer.push_str(nulls.as_sql());
        }
    }

    /// Generate the SQL for this field.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(self.column.len() + 16);
        self.write_sql(&mut sql);
        sql
    }
}

/// An ordering over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    fields: Vec<OrderByField>,
}

impl OrderBy {
    /// No ordering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check if the order by is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a field.
    pub fn then(mut self, field: OrderByField) -> Self {
        self.fields.push(field);
        self
    }

    /// Build from fields.
    pub fn from_fields(fields: impl IntoIterator<Item = OrderByField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// The fields in order.
    pub fn fields(&self) -> &[OrderByField] {
        &self.fields
    }

    /// Put the given columns first, keeping their direction when they were
    /// already ordered on. `DISTINCT ON` requires this shape.
    pub fn led_by(&self, columns: &[String]) -> Self {
        let mut fields: Vec<OrderByField> = columns
            .iter()
            .map(|col| {
                self.fields
                    .iter()
                    .find(|f| f.column == col.as_str())
                    .cloned()
                    .unwrap_or_else(|| OrderByField::asc(col.clone()))
            })
            .collect();
        fields.extend(
            self.fields
                .iter()
                .filter(|f| !columns.iter().any(|c| f.column == c.as_str()))
                .cloned(),
        );
        Self { fields }
    }

    /// Generate the ORDER BY list (without the keyword).
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            field.write_sql(&mut sql);
        }
        sql
    }
}

impl From<OrderByField> for OrderBy {
    fn from(field: OrderByField) -> Self {
        Self { fields: vec![field] }
    }
}

impl From<Vec<OrderByField>> for OrderBy {
    fn from(fields: Vec<OrderByField>) -> Self {
        Self { fields }
    }
}

impl<const N: usize> From<[OrderByField; N]> for OrderBy {
    fn from(fields: [OrderByField; N]) -> Self {
        Self::from_fields(fields)
    }
}

/// Columns returned by a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Select {
    /// Every column of the model.
    #[default]
    All,
    /// Only the named columns.
    Fields(Vec<String>),
}

impl Select {
    /// Select specific columns.
    pub fn fields(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Fields(columns.into_iter().map(Into::into).collect())
    }

    /// Render against a model's full column list.
    pub fn to_sql(&self, all_columns: &[&str]) -> String {
        match self {
            Self::All => column_list(all_columns),
            Self::Fields(cols) => column_list(cols),
        }
    }
}

impl From<Vec<&str>> for Select {
    fn from(cols: Vec<&str>) -> Self {
        Self::fields(cols)
    }
}

impl<const N: usize> From<[&str; N]> for Select {
    fn from(cols: [&str; N]) -> Self {
        Self::fields(cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_field() {
        assert_eq!(OrderByField::desc("created_at").to_sql(), "created_at DESC");
        assert_eq!(
            OrderByField::asc("published_at").nulls(NullsOrder::Last).to_sql(),
            "published_at ASC NULLS LAST"
        );
    }

    #[test]
    fn test_order_by_many() {
        let order = OrderBy::from([OrderByField::asc("position"), OrderByField::desc("id")]);
        assert_eq!(order.to_sql(), "position ASC, id DESC");
        assert!(OrderBy::none().is_empty());
    }

    #[test]
    fn test_led_by_keeps_direction() {
        let order = OrderBy::from([OrderByField::asc("title"), OrderByField::desc("topic_id")]);
        let led = order.led_by(&["topic_id".to_string(), "kind".to_string()]);
        assert_eq!(led.to_sql(), "topic_id DESC, kind ASC, title ASC");
    }

    #[test]
    fn test_select() {
        assert_eq!(Select::All.to_sql(&["id", "slug"]), "id, slug");
        assert_eq!(Select::from(["slug"]).to_sql(&["id", "slug"]), "slug");
    }
}
