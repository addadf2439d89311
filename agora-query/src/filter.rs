//! Filter types for building WHERE clauses.
//!
//! A [`Filter`] is a tree rendered into PostgreSQL with `$n` placeholders.
//! Placeholders are numbered in order of appearance, continuing from the
//! offset passed to [`Filter::to_sql`], so a filter can follow a SET list
//! or any other parameterised fragment.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sql::quote_identifier;

/// A value bound as a statement parameter or read back from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value. Enum columns are bound as their database string.
    String(String),
    /// UUID value.
    Uuid(Uuid),
    /// Timestamp with time zone.
    DateTime(DateTime<Utc>),
    /// JSON value.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, used in type mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Uuid(_) => "uuid",
            Self::DateTime(_) => "timestamp",
            Self::Json(_) => "json",
            Self::List(_) => "list",
        }
    }

    /// Render as JSON, for logging and aggregate results.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Uuid(u) => serde_json::Value::String(u.to_string()),
            Self::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Self::Json(v) => v.clone(),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for FilterValue {
    fn from(v: i16) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f32> for FilterValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<&String> for FilterValue {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

/// JSON `null` stays a JSON value; SQL NULL comes from `None`.
impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Case sensitivity for string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// `LIKE`
    #[default]
    Default,
    /// `ILIKE`
    Insensitive,
}

/// Where the needle must appear in a string match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Anywhere in the value.
    Contains,
    /// At the start.
    StartsWith,
    /// At the end.
    EndsWith,
    /// The whole value.
    Exact,
}

impl MatchKind {
    fn pattern(&self, needle: &str) -> String {
        let escaped = escape_like(needle);
        match self {
            Self::Contains => format!("%{}%", escaped),
            Self::StartsWith => format!("{}%", escaped),
            Self::EndsWith => format!("%{}", escaped),
            Self::Exact => escaped,
        }
    }
}

/// Escape LIKE wildcards so the needle matches literally.
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// How a relation filter quantifies over related rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// At least one related row matches.
    Some,
    /// No related row matches.
    None,
    /// Every related row matches (vacuously true without related rows).
    Every,
    /// The to-one related row exists and matches.
    Is,
    /// The to-one related row does not match or does not exist.
    IsNot,
}

/// A filter on rows of a related table, rendered as a correlated `EXISTS`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    /// Quantifier.
    pub kind: RelationKind,
    /// Table of the model that owns the relation.
    pub parent_table: &'static str,
    /// Table of the related model.
    pub table: &'static str,
    /// Join pairs as `(related column, parent column)`.
    pub join: &'static [(&'static str, &'static str)],
    /// Filter on the related rows.
    pub filter: Box<Filter>,
}

impl RelationFilter {
    /// Create a relation filter.
    pub fn new(
        kind: RelationKind,
        parent_table: &'static str,
        table: &'static str,
        join: &'static [(&'static str, &'static str)],
        filter: Filter,
    ) -> Self {
        Self {
            kind,
            parent_table,
            table,
            join,
            filter: Box::new(filter),
        }
    }
}

/// A complete filter that can be converted to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison. A null value renders `IS NULL`.
    Equals(String, FilterValue),
    /// Not equals comparison. A null value renders `IS NOT NULL`.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(String, Vec<FilterValue>),

    /// String match with LIKE or ILIKE. Wildcards in the needle are escaped.
    Like {
        /// Column to match.
        column: String,
        /// Position of the needle.
        kind: MatchKind,
        /// Literal text to look for.
        needle: String,
        /// Case sensitivity.
        mode: QueryMode,
    },

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// JSONB containment (`@>`).
    JsonContains(String, serde_json::Value),
    /// JSONB top-level key existence (`?`).
    JsonHasKey(String, String),

    /// Filter on related rows.
    Relation(RelationFilter),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter, dropping empty members.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter, dropping empty members.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Generate SQL for this filter.
    ///
    /// `param_offset` is the number of parameters already bound by the
    /// enclosing statement; the first placeholder emitted is
    /// `$(param_offset + 1)`. Returns the SQL and the values to bind.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FilterValue>) {
        let mut writer = FilterWriter {
            sql: String::new(),
            params: Vec::new(),
            offset: param_offset,
            depth: 0,
        };
        writer.write(self, None);
        (writer.sql, writer.params)
    }
}

impl From<RelationFilter> for Filter {
    fn from(relation: RelationFilter) -> Self {
        Self::Relation(relation)
    }
}

struct FilterWriter {
    sql: String,
    params: Vec<FilterValue>,
    offset: usize,
    depth: usize,
}

impl FilterWriter {
    fn bind(&mut self, value: FilterValue) -> usize {
        self.params.push(value);
        self.offset + self.params.len()
    }

    fn column(&mut self, scope: Option<&str>, column: &str) {
        if let Some(scope) = scope {
            self.sql.push_str(scope);
            self.sql.push('.');
        }
        self.sql.push_str(&quote_identifier(column));
    }

    fn compare(&mut self, scope: Option<&str>, column: &str, op: &str, value: &FilterValue) {
        self.column(scope, column);
        let idx = self.bind(value.clone());
        let _ = write!(self.sql, " {} ${}", op, idx);
    }

    fn list(&mut self, scope: Option<&str>, column: &str, op: &str, values: &[FilterValue]) {
        self.column(scope, column);
        let _ = write!(self.sql, " {} (", op);
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            let idx = self.bind(value.clone());
            let _ = write!(self.sql, "${}", idx);
        }
        self.sql.push(')');
    }

    fn join(&mut self, filters: &[Filter], sep: &str, scope: Option<&str>) {
        self.sql.push('(');
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            self.write(filter, scope);
        }
        self.sql.push(')');
    }

    /// `scope` is the alias columns are qualified with inside a relation
    /// subquery. Top-level filters leave columns unqualified.
    fn write(&mut self, filter: &Filter, scope: Option<&str>) {
        match filter {
            Filter::None => self.sql.push_str("TRUE"),

            Filter::Equals(col, val) if val.is_null() => {
                self.column(scope, col);
                self.sql.push_str(" IS NULL");
            }
            Filter::Equals(col, val) => self.compare(scope, col, "=", val),
            Filter::NotEquals(col, val) if val.is_null() => {
                self.column(scope, col);
                self.sql.push_str(" IS NOT NULL");
            }
            Filter::NotEquals(col, val) => self.compare(scope, col, "<>", val),

            Filter::Lt(col, val) => self.compare(scope, col, "<", val),
            Filter::Lte(col, val) => self.compare(scope, col, "<=", val),
            Filter::Gt(col, val) => self.compare(scope, col, ">", val),
            Filter::Gte(col, val) => self.compare(scope, col, ">=", val),

            Filter::In(_, values) if values.is_empty() => self.sql.push_str("FALSE"),
            Filter::In(col, values) => self.list(scope, col, "IN", values),
            Filter::NotIn(_, values) if values.is_empty() => self.sql.push_str("TRUE"),
            Filter::NotIn(col, values) => self.list(scope, col, "NOT IN", values),

            Filter::Like {
                column,
                kind,
                needle,
                mode,
            } => {
                let op = match mode {
                    QueryMode::Default => "LIKE",
                    QueryMode::Insensitive => "ILIKE",
                };
                self.compare(scope, column, op, &FilterValue::String(kind.pattern(needle)));
            }

            Filter::IsNull(col) => {
                self.column(scope, col);
                self.sql.push_str(" IS NULL");
            }
            Filter::IsNotNull(col) => {
                self.column(scope, col);
                self.sql.push_str(" IS NOT NULL");
            }

            Filter::JsonContains(col, value) => {
                self.compare(scope, col, "@>", &FilterValue::Json(value.clone()))
            }
            Filter::JsonHasKey(col, key) => {
                self.compare(scope, col, "?", &FilterValue::String(key.clone()))
            }

            Filter::Relation(relation) => self.relation(relation, scope),

            Filter::And(filters) if filters.is_empty() => self.sql.push_str("TRUE"),
            Filter::And(filters) => self.join(filters, " AND ", scope),
            Filter::Or(filters) if filters.is_empty() => self.sql.push_str("FALSE"),
            Filter::Or(filters) => self.join(filters, " OR ", scope),
            Filter::Not(inner) => {
                self.sql.push_str("NOT (");
                self.write(inner, scope);
                self.sql.push(')');
            }
        }
    }

    fn relation(&mut self, relation: &RelationFilter, scope: Option<&str>) {
        self.depth += 1;
        let alias = format!("r{}", self.depth);
        let parent = scope.unwrap_or(relation.parent_table).to_string();

        let negate = matches!(
            relation.kind,
            RelationKind::None | RelationKind::Every | RelationKind::IsNot
        );
        if negate {
            self.sql.push_str("NOT ");
        }
        let _ = write!(
            self.sql,
            "EXISTS (SELECT 1 FROM {} AS {} WHERE ",
            relation.table, alias
        );
        for (i, (related, parent_col)) in relation.join.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(" AND ");
            }
            let _ = write!(
                self.sql,
                "{}.{} = {}.{}",
                alias,
                quote_identifier(related),
                parent,
                quote_identifier(parent_col)
            );
        }

        if relation.kind == RelationKind::Every {
            self.sql.push_str(" AND NOT (");
            self.write(&relation.filter, Some(&alias));
            self.sql.push(')');
        } else if !relation.filter.is_none() {
            self.sql.push_str(" AND ");
            self.write(&relation.filter, Some(&alias));
        }
        self.sql.push(')');
        self.depth -= 1;
    }
}
