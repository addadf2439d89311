//! Raw SQL with bound parameters.
//!
//! Values are always sent as parameters, never spliced into the text.
//!
//! ```rust
//! use agora_query::{raw_query, Sql};
//!
//! let sql = Sql::new("SELECT * FROM topics WHERE slug = ").bind("climate");
//! assert_eq!(sql.sql(), "SELECT * FROM topics WHERE slug = $1");
//!
//! let slug = "'; DROP TABLE topics; --";
//! let sql = raw_query!("SELECT * FROM topics WHERE slug = {} AND position > {}", slug, 2);
//! assert_eq!(sql.sql(), "SELECT * FROM topics WHERE slug = $1 AND position > $2");
//! assert_eq!(sql.params().len(), 2);
//! assert!(!sql.sql().contains("DROP TABLE"));
//! ```

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::row::Row;
use crate::sql::placeholder;
use crate::traits::{Model, QueryEngine};

/// A raw SQL statement with parameterized values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    text: String,
    params: Vec<FilterValue>,
}

impl Sql {
    /// Start from a piece of SQL.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            text: sql.into(),
            params: Vec::new(),
        }
    }

    /// An empty statement.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append literal SQL.
    pub fn push(mut self, sql: impl AsRef<str>) -> Self {
        self.text.push_str(sql.as_ref());
        self
    }

    /// Bind a value, appending its placeholder.
    pub fn bind(mut self, value: impl Into<FilterValue>) -> Self {
        self.params.push(value.into());
        self.text.push_str(&placeholder(self.params.len()));
        self
    }

    /// Bind several values separated by commas, e.g. for an `IN` list.
    pub fn bind_many(mut self, values: impl IntoIterator<Item = impl Into<FilterValue>>) -> Self {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.text.push_str(", ");
            }
            self = self.bind(value);
        }
        self
    }

    /// Append SQL when `condition` holds.
    pub fn push_if(self, condition: bool, sql: impl AsRef<str>) -> Self {
        if condition { self.push(sql) } else { self }
    }

    /// Bind a value when `condition` holds.
    pub fn bind_if(self, condition: bool, value: impl Into<FilterValue>) -> Self {
        if condition { self.bind(value) } else { self }
    }

    /// Append SQL followed by a bound value.
    pub fn push_bind(self, sql: impl AsRef<str>, value: impl Into<FilterValue>) -> Self {
        self.push(sql).bind(value)
    }

    /// [`push_bind`](Self::push_bind) when `condition` holds.
    pub fn push_bind_if(self, condition: bool, sql: impl AsRef<str>, value: impl Into<FilterValue>) -> Self {
        if condition { self.push(sql).bind(value) } else { self }
    }

    /// Append a list of items separated by `separator`.
    pub fn separated(self, separator: &str) -> SeparatedSql {
        SeparatedSql {
            sql: self,
            separator: separator.to_string(),
            first: true,
        }
    }

    /// Finish into the SQL text and its parameters.
    pub fn build(self) -> (String, Vec<FilterValue>) {
        debug!(sql_len = self.text.len(), params = self.params.len(), "raw sql");
        (self.text, self.params)
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.text
    }

    /// The bound parameters.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// True when there is no SQL text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Sql {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Sql {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

/// Builds a separated list inside a [`Sql`].
#[derive(Debug, Clone)]
pub struct SeparatedSql {
    sql: Sql,
    separator: String,
    first: bool,
}

impl SeparatedSql {
    fn separate(&mut self) {
        if !self.first {
            self.sql.text.push_str(&self.separator);
        }
        self.first = false;
    }

    /// Append a literal item.
    pub fn push(mut self, sql: impl AsRef<str>) -> Self {
        self.separate();
        self.sql = self.sql.push(sql);
        self
    }

    /// Append an item followed by a bound value.
    pub fn push_bind(mut self, sql: impl AsRef<str>, value: impl Into<FilterValue>) -> Self {
        self.separate();
        self.sql = self.sql.push(sql).bind(value);
        self
    }

    /// [`push_bind`](Self::push_bind) when `condition` holds.
    pub fn push_bind_if(self, condition: bool, sql: impl AsRef<str>, value: impl Into<FilterValue>) -> Self {
        if condition { self.push_bind(sql, value) } else { self }
    }

    /// Back to the enclosing statement.
    pub fn finish(self) -> Sql {
        self.sql
    }
}

/// A raw query decoded into model records.
pub struct RawQueryOperation<E: QueryEngine, M: Model> {
    engine: E,
    sql: Sql,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> RawQueryOperation<E, M> {
    /// Create a new raw query operation.
    pub fn new(engine: E, sql: impl Into<Sql>) -> Self {
        Self {
            engine,
            sql: sql.into(),
            _model: PhantomData,
        }
    }

    /// All returned records.
    pub async fn exec(self) -> QueryResult<Vec<M>> {
        let (sql, params) = self.sql.build();
        self.engine.query_many::<M>(&sql, params).await
    }

    /// The first record; `RecordNotFound` when nothing was returned.
    pub async fn exec_one(self) -> QueryResult<M> {
        let (sql, params) = self.sql.build();
        self.engine.query_one::<M>(&sql, params).await
    }

    /// The first record, if any.
    pub async fn exec_optional(self) -> QueryResult<Option<M>> {
        let (sql, params) = self.sql.build();
        self.engine.query_optional::<M>(&sql, params).await
    }
}

/// A raw query returning untyped rows.
pub struct RawRowsOperation<E: QueryEngine> {
    engine: E,
    sql: Sql,
}

impl<E: QueryEngine> RawRowsOperation<E> {
    /// Create a new raw rows operation.
    pub fn new(engine: E, sql: impl Into<Sql>) -> Self {
        Self {
            engine,
            sql: sql.into(),
        }
    }

    /// All returned rows.
    pub async fn exec(self) -> QueryResult<Vec<Row>> {
        let (sql, params) = self.sql.build();
        self.engine.query_rows(&sql, params).await
    }

    /// Rows as JSON objects.
    pub async fn exec_json(self) -> QueryResult<Vec<serde_json::Value>> {
        Ok(self.exec().await?.iter().map(Row::to_json).collect())
    }
}

/// A raw statement returning the affected row count.
pub struct RawExecuteOperation<E: QueryEngine> {
    engine: E,
    sql: Sql,
}

impl<E: QueryEngine> RawExecuteOperation<E> {
    /// Create a new raw execute operation.
    pub fn new(engine: E, sql: impl Into<Sql>) -> Self {
        Self {
            engine,
            sql: sql.into(),
        }
    }

    /// Run the statement.
    pub async fn exec(self) -> QueryResult<u64> {
        let (sql, params) = self.sql.build();
        self.engine.execute(&sql, params).await
    }
}

/// Build a [`Sql`] from a template where every `{}` becomes a bound
/// parameter.
///
/// ```rust
/// use agora_query::raw_query;
///
/// let sql = raw_query!("UPDATE topics SET position = {} WHERE slug = {}", 3, "climate");
/// assert_eq!(sql.sql(), "UPDATE topics SET position = $1 WHERE slug = $2");
/// ```
#[macro_export]
macro_rules! raw_query {
    ($sql:expr) => {
        $crate::raw::Sql::new($sql)
    };

    ($sql:expr, $($params:expr),+ $(,)?) => {{
        let values: Vec<$crate::filter::FilterValue> = vec![$($params.into()),+];
        let mut values = values.into_iter();
        let mut sql = $crate::raw::Sql::empty();
        let mut parts = $sql.split("{}").peekable();
        while let Some(part) = parts.next() {
            sql = sql.push(part);
            if parts.peek().is_some() {
                if let Some(value) = values.next() {
                    sql = sql.bind(value);
                }
            }
        }
        sql
    }};
}
