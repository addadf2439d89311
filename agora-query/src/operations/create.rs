//! Create operations for inserting new records.

use std::marker::PhantomData;

use tracing::debug;

use crate::data::CreateData;
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::sql::{column_list, placeholder_list};
use crate::traits::{Model, QueryEngine};

/// A create operation for inserting a new record.
///
/// ```rust,ignore
/// let topic = client
///     .topic()
///     .create(topic::CreateInput::new("climate", "Climate"))
///     .exec()
///     .await?;
/// ```
pub struct CreateOperation<E: QueryEngine, M: Model> {
    engine: E,
    columns: Vec<String>,
    values: Vec<FilterValue>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> CreateOperation<E, M> {
    /// Create a new Create operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            columns: Vec::new(),
            values: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Set a column value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Set multiple column values from an iterator.
    pub fn set_many(
        mut self,
        values: impl IntoIterator<Item = (impl Into<String>, impl Into<FilterValue>)>,
    ) -> Self {
        for (col, val) in values {
            self.columns.push(col.into());
            self.values.push(val.into());
        }
        self
    }

    /// Use a typed create input.
    pub fn data<D: CreateData<Model = M>>(self, data: D) -> Self {
        self.set_many(data.into_values())
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let mut sql = format!("INSERT INTO {}", M::TABLE_NAME);
        if self.columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(" (");
            sql.push_str(&column_list(&self.columns));
            sql.push_str(") VALUES (");
            sql.push_str(&placeholder_list(1, self.values.len()));
            sql.push(')');
        }
        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(M::COLUMNS));

        (sql, self.values.clone())
    }

    /// Execute and return the created record.
    pub async fn exec(self) -> QueryResult<M> {
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, columns = self.columns.len(), "create");
        self.engine.query_one::<M>(&sql, params).await
    }
}

/// Create many records with one statement.
pub struct CreateManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    columns: Vec<String>,
    rows: Vec<Vec<FilterValue>>,
    skip_duplicates: bool,
    error: Option<QueryError>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> CreateManyOperation<E, M> {
    /// Create a new CreateMany operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            columns: Vec::new(),
            rows: Vec::new(),
            skip_duplicates: false,
            error: None,
            _model: PhantomData,
        }
    }

    /// Set the columns for insertion.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a row of values, in column order.
    pub fn row(mut self, values: impl IntoIterator<Item = impl Into<FilterValue>>) -> Self {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Add typed create inputs. The first input fixes the column list.
    pub fn data<D: CreateData<Model = M>>(mut self, inputs: impl IntoIterator<Item = D>) -> Self {
        for input in inputs {
            let (columns, values): (Vec<&'static str>, Vec<FilterValue>) =
                input.into_values().into_iter().unzip();
            if self.columns.is_empty() && self.rows.is_empty() {
                self.columns = columns.iter().map(|c| c.to_string()).collect();
            } else if self.columns.iter().map(String::as_str).ne(columns.iter().copied()) {
                self.error.get_or_insert_with(|| {
                    QueryError::invalid_input("data", "create inputs produced different column lists")
                });
            }
            self.rows.push(values);
        }
        self
    }

    /// Skip records that violate unique constraints.
    pub fn skip_duplicates(mut self) -> Self {
        self.skip_duplicates = true;
        self
    }

    fn validate(&mut self) -> QueryResult<()> {
        if let Some(err) = self.error.take() {
            return Err(err.with_model(M::MODEL_NAME));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(QueryError::invalid_input(
                    format!("rows[{}]", i),
                    format!("expected {} values, got {}", self.columns.len(), row.len()),
                )
                .with_model(M::MODEL_NAME));
            }
        }
        Ok(())
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ",
            M::TABLE_NAME,
            column_list(&self.columns)
        );
        let mut params = Vec::with_capacity(self.rows.len() * self.columns.len());

        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            sql.push_str(&placeholder_list(params.len() + 1, row.len()));
            sql.push(')');
            params.extend(row.iter().cloned());
        }

        if self.skip_duplicates {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }

        (sql, params)
    }

    /// Execute and return the number of inserted records.
    pub async fn exec(mut self) -> QueryResult<u64> {
        self.validate()?;
        if self.rows.is_empty() {
            return Ok(0);
        }
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, rows = self.rows.len(), "create_many");
        self.engine.execute(&sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article_row, Article, MockEngine};
    use pretty_assertions::assert_eq;

    struct NewArticle {
        title: &'static str,
        views: i32,
    }

    impl CreateData for NewArticle {
        type Model = Article;

        fn into_values(self) -> Vec<(&'static str, FilterValue)> {
            vec![("title", self.title.into()), ("views", self.views.into())]
        }
    }

    #[test]
    fn test_create_sql() {
        let op = CreateOperation::<_, Article>::new(MockEngine::new())
            .set("title", "Hello")
            .set("views", 0);
        let (sql, params) = op.build_sql();
        assert_eq!(
            sql,
            "INSERT INTO articles (title, views) VALUES ($1, $2) RETURNING id, title, views, updated_at"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_create_default_values() {
        let (sql, _) = CreateOperation::<_, Article>::new(MockEngine::new()).build_sql();
        assert!(sql.starts_with("INSERT INTO articles DEFAULT VALUES RETURNING"));
    }

    #[tokio::test]
    async fn test_create_exec_returns_record() {
        let engine = MockEngine::with_rows(vec![article_row("Hello", 0)]);
        let article = CreateOperation::<_, Article>::new(engine)
            .data(NewArticle { title: "Hello", views: 0 })
            .exec()
            .await
            .unwrap();
        assert_eq!(article.title, "Hello");
    }

    #[test]
    fn test_create_many_sql() {
        let op = CreateManyOperation::<_, Article>::new(MockEngine::new())
            .data([
                NewArticle { title: "A", views: 1 },
                NewArticle { title: "B", views: 2 },
            ])
            .skip_duplicates();
        let (sql, params) = op.build_sql();
        assert_eq!(
            sql,
            "INSERT INTO articles (title, views) VALUES ($1, $2), ($3, $4) ON CONFLICT DO NOTHING"
        );
        assert_eq!(params.len(), 4);
    }

    #[tokio::test]
    async fn test_create_many_empty_skips_engine() {
        let engine = MockEngine::with_affected(7);
        let count = CreateManyOperation::<_, Article>::new(engine.clone())
            .columns(["title"])
            .exec()
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(engine.statement_count(), 0);
    }

    #[tokio::test]
    async fn test_create_many_rejects_short_row() {
        let err = CreateManyOperation::<_, Article>::new(MockEngine::new())
            .columns(["title", "views"])
            .row(["only title"])
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn test_create_many_returns_affected() {
        let engine = MockEngine::with_affected(2);
        let count = CreateManyOperation::<_, Article>::new(engine)
            .columns(["title"])
            .row(["A"])
            .row(["B"])
            .exec()
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
