//! Delete operations for removing records.

use std::marker::PhantomData;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::sql::column_list;
use crate::traits::{Model, QueryEngine};

fn build_delete<M: Model>(filter: &Filter, returning: bool) -> (String, Vec<FilterValue>) {
    let mut sql = format!("DELETE FROM {}", M::TABLE_NAME);
    let (where_sql, params) = filter.to_sql(0);
    if !filter.is_none() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
    }
    if returning {
        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(M::COLUMNS));
    }
    (sql, params)
}

/// Deletes one record selected by a unique key and returns it.
pub struct DeleteOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> DeleteOperation<E, M> {
    /// Create a new Delete operation for the record matching `filter`.
    pub fn new(engine: E, filter: impl Into<Filter>) -> Self {
        Self {
            engine,
            filter: filter.into(),
            _model: PhantomData,
        }
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        build_delete::<M>(&self.filter, true)
    }

    /// Execute and return the deleted record.
    pub async fn exec(self) -> QueryResult<M> {
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, "delete");
        self.engine
            .query_optional::<M>(&sql, params)
            .await?
            .ok_or_else(|| {
                QueryError::not_found(M::MODEL_NAME)
                    .with_context(format!("{}.delete", M::MODEL_NAME))
                    .with_sql(sql)
            })
    }
}

/// Deletes every record matching a filter.
///
/// ```rust,ignore
/// let removed = client
///     .quick_signup()
///     .delete_many()
///     .r#where(quick_signup::created_at().lt(cutoff))
///     .exec()
///     .await?;
/// ```
pub struct DeleteManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> DeleteManyOperation<E, M> {
    /// Create a new DeleteMany operation. Without a filter every row goes.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: Filter::None,
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and_then(filter.into());
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        build_delete::<M>(&self.filter, false)
    }

    /// Execute and return the number of deleted records.
    pub async fn exec(self) -> QueryResult<u64> {
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, "delete_many");
        self.engine.execute(&sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article_row, Article, MockEngine};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delete_sql() {
        let op = DeleteOperation::<_, Article>::new(
            MockEngine::new(),
            Filter::Equals("title".into(), "Gone".into()),
        );
        let (sql, params) = op.build_sql();
        assert_eq!(
            sql,
            "DELETE FROM articles WHERE title = $1 RETURNING id, title, views, updated_at"
        );
        assert_eq!(params.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_exec() {
        let engine = MockEngine::with_rows(vec![article_row("Gone", 0)]);
        let deleted = DeleteOperation::<_, Article>::new(engine, Filter::Equals("title".into(), "Gone".into()))
            .exec()
            .await
            .unwrap();
        assert_eq!(deleted.title, "Gone");
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let err = DeleteOperation::<_, Article>::new(MockEngine::new(), Filter::Equals("title".into(), "x".into()))
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_many_without_filter() {
        let (sql, params) = DeleteManyOperation::<_, Article>::new(MockEngine::new()).build_sql();
        assert_eq!(sql, "DELETE FROM articles");
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn test_delete_many_exec() {
        let engine = MockEngine::with_affected(3);
        let count = DeleteManyOperation::<_, Article>::new(engine.clone())
            .r#where(Filter::In("views".into(), vec![FilterValue::Int(0), FilterValue::Int(1)]))
            .exec()
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(engine.last_sql(), "DELETE FROM articles WHERE views IN ($1, $2)");
    }
}
