//! FindUnique operation for fetching a record by a unique key.

use std::marker::PhantomData;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::sql::column_list;
use crate::traits::{Model, QueryEngine};

/// Finds at most one record by primary key or another unique column.
///
/// The filter comes from a model's unique selector, so at most one row can
/// match.
///
/// ```rust,ignore
/// let topic = client
///     .topic()
///     .find_unique(topic::UniqueWhere::Slug("climate".into()))
///     .exec()
///     .await?;
/// ```
pub struct FindUniqueOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> FindUniqueOperation<E, M> {
    /// Create a new FindUnique operation.
    pub fn new(engine: E, filter: impl Into<Filter>) -> Self {
        Self {
            engine,
            filter: filter.into(),
            _model: PhantomData,
        }
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let (where_sql, params) = self.filter.to_sql(0);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} LIMIT 1",
            column_list(M::COLUMNS),
            M::TABLE_NAME,
            where_sql
        );
        (sql, params)
    }

    /// Execute and return the record, if any.
    pub async fn exec(self) -> QueryResult<Option<M>> {
        let (sql, params) = self.build_sql();
        self.engine.query_optional::<M>(&sql, params).await
    }

    /// Execute and fail with `RecordNotFound` when nothing matches.
    pub async fn exec_or_throw(self) -> QueryResult<M> {
        let (sql, params) = self.build_sql();
        self.engine
            .query_optional::<M>(&sql, params)
            .await?
            .ok_or_else(|| {
                QueryError::not_found(M::MODEL_NAME)
                    .with_context(format!("{}.find_unique", M::MODEL_NAME))
                    .with_sql(sql)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article_row, Article, MockEngine};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_sql() {
        let op = FindUniqueOperation::<_, Article>::new(
            MockEngine::new(),
            Filter::Equals("title".into(), "Hello".into()),
        );
        let (sql, params) = op.build_sql();
        assert_eq!(
            sql,
            "SELECT id, title, views, updated_at FROM articles WHERE title = $1 LIMIT 1"
        );
        assert_eq!(params.len(), 1);
    }

    #[tokio::test]
    async fn test_exec_found() {
        let engine = MockEngine::with_rows(vec![article_row("Hello", 3)]);
        let found = FindUniqueOperation::<_, Article>::new(
            engine,
            Filter::Equals("title".into(), "Hello".into()),
        )
        .exec()
        .await
        .unwrap();

        let article = found.expect("row was returned");
        assert_eq!(article.title, "Hello");
        assert_eq!(article.views, 3);
    }

    #[tokio::test]
    async fn test_exec_missing() {
        let op = FindUniqueOperation::<_, Article>::new(
            MockEngine::new(),
            Filter::Equals("title".into(), "nope".into()),
        );
        assert!(op.exec().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exec_or_throw() {
        let op = FindUniqueOperation::<_, Article>::new(
            MockEngine::new(),
            Filter::Equals("title".into(), "nope".into()),
        );
        let err = op.exec_or_throw().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.context.operation.as_deref(), Some("Article.find_unique"));
    }
}
