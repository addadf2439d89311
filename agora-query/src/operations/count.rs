//! Count operation for counting records.

use std::marker::PhantomData;

use tracing::debug;

use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::pagination::Pagination;
use crate::sql::quote_identifier;
use crate::traits::{Model, QueryEngine};

/// A count operation for counting records.
///
/// ```rust,ignore
/// let drafts = client
///     .content_item()
///     .count()
///     .r#where(content_item::status().equals(PublishStatus::Draft))
///     .exec()
///     .await?;
/// ```
pub struct CountOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    distinct: Option<String>,
    pagination: Pagination,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> CountOperation<E, M> {
    /// Create a new Count operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: Filter::None,
            distinct: None,
            pagination: Pagination::new(),
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and_then(filter.into());
        self
    }

    /// Count distinct non-null values of a column.
    pub fn distinct(mut self, column: impl Into<String>) -> Self {
        self.distinct = Some(column.into());
        self
    }

    /// Skip a number of records before counting.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Count at most `n` records.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let (where_sql, params) = self.filter.to_sql(0);
        let where_clause = if self.filter.is_none() {
            String::new()
        } else {
            format!(" WHERE {}", where_sql)
        };
        let distinct = self.distinct.as_deref().map(quote_identifier);

        let sql = if self.pagination.is_empty() {
            match distinct {
                Some(col) => format!("SELECT COUNT(DISTINCT {}) FROM {}{}", col, M::TABLE_NAME, where_clause),
                None => format!("SELECT COUNT(*) FROM {}{}", M::TABLE_NAME, where_clause),
            }
        } else {
            let (inner, outer) = match distinct {
                Some(col) => (format!("DISTINCT {}", col), format!("COUNT({})", col)),
                None => ("1".to_string(), "COUNT(*)".to_string()),
            };
            format!(
                "SELECT {} FROM (SELECT {} FROM {}{} {}) AS sub",
                outer,
                inner,
                M::TABLE_NAME,
                where_clause,
                self.pagination.to_sql()
            )
        };

        (sql, params)
    }

    /// Execute the count query.
    pub async fn exec(self) -> QueryResult<u64> {
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, "count");
        self.engine.count(&sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::test_support::{Article, MockEngine};
    use pretty_assertions::assert_eq;

    fn op() -> CountOperation<MockEngine, Article> {
        CountOperation::new(MockEngine::new())
    }

    #[test]
    fn test_count_all() {
        let (sql, params) = op().build_sql();
        assert_eq!(sql, "SELECT COUNT(*) FROM articles");
        assert!(params.is_empty());
    }

    #[test]
    fn test_count_with_filter_and_distinct() {
        let (sql, params) = op()
            .r#where(Filter::Gt("views".into(), FilterValue::Int(1)))
            .distinct("title")
            .build_sql();
        assert_eq!(sql, "SELECT COUNT(DISTINCT title) FROM articles WHERE views > $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_paginated_count_uses_subquery() {
        let (sql, _) = op().skip(10).take(5).build_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM (SELECT 1 FROM articles LIMIT 5 OFFSET 10) AS sub"
        );
    }

    #[tokio::test]
    async fn test_exec_reads_first_column() {
        let engine = MockEngine::with_rows(vec![Row::new().with("count", 12i64)]);
        let count = CountOperation::<_, Article>::new(engine).exec().await.unwrap();
        assert_eq!(count, 12);
    }

    #[tokio::test]
    async fn test_exec_without_rows_is_internal_error() {
        let err = op().exec().await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Internal);
        assert!(err.message.contains("no rows"));
    }
}
