//! FindMany operation for querying multiple records.

use std::marker::PhantomData;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::pagination::{Cursor, Pagination};
use crate::row::Row;
use crate::sql::column_list;
use crate::traits::{Model, QueryEngine};
use crate::types::{OrderBy, Select};

/// A query operation that finds multiple records.
///
/// ```rust,ignore
/// let items = client
///     .content_item()
///     .find_many()
///     .r#where(content_item::title().contains("vote"))
///     .order_by(content_item::position().asc())
///     .skip(20)
///     .take(10)
///     .exec()
///     .await?;
/// ```
pub struct FindManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    order_by: OrderBy,
    pagination: Pagination,
    select: Select,
    distinct: Option<Vec<String>>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> FindManyOperation<E, M> {
    /// Create a new FindMany operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: Filter::None,
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
            select: Select::All,
            distinct: None,
            _model: PhantomData,
        }
    }

    /// Add a filter condition. Repeated calls are combined with AND.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and_then(filter.into());
        self
    }

    /// Set the order by clause.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = order.into();
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Take a limited number of records.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Continue after (or before) a known row.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.pagination = self.pagination.cursor(cursor);
        self
    }

    /// Restrict the returned columns. Only [`exec_rows`](Self::exec_rows)
    /// honours this; typed results always load every column.
    pub fn select(mut self, select: impl Into<Select>) -> Self {
        self.select = select.into();
        self
    }

    /// Return one row per distinct combination of the columns.
    pub fn distinct(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.distinct = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        self.build(&self.select)
    }

    fn build(&self, select: &Select) -> (String, Vec<FilterValue>) {
        let (where_sql, mut params) = self.filter.to_sql(0);

        let mut conditions = Vec::new();
        if !self.filter.is_none() {
            conditions.push(where_sql);
        }
        if let Some(cursor) = &self.pagination.cursor {
            params.push(cursor.value.clone());
            conditions.push(cursor.to_sql_condition(params.len()));
        }

        let mut order = match &self.pagination.cursor {
            Some(cursor) if self.order_by.is_empty() => cursor.default_order(),
            _ => self.order_by.clone(),
        };

        let mut sql = String::from("SELECT ");
        if let Some(cols) = &self.distinct {
            sql.push_str("DISTINCT ON (");
            sql.push_str(&column_list(cols));
            sql.push_str(") ");
            order = order.led_by(cols);
        }
        sql.push_str(&select.to_sql(M::COLUMNS));
        sql.push_str(" FROM ");
        sql.push_str(M::TABLE_NAME);

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.to_sql());
        }

        let pagination_sql = self.pagination.to_sql();
        if !pagination_sql.is_empty() {
            sql.push(' ');
            sql.push_str(&pagination_sql);
        }

        (sql, params)
    }

    /// Execute the query.
    pub async fn exec(self) -> QueryResult<Vec<M>> {
        let (sql, params) = self.build(&Select::All);
        debug!(model = M::MODEL_NAME, params = params.len(), "find_many");
        self.engine.query_many::<M>(&sql, params).await
    }

    /// Execute and return untyped rows with only the selected columns.
    pub async fn exec_rows(self) -> QueryResult<Vec<Row>> {
        if let Select::Fields(columns) = &self.select {
            if let Some(unknown) = columns.iter().find(|c| !M::COLUMNS.contains(&c.as_str())) {
                return Err(QueryError::invalid_select(M::MODEL_NAME, unknown.as_str()));
            }
        }
        let (sql, params) = self.build_sql();
        self.engine.query_rows(&sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article_row, Article, MockEngine};
    use crate::types::OrderByField;
    use pretty_assertions::assert_eq;

    fn op() -> FindManyOperation<MockEngine, Article> {
        FindManyOperation::new(MockEngine::new())
    }

    #[test]
    fn test_find_many_basic() {
        let (sql, params) = op().build_sql();
        assert_eq!(sql, "SELECT id, title, views, updated_at FROM articles");
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_calls_are_anded() {
        let (sql, params) = op()
            .r#where(Filter::Equals("title".into(), "A".into()))
            .r#where(Filter::Gte("views".into(), FilterValue::Int(10)))
            .build_sql();
        assert_eq!(
            sql,
            "SELECT id, title, views, updated_at FROM articles WHERE (title = $1 AND views >= $2)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_order_and_pagination() {
        let (sql, _) = op()
            .order_by([OrderByField::desc("views"), OrderByField::asc("title")])
            .skip(20)
            .take(10)
            .build_sql();
        assert!(sql.ends_with("ORDER BY views DESC, title ASC LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_cursor_binds_after_filter() {
        let (sql, params) = op()
            .r#where(Filter::Gt("views".into(), FilterValue::Int(0)))
            .cursor(Cursor::after("title", "M"))
            .take(5)
            .build_sql();
        assert_eq!(
            sql,
            "SELECT id, title, views, updated_at FROM articles WHERE views > $1 AND title > $2 \
             ORDER BY title ASC LIMIT 5"
        );
        assert_eq!(params, vec![FilterValue::Int(0), FilterValue::String("M".into())]);
    }

    #[test]
    fn test_cursor_keeps_explicit_order() {
        let (sql, _) = op()
            .cursor(Cursor::before("title", "M"))
            .order_by(OrderByField::desc("title"))
            .build_sql();
        assert!(sql.ends_with("WHERE title < $1 ORDER BY title DESC"));
    }

    #[test]
    fn test_distinct_leads_order() {
        let (sql, _) = op()
            .distinct(["title"])
            .order_by(OrderByField::desc("views"))
            .build_sql();
        assert_eq!(
            sql,
            "SELECT DISTINCT ON (title) id, title, views, updated_at FROM articles \
             ORDER BY title ASC, views DESC"
        );
    }

    #[test]
    fn test_select_only_applies_to_rows() {
        let (sql, _) = op().select(["title"]).build_sql();
        assert_eq!(sql, "SELECT title FROM articles");
    }

    #[tokio::test]
    async fn test_exec_decodes_rows() {
        let engine = MockEngine::with_rows(vec![article_row("A", 1), article_row("B", 2)]);
        let articles = FindManyOperation::<_, Article>::new(engine.clone())
            .select(["title"])
            .exec()
            .await
            .unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].title, "B");
        assert!(engine.last_sql().starts_with("SELECT id, title, views, updated_at"));
    }

    #[tokio::test]
    async fn test_exec_rows_rejects_unknown_column() {
        let engine = MockEngine::new();
        let err = FindManyOperation::<_, Article>::new(engine.clone())
            .select(["title", "body"])
            .exec_rows()
            .await
            .unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::InvalidSelect);
        assert_eq!(err.context.field.as_deref(), Some("body"));
        assert_eq!(engine.statement_count(), 0);
    }

    #[tokio::test]
    async fn test_exec_rows_with_known_columns() {
        let engine = MockEngine::with_rows(vec![article_row("A", 1)]);
        let rows = FindManyOperation::<_, Article>::new(engine.clone())
            .select(["title", "views"])
            .exec_rows()
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(engine.last_sql(), "SELECT title, views FROM articles");
    }
}
