//! Aggregation query operations.
//!
//! `aggregate()` computes counts, sums, averages and extrema over the rows
//! matching a filter; `group_by()` computes them per group.
//!
//! ```rust,ignore
//! let stats = client
//!     .answer_option()
//!     .aggregate()
//!     .count()
//!     .max(answer_option::position())
//!     .r#where(answer_option::item_id().equals(item_id))
//!     .exec()
//!     .await?;
//!
//! let per_kind = client
//!     .content_item()
//!     .group_by(["kind"])
//!     .count()
//!     .having(having::count_gt(10))
//!     .exec()
//!     .await?;
//! ```

use std::marker::PhantomData;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::pagination::Pagination;
use crate::row::{FromColumn, Row};
use crate::sql::{column_list, quote_identifier};
use crate::traits::{Model, QueryEngine};
use crate::types::OrderBy;

/// An aggregation field specifier.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateField {
    /// Count all rows.
    CountAll,
    /// Count non-null values in a column.
    CountColumn(String),
    /// Count distinct values in a column.
    CountDistinct(String),
    /// Sum of a numeric column.
    Sum(String),
    /// Average of a numeric column.
    Avg(String),
    /// Minimum value in a column.
    Min(String),
    /// Maximum value in a column.
    Max(String),
}

impl AggregateField {
    /// Build the SQL expression for this aggregate. Sums and averages are
    /// returned as double precision whatever the column type.
    pub fn to_sql(&self) -> String {
        match self {
            Self::CountAll => "COUNT(*)".to_string(),
            Self::CountColumn(col) => format!("COUNT({})", quote_identifier(col)),
            Self::CountDistinct(col) => format!("COUNT(DISTINCT {})", quote_identifier(col)),
            Self::Sum(col) => format!("CAST(SUM({}) AS DOUBLE PRECISION)", quote_identifier(col)),
            Self::Avg(col) => format!("CAST(AVG({}) AS DOUBLE PRECISION)", quote_identifier(col)),
            Self::Min(col) => format!("MIN({})", quote_identifier(col)),
            Self::Max(col) => format!("MAX({})", quote_identifier(col)),
        }
    }

    /// Get the alias for this aggregate.
    pub fn alias(&self) -> String {
        match self {
            Self::CountAll => "_count".to_string(),
            Self::CountColumn(col) => format!("_count_{}", col),
            Self::CountDistinct(col) => format!("_count_distinct_{}", col),
            Self::Sum(col) => format!("_sum_{}", col),
            Self::Avg(col) => format!("_avg_{}", col),
            Self::Min(col) => format!("_min_{}", col),
            Self::Max(col) => format!("_max_{}", col),
        }
    }

    fn select_sql(&self) -> String {
        format!("{} AS {}", self.to_sql(), quote_identifier(&self.alias()))
    }
}

/// Aggregate values keyed by alias (`_count`, `_sum_position`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    values: IndexMap<String, FilterValue>,
}

impl AggregateResult {
    /// Wrap raw aggregate values.
    pub fn new(values: IndexMap<String, FilterValue>) -> Self {
        Self { values }
    }

    fn read<T: FromColumn>(&self, alias: &str) -> Option<T> {
        let value = self.values.get(alias)?;
        Option::<T>::from_column(alias, value).ok().flatten()
    }

    /// Row count, if requested.
    pub fn count(&self) -> Option<u64> {
        self.read("_count")
    }

    /// Non-null count of a column, if requested.
    pub fn count_of(&self, column: &str) -> Option<u64> {
        self.read(&format!("_count_{}", column))
    }

    /// Distinct count of a column, if requested.
    pub fn count_distinct_of(&self, column: &str) -> Option<u64> {
        self.read(&format!("_count_distinct_{}", column))
    }

    /// Sum of a column. `None` when not requested or no rows matched.
    pub fn sum(&self, column: &str) -> Option<f64> {
        self.read(&format!("_sum_{}", column))
    }

    /// Average of a column. `None` when not requested or no rows matched.
    pub fn avg(&self, column: &str) -> Option<f64> {
        self.read(&format!("_avg_{}", column))
    }

    /// Minimum of a column.
    pub fn min(&self, column: &str) -> Option<&FilterValue> {
        self.values.get(&format!("_min_{}", column)).filter(|v| !v.is_null())
    }

    /// Maximum of a column.
    pub fn max(&self, column: &str) -> Option<&FilterValue> {
        self.values.get(&format!("_max_{}", column)).filter(|v| !v.is_null())
    }

    /// Raw value by alias.
    pub fn get(&self, alias: &str) -> Option<&FilterValue> {
        self.values.get(alias)
    }

    /// Number of aggregate values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing was aggregated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Row> for AggregateResult {
    fn from(row: Row) -> Self {
        Self::new(
            row.iter()
                .map(|(column, value)| (column.to_string(), value.clone()))
                .collect(),
        )
    }
}

macro_rules! aggregate_builders {
    ($field:ident) => {
        /// Add a count of all rows.
        pub fn count(mut self) -> Self {
            self.$field.push(AggregateField::CountAll);
            self
        }

        /// Add a count of non-null values in a column.
        pub fn count_column(mut self, column: impl Into<String>) -> Self {
            self.$field.push(AggregateField::CountColumn(column.into()));
            self
        }

        /// Add a count of distinct values in a column.
        pub fn count_distinct(mut self, column: impl Into<String>) -> Self {
            self.$field.push(AggregateField::CountDistinct(column.into()));
            self
        }

        /// Add sum of a numeric column.
        pub fn sum(mut self, column: impl Into<String>) -> Self {
            self.$field.push(AggregateField::Sum(column.into()));
            self
        }

        /// Add average of a numeric column.
        pub fn avg(mut self, column: impl Into<String>) -> Self {
            self.$field.push(AggregateField::Avg(column.into()));
            self
        }

        /// Add minimum of a column.
        pub fn min(mut self, column: impl Into<String>) -> Self {
            self.$field.push(AggregateField::Min(column.into()));
            self
        }

        /// Add maximum of a column.
        pub fn max(mut self, column: impl Into<String>) -> Self {
            self.$field.push(AggregateField::Max(column.into()));
            self
        }
    };
}

/// Aggregate operation builder.
pub struct AggregateOperation<E: QueryEngine, M: Model> {
    engine: E,
    fields: Vec<AggregateField>,
    filter: Filter,
    pagination: Pagination,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> AggregateOperation<E, M> {
    /// Create a new aggregate operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            fields: Vec::new(),
            filter: Filter::None,
            pagination: Pagination::new(),
            _model: PhantomData,
        }
    }

    aggregate_builders!(fields);

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and_then(filter.into());
        self
    }

    /// Skip a number of records before aggregating.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Aggregate at most `n` records.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Build the SQL for this operation. With no fields requested the row
    /// count is computed.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let default_fields = [AggregateField::CountAll];
        let fields: &[AggregateField] = if self.fields.is_empty() {
            &default_fields
        } else {
            &self.fields
        };
        let select = fields
            .iter()
            .map(AggregateField::select_sql)
            .collect::<Vec<_>>()
            .join(", ");

        let (where_sql, params) = self.filter.to_sql(0);
        let mut source = M::TABLE_NAME.to_string();
        let mut where_clause = String::new();
        if !self.filter.is_none() {
            where_clause = format!(" WHERE {}", where_sql);
        }

        if !self.pagination.is_empty() {
            source = format!(
                "(SELECT * FROM {}{} {}) AS sub",
                M::TABLE_NAME,
                where_clause,
                self.pagination.to_sql()
            );
            where_clause.clear();
        }

        (format!("SELECT {} FROM {}{}", select, source, where_clause), params)
    }

    /// Execute the aggregate operation.
    pub async fn exec(self) -> QueryResult<AggregateResult> {
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, fields = self.fields.len(), "aggregate");
        let rows = self.engine.query_rows(&sql, params).await?;
        Ok(rows.into_iter().next().map(AggregateResult::from).unwrap_or_default())
    }
}

/// Operators for HAVING conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HavingOp {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
}

impl HavingOp {
    /// Get the SQL operator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Eq => "=",
            Self::Ne => "<>",
        }
    }
}

/// A condition for the HAVING clause. The value is bound as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct HavingCondition {
    /// The aggregate to compare.
    pub field: AggregateField,
    /// The comparison operator.
    pub op: HavingOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl HavingCondition {
    /// Build a condition.
    pub fn new(field: AggregateField, op: HavingOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }
}

/// One result group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByRow {
    /// Values of the grouping columns.
    pub group: IndexMap<String, FilterValue>,
    /// The aggregates computed for the group.
    pub aggregates: AggregateResult,
}

impl GroupByRow {
    fn split(row: Row, columns: &[String]) -> Self {
        let mut group = IndexMap::new();
        let mut aggregates = IndexMap::new();
        for (column, value) in row.iter() {
            if columns.iter().any(|c| c == column) {
                group.insert(column.to_string(), value.clone());
            } else {
                aggregates.insert(column.to_string(), value.clone());
            }
        }
        Self {
            group,
            aggregates: AggregateResult::new(aggregates),
        }
    }

    /// Typed value of a grouping column.
    pub fn key<T: FromColumn>(&self, column: &str) -> QueryResult<T> {
        match self.group.get(column) {
            Some(value) => Ok(T::from_column(column, value)?),
            None => Ok(T::missing(column)?),
        }
    }
}

/// Group by operation builder.
pub struct GroupByOperation<E: QueryEngine, M: Model> {
    engine: E,
    columns: Vec<String>,
    fields: Vec<AggregateField>,
    filter: Filter,
    having: Vec<HavingCondition>,
    order_by: OrderBy,
    pagination: Pagination,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> GroupByOperation<E, M> {
    /// Create a new group by operation.
    pub fn new(engine: E, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            engine,
            columns: columns.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
            filter: Filter::None,
            having: Vec::new(),
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
            _model: PhantomData,
        }
    }

    aggregate_builders!(fields);

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and_then(filter.into());
        self
    }

    /// Add a having condition. Several conditions are combined with AND.
    pub fn having(mut self, condition: HavingCondition) -> Self {
        self.having.push(condition);
        self
    }

    /// Set ordering. Aggregates can be ordered by alias, e.g. `_count`.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = order.into();
        self
    }

    /// Skip a number of groups.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Return at most `n` groups.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Build the SQL for this operation.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let group_cols = column_list(&self.columns);
        let mut select = group_cols.clone();
        for field in &self.fields {
            select.push_str(", ");
            select.push_str(&field.select_sql());
        }

        let (where_sql, mut params) = self.filter.to_sql(0);
        let mut sql = format!("SELECT {} FROM {}", select, M::TABLE_NAME);
        if !self.filter.is_none() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        sql.push_str(" GROUP BY ");
        sql.push_str(&group_cols);

        if !self.having.is_empty() {
            let conditions: Vec<String> = self
                .having
                .iter()
                .map(|h| {
                    params.push(h.value.clone());
                    format!("{} {} ${}", h.field.to_sql(), h.op.as_str(), params.len())
                })
                .collect();
            sql.push_str(" HAVING ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.to_sql());
        }

        let pagination = self.pagination.to_sql();
        if !pagination.is_empty() {
            sql.push(' ');
            sql.push_str(&pagination);
        }

        (sql, params)
    }

    /// Execute the group by operation.
    pub async fn exec(self) -> QueryResult<Vec<GroupByRow>> {
        if self.columns.is_empty() {
            return Err(QueryError::invalid_input("by", "group_by needs at least one column")
                .with_model(M::MODEL_NAME));
        }
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, groups = ?self.columns, "group_by");
        let rows = self.engine.query_rows(&sql, params).await?;
        Ok(rows
            .into_iter()
            .map(|row| GroupByRow::split(row, &self.columns))
            .collect())
    }
}

/// Shorthands for common having conditions.
pub mod having {
    use super::{AggregateField, HavingCondition, HavingOp};

    /// `COUNT(*) > value`
    pub fn count_gt(value: i64) -> HavingCondition {
        HavingCondition::new(AggregateField::CountAll, HavingOp::Gt, value)
    }

    /// `COUNT(*) >= value`
    pub fn count_gte(value: i64) -> HavingCondition {
        HavingCondition::new(AggregateField::CountAll, HavingOp::Gte, value)
    }

    /// `COUNT(*) < value`
    pub fn count_lt(value: i64) -> HavingCondition {
        HavingCondition::new(AggregateField::CountAll, HavingOp::Lt, value)
    }

    /// `COUNT(*) = value`
    pub fn count_eq(value: i64) -> HavingCondition {
        HavingCondition::new(AggregateField::CountAll, HavingOp::Eq, value)
    }

    /// `SUM(column) > value`
    pub fn sum_gt(column: impl Into<String>, value: f64) -> HavingCondition {
        HavingCondition::new(AggregateField::Sum(column.into()), HavingOp::Gt, value)
    }

    /// `AVG(column) > value`
    pub fn avg_gt(column: impl Into<String>, value: f64) -> HavingCondition {
        HavingCondition::new(AggregateField::Avg(column.into()), HavingOp::Gt, value)
    }

    /// `AVG(column) < value`
    pub fn avg_lt(column: impl Into<String>, value: f64) -> HavingCondition {
        HavingCondition::new(AggregateField::Avg(column.into()), HavingOp::Lt, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Article, MockEngine};
    use crate::types::OrderByField;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aggregate_field_sql() {
        assert_eq!(AggregateField::CountAll.to_sql(), "COUNT(*)");
        assert_eq!(
            AggregateField::Avg("views".into()).to_sql(),
            "CAST(AVG(views) AS DOUBLE PRECISION)"
        );
        assert_eq!(AggregateField::Max("views".into()).alias(), "_max_views");
    }

    #[test]
    fn test_aggregate_defaults_to_count() {
        let (sql, _) = AggregateOperation::<_, Article>::new(MockEngine::new()).build_sql();
        assert_eq!(sql, "SELECT COUNT(*) AS _count FROM articles");
    }

    #[test]
    fn test_aggregate_with_filter() {
        let (sql, params) = AggregateOperation::<_, Article>::new(MockEngine::new())
            .count()
            .sum("views")
            .r#where(Filter::Gt("views".into(), FilterValue::Int(0)))
            .build_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS _count, CAST(SUM(views) AS DOUBLE PRECISION) AS _sum_views \
             FROM articles WHERE views > $1"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_aggregate_paginated_uses_subquery() {
        let (sql, _) = AggregateOperation::<_, Article>::new(MockEngine::new())
            .min("views")
            .r#where(Filter::Gt("views".into(), FilterValue::Int(0)))
            .take(10)
            .build_sql();
        assert_eq!(
            sql,
            "SELECT MIN(views) AS _min_views FROM (SELECT * FROM articles WHERE views > $1 LIMIT 10) AS sub"
        );
    }

    #[tokio::test]
    async fn test_aggregate_exec_reads_values() {
        let row = Row::new()
            .with("_count", 3i64)
            .with("_avg_views", 2.5f64)
            .with("_max_views", 4i32)
            .with("_sum_views", FilterValue::Null);
        let result = AggregateOperation::<_, Article>::new(MockEngine::with_rows(vec![row]))
            .count()
            .avg("views")
            .max("views")
            .sum("views")
            .exec()
            .await
            .unwrap();

        assert_eq!(result.count(), Some(3));
        assert_eq!(result.avg("views"), Some(2.5));
        assert_eq!(result.max("views"), Some(&FilterValue::Int(4)));
        assert_eq!(result.sum("views"), None);
    }

    #[test]
    fn test_group_by_binds_having() {
        let (sql, params) = GroupByOperation::<_, Article>::new(MockEngine::new(), ["title"])
            .count()
            .avg("views")
            .r#where(Filter::Gt("views".into(), FilterValue::Int(1)))
            .having(having::count_gt(2))
            .having(having::avg_lt("views", 50.0))
            .order_by(OrderByField::desc("_count"))
            .take(5)
            .build_sql();

        assert_eq!(
            sql,
            "SELECT title, COUNT(*) AS _count, CAST(AVG(views) AS DOUBLE PRECISION) AS _avg_views \
             FROM articles WHERE views > $1 GROUP BY title \
             HAVING COUNT(*) > $2 AND CAST(AVG(views) AS DOUBLE PRECISION) < $3 \
             ORDER BY _count DESC LIMIT 5"
        );
        assert_eq!(
            params,
            vec![FilterValue::Int(1), FilterValue::Int(2), FilterValue::Float(50.0)]
        );
    }

    #[tokio::test]
    async fn test_group_by_requires_columns() {
        let engine = MockEngine::new();
        let err = GroupByOperation::<_, Article>::new(engine.clone(), Vec::<String>::new())
            .count()
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(engine.statement_count(), 0);
    }

    #[tokio::test]
    async fn test_group_by_splits_rows() {
        let rows = vec![
            Row::new().with("title", "A").with("_count", 2i64),
            Row::new().with("title", "B").with("_count", 1i64),
        ];
        let groups = GroupByOperation::<_, Article>::new(MockEngine::with_rows(rows), ["title"])
            .count()
            .exec()
            .await
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key::<String>("title").unwrap(), "A");
        assert_eq!(groups[1].aggregates.count(), Some(1));
    }
}
