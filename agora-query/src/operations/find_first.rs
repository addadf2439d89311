//! FindFirst operation for fetching the first matching record.

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::pagination::Cursor;
use crate::traits::{Model, QueryEngine};
use crate::types::OrderBy;

use super::FindManyOperation;

/// Finds the first record matching a filter, in the requested order.
pub struct FindFirstOperation<E: QueryEngine, M: Model> {
    inner: FindManyOperation<E, M>,
}

impl<E: QueryEngine, M: Model> FindFirstOperation<E, M> {
    /// Create a new FindFirst operation.
    pub fn new(engine: E) -> Self {
        Self {
            inner: FindManyOperation::new(engine).take(1),
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.inner = self.inner.r#where(filter);
        self
    }

    /// Set the order by clause.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.inner = self.inner.order_by(order);
        self
    }

    /// Skip a number of records before picking one.
    pub fn skip(mut self, n: u64) -> Self {
        self.inner = self.inner.skip(n);
        self
    }

    /// Start after (or before) a known row.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.inner = self.inner.cursor(cursor);
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        self.inner.build_sql()
    }

    /// Execute and return the record, if any.
    pub async fn exec(self) -> QueryResult<Option<M>> {
        Ok(self.inner.exec().await?.into_iter().next())
    }

    /// Execute and fail with `RecordNotFound` when nothing matches.
    pub async fn exec_or_throw(self) -> QueryResult<M> {
        self.exec().await?.ok_or_else(|| {
            QueryError::not_found(M::MODEL_NAME)
                .with_context(format!("{}.find_first", M::MODEL_NAME))
        })
    }
}
