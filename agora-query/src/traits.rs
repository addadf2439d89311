//! Core traits: models and the engines that execute their queries.

pub use futures::future::BoxFuture;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::row::Row;
use crate::transaction::TransactionConfig;

/// A record type mapped to one table.
pub trait Model: Sized + Send + Sync + 'static {
    /// Model name as written in the schema, e.g. `ContentItem`.
    const MODEL_NAME: &'static str;
    /// Table name.
    const TABLE_NAME: &'static str;
    /// Primary key columns.
    const PRIMARY_KEY: &'static [&'static str];
    /// All columns, in declaration order.
    const COLUMNS: &'static [&'static str];
    /// Column refreshed to the current time on every update, if any.
    const UPDATED_AT: Option<&'static str> = None;

    /// Decode a full row.
    fn from_row(row: &Row) -> QueryResult<Self>;
}

/// Executes SQL produced by the operations.
///
/// Implementors supply [`query_rows`](Self::query_rows) and
/// [`execute`](Self::execute); the typed helpers are provided.
pub trait QueryEngine: Clone + Send + Sync + 'static {
    /// Run a statement that returns rows.
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>>;

    /// Decode every returned row as `T`.
    fn query_many<T: Model>(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<T>>> {
        let rows = self.query_rows(sql, params);
        Box::pin(async move { rows.await?.iter().map(T::from_row).collect() })
    }

    /// Decode the first row as `T`; `RecordNotFound` when there is none.
    fn query_one<T: Model>(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<T>> {
        let rows = self.query_rows(sql, params);
        Box::pin(async move {
            match rows.await?.first() {
                Some(row) => T::from_row(row),
                None => Err(QueryError::not_found(T::MODEL_NAME)),
            }
        })
    }

    /// Decode the first row as `T`, if any.
    fn query_optional<T: Model>(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Option<T>>> {
        let rows = self.query_rows(sql, params);
        Box::pin(async move { rows.await?.first().map(T::from_row).transpose() })
    }

    /// Read the first column of the first row as a count.
    fn count(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let rows = self.query_rows(sql, params);
        Box::pin(async move {
            let rows = rows.await?;
            let (column, value) = rows
                .first()
                .and_then(|row| row.value_at(0))
                .ok_or_else(|| QueryError::internal("count query returned no rows"))?;
            Ok(crate::row::FromColumn::from_column(column, value)?)
        })
    }
}

/// An engine that can open transactions.
pub trait TransactionalEngine: QueryEngine {
    /// Engine bound to one open transaction.
    type Transaction: TransactionEngine;

    /// Start a transaction.
    fn begin(&self, config: TransactionConfig) -> BoxFuture<'_, QueryResult<Self::Transaction>>;
}

/// An engine bound to an open transaction.
///
/// Statements run through it take part in the transaction until
/// [`commit`](Self::commit) or [`rollback`](Self::rollback); after that every
/// call fails with `TransactionClosed`.
pub trait TransactionEngine: QueryEngine {
    /// Commit the transaction.
    fn commit(&self) -> BoxFuture<'_, QueryResult<()>>;

    /// Roll the transaction back.
    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>>;

    /// Next unused savepoint name (`sp_1`, `sp_2`, ...).
    fn next_savepoint_name(&self) -> String;

    /// `SAVEPOINT name`.
    fn savepoint(&self, name: &str) -> BoxFuture<'_, QueryResult<()>> {
        let run = self.execute(&format!("SAVEPOINT {}", name), Vec::new());
        Box::pin(async move { run.await.map(|_| ()) })
    }

    /// `ROLLBACK TO SAVEPOINT name`.
    fn rollback_to(&self, name: &str) -> BoxFuture<'_, QueryResult<()>> {
        let run = self.execute(&format!("ROLLBACK TO SAVEPOINT {}", name), Vec::new());
        Box::pin(async move { run.await.map(|_| ()) })
    }

    /// `RELEASE SAVEPOINT name`.
    fn release_savepoint(&self, name: &str) -> BoxFuture<'_, QueryResult<()>> {
        let run = self.execute(&format!("RELEASE SAVEPOINT {}", name), Vec::new());
        Box::pin(async move { run.await.map(|_| ()) })
    }
}
