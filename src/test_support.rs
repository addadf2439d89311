//! Recording engine shared by the unit tests.

use std::sync::Arc;

use agora_query::{
    BoxFuture, FilterValue, QueryEngine, QueryResult, Row, SavepointCounter, TransactionConfig,
    TransactionEngine, TransactionalEngine,
};
use parking_lot::Mutex;

/// Remembers every statement and answers with canned rows.
///
/// Transactions opened from it share the same log, so a test sees
/// `BEGIN`, the statements and `COMMIT`/`ROLLBACK` in order.
#[derive(Clone, Default)]
pub(crate) struct MockEngine {
    pub statements: Arc<Mutex<Vec<(String, Vec<FilterValue>)>>>,
    pub rows: Arc<Mutex<Vec<Row>>>,
    pub affected: u64,
    savepoints: Arc<SavepointCounter>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        let engine = Self::default();
        *engine.rows.lock() = rows;
        engine
    }

    pub fn with_affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    pub fn affecting(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    pub fn last_statement(&self) -> (String, Vec<FilterValue>) {
        self.statements.lock().last().cloned().unwrap_or_default()
    }

    pub fn last_sql(&self) -> String {
        self.last_statement().0
    }

    pub fn sql_log(&self) -> Vec<String> {
        self.statements.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    fn record(&self, sql: &str, params: Vec<FilterValue>) {
        self.statements.lock().push((sql.to_string(), params));
    }
}

impl QueryEngine for MockEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        self.record(sql, params);
        let rows = self.rows.lock().clone();
        Box::pin(async move { Ok(rows) })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        self.record(sql, params);
        let affected = self.affected;
        Box::pin(async move { Ok(affected) })
    }
}

impl TransactionalEngine for MockEngine {
    type Transaction = MockEngine;

    fn begin(&self, config: TransactionConfig) -> BoxFuture<'_, QueryResult<Self::Transaction>> {
        self.record(&config.to_begin_sql(), Vec::new());
        let tx = self.clone();
        Box::pin(async move { Ok(tx) })
    }
}

impl TransactionEngine for MockEngine {
    fn commit(&self) -> BoxFuture<'_, QueryResult<()>> {
        self.record("COMMIT", Vec::new());
        Box::pin(async { Ok(()) })
    }

    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>> {
        self.record("ROLLBACK", Vec::new());
        Box::pin(async { Ok(()) })
    }

    fn next_savepoint_name(&self) -> String {
        self.savepoints.next_name()
    }
}
