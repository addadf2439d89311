//! Scripted engine for the integration tests.

use std::collections::VecDeque;
use std::sync::Arc;

use agora::FilterValue;
use agora_query::{
    BoxFuture, QueryEngine, QueryError, QueryResult, Row, SavepointCounter, TransactionConfig,
    TransactionEngine, TransactionalEngine,
};
use parking_lot::Mutex;

/// Answers each query with the next scripted result set and records
/// every statement, including `BEGIN`/`COMMIT`/`ROLLBACK`.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    log: Arc<Mutex<Vec<(String, Vec<FilterValue>)>>>,
    responses: Arc<Mutex<VecDeque<Vec<Row>>>>,
    fail_prefix: Arc<Mutex<Option<String>>>,
    savepoints: Arc<SavepointCounter>,
}

#[allow(dead_code)]
impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next statement. `execute` reports
    /// their count as the affected rows.
    pub fn respond(&self, rows: Vec<Row>) -> &Self {
        self.responses.lock().push_back(rows);
        self
    }

    /// Fail statements starting with `prefix` with a unique violation.
    pub fn fail_on(&self, prefix: &str) {
        *self.fail_prefix.lock() = Some(prefix.to_string());
    }

    pub fn statements(&self) -> Vec<(String, Vec<FilterValue>)> {
        self.log.lock().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.log.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    fn record(&self, sql: &str, params: Vec<FilterValue>) -> QueryResult<()> {
        self.log.lock().push((sql.to_string(), params));
        match self.fail_prefix.lock().as_deref() {
            Some(prefix) if sql.starts_with(prefix) => {
                Err(QueryError::unique_violation("tags", "slug").with_sql(sql))
            }
            _ => Ok(()),
        }
    }
}

impl QueryEngine for ScriptedEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let result = self
            .record(sql, params)
            .map(|_| self.responses.lock().pop_front().unwrap_or_default());
        Box::pin(async move { result })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let result = self.record(sql, params).map(|_| {
            self.responses
                .lock()
                .pop_front()
                .map_or(0, |rows| rows.len() as u64)
        });
        Box::pin(async move { result })
    }
}

impl TransactionalEngine for ScriptedEngine {
    type Transaction = ScriptedEngine;

    fn begin(&self, config: TransactionConfig) -> BoxFuture<'_, QueryResult<Self::Transaction>> {
        let result = self.record(&config.to_begin_sql(), Vec::new()).map(|_| self.clone());
        Box::pin(async move { result })
    }
}

impl TransactionEngine for ScriptedEngine {
    fn commit(&self) -> BoxFuture<'_, QueryResult<()>> {
        let result = self.record("COMMIT", Vec::new());
        Box::pin(async move { result })
    }

    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>> {
        let result = self.record("ROLLBACK", Vec::new());
        Box::pin(async move { result })
    }

    fn next_savepoint_name(&self) -> String {
        self.savepoints.next_name()
    }
}
