//! PostgreSQL query engine.

use std::time::Duration;

use agora_query::{
    BoxFuture, FilterValue, QueryEngine, QueryError, QueryResult, Row, TransactionConfig,
    TransactionalEngine,
};
use tracing::debug;

use crate::error::PgError;
use crate::pool::PgPool;
use crate::transaction::PgTransactionEngine;

/// Attach the statement to a driver error.
pub(crate) fn with_statement(err: PgError, sql: &str) -> QueryError {
    QueryError::from(err).with_sql(sql)
}

/// Query engine that checks out a pooled connection per statement.
#[derive(Clone, Debug)]
pub struct PgEngine {
    pool: PgPool,
}

impl PgEngine {
    /// Create a new PostgreSQL engine with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log statements slower than `threshold` at `warn`.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        let mut logging = self.pool.logging();
        logging.slow_query_threshold = Some(threshold);
        self.pool = self.pool.with_logging(logging);
        self
    }

    /// Log every statement at `info`.
    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        let mut logging = self.pool.logging();
        logging.log_queries = enabled;
        self.pool = self.pool.with_logging(logging);
        self
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl QueryEngine for PgEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let sql = sql.to_string();
        Box::pin(async move {
            let conn = self.pool.get().await?;
            conn.query(&sql, &params)
                .await
                .map_err(|e| with_statement(e, &sql))
        })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let sql = sql.to_string();
        Box::pin(async move {
            let conn = self.pool.get().await?;
            conn.execute(&sql, &params)
                .await
                .map_err(|e| with_statement(e, &sql))
        })
    }
}

impl TransactionalEngine for PgEngine {
    type Transaction = PgTransactionEngine;

    fn begin(&self, config: TransactionConfig) -> BoxFuture<'_, QueryResult<PgTransactionEngine>> {
        Box::pin(async move {
            let conn = self.pool.get().await?;
            let begin = config.to_begin_sql();
            conn.batch_execute(&begin)
                .await
                .map_err(|e| with_statement(e, &begin))?;
            debug!(sql = %begin, "transaction started");
            Ok(PgTransactionEngine::new(conn))
        })
    }
}
