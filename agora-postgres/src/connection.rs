//! PostgreSQL connection wrapper.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agora_query::{agora_debug, FilterValue, Row};
use deadpool_postgres::Object;
use tracing::{debug, info, warn};

use crate::error::PgResult;
use crate::row::decode_rows;
use crate::statement::PreparedStatementCache;
use crate::types::{as_sql_params, bind_params};

/// How statements are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryLogging {
    /// Log every statement at `info` instead of `debug`.
    pub log_queries: bool,
    /// Statements slower than this are logged at `warn`.
    pub slow_query_threshold: Option<Duration>,
}

impl QueryLogging {
    fn report(&self, sql: &str, params: usize, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match self.slow_query_threshold {
            Some(threshold) if elapsed >= threshold => {
                warn!(sql = %sql, params, elapsed_ms, threshold_ms = threshold.as_millis() as u64, "slow query");
            }
            _ if self.log_queries => info!(sql = %sql, params, elapsed_ms, "query"),
            _ => debug!(sql = %sql, params, elapsed_ms, "query"),
        }
    }
}

/// A pooled connection with statement caching.
pub struct PgConnection {
    client: Object,
    statement_cache: Arc<PreparedStatementCache>,
    logging: QueryLogging,
}

impl PgConnection {
    pub(crate) fn new(
        client: Object,
        statement_cache: Arc<PreparedStatementCache>,
        logging: QueryLogging,
    ) -> Self {
        Self {
            client,
            statement_cache,
            logging,
        }
    }

    /// Run a statement and decode the returned rows.
    pub async fn query(&self, sql: &str, params: &[FilterValue]) -> PgResult<Vec<Row>> {
        agora_debug!(sql = %sql, params = ?params, "binding query");
        let started = Instant::now();

        let stmt = self.statement_cache.get_or_prepare(&self.client, sql).await?;
        let values = bind_params(params);
        let rows = self.client.query(&stmt, &as_sql_params(&values)).await?;

        self.logging.report(sql, params.len(), started.elapsed());
        decode_rows(&rows)
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[FilterValue]) -> PgResult<u64> {
        agora_debug!(sql = %sql, params = ?params, "binding statement");
        let started = Instant::now();

        let stmt = self.statement_cache.get_or_prepare(&self.client, sql).await?;
        let values = bind_params(params);
        let count = self.client.execute(&stmt, &as_sql_params(&values)).await?;

        self.logging.report(sql, params.len(), started.elapsed());
        Ok(count)
    }

    /// Run one or more statements over the simple protocol, without
    /// parameters. Used for transaction control.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        debug!(sql = %sql, "executing batch");
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    /// Round-trip `SELECT 1`.
    pub async fn ping(&self) -> PgResult<()> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Remove the connection from the pool so dropping it closes it.
    /// Used when its session state is unknown, e.g. a transaction that was
    /// never finished.
    pub(crate) fn detach(self) {
        drop(Object::take(self.client));
    }
}
