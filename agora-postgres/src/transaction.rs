//! Engine bound to one open transaction.

use std::sync::Arc;

use agora_query::{
    BoxFuture, FilterValue, QueryEngine, QueryError, QueryResult, Row, SavepointCounter,
    TransactionEngine,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::connection::PgConnection;
use crate::engine::with_statement;

struct TransactionState {
    /// `None` once committed or rolled back.
    conn: Mutex<Option<PgConnection>>,
    savepoints: SavepointCounter,
}

impl Drop for TransactionState {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take() {
            warn!("transaction dropped while open; closing its connection");
            conn.detach();
        }
    }
}

/// Runs every statement on the connection that issued `BEGIN`.
///
/// Clones share the transaction. After [`commit`](TransactionEngine::commit)
/// or [`rollback`](TransactionEngine::rollback) the connection goes back to
/// the pool and further calls fail with `TransactionClosed`. A transaction
/// dropped while still open has its connection closed, which makes the
/// server roll it back.
#[derive(Clone)]
pub struct PgTransactionEngine {
    state: Arc<TransactionState>,
}

impl PgTransactionEngine {
    pub(crate) fn new(conn: PgConnection) -> Self {
        Self {
            state: Arc::new(TransactionState {
                conn: Mutex::new(Some(conn)),
                savepoints: SavepointCounter::new(),
            }),
        }
    }

    /// Whether commit or rollback already ran.
    pub async fn is_closed(&self) -> bool {
        self.state.conn.lock().await.is_none()
    }

    async fn finish(&self, sql: &'static str) -> QueryResult<()> {
        let conn = self
            .state
            .conn
            .lock()
            .await
            .take()
            .ok_or_else(QueryError::transaction_closed)?;

        match conn.batch_execute(sql).await {
            Ok(()) => {
                debug!(sql, "transaction finished");
                Ok(())
            }
            Err(e) => {
                conn.detach();
                Err(with_statement(e, sql))
            }
        }
    }

    async fn control(&self, sql: String) -> QueryResult<()> {
        let guard = self.state.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(QueryError::transaction_closed)?;
        conn.batch_execute(&sql)
            .await
            .map_err(|e| with_statement(e, &sql))
    }
}

impl QueryEngine for PgTransactionEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let sql = sql.to_string();
        Box::pin(async move {
            let guard = self.state.conn.lock().await;
            let conn = guard.as_ref().ok_or_else(QueryError::transaction_closed)?;
            conn.query(&sql, &params)
                .await
                .map_err(|e| with_statement(e, &sql))
        })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let sql = sql.to_string();
        Box::pin(async move {
            let guard = self.state.conn.lock().await;
            let conn = guard.as_ref().ok_or_else(QueryError::transaction_closed)?;
            conn.execute(&sql, &params)
                .await
                .map_err(|e| with_statement(e, &sql))
        })
    }
}

impl TransactionEngine for PgTransactionEngine {
    fn commit(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(self.finish("COMMIT"))
    }

    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(self.finish("ROLLBACK"))
    }

    fn next_savepoint_name(&self) -> String {
        self.state.savepoints.next_name()
    }

    fn savepoint(&self, name: &str) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(self.control(format!("SAVEPOINT {}", name)))
    }

    fn rollback_to(&self, name: &str) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(self.control(format!("ROLLBACK TO SAVEPOINT {}", name)))
    }

    fn release_savepoint(&self, name: &str) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(self.control(format!("RELEASE SAVEPOINT {}", name)))
    }
}
