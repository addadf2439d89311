//! Connection pool for PostgreSQL.

use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime, TimeoutType};
use futures::future::try_join_all;
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::PgConfig;
use crate::connection::{PgConnection, QueryLogging};
use crate::error::{PgError, PgResult};
use crate::statement::PreparedStatementCache;

/// Pooled PostgreSQL connections sharing one statement cache.
#[derive(Clone, Debug)]
pub struct PgPool {
    inner: Pool,
    config: Arc<PgConfig>,
    pool_config: PoolConfig,
    statement_cache: Arc<PreparedStatementCache>,
    logging: QueryLogging,
}

impl PgPool {
    /// Build the pool. No connection is opened until one is requested;
    /// see [`warm_up`](Self::warm_up).
    pub fn with_pool_config(config: PgConfig, pool_config: PoolConfig) -> PgResult<Self> {
        if pool_config.max_connections == 0 {
            return Err(PgError::config("max_connections must be at least 1"));
        }

        let manager = Manager::from_config(
            config.to_pg_config(),
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let inner = Pool::builder(manager)
            .max_size(pool_config.max_connections)
            .wait_timeout(pool_config.connection_timeout)
            .create_timeout(Some(config.connect_timeout))
            .recycle_timeout(pool_config.idle_timeout)
            .runtime(Runtime::Tokio1)
            .build()?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = pool_config.max_connections,
            "postgres pool ready"
        );

        Ok(Self {
            inner,
            statement_cache: Arc::new(PreparedStatementCache::new(pool_config.statement_cache_size)),
            config: Arc::new(config),
            pool_config,
            logging: QueryLogging::default(),
        })
    }

    /// Use `logging` for every connection handed out from now on.
    pub fn with_logging(mut self, logging: QueryLogging) -> Self {
        self.logging = logging;
        self
    }

    /// Current statement logging.
    pub fn logging(&self) -> QueryLogging {
        self.logging
    }

    /// Check out a connection.
    pub async fn get(&self) -> PgResult<PgConnection> {
        debug!("acquiring connection");
        let client = self.inner.get().await.map_err(|e| self.classify(e))?;
        Ok(PgConnection::new(client, self.statement_cache.clone(), self.logging))
    }

    fn classify(&self, err: PoolError) -> PgError {
        match err {
            PoolError::Timeout(TimeoutType::Wait) => PgError::PoolExhausted {
                max: self.pool_config.max_connections,
            },
            PoolError::Timeout(TimeoutType::Create) => {
                PgError::ConnectTimeout(self.config.connect_timeout.as_millis() as u64)
            }
            other => PgError::Pool(other),
        }
    }

    /// Open `min_connections` connections up front and check they answer.
    pub async fn warm_up(&self) -> PgResult<()> {
        let wanted = self.pool_config.min_connections.min(self.pool_config.max_connections);
        let connections = try_join_all((0..wanted).map(|_| self.get())).await?;
        for connection in &connections {
            connection.ping().await?;
        }
        debug!(connections = connections.len(), "pool warmed up");
        Ok(())
    }

    /// Sizes as reported by deadpool.
    pub fn status(&self) -> PoolStatus {
        let status = self.inner.status();
        PoolStatus {
            available: status.available,
            size: status.size,
            max_size: status.max_size,
            waiting: status.waiting,
        }
    }

    /// Connection settings the pool dials with.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Check the pool can hand out a working connection.
    pub async fn is_healthy(&self) -> bool {
        match self.get().await {
            Ok(conn) => conn.ping().await.is_ok(),
            Err(_) => false,
        }
    }

    /// Stop handing out connections and drop the idle ones.
    pub fn close(&self) {
        self.inner.close();
        info!("postgres pool closed");
    }
}

/// Snapshot of [`PgPool::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle connections.
    pub available: usize,
    /// Open connections.
    pub size: usize,
    /// Upper bound on `size`.
    pub max_size: usize,
    /// Tasks queued for a connection.
    pub waiting: usize,
}

/// Pool sizing, usually built by `AgoraConfig::pool_config`.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Upper bound on open connections.
    pub max_connections: usize,
    /// Connections opened by [`PgPool::warm_up`].
    pub min_connections: usize,
    /// Maximum time to wait for a free connection.
    pub connection_timeout: Option<Duration>,
    /// Maximum time spent checking an idle connection before reuse.
    pub idle_timeout: Option<Duration>,
    /// Number of distinct statements kept prepared.
    pub statement_cache_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connection_timeout: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(600)),
            statement_cache_size: 100,
        }
    }
}
