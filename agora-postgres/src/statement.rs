//! Prepared statement caching.

use deadpool_postgres::Object;
use indexmap::IndexSet;
use parking_lot::RwLock;
use tokio_postgres::Statement;
use tracing::debug;

use crate::error::PgResult;

/// Bounds the statements prepared on pooled connections.
///
/// Statements live on the connection that prepared them (deadpool keeps one
/// cache per connection). The shared set of SQL texts stays under
/// `max_size` by forgetting its oldest half, and the forgotten texts are
/// dropped from the connection in hand. A connection whose own cache grows
/// past `max_size` is reset, so texts evicted while it sat idle in the
/// pool cannot pile up on it.
#[derive(Debug)]
pub struct PreparedStatementCache {
    max_size: usize,
    prepared: RwLock<IndexSet<String>>,
}

impl PreparedStatementCache {
    /// Create a new statement cache with the given maximum size.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            prepared: RwLock::new(IndexSet::new()),
        }
    }

    /// Record `sql`; returns whether it was already known and the texts
    /// evicted to make room.
    fn record(&self, sql: &str) -> (bool, Vec<String>) {
        if self.prepared.read().contains(sql) {
            return (true, Vec::new());
        }

        let mut prepared = self.prepared.write();
        let mut evicted = Vec::new();
        if self.max_size > 0 && prepared.len() >= self.max_size {
            let half = (prepared.len() / 2).max(1);
            evicted.extend(prepared.drain(..half));
        }
        prepared.insert(sql.to_string());
        (false, evicted)
    }

    /// Whether a connection now holding `connection_size` statements must
    /// drop them, `grew` telling whether the last prepare added one.
    fn must_reset(&self, connection_size: usize, grew: bool) -> bool {
        self.max_size > 0 && grew && connection_size > self.max_size
    }

    /// Get or prepare a statement for the given SQL on `client`.
    pub async fn get_or_prepare(&self, client: &Object, sql: &str) -> PgResult<Statement> {
        if self.max_size == 0 {
            return Ok(client.prepare(sql).await?);
        }

        let (cached, evicted) = self.record(sql);
        if cached {
            debug!(sql = %sql, "using cached prepared statement");
        } else {
            debug!(sql = %sql, evicted = evicted.len(), "preparing new statement");
            for old in &evicted {
                client.statement_cache.remove(old, &[]);
            }
        }

        let before = client.statement_cache.size();
        let statement = client.prepare_cached(sql).await?;
        let after = client.statement_cache.size();
        if self.must_reset(after, after > before) {
            // the returned statement stays valid until dropped
            debug!(size = after, "connection statement cache full, resetting");
            client.statement_cache.clear();
        }
        Ok(statement)
    }

    /// Clear all cached statement keys.
    pub fn clear(&self) {
        self.prepared.write().clear();
        debug!("statement cache cleared");
    }

    /// Get the number of cached statement keys.
    pub fn len(&self) -> usize {
        self.prepared.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the maximum cache size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statement_cache_creation() {
        let cache = PreparedStatementCache::new(100);
        assert_eq!(cache.max_size(), 100);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_record_hits_and_misses() {
        let cache = PreparedStatementCache::new(10);
        assert_eq!(cache.record("SELECT 1"), (false, vec![]));
        assert_eq!(cache.record("SELECT 1"), (true, vec![]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_eviction_drops_oldest_half() {
        let cache = PreparedStatementCache::new(4);
        for sql in ["a", "b", "c", "d"] {
            cache.record(sql);
        }
        let (cached, evicted) = cache.record("e");
        assert!(!cached);
        assert_eq!(evicted, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.record("c"), (true, vec![]));
    }

    #[test]
    fn test_connection_reset_only_when_it_grows_past_max() {
        let cache = PreparedStatementCache::new(4);
        assert!(!cache.must_reset(4, true));
        assert!(cache.must_reset(5, true));
        // texts evicted from the shared set while the connection was idle
        assert!(cache.must_reset(9, true));
        // a hit on the connection never throws its cache away
        assert!(!cache.must_reset(9, false));
        assert!(!PreparedStatementCache::new(0).must_reset(50, true));
    }

    #[test]
    fn test_clear() {
        let cache = PreparedStatementCache::new(4);
        cache.record("SELECT 1");
        cache.clear();
        assert!(cache.is_empty());
    }
}
