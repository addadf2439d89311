//! Transaction configuration.
//!
//! ```rust
//! use std::time::Duration;
//! use agora_query::{IsolationLevel, TransactionConfig};
//!
//! let config = TransactionConfig::new()
//!     .isolation(IsolationLevel::Serializable)
//!     .timeout(Duration::from_secs(5));
//!
//! assert_eq!(
//!     config.to_begin_sql(),
//!     "BEGIN ISOLATION LEVEL SERIALIZABLE READ WRITE"
//! );
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::debug;

/// `ISOLATION LEVEL` of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Read uncommitted (PostgreSQL treats it as read committed).
    ReadUncommitted,
    /// Read committed.
    #[default]
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable.
    Serializable,
}

impl IsolationLevel {
    /// Keyword form used after `ISOLATION LEVEL`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// `READ WRITE` or `READ ONLY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// Writes allowed.
    #[default]
    ReadWrite,
    /// Writes rejected by the server.
    ReadOnly,
}

impl AccessMode {
    /// Keyword form.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadWrite => "READ WRITE",
            Self::ReadOnly => "READ ONLY",
        }
    }
}

/// How `AgoraClient::transaction` opens and bounds a transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionConfig {
    /// Defaults to READ COMMITTED.
    pub isolation: IsolationLevel,
    /// Defaults to READ WRITE.
    pub access_mode: AccessMode,
    /// Roll back and fail if the transaction body runs longer than this.
    pub timeout: Option<Duration>,
    /// DEFERRABLE; only honoured for SERIALIZABLE READ ONLY.
    pub deferrable: bool,
}

impl TransactionConfig {
    /// Defaults: READ COMMITTED, READ WRITE, no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Fail with `TransactionFailed` once the body has run this long.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shorthand for `access_mode(AccessMode::ReadOnly)`.
    pub fn read_only(self) -> Self {
        self.access_mode(AccessMode::ReadOnly)
    }

    pub fn deferrable(mut self) -> Self {
        self.deferrable = true;
        self
    }

    /// The BEGIN statement for this configuration.
    pub fn to_begin_sql(&self) -> String {
        let mut sql = format!(
            "BEGIN ISOLATION LEVEL {} {}",
            self.isolation.as_sql(),
            self.access_mode.as_sql()
        );
        if self.deferrable
            && self.isolation == IsolationLevel::Serializable
            && self.access_mode == AccessMode::ReadOnly
        {
            sql.push_str(" DEFERRABLE");
        }
        debug!(isolation = self.isolation.as_sql(), mode = self.access_mode.as_sql(), "begin");
        sql
    }
}

/// Hands out `sp_1`, `sp_2`, ... for one transaction.
#[derive(Debug, Default)]
pub struct SavepointCounter(AtomicU32);

impl SavepointCounter {
    /// Fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next savepoint name.
    pub fn next_name(&self) -> String {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        format!("sp_{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_sql_defaults_to_read_committed() {
        assert_eq!(
            TransactionConfig::default().to_begin_sql(),
            "BEGIN ISOLATION LEVEL READ COMMITTED READ WRITE"
        );
        assert_eq!(
            TransactionConfig::new()
                .isolation(IsolationLevel::RepeatableRead)
                .read_only()
                .to_begin_sql(),
            "BEGIN ISOLATION LEVEL REPEATABLE READ READ ONLY"
        );
    }

    #[test]
    fn test_deferrable_only_for_serializable_read_only() {
        let config = TransactionConfig::new().deferrable();
        assert!(!config.to_begin_sql().contains("DEFERRABLE"));

        let config = TransactionConfig::new()
            .isolation(IsolationLevel::Serializable)
            .read_only()
            .deferrable();
        assert_eq!(
            config.to_begin_sql(),
            "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY DEFERRABLE"
        );
    }

    #[test]
    fn test_savepoint_names() {
        let counter = SavepointCounter::new();
        assert_eq!(counter.next_name(), "sp_1");
        assert_eq!(counter.next_name(), "sp_2");
    }
}
