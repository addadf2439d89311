//! Error types for PostgreSQL operations.

use agora_query::{ErrorCode, QueryError};
use thiserror::Error;
use tokio_postgres::error::{DbError, SqlState};

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors raised by the PostgreSQL engine.
#[derive(Error, Debug)]
pub enum PgError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Pool construction error.
    #[error("pool build error: {0}")]
    PoolBuild(#[from] deadpool_postgres::BuildError),

    /// PostgreSQL driver error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Every pooled connection was busy for the whole wait timeout.
    #[error("connection pool exhausted (max {max} connections)")]
    PoolExhausted {
        /// Pool size.
        max: usize,
    },

    /// Opening a new connection timed out.
    #[error("connecting timed out after {0}ms")]
    ConnectTimeout(u64),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A column type with no decoder.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }
}

/// Column list from a constraint detail such as
/// `Key (slug)=(climate) already exists.`
fn key_columns(detail: &str) -> Option<&str> {
    let start = detail.find("Key (")? + "Key (".len();
    let end = start + detail[start..].find(")=")?;
    Some(&detail[start..end])
}

/// Map a server error to the client taxonomy by SQLSTATE.
fn from_db_error(db: &DbError) -> QueryError {
    let table = db.table().unwrap_or("unknown");
    let constraint = db.constraint().unwrap_or("unknown");
    let code = db.code();

    let err = if *code == SqlState::UNIQUE_VIOLATION {
        let field = db
            .detail()
            .and_then(key_columns)
            .unwrap_or(constraint);
        QueryError::unique_violation(table, field)
    } else if *code == SqlState::FOREIGN_KEY_VIOLATION {
        QueryError::foreign_key_violation(table, constraint)
    } else if *code == SqlState::NOT_NULL_VIOLATION {
        QueryError::not_null_violation(table, db.column().unwrap_or("unknown"))
    } else if *code == SqlState::CHECK_VIOLATION {
        QueryError::check_violation(table, constraint)
    } else if *code == SqlState::T_R_DEADLOCK_DETECTED {
        QueryError::deadlock()
    } else if *code == SqlState::T_R_SERIALIZATION_FAILURE {
        QueryError::serialization_failure()
    } else if *code == SqlState::QUERY_CANCELED {
        QueryError::new(ErrorCode::QueryTimeout, db.message())
            .with_suggestion("Raise statement_timeout or narrow the query")
    } else if *code == SqlState::SYNTAX_ERROR {
        QueryError::sql_syntax(db.message(), "")
    } else if *code == SqlState::INVALID_PASSWORD
        || *code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION
    {
        QueryError::authentication_failed(db.message())
    } else {
        QueryError::database(db.message())
    };

    match db.detail() {
        Some(detail) => err.with_suggestion(detail),
        None => err,
    }
}

impl From<PgError> for QueryError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Pool(deadpool_postgres::PoolError::Timeout(kind)) => {
                QueryError::connection(format!("timed out waiting for a connection ({:?})", kind))
            }
            PgError::PoolExhausted { max } => QueryError::pool_exhausted(max),
            PgError::ConnectTimeout(ms) => QueryError::connection_timeout(ms),
            PgError::Pool(deadpool_postgres::PoolError::Backend(e)) => PgError::Postgres(e).into(),
            PgError::Pool(e) => QueryError::connection(e.to_string()),
            PgError::PoolBuild(e) => QueryError::configuration(e.to_string()),
            PgError::Postgres(e) => {
                let mapped = match e.as_db_error() {
                    Some(db) => from_db_error(db),
                    None if e.is_closed() => QueryError::connection("connection closed"),
                    None => QueryError::database(e.to_string()),
                };
                mapped.with_source(e)
            }
            PgError::Config(msg) => QueryError::invalid_connection_string(msg),
            PgError::Deserialization(msg) => QueryError::deserialization(msg),
        }
    }
}
