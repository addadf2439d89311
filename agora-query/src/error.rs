//! Error taxonomy for query execution.
//!
//! Every failure surfaced by the client is a [`QueryError`] carrying a stable
//! [`ErrorCode`]. Codes are grouped by family:
//!
//! - `P1xxx`: request errors (record not found, bad filter, missing field)
//! - `P2xxx`: constraint violations (unique, foreign key, check, not null)
//! - `P3xxx`: connection errors (refused, pool exhausted, timeout, auth)
//! - `P4xxx`: transaction errors (deadlock, serialization failure)
//! - `P5xxx`: execution errors (timeout, syntax, invalid parameter)
//! - `P6xxx`: data errors (type mismatch, (de)serialization)
//! - `P7xxx`: configuration errors
//! - `P9xxx`: internal errors
//!
//! ```rust
//! use agora_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_found("Topic");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert_eq!(err.code.code(), "P1001");
//! assert!(err.to_string().contains("Topic"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request errors (1xxx)
    /// No record matched a query that required one (P1001).
    RecordNotFound = 1001,
    /// The select list names an unknown column (P1004).
    InvalidSelect = 1004,

    // Constraint errors (2xxx)
    /// Unique constraint violation (P2001).
    UniqueConstraint = 2001,
    /// Foreign key constraint violation (P2002).
    ForeignKeyConstraint = 2002,
    /// Check constraint violation (P2003).
    CheckConstraint = 2003,
    /// Not null constraint violation (P2004).
    NotNullConstraint = 2004,

    // Connection errors (3xxx)
    /// Could not connect to the database (P3001).
    ConnectionFailed = 3001,
    /// No pooled connection became available (P3002).
    PoolExhausted = 3002,
    /// Connecting took too long (P3003).
    ConnectionTimeout = 3003,
    /// The server rejected the credentials (P3004).
    AuthenticationFailed = 3004,

    // Transaction errors (4xxx)
    /// Transaction failed or timed out (P4001).
    TransactionFailed = 4001,
    /// Deadlock detected (P4002).
    Deadlock = 4002,
    /// Serialization failure under SERIALIZABLE isolation (P4003).
    SerializationFailure = 4003,
    /// The transaction was already committed or rolled back (P4004).
    TransactionClosed = 4004,

    // Execution errors (5xxx)
    /// Statement timeout (P5001).
    QueryTimeout = 5001,
    /// SQL syntax error (P5002).
    SqlSyntax = 5002,
    /// A parameter or input value was rejected before execution (P5003).
    InvalidParameter = 5003,
    /// Any other database-side error (P5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Value does not fit the target type (P6001).
    InvalidDataType = 6001,
    /// Serialization error (P6002).
    SerializationError = 6002,
    /// A result row could not be decoded (P6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (P7001).
    InvalidConfiguration = 7001,
    /// Missing configuration (P7002).
    MissingConfiguration = 7002,
    /// Invalid connection string (P7003).
    InvalidConnectionString = 7003,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
}

impl ErrorCode {
    /// The code as printed in messages, e.g. `P2001`.
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Short human description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidSelect => "Invalid select",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ForeignKeyConstraint => "Foreign key constraint violation",
            Self::CheckConstraint => "Check constraint violation",
            Self::NotNullConstraint => "Not null constraint violation",
            Self::ConnectionFailed => "Database connection failed",
            Self::PoolExhausted => "Connection pool exhausted",
            Self::ConnectionTimeout => "Connection timeout",
            Self::AuthenticationFailed => "Authentication failed",
            Self::TransactionFailed => "Transaction failed",
            Self::Deadlock => "Deadlock detected",
            Self::SerializationFailure => "Serialization failure",
            Self::TransactionClosed => "Transaction already closed",
            Self::QueryTimeout => "Query timeout",
            Self::SqlSyntax => "SQL syntax error",
            Self::InvalidParameter => "Invalid parameter",
            Self::DatabaseError => "Database error",
            Self::InvalidDataType => "Invalid data type",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::MissingConfiguration => "Missing configuration",
            Self::InvalidConnectionString => "Invalid connection string",
            Self::Internal => "Internal error",
        }
    }

    /// Which family the code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match *self as u16 / 1000 {
            1 => ErrorKind::Request,
            2 => ErrorKind::Constraint,
            3 => ErrorKind::Connection,
            4 => ErrorKind::Transaction,
            5 => ErrorKind::Execution,
            6 => ErrorKind::Data,
            7 => ErrorKind::Configuration,
            _ => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse error classes exposed to application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Known request errors such as not-found.
    Request,
    /// Constraint violations reported by the database.
    Constraint,
    /// Connectivity problems.
    Connection,
    /// Transaction lifecycle failures.
    Transaction,
    /// Statement execution failures and rejected input.
    Execution,
    /// Encoding or decoding of values.
    Data,
    /// Bad or missing configuration.
    Configuration,
    /// Bugs.
    Internal,
}

/// Where an error happened.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being run, e.g. `Topic.update`.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field or column involved.
    pub field: Option<String>,
    /// The SQL statement, if one was built.
    pub sql: Option<String>,
    /// Hints for fixing the error.
    pub suggestions: Vec<String>,
}

/// The error type returned by every client operation.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The underlying error, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Record the operation that failed.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Request errors

    /// No record matched.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(model)
        .with_suggestion("Use find_first() or find_unique().exec() to get None instead of an error")
    }

    // Constraint errors

    /// Unique constraint violation.
    pub fn unique_violation(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint violated on {}.{}", model, field),
        )
        .with_suggestion(format!("A record with this {} already exists; upsert() updates it instead", field))
        .with_model(model)
        .with_field(field)
    }

    /// Foreign key violation.
    pub fn foreign_key_violation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        let model = model.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::ForeignKeyConstraint,
            format!("Foreign key constraint violated: {} -> {}", model, relation),
        )
        .with_suggestion(format!("Create the referenced record before linking it from {}", model))
        .with_model(model)
        .with_field(relation)
    }

    /// Not null violation.
    pub fn not_null_violation(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::NotNullConstraint,
            format!("{}.{} cannot be null", model, field),
        )
        .with_model(model)
        .with_field(field)
    }

    /// Check constraint violation.
    pub fn check_violation(model: impl Into<String>, constraint: impl Into<String>) -> Self {
        let model = model.into();
        let constraint = constraint.into();
        Self::new(
            ErrorCode::CheckConstraint,
            format!("Check constraint {} violated on {}", constraint, model),
        )
        .with_model(model)
        .with_field(constraint)
    }

    // Connection errors

    /// Connection failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConnectionFailed,
            format!("Connection error: {}", message.into()),
        )
        .with_suggestion("Check that the database server is running and the URL is correct")
    }

    /// Connecting timed out.
    pub fn connection_timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::ConnectionTimeout,
            format!("Connection timed out after {}ms", duration_ms),
        )
        .with_suggestion("Raise connect_timeout in the connection URL")
    }

    /// The pool had no free connection.
    pub fn pool_exhausted(max_connections: usize) -> Self {
        Self::new(
            ErrorCode::PoolExhausted,
            format!("Connection pool exhausted (max {} connections)", max_connections),
        )
        .with_suggestion("Increase database.pool.max_connections")
    }

    /// Authentication failed.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AuthenticationFailed,
            format!("Authentication failed: {}", message.into()),
        )
    }

    // Transaction errors

    /// Generic transaction failure.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransactionFailed,
            format!("Transaction error: {}", message.into()),
        )
    }

    /// The transaction exceeded its configured timeout and was rolled back.
    pub fn transaction_timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::TransactionFailed,
            format!("Transaction timed out after {}ms and was rolled back", duration_ms),
        )
    }

    /// The transaction handle was used after commit or rollback.
    pub fn transaction_closed() -> Self {
        Self::new(
            ErrorCode::TransactionClosed,
            "Transaction was already committed or rolled back",
        )
    }

    /// Deadlock detected.
    pub fn deadlock() -> Self {
        Self::new(ErrorCode::Deadlock, "Deadlock detected, transaction was rolled back")
            .with_suggestion("Retry the transaction")
    }

    /// Serialization failure.
    pub fn serialization_failure() -> Self {
        Self::new(
            ErrorCode::SerializationFailure,
            "Could not serialize access due to concurrent update",
        )
        .with_suggestion("Retry the transaction")
    }

    // Execution errors

    /// Statement timeout.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Query timed out after {}ms", duration_ms),
        )
    }

    /// SQL syntax error.
    pub fn sql_syntax(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SqlSyntax,
            format!("SQL syntax error: {}", message.into()),
        )
        .with_sql(sql)
    }

    /// Input rejected before it reached the database.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid input for {}: {}", field, message.into()),
        )
        .with_field(field)
    }

    /// Any other database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    // Data errors

    /// A column value could not be converted to the requested type.
    pub fn invalid_type(column: impl Into<String>, detail: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::InvalidDataType,
            format!("Column {} cannot be decoded: {}", column, detail.into()),
        )
        .with_field(column)
    }

    /// `select` names a column the model does not have.
    pub fn invalid_select(model: impl Into<String>, column: impl Into<String>) -> Self {
        let model = model.into();
        let column = column.into();
        Self::new(
            ErrorCode::InvalidSelect,
            format!("{} has no column {}", model, column),
        )
        .with_model(model)
        .with_field(column)
    }

    /// Serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// A result row could not be decoded.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to decode result: {}", message.into()),
        )
    }

    // Configuration errors

    /// Invalid configuration.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Invalid connection URL.
    pub fn invalid_connection_string(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConnectionString,
            format!("Invalid connection string: {}", message.into()),
        )
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // Predicates

    /// No record matched.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// The database rejected the write because of a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        self.code.kind() == ErrorKind::Constraint
    }

    /// Unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        self.code == ErrorCode::UniqueConstraint
    }

    /// Query or connection timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.code, ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout)
    }

    /// Connectivity problem.
    pub fn is_connection_error(&self) -> bool {
        self.code.kind() == ErrorKind::Connection
    }

    /// Input rejected before execution.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidParameter
                | ErrorCode::InvalidSelect
        )
    }

    /// The same request might succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionTimeout
                | ErrorCode::PoolExhausted
                | ErrorCode::QueryTimeout
                | ErrorCode::Deadlock
                | ErrorCode::SerializationFailure
        )
    }

    /// Multi-line rendering with context and hints.
    pub fn display_full(&self) -> String {
        let mut output = format!("Error [{}]: {}\n", self.code.code(), self.message);

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  while: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  field: {}\n", field));
        }
        if let Some(ref sql) = self.context.sql {
            let shown: String = sql.chars().take(200).collect();
            let ellipsis = if sql.chars().count() > 200 { "..." } else { "" };
            output.push_str(&format!("  sql: {}{}\n", shown, ellipsis));
        }
        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::serialization(err.to_string()).with_source(err)
    }
}

/// Build a [`QueryError`] and apply `with_*` setters in one expression.
///
/// ```rust
/// use agora_query::{query_error, ErrorCode};
///
/// let err = query_error!(
///     ErrorCode::InvalidParameter,
///     "email must contain @",
///     with_field = "email",
/// );
/// assert_eq!(err.context.field.as_deref(), Some("email"));
/// ```
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "P1001");
        assert_eq!(ErrorCode::UniqueConstraint.code(), "P2001");
        assert_eq!(ErrorCode::ConnectionFailed.code(), "P3001");
        assert_eq!(ErrorCode::TransactionFailed.code(), "P4001");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(ErrorCode::RecordNotFound.kind(), ErrorKind::Request);
        assert_eq!(ErrorCode::CheckConstraint.kind(), ErrorKind::Constraint);
        assert_eq!(ErrorCode::PoolExhausted.kind(), ErrorKind::Connection);
        assert_eq!(ErrorCode::InvalidConnectionString.kind(), ErrorKind::Configuration);
        assert_eq!(ErrorCode::Internal.kind(), ErrorKind::Internal);
        assert_eq!(ErrorCode::InvalidDataType.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_invalid_select_names_the_column() {
        let err = QueryError::invalid_select("Topic", "titel");
        assert_eq!(err.code, ErrorCode::InvalidSelect);
        assert_eq!(err.context.model.as_deref(), Some("Topic"));
        assert_eq!(err.context.field.as_deref(), Some("titel"));
        assert!(err.message.contains("titel"));
    }

    #[test]
    fn test_not_found_error() {
        let err = QueryError::not_found("Topic");
        assert!(err.is_not_found());
        assert!(err.message.contains("Topic"));
        assert_eq!(err.context.model.as_deref(), Some("Topic"));
        assert!(!err.context.suggestions.is_empty());
    }

    #[test]
    fn test_unique_violation_error() {
        let err = QueryError::unique_violation("Tag", "slug");
        assert!(err.is_constraint_violation());
        assert!(err.is_unique_violation());
        assert_eq!(err.context.model.as_deref(), Some("Tag"));
        assert_eq!(err.context.field.as_deref(), Some("slug"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(QueryError::invalid_input("email", "empty").is_validation_error());
        assert!(QueryError::invalid_select("Topic", "titel").is_validation_error());
        assert!(!QueryError::database("boom").is_validation_error());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(QueryError::timeout(1000).is_retryable());
        assert!(QueryError::deadlock().is_retryable());
        assert!(QueryError::serialization_failure().is_retryable());
        assert!(QueryError::pool_exhausted(10).is_retryable());
        assert!(!QueryError::not_found("Topic").is_retryable());
    }

    #[test]
    fn test_connection_errors() {
        assert!(QueryError::connection("refused").is_connection_error());
        assert!(QueryError::authentication_failed("bad password").is_connection_error());
        assert!(!QueryError::transaction_closed().is_connection_error());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unique_violation("UserProfile", "email")
            .with_context("UserProfile.create")
            .with_sql("INSERT INTO user_profiles (email) VALUES ($1)");

        let output = err.display_full();
        assert!(output.contains("P2001"));
        assert!(output.contains("UserProfile.create"));
        assert!(output.contains("sql: INSERT INTO user_profiles"));
        assert!(output.contains("Suggestions"));
    }

    #[test]
    fn test_error_macro() {
        let err = query_error!(
            ErrorCode::InvalidParameter,
            "Invalid email format",
            with_field = "email",
            with_suggestion = "Use a valid email address"
        );

        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert_eq!(err.context.field.as_deref(), Some("email"));
        assert_eq!(err.context.suggestions.len(), 1);
    }
}
