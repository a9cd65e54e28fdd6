//! Error types for daog.
//!
//! All fallible operations return [`DaoError`]. Construction-time failures
//! (acquire, begin) are surfaced to callers; finalize-time failures are only
//! logged by the transaction context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaoError {
    #[error("get connection timeout{}", timeout_suffix(.timeout_secs))]
    ConnectionAcquireTimeout {
        /// The bound that elapsed; `None` when the pool reported the timeout
        /// without it.
        timeout_secs: Option<u64>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Begin transaction failed: {message}")]
    TransactionBegin { message: String },

    #[error("invalid tc status: {status}")]
    InvalidState { status: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "23000" for an integrity constraint violation
        sql_state: Option<String>,
    },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Edit hook rejected {operation} on '{table}': {message}")]
    Hook {
        operation: &'static str,
        table: String,
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DaoError {
    /// Create an acquire timeout error.
    pub fn acquire_timeout(timeout_secs: u64) -> Self {
        Self::ConnectionAcquireTimeout {
            timeout_secs: Some(timeout_secs),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a transaction begin error.
    pub fn transaction_begin(message: impl Into<String>) -> Self {
        Self::TransactionBegin {
            message: message.into(),
        }
    }

    pub fn invalid_state(status: impl Into<String>) -> Self {
        Self::InvalidState {
            status: status.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create a hook error for the given write operation.
    pub fn hook(
        operation: &'static str,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Hook {
            operation,
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::ConnectionAcquireTimeout { .. } => {
                Some("Increase the pool size or the acquire timeout")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionAcquireTimeout { .. }
        )
    }

    /// Whether this is the dedicated acquire timeout (not a raw deadline error).
    pub fn is_acquire_timeout(&self) -> bool {
        matches!(self, Self::ConnectionAcquireTimeout { .. })
    }
}

/// Convert sqlx errors to DaoError.
impl From<sqlx::Error> for DaoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DaoError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DaoError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DaoError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => DaoError::ConnectionAcquireTimeout { timeout_secs: None },
            sqlx::Error::PoolClosed => {
                DaoError::connection("Connection pool is closed", "The datasource was shut down")
            }
            sqlx::Error::Io(io_err) => DaoError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DaoError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DaoError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DaoError::database(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DaoError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DaoError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DaoError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DaoError::internal("Database worker crashed"),
            _ => DaoError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

fn timeout_suffix(timeout_secs: &Option<u64>) -> String {
    timeout_secs
        .map(|secs| format!(" after {}s", secs))
        .unwrap_or_default()
}

/// Result type alias for daog operations.
pub type DaoResult<T> = Result<T, DaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaoError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_acquire_timeout_is_distinct() {
        let err = DaoError::acquire_timeout(10);
        assert!(err.is_acquire_timeout());
        assert_eq!(err.to_string(), "get connection timeout after 10s");
        assert!(!DaoError::connection("x", "y").is_acquire_timeout());
    }

    #[test]
    fn test_pool_timed_out_maps_to_acquire_timeout() {
        let err: DaoError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_acquire_timeout());
        assert_eq!(err.to_string(), "get connection timeout");
    }

    #[test]
    fn test_pool_closed_maps_to_connection() {
        let err: DaoError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DaoError::Connection { .. }));
    }

    #[test]
    fn test_error_retryable() {
        assert!(DaoError::acquire_timeout(10).is_retryable());
        assert!(DaoError::connection("err", "sugg").is_retryable());
        assert!(!DaoError::invalid_state("Invalid").is_retryable());
        assert!(!DaoError::transaction_begin("denied").is_retryable());
    }

    #[test]
    fn test_error_suggestion() {
        let err = DaoError::connection("refused", "Check the server");
        assert_eq!(err.suggestion(), Some("Check the server"));
        assert_eq!(DaoError::internal("boom").suggestion(), None);
    }

    #[test]
    fn test_hook_error_display() {
        let err = DaoError::hook("insert", "user", "name required");
        assert_eq!(
            err.to_string(),
            "Edit hook rejected insert on 'user': name required"
        );
    }
}
