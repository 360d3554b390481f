//! Error types for pgdal

use thiserror::Error;

/// Result type returned by every public pgdal operation.
pub type OperationResult<T> = Result<T, DalError>;

/// Stage of statement handling at which the driver reported an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `prepare()`
    Prepare,
    /// Bind + execute / fetch
    Execute,
    /// BEGIN / COMMIT / ROLLBACK
    Transaction,
    /// Opening the connection
    Connect,
}

/// Error types for data-access operations
#[derive(Debug, Error)]
pub enum DalError {
    /// No column values were supplied to a write operation
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Credentials incomplete, connect failed, or the connection was closed
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Statement preparation failed
    #[error("Prepare failed: {message}")]
    Prepare {
        sqlstate: Option<String>,
        message: String,
    },

    /// Statement execution failed (constraint violation, type mismatch, syntax error)
    #[error("Execution failed: {message}")]
    Execution {
        sqlstate: Option<String>,
        message: String,
    },

    /// BEGIN / COMMIT / ROLLBACK failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A placeholder has no value, or a value cannot be sent as the parameter type
    #[error("Bind error: {0}")]
    Bind(String),

    /// Invalid identifier, direction, or other caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Result column could not be normalized into a [`Value`](crate::Value)
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl DalError {
    /// Create an empty-input error
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a bind error
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an execution error without a SQLSTATE.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            sqlstate: None,
            message: message.into(),
        }
    }

    /// The human-readable failure message.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Prepare { sqlstate, .. } | Self::Execution { sqlstate, .. } => {
                sqlstate.as_deref()
            }
            _ => None,
        }
    }

    /// Check if this is an execution failure
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate() == Some("23503")
    }

    /// Check if the connection was missing or lost
    pub fn is_connection_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionUnavailable(_))
    }

    /// Append a failed rollback to this error, keeping its kind.
    pub fn with_rollback_failure(self, rollback: &DalError) -> Self {
        let note = format!(" (rollback failed: {rollback})");
        match self {
            Self::Prepare { sqlstate, message } => Self::Prepare {
                sqlstate,
                message: message + &note,
            },
            Self::Execution { sqlstate, message } => Self::Execution {
                sqlstate,
                message: message + &note,
            },
            Self::EmptyInput(m) => Self::EmptyInput(m + &note),
            Self::ConnectionUnavailable(m) => Self::ConnectionUnavailable(m + &note),
            Self::Transaction(m) => Self::Transaction(m + &note),
            Self::Bind(m) => Self::Bind(m + &note),
            Self::Validation(m) => Self::Validation(m + &note),
            Self::Decode { column, message } => Self::Decode {
                column,
                message: message + &note,
            },
        }
    }

    /// Convert a tokio_postgres error raised at `stage` into a `DalError`.
    ///
    /// Server errors keep their message, detail and SQLSTATE; a closed connection
    /// always maps to [`DalError::ConnectionUnavailable`].
    pub fn from_db_error(stage: Stage, err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::ConnectionUnavailable(err.to_string());
        }

        let (sqlstate, message) = match err.as_db_error() {
            Some(db_err) => {
                let message = match db_err.detail() {
                    Some(detail) => format!("{}: {}", db_err.message(), detail),
                    None => db_err.message().to_string(),
                };
                (Some(db_err.code().code().to_string()), message)
            }
            None => (None, err.to_string()),
        };

        match stage {
            Stage::Prepare => Self::Prepare { sqlstate, message },
            Stage::Execute => Self::Execution { sqlstate, message },
            Stage::Transaction => Self::Transaction(message),
            Stage::Connect => Self::ConnectionUnavailable(message),
        }
    }
}
