/// Adapter Error Module
///
/// This module defines the error types for the adapter. Every failure reported
/// by the call-level interface is surfaced here with its original message and
/// code preserved.
use crate::core::driver::DriverError;
use std::fmt;
use thiserror::Error;

/// The step of a transaction operation that failed.
///
/// Commit is a two-step operation (commit, then re-enable autocommit) and the
/// two failure modes leave the connection in different states, so they are
/// reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStep {
    /// Disabling autocommit to open a transaction
    Begin,
    /// Committing pending work
    Commit,
    /// Re-enabling autocommit after a successful commit
    EnableAutocommit,
    /// Rolling back pending work
    Rollback,
}

impl fmt::Display for TransactionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            TransactionStep::Begin => "begin",
            TransactionStep::Commit => "commit",
            TransactionStep::EnableAutocommit => "enable autocommit",
            TransactionStep::Rollback => "rollback",
        };
        f.write_str(step)
    }
}

/// Error type for the adapter.
///
/// - configuration validation (missing connection properties)
/// - connection establishment
/// - statement preparation and execution
/// - transaction control
/// - config file loading
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Required connection properties are missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// The connection handle could not be established
    #[error("Connection error: can't connect with DSN '{dsn}': {source}")]
    Connection {
        dsn: String,
        #[source]
        source: DriverError,
    },

    /// Statement execution or preparation failed
    #[error("Query error [{code}]: {message}")]
    Query { message: String, code: String },

    /// A built statement failed; carries the SQL text that was sent
    #[error("Statement failed: {sql}: {source}")]
    Statement {
        sql: String,
        #[source]
        source: Box<AdapterError>,
    },

    /// Autocommit toggle, commit or rollback failed
    #[error("Transaction error at {step} [{code}]: {message}")]
    Transaction {
        step: TransactionStep,
        message: String,
        code: String,
    },

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Row (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    /// Wraps a driver failure as a query error.
    pub fn query(err: DriverError) -> Self {
        AdapterError::Query {
            message: err.message,
            code: err.code,
        }
    }

    /// Wraps a driver failure as a transaction error at `step`.
    pub fn transaction(step: TransactionStep, err: DriverError) -> Self {
        AdapterError::Transaction {
            step,
            message: err.message,
            code: err.code,
        }
    }

    /// Attaches the SQL text of the statement that failed.
    pub fn with_sql(self, sql: impl Into<String>) -> Self {
        AdapterError::Statement {
            sql: sql.into(),
            source: Box::new(self),
        }
    }

    /// The failing transaction step, if this is a transaction error.
    pub fn transaction_step(&self) -> Option<TransactionStep> {
        match self {
            AdapterError::Transaction { step, .. } => Some(*step),
            AdapterError::Statement { source, .. } => source.transaction_step(),
            _ => None,
        }
    }
}

/// Type alias for Result to use AdapterError as the error type.
pub type Result<T> = std::result::Result<T, AdapterError>;
