/// Call-Level Interface Module
///
/// The adapter talks to the database only through these traits, which mirror
/// the connect/prepare/execute/fetch surface of an ODBC-style interface.
/// A failing call returns a [`DriverError`] carrying the interface's last
/// error message and code.
///
/// ## Backends
///
/// - **SQLite** (`sqlite.rs`): a `rusqlite` backend that emulates the Vertica
///   column catalog, used for local development and tests
pub mod sqlite;

pub use sqlite::SqliteDriver;

use crate::core::value::Value;
use thiserror::Error;

/// Error reported by the call-level interface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct DriverError {
    /// Last error message of the interface
    pub message: String,
    /// Last error code (SQLSTATE or native code)
    pub code: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        DriverError {
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Entry point of a call-level interface: opens connection handles.
pub trait Driver {
    type Connection: DriverConnection;

    /// Opens a connection for the given descriptor string and credentials
    fn connect(&self, dsn: &str, user: &str, password: &str) -> DriverResult<Self::Connection>;
}

/// An open connection handle.
///
/// Connections start in autocommit mode.
pub trait DriverConnection {
    type Cursor: Cursor;
    type Statement;

    /// Executes `sql` directly and returns a cursor over its result set
    fn exec(&mut self, sql: &str) -> DriverResult<Self::Cursor>;

    /// Prepares `sql` for bound execution
    fn prepare(&mut self, sql: &str) -> DriverResult<Self::Statement>;

    /// Executes a prepared statement with positional parameters, returning the affected row count
    fn execute(&mut self, statement: &Self::Statement, params: &[Value]) -> DriverResult<u64>;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()>;

    fn commit(&mut self) -> DriverResult<()>;

    fn rollback(&mut self) -> DriverResult<()>;

    /// Whether `err` means the handle is no longer usable.
    /// Defaults to the SQLSTATE connection-exception class `08`.
    fn is_fatal(&self, err: &DriverError) -> bool {
        err.code.starts_with("08")
    }
}

/// A result set positioned before its first row
pub trait Cursor {
    /// Column names in select-list order
    fn columns(&self) -> &[String];

    /// Fetches the next row, or the row at `row_index` (0-based) when given.
    /// Returns `None` past the end of the result set.
    fn fetch_row(&mut self, row_index: Option<usize>) -> DriverResult<Option<Vec<Value>>>;
}

/// Cursor type produced by a driver's connections
pub type CursorOf<D> = <<D as Driver>::Connection as DriverConnection>::Cursor;
