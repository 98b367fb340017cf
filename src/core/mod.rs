/// Core Module
///
/// Shared infrastructure of the adapter: the call-level interface traits,
/// the database layer built on them, values and rows, and error handling.

pub mod db;
pub mod driver;
pub mod error;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{AdapterError, Result, TransactionStep};
