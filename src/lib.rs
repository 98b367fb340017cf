// Core infrastructure modules
pub mod core;

pub mod config;

// Access layer
pub mod adapter;
pub mod query_builder;
pub mod table;

#[cfg(test)]
mod test_utils;

pub use adapter::Adapter;
pub use config::{AdapterOptions, ConnectionConfig, ConnectionSettings, Settings};
pub use crate::core::db::{ColumnMap, ExecOutcome, SkipReason, TransactionState, Where};
pub use crate::core::driver::{Driver, DriverError, SqliteDriver};
pub use crate::core::value::{params, FetchMode, Params, Record, Row, Value};
pub use crate::core::{AdapterError, Result};
pub use query_builder::QueryBuilder;
pub use table::DbTable;
