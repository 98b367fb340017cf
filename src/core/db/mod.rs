/// Database Module
///
/// The adapter's database layer, organized into focused submodules.
///
/// ## Architecture
///
/// The database layer is split into three main concerns:
/// - **Connection Management** (`connection.rs`): Lazy connection, reuse and transaction state
/// - **Schema Introspection** (`schema.rs`): Column lookups in the Vertica catalog
/// - **Query Execution** (`query.rs`): Raw queries, result fetching and parameterized writes
///
/// ## Error Handling
///
/// All database operations use the standardized `AdapterError` type for consistent error propagation.
pub mod connection;
pub mod query;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use schema::*;
