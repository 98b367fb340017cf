//! The adapter façade.
//!
//! An [`Adapter`] binds one connection manager, the adapter options and the
//! optional schema cache together. Statement execution lives in
//! `core::db::query` and catalog lookups in `core::db::schema`; both are
//! `impl` blocks on this type.

use crate::config::{AdapterOptions, ConnectionConfig, ConnectionSettings};
use crate::core::db::{ConnectionManager, SchemaCache, TransactionState};
use crate::core::driver::Driver;
use crate::core::Result;
use crate::query_builder::QueryBuilder;
use crate::table::DbTable;

/// Access adapter over a call-level interface driver
#[derive(Debug)]
pub struct Adapter<D: Driver> {
    pub(crate) connections: ConnectionManager<D>,
    pub(crate) options: AdapterOptions,
    pub(crate) schema_cache: Option<SchemaCache>,
}

impl<D: Driver> Adapter<D> {
    /// Creates an adapter with default options. No connection is opened yet.
    pub fn new(driver: D, config: ConnectionConfig) -> Self {
        Self::with_options(driver, config, AdapterOptions::default())
    }

    pub fn with_options(driver: D, config: ConnectionConfig, options: AdapterOptions) -> Self {
        let schema_cache = options.cache_schema.then(SchemaCache::default);
        Adapter {
            connections: ConnectionManager::new(driver, config),
            options,
            schema_cache,
        }
    }

    /// Validates raw connection settings and creates an adapter
    pub fn from_settings(
        driver: D,
        settings: ConnectionSettings,
        options: AdapterOptions,
    ) -> Result<Self> {
        let config = ConnectionConfig::try_from(settings)?;
        Ok(Self::with_options(driver, config, options))
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.connections.config()
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// The cached connection descriptor string
    pub fn dsn(&self) -> &str {
        self.connections.config().dsn()
    }

    pub fn connect(&mut self) -> Result<()> {
        self.connections.connect()
    }

    /// The live handle, connecting first if needed
    pub fn get_connection(&mut self) -> Result<&mut D::Connection> {
        self.connections.connection()
    }

    pub fn disconnect(&mut self) {
        self.connections.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.connections.transaction_state()
    }

    pub fn begin_transaction(&mut self) -> Result<()> {
        self.connections.begin_transaction()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.connections.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.connections.rollback()
    }

    /// Binds a table (optionally in `schema`) to this adapter
    pub fn table(&mut self, name: &str, schema: Option<&str>) -> DbTable<'_, D> {
        DbTable::new(self, name, schema)
    }

    /// Starts a SELECT on `table`
    pub fn select<I, S>(&mut self, table: &str, fields: I) -> QueryBuilder<'_, D>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryBuilder::new(self, table, fields)
    }
}
