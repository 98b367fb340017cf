//! Table-scoped access: binds an adapter to one (optionally schema-qualified) table.

use crate::adapter::Adapter;
use crate::core::db::{ColumnMap, ExecOutcome, Where};
use crate::core::driver::{CursorOf, Driver};
use crate::core::value::Params;
use crate::core::Result;
use crate::query_builder::QueryBuilder;

/// A table bound to an adapter
#[derive(Debug)]
pub struct DbTable<'a, D: Driver> {
    adapter: &'a mut Adapter<D>,
    name: String,
}

impl<'a, D: Driver> DbTable<'a, D> {
    /// Binds `name`, prefixing `schema` unless the name is already qualified
    pub fn new(adapter: &'a mut Adapter<D>, name: &str, schema: Option<&str>) -> Self {
        let name = match schema.filter(|s| !s.is_empty()) {
            Some(schema) if !name.contains('.') => format!("{}.{}", schema, name),
            _ => name.to_string(),
        };
        DbTable { adapter, name }
    }

    /// The (qualified) table name used in statements
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, params: Params) -> Result<ExecOutcome> {
        self.adapter.insert(&self.name, params)
    }

    pub fn update(&mut self, params: Params, where_clause: &str) -> Result<ExecOutcome> {
        self.adapter.update(&self.name, params, where_clause)
    }

    /// Deletes rows; refuses to run without a WHERE clause
    pub fn delete(&mut self, where_clause: impl Into<Where>) -> Result<ExecOutcome> {
        self.adapter.delete(&self.name, where_clause)
    }

    pub fn query(&mut self, sql: &str) -> Result<CursorOf<D>> {
        self.adapter.query(sql)
    }

    pub fn describe_table(&mut self) -> Result<ColumnMap> {
        self.adapter.describe_table(&self.name, None)
    }

    /// Starts a SELECT of `fields` (all columns when empty) on this table
    pub fn select<I, S>(&mut self, fields: I) -> QueryBuilder<'_, D>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryBuilder::new(self.adapter, &self.name, fields)
    }
}
