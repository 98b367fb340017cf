/// Schema Introspection Module
///
/// Describes table columns from the Vertica system catalog and filters write
/// parameters down to the columns a table actually has.

use crate::adapter::Adapter;
use crate::core::driver::Driver;
use crate::core::value::{FetchMode, Params, Record};
use crate::core::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Column name to declared data type, in ordinal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: Vec<(String, String)>,
}

impl ColumnMap {
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == column)
    }

    /// Declared type of `column`
    pub fn data_type(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), ty.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Empty both for unknown tables and tables without columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut map = ColumnMap::default();
        for (name, ty) in iter {
            let name = name.into();
            let ty = ty.into();
            match map.columns.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = ty,
                None => map.columns.push((name, ty)),
            }
        }
        map
    }
}

/// Opt-in cache of column maps keyed by (schema, table)
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: HashMap<(String, String), ColumnMap>,
}

impl SchemaCache {
    pub fn get(&self, schema: &str, table: &str) -> Option<&ColumnMap> {
        self.entries.get(&(schema.to_string(), table.to_string()))
    }

    pub fn insert(&mut self, schema: &str, table: &str, columns: ColumnMap) {
        self.entries
            .insert((schema.to_string(), table.to_string()), columns);
    }

    pub fn remove(&mut self, schema: &str, table: &str) -> Option<ColumnMap> {
        self.entries.remove(&(schema.to_string(), table.to_string()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits `schema.table` into its parts. A leading dot is not a qualifier.
pub fn split_table_name(table: &str) -> (Option<&str>, &str) {
    match table.find('.') {
        Some(pos) if pos > 0 => {
            let (schema, rest) = table.split_at(pos);
            let name = rest[1..].split('.').next().unwrap_or("");
            (Some(schema), name)
        }
        _ => (None, table),
    }
}

/// Catalog query listing a table's columns in ordinal order.
///
/// Names are interpolated, not bound: they must come from trusted code.
pub fn catalog_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT column_name, data_type FROM v_catalog.columns \
         WHERE table_schema='{}' AND table_name='{}' ORDER BY ordinal_position;",
        schema, table
    )
}

/// Keeps the params whose keys are columns of `columns`, in their original order.
pub fn filter_params(params: Params, columns: &ColumnMap) -> Params {
    params
        .into_iter()
        .filter(|(name, _)| columns.contains(name))
        .collect()
}

impl<D: Driver> Adapter<D> {
    /// Resolves `(schema, table)` for a catalog lookup
    fn resolve_table(&self, table: &str, schema: Option<&str>) -> (String, String) {
        match schema.filter(|s| !s.is_empty()) {
            Some(schema) => (schema.to_string(), table.to_string()),
            None => {
                let (schema, name) = split_table_name(table);
                (
                    schema.unwrap_or(&self.options.default_schema).to_string(),
                    name.to_string(),
                )
            }
        }
    }

    /// Describes a table's columns from the catalog
    ///
    /// A qualified `schema.table` name is split when no schema is given;
    /// otherwise the configured default schema is used. Always queries the
    /// catalog. Returns an empty map when the catalog has no entry for the
    /// table, which does not prove the table is missing.
    pub fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Result<ColumnMap> {
        let (schema, table) = self.resolve_table(table, schema);
        let mut cursor = self.query(&catalog_query(&schema, &table))?;
        let rows = self.fetch_all(&mut cursor, FetchMode::Array, None)?;

        let columns: ColumnMap = rows
            .iter()
            .filter_map(Record::as_row)
            .filter_map(|row| {
                let name = row.get("column_name")?.to_string();
                let ty = row.get("data_type")?.to_string();
                Some((name, ty))
            })
            .collect();

        debug!("Described {}.{}: {} columns", schema, table, columns.len());
        if let Some(cache) = self.schema_cache.as_mut() {
            cache.insert(&schema, &table, columns.clone());
        }
        Ok(columns)
    }

    /// Column map for the write path: served from the cache when enabled
    fn write_columns(&mut self, table: &str) -> Result<ColumnMap> {
        let (schema, name) = self.resolve_table(table, None);
        if let Some(cached) = self
            .schema_cache
            .as_ref()
            .and_then(|cache| cache.get(&schema, &name))
        {
            return Ok(cached.clone());
        }
        self.describe_table(&name, Some(&schema))
    }

    /// Drops params that do not name a column of `table`
    pub fn filter_params(&mut self, table: &str, params: Params) -> Result<Params> {
        let columns = self.write_columns(table)?;
        if columns.is_empty() {
            let (schema, name) = self.resolve_table(table, None);
            warn!(
                "Catalog has no columns for {}.{}; every parameter will be dropped (check default_schema)",
                schema, name
            );
        }
        let before = params.len();
        let kept = filter_params(params, &columns);
        if kept.len() < before {
            warn!(
                "Dropped {} parameter(s) not matching columns of {}",
                before - kept.len(),
                table
            );
        }
        Ok(kept)
    }

    /// Forgets the cached column map of `table`
    pub fn invalidate_schema(&mut self, table: &str) {
        let (schema, name) = self.resolve_table(table, None);
        if let Some(cache) = self.schema_cache.as_mut() {
            cache.remove(&schema, &name);
        }
    }

    pub fn clear_schema_cache(&mut self) {
        if let Some(cache) = self.schema_cache.as_mut() {
            cache.clear();
        }
    }
}
