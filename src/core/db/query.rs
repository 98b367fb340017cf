/// Query Execution Module
///
/// Raw query execution, result materialization and the table-scoped write
/// operations (insert/update/delete) built as parameterized statements.
/// Write parameters are filtered against the table's catalog columns first.

use crate::adapter::Adapter;
use crate::core::driver::{Cursor, CursorOf, Driver, DriverConnection, DriverError};
use crate::core::value::{FetchMode, Params, Record, Row, Value};
use crate::core::{AdapterError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Why a write was not sent to the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// DELETE without a WHERE clause
    EmptyWhere,
    /// No parameter matched a column of the table
    NoColumns,
}

/// Result of a write operation
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// Executed; number of affected rows
    Affected(u64),
    /// Prepared but refused at execution by the interface
    Rejected(DriverError),
    /// Guarded no-op; nothing was sent
    Skipped(SkipReason),
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecOutcome::Affected(_))
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            ExecOutcome::Affected(n) => Some(*n),
            _ => None,
        }
    }
}

/// WHERE clause of a DELETE: raw SQL or column equalities
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Used verbatim
    Raw(String),
    /// `col = ?` terms joined with AND, after schema filtering
    Columns(Params),
}

impl Where {
    pub fn is_empty(&self) -> bool {
        match self {
            Where::Raw(sql) => sql.trim().is_empty(),
            Where::Columns(params) => params.is_empty(),
        }
    }
}

impl From<&str> for Where {
    fn from(sql: &str) -> Self {
        Where::Raw(sql.to_string())
    }
}

impl From<String> for Where {
    fn from(sql: String) -> Self {
        Where::Raw(sql)
    }
}

impl From<Params> for Where {
    fn from(params: Params) -> Self {
        Where::Columns(params)
    }
}

/// Quotes a value for inline use in SQL text.
///
/// Numbers pass through unquoted, NULL becomes the keyword, text is wrapped in
/// single quotes with NUL, `\n`, `\r`, backslash, `'`, `"` and 0x1A escaped.
pub fn quote(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                match c {
                    '\0' => out.push_str("\\000"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\x1a' => out.push_str("\\032"),
                    '\\' | '\'' | '"' => {
                        out.push('\\');
                        out.push(c);
                    }
                    _ => out.push(c),
                }
            }
            out.push('\'');
            out
        }
    }
}

/// Appends the Vertica pagination clause: OFFSET first, then LIMIT.
/// A zero count or offset is left out.
pub fn limit(sql: &str, count: u64, offset: u64) -> String {
    let mut sql = sql.to_string();
    if offset > 0 {
        sql.push_str(&format!(" OFFSET {}", offset));
    }
    if count > 0 {
        sql.push_str(&format!(" LIMIT {}", count));
    }
    sql
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `INSERT INTO t (a, b) VALUES (?, ?)` with its bind values
pub fn build_insert(table: &str, params: &Params) -> (String, Vec<Value>) {
    let columns: Vec<&str> = params.iter().map(|(name, _)| name.as_str()).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders(params.len())
    );
    (sql, params.iter().map(|(_, v)| v.clone()).collect())
}

/// `UPDATE t SET a = ..., b = ... WHERE <clause|1>` with inline quoted values,
/// or placeholders and bind values when `bind` is set
pub fn build_update(table: &str, params: &Params, where_clause: &str, bind: bool) -> (String, Vec<Value>) {
    let assignments: Vec<String> = params
        .iter()
        .map(|(name, value)| {
            if bind {
                format!("{} = ?", name)
            } else {
                format!("{} = {}", name, quote(value))
            }
        })
        .collect();
    let where_clause = if where_clause.trim().is_empty() {
        "1"
    } else {
        where_clause
    };
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments.join(", "),
        where_clause
    );
    let values = if bind {
        params.iter().map(|(_, v)| v.clone()).collect()
    } else {
        Vec::new()
    };
    (sql, values)
}

/// `DELETE FROM t WHERE ...`; the clause must not be empty
pub fn build_delete(table: &str, where_clause: &Where) -> (String, Vec<Value>) {
    match where_clause {
        Where::Raw(sql) => (format!("DELETE FROM {} WHERE {}", table, sql), Vec::new()),
        Where::Columns(params) => {
            let terms: Vec<String> = params
                .iter()
                .map(|(name, _)| format!("{} = ?", name))
                .collect();
            (
                format!("DELETE FROM {} WHERE {}", table, terms.join(" AND ")),
                params.iter().map(|(_, v)| v.clone()).collect(),
            )
        }
    }
}

/// Drains a cursor into records.
///
/// With `row_number`, only that row (0-based) is fetched.
pub fn fetch_all<C: Cursor>(cursor: &mut C, mode: FetchMode, row_number: Option<usize>) -> Result<Vec<Record>> {
    let columns = cursor.columns().to_vec();
    let mut records = Vec::new();

    if let Some(index) = row_number {
        if let Some(values) = cursor.fetch_row(Some(index)).map_err(AdapterError::query)? {
            records.push(Record::from_row(Row::new(&columns, values), mode));
        }
        return Ok(records);
    }

    while let Some(values) = cursor.fetch_row(None).map_err(AdapterError::query)? {
        records.push(Record::from_row(Row::new(&columns, values), mode));
    }
    Ok(records)
}

impl<D: Driver> Adapter<D> {
    /// Executes `sql` directly, without binding
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` with the interface's message and code.
    pub fn query(&mut self, sql: &str) -> Result<CursorOf<D>> {
        debug!("Executing query: {}", sql);
        let result = self.connections.connection()?.exec(sql);
        result.map_err(|e| {
            self.connections.invalidate_if_fatal(&e);
            AdapterError::query(e)
        })
    }

    /// Materializes every row of `cursor` (or only `row_number`)
    pub fn fetch_all<C: Cursor>(&self, cursor: &mut C, mode: FetchMode, row_number: Option<usize>) -> Result<Vec<Record>> {
        fetch_all(cursor, mode, row_number)
    }

    /// The first row of `cursor`, if any
    pub fn fetch_one<C: Cursor>(&self, cursor: &mut C, mode: FetchMode) -> Result<Option<Record>> {
        Ok(fetch_all(cursor, mode, Some(0))?.into_iter().next())
    }

    /// Fetches every row as an object record deserialized into `T`
    pub fn fetch_all_as<T: DeserializeOwned, C: Cursor>(&self, cursor: &mut C) -> Result<Vec<T>> {
        fetch_all(cursor, FetchMode::Object, None)?
            .into_iter()
            .map(|record| record.deserialize().map_err(AdapterError::from))
            .collect()
    }

    /// Prepares `sql`, binds `params` in order and executes it
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` when preparation fails. A failed execution is
    /// reported as [`ExecOutcome::Rejected`].
    pub fn prepare_and_execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
        debug!("Preparing statement: {} ({} params)", sql, params.len());
        let conn = self.connections.connection()?;
        let executed = match conn.prepare(sql) {
            Ok(statement) => conn.execute(&statement, params),
            Err(e) => {
                self.connections.invalidate_if_fatal(&e);
                return Err(AdapterError::query(e));
            }
        };

        match executed {
            Ok(affected) => Ok(ExecOutcome::Affected(affected)),
            Err(e) => {
                warn!("Execution rejected: {}: {}", sql, e);
                self.connections.invalidate_if_fatal(&e);
                Ok(ExecOutcome::Rejected(e))
            }
        }
    }

    /// Inserts one row. Params naming unknown columns are dropped.
    pub fn insert(&mut self, table: &str, params: Params) -> Result<ExecOutcome> {
        let params = self.filter_params(table, params)?;
        let (sql, values) = build_insert(table, &params);
        self.prepare_and_execute(&sql, &values)
    }

    /// Updates rows matching `where_clause` (all rows when it is empty)
    ///
    /// SET values are inlined as quoted literals unless the adapter is
    /// configured to bind them.
    pub fn update(&mut self, table: &str, params: Params, where_clause: &str) -> Result<ExecOutcome> {
        let params = self.filter_params(table, params)?;
        if params.is_empty() {
            warn!("Skipping UPDATE on {}: no matching columns", table);
            return Ok(ExecOutcome::Skipped(SkipReason::NoColumns));
        }
        let (sql, values) = build_update(table, &params, where_clause, self.options.bind_update_values);
        self.prepare_and_execute(&sql, &values)
    }

    /// Deletes rows matching `where_clause`
    ///
    /// Refuses to run without a clause: an empty string, an empty column map
    /// or a column map with no matching columns is skipped. Use
    /// [`query`](Adapter::query) for an unscoped delete.
    pub fn delete(&mut self, table: &str, where_clause: impl Into<Where>) -> Result<ExecOutcome> {
        let where_clause = match where_clause.into() {
            w if w.is_empty() => {
                warn!("Refusing DELETE on {} without a WHERE clause", table);
                return Ok(ExecOutcome::Skipped(SkipReason::EmptyWhere));
            }
            Where::Columns(params) => {
                let params = self.filter_params(table, params)?;
                if params.is_empty() {
                    warn!("Refusing DELETE on {}: no matching WHERE columns", table);
                    return Ok(ExecOutcome::Skipped(SkipReason::NoColumns));
                }
                Where::Columns(params)
            }
            raw => raw,
        };
        let (sql, values) = build_delete(table, &where_clause);
        self.prepare_and_execute(&sql, &values)
    }

    /// Appends the dialect's pagination clause to `sql`
    pub fn limit(&self, sql: &str, count: u64, offset: u64) -> String {
        limit(sql, count, offset)
    }

    /// Quotes a value for inline SQL
    pub fn quote(&self, value: &Value) -> String {
        quote(value)
    }

    /// Checks that the connection answers `SELECT 1`
    pub fn ping(&mut self) -> bool {
        let mut cursor = match self.query("SELECT 1") {
            Ok(cursor) => cursor,
            Err(e) => {
                debug!("Ping failed: {}", e);
                return false;
            }
        };
        match self.fetch_one(&mut cursor, FetchMode::Array) {
            Ok(Some(Record::Array(row))) => row.first().and_then(Value::as_i64) == Some(1),
            _ => false,
        }
    }
}
