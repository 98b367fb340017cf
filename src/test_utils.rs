/// # Test Utilities Module
///
/// A scripted in-memory driver for unit tests. It records every connect,
/// statement and transaction call, answers catalog queries from a table
/// registry, and can be told to fail a given interface call.

use crate::config::ConnectionConfig;
use crate::core::driver::{Cursor, Driver, DriverConnection, DriverError, DriverResult};
use crate::core::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Interface calls the mock can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Connect,
    Exec,
    Prepare,
    Execute,
    Autocommit(bool),
    Commit,
    Rollback,
    /// The next interface call on an open connection fails with SQLSTATE 08S01;
    /// reconnecting afterwards succeeds
    ConnectionLost,
}

#[derive(Debug, Default)]
struct MockState {
    connects: usize,
    last_dsn: Option<String>,
    calls: Vec<String>,
    statements: Vec<String>,
    bound: Vec<Vec<Value>>,
    failures: Vec<MockFailure>,
    catalog: HashMap<(String, String), Vec<(String, String)>>,
    results: VecDeque<(Vec<String>, Vec<Vec<Value>>)>,
    affected: u64,
}

impl MockState {
    fn check(&mut self, failure: MockFailure, message: &str, code: &str) -> DriverResult<()> {
        if let Some(pos) = self
            .failures
            .iter()
            .position(|f| *f == MockFailure::ConnectionLost)
        {
            if failure != MockFailure::Connect {
                self.failures.remove(pos);
                return Err(DriverError::new("communication link failure", "08S01"));
            }
        }
        if self.failures.contains(&failure) {
            return Err(DriverError::new(message, code));
        }
        Ok(())
    }
}

/// Scripted driver; clones share the same recorded state
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        let driver = MockDriver::default();
        driver.state.borrow_mut().affected = 1;
        driver
    }

    /// Registers a table in the catalog
    pub fn with_table(self, schema: &str, table: &str, columns: &[(&str, &str)]) -> Self {
        self.state.borrow_mut().catalog.insert(
            (schema.to_string(), table.to_string()),
            columns
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.to_string()))
                .collect(),
        );
        self
    }

    /// Queues the result set returned by the next non-catalog `exec`
    pub fn push_result(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.state
            .borrow_mut()
            .results
            .push_back((columns.iter().map(|c| c.to_string()).collect(), rows));
    }

    pub fn fail_on(&self, failure: MockFailure) {
        self.state.borrow_mut().failures.push(failure);
    }

    pub fn set_affected(&self, rows: u64) {
        self.state.borrow_mut().affected = rows;
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn last_dsn(&self) -> Option<String> {
        self.state.borrow().last_dsn.clone()
    }

    /// Transaction calls in order, e.g. `autocommit(false)`, `commit`
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// SQL text passed to `exec` and `prepare`, in order
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().statements.clone()
    }

    /// Statements excluding catalog lookups
    pub fn data_statements(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| !sql.contains("v_catalog."))
            .collect()
    }

    pub fn catalog_queries(&self) -> usize {
        self.statements()
            .iter()
            .filter(|sql| sql.contains("v_catalog."))
            .count()
    }

    /// Parameter lists passed to bound executions
    pub fn bound_params(&self) -> Vec<Vec<Value>> {
        self.state.borrow().bound.clone()
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    fn connect(&self, dsn: &str, _user: &str, _password: &str) -> DriverResult<MockConnection> {
        let mut state = self.state.borrow_mut();
        state.check(MockFailure::Connect, "connect failed", "08001")?;
        state.connects += 1;
        state.last_dsn = Some(dsn.to_string());
        Ok(MockConnection {
            state: Rc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct MockConnection {
    state: Rc<RefCell<MockState>>,
}

#[derive(Debug)]
pub struct MockStatement {
    #[allow(dead_code)]
    sql: String,
}

fn quoted_after<'a>(sql: &'a str, marker: &str) -> &'a str {
    sql.split_once(marker)
        .and_then(|(_, rest)| rest.split_once('\''))
        .map(|(value, _)| value)
        .unwrap_or("")
}

impl DriverConnection for MockConnection {
    type Cursor = MockCursor;
    type Statement = MockStatement;

    fn exec(&mut self, sql: &str) -> DriverResult<MockCursor> {
        let mut state = self.state.borrow_mut();
        state.statements.push(sql.to_string());
        state.check(MockFailure::Exec, "exec failed", "42000")?;

        if sql.contains("v_catalog.columns") {
            let key = (
                quoted_after(sql, "table_schema='").to_string(),
                quoted_after(sql, "table_name='").to_string(),
            );
            let rows = state
                .catalog
                .get(&key)
                .map(|cols| {
                    cols.iter()
                        .map(|(name, ty)| vec![Value::from(name.as_str()), Value::from(ty.as_str())])
                        .collect()
                })
                .unwrap_or_default();
            return Ok(MockCursor::new(
                vec!["column_name".to_string(), "data_type".to_string()],
                rows,
            ));
        }

        let (columns, rows) = state.results.pop_front().unwrap_or_default();
        Ok(MockCursor::new(columns, rows))
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<MockStatement> {
        let mut state = self.state.borrow_mut();
        state.statements.push(sql.to_string());
        state.check(MockFailure::Prepare, "prepare failed", "42601")?;
        Ok(MockStatement {
            sql: sql.to_string(),
        })
    }

    fn execute(&mut self, _statement: &MockStatement, params: &[Value]) -> DriverResult<u64> {
        let mut state = self.state.borrow_mut();
        state.bound.push(params.to_vec());
        state.check(MockFailure::Execute, "execute failed", "22000")?;
        Ok(state.affected)
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("autocommit({})", enabled));
        state.check(MockFailure::Autocommit(enabled), "autocommit toggle failed", "HY011")
    }

    fn commit(&mut self) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("commit".to_string());
        state.check(MockFailure::Commit, "commit failed", "40001")
    }

    fn rollback(&mut self) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("rollback".to_string());
        state.check(MockFailure::Rollback, "rollback failed", "40001")
    }
}

#[derive(Debug)]
pub struct MockCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: usize,
}

impl MockCursor {
    fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        MockCursor {
            columns,
            rows,
            position: 0,
        }
    }
}

impl Cursor for MockCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_row(&mut self, row_index: Option<usize>) -> DriverResult<Option<Vec<Value>>> {
        let index = row_index.unwrap_or(self.position);
        let row = self.rows.get(index).cloned();
        if row.is_some() {
            self.position = index + 1;
        }
        Ok(row)
    }
}

/// Config used by unit tests
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new("localhost", "testDb", "dbuser", "test")
        .expect("test config is complete")
}
