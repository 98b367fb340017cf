//! Fluent SELECT builder.
//!
//! Each call takes the builder by value and hands it back, so a query is
//! assembled by one owner and consumed by `fetch_all`. Conditions are
//! caller-supplied SQL and are not escaped.

use crate::adapter::Adapter;
use crate::core::driver::Driver;
use crate::core::value::{FetchMode, Record};
use crate::core::Result;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

/// Join types accepted by [`QueryBuilder::add_join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
    Outer,
}

impl JoinKind {
    /// Parses a join type. Matching is exact: anything other than the
    /// upper-case LEFT/RIGHT/INNER/OUTER is `None`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "LEFT" => Some(JoinKind::Left),
            "RIGHT" => Some(JoinKind::Right),
            "INNER" => Some(JoinKind::Inner),
            "OUTER" => Some(JoinKind::Outer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Inner => "INNER",
            JoinKind::Outer => "OUTER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `DESC` in any case is descending, everything else ascending
    pub fn parse(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("DESC") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: Option<JoinKind>,
    table: String,
    condition: String,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.map(|k| k.as_str()).unwrap_or("");
        write!(f, "{} JOIN {} ON ({})", kind, self.table, self.condition)
    }
}

/// Builds one SELECT statement against an adapter
#[derive(Debug)]
pub struct QueryBuilder<'a, D: Driver> {
    adapter: &'a mut Adapter<D>,
    table: String,
    fields: Vec<String>,
    joins: Vec<Join>,
    where_clause: String,
    group_by: String,
    order_by: Vec<(String, SortOrder)>,
    limit: String,
}

impl<'a, D: Driver> QueryBuilder<'a, D> {
    pub fn new<I, S>(adapter: &'a mut Adapter<D>, table: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryBuilder {
            adapter,
            table: table.to_string(),
            fields: fields.into_iter().map(Into::into).collect(),
            joins: Vec::new(),
            where_clause: String::new(),
            group_by: String::new(),
            order_by: Vec::new(),
            limit: String::new(),
        }
    }

    /// Appends `condition` to the WHERE clause verbatim
    pub fn filter(mut self, condition: &str) -> Self {
        self.where_clause.push_str(condition);
        self
    }

    /// Appends `AND condition`
    pub fn and_filter(self, condition: &str) -> Self {
        self.connective(" AND ", condition)
    }

    /// Appends `OR condition`
    pub fn or_filter(self, condition: &str) -> Self {
        self.connective(" OR ", condition)
    }

    fn connective(mut self, op: &str, condition: &str) -> Self {
        // a leading connective would leave the clause unparsable
        if !self.where_clause.trim().is_empty() {
            self.where_clause.push_str(op);
        }
        self.filter(condition)
    }

    pub fn left_join(self, table: &str, condition: &str) -> Self {
        self.add_join(table, condition, "LEFT")
    }

    pub fn right_join(self, table: &str, condition: &str) -> Self {
        self.add_join(table, condition, "RIGHT")
    }

    /// Adds a join. An unrecognized `kind` renders as a bare `JOIN`.
    pub fn add_join(mut self, table: &str, condition: &str, kind: &str) -> Self {
        self.joins.push(Join {
            kind: JoinKind::parse(kind),
            table: table.to_string(),
            condition: condition.to_string(),
        });
        self
    }

    /// Sets the GROUP BY clause
    pub fn group_by(mut self, condition: &str) -> Self {
        self.group_by = condition.to_string();
        self
    }

    /// Adds an ORDER BY term; repeated calls append
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.order_by
            .push((column.to_string(), SortOrder::parse(direction)));
        self
    }

    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, "ASC")
    }

    /// Sets the pagination clause (rendered OFFSET before LIMIT)
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = self.adapter.limit("", count, offset).trim().to_string();
        self
    }

    /// Renders the SELECT statement
    pub fn sql(&self) -> String {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields.join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", fields, self.table);

        if !self.joins.is_empty() {
            let joins: Vec<String> = self.joins.iter().map(Join::to_string).collect();
            sql.push(' ');
            sql.push_str(&joins.join(" "));
        }
        if self.where_clause.trim().is_empty() {
            sql.push_str(" WHERE 1");
        } else {
            sql.push_str(" WHERE  ");
            sql.push_str(&self.where_clause);
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by);
        }
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, order)| format!("{} {}", column, order))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if !self.limit.is_empty() {
            sql.push(' ');
            sql.push_str(&self.limit);
        }
        sql
    }

    /// Executes the statement and returns every row
    ///
    /// # Errors
    ///
    /// Failures are wrapped in `AdapterError::Statement` with the SQL text.
    pub fn fetch_all(self, mode: FetchMode) -> Result<Vec<Record>> {
        let sql = self.sql();
        debug!("Query builder produced: {}", sql);
        let mut cursor = self.adapter.query(&sql).map_err(|e| e.with_sql(&sql))?;
        self.adapter
            .fetch_all(&mut cursor, mode, None)
            .map_err(|e| e.with_sql(&sql))
    }

    /// Executes the statement and deserializes every row into `T`
    pub fn fetch_all_as<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let sql = self.sql();
        debug!("Query builder produced: {}", sql);
        let mut cursor = self.adapter.query(&sql).map_err(|e| e.with_sql(&sql))?;
        self.adapter
            .fetch_all_as(&mut cursor)
            .map_err(|e| e.with_sql(&sql))
    }
}
