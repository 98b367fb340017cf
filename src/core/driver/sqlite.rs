/// SQLite Backend
///
/// Implements the call-level interface on top of `rusqlite`. The database file
/// is taken from the `Database=` field of the DSN; credentials are ignored.
///
/// Vertica's `v_catalog.columns` system view is emulated with an attached
/// in-memory database that is refreshed from `pragma_table_info` whenever a
/// statement reads from `v_catalog.`. Each attached SQLite database
/// (`main`, ...) shows up as a schema.
///
/// Statement text is translated from the Vertica dialect the adapter emits
/// before SQLite sees it: backslash escapes inside string literals become
/// plain characters (`\'` becomes `''`), and a trailing `OFFSET n LIMIT m`
/// is reordered to `LIMIT m OFFSET n`.

use super::{Cursor, Driver, DriverConnection, DriverError, DriverResult};
use crate::core::value::Value;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;
use tracing::debug;

const CATALOG_SCHEMA: &str = "v_catalog";

const CATALOG_SQL: &str = "
    ATTACH DATABASE ':memory:' AS v_catalog;
    CREATE TABLE v_catalog.columns (
        table_schema TEXT NOT NULL,
        table_name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        data_type TEXT NOT NULL,
        ordinal_position INTEGER NOT NULL
    );
";

impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(e, _) => e.extended_code.to_string(),
            rusqlite::Error::SqlInputError { error, .. } => error.extended_code.to_string(),
            _ => "HY000".to_string(),
        };
        DriverError::new(err.to_string(), code)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn value_from_ref(value: ValueRef) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
    }
}

/// Translates Vertica-only syntax into SQLite's dialect
pub fn translate(sql: &str) -> String {
    reorder_pagination(&unescape_literals(sql))
}

/// Resolves backslash escapes inside single-quoted literals.
///
/// NUL cannot live inside an SQLite literal and is spliced in with `char(0)`.
fn unescape_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut open: Option<char> = None;

    while let Some(c) = chars.next() {
        match open {
            None => {
                if c == '\'' || c == '"' {
                    open = Some(c);
                }
                out.push(c);
            }
            Some('"') => {
                if c == '"' {
                    open = None;
                }
                out.push(c);
            }
            Some(_) => match c {
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    out.push_str("''");
                }
                '\'' => {
                    open = None;
                    out.push(c);
                }
                '\\' => match chars.next() {
                    Some('\'') => out.push_str("''"),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some(d) if d.is_digit(8) => {
                        let mut code = d.to_digit(8).unwrap_or_default();
                        for _ in 0..2 {
                            match chars.peek().and_then(|c| c.to_digit(8)) {
                                Some(digit) => {
                                    code = code * 8 + digit;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        match char::from_u32(code) {
                            Some(ch) if ch != '\0' => out.push(ch),
                            _ => out.push_str("' || char(0) || '"),
                        }
                    }
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                },
                _ => out.push(c),
            },
        }
    }
    out
}

/// Splits up to `n` whitespace-separated words off the end of `sql`
fn trailing_words(sql: &str, n: usize) -> (&str, Vec<&str>) {
    let mut rest = sql.trim_end();
    let mut words = Vec::new();
    for _ in 0..n {
        if rest.is_empty() {
            break;
        }
        let start = rest
            .rfind(|c: char| c.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        words.push(&rest[start..]);
        rest = rest[..start].trim_end();
    }
    words.reverse();
    (rest, words)
}

fn is_count(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

/// `OFFSET n LIMIT m` becomes `LIMIT m OFFSET n`; a lone `OFFSET n` becomes `LIMIT -1 OFFSET n`
fn reorder_pagination(sql: &str) -> String {
    let trimmed = sql.trim_end();
    let (body, terminator) = match trimmed.strip_suffix(';') {
        Some(body) => (body.trim_end(), ";"),
        None => (trimmed, ""),
    };

    let (head, words) = trailing_words(body, 4);
    if let [offset, n, limit, m] = words.as_slice() {
        if offset.eq_ignore_ascii_case("OFFSET")
            && limit.eq_ignore_ascii_case("LIMIT")
            && is_count(n)
            && is_count(m)
        {
            return format!("{} LIMIT {} OFFSET {}{}", head, m, n, terminator);
        }
    }

    let (head, words) = trailing_words(body, 2);
    if let [offset, n] = words.as_slice() {
        let after_limit = matches!(
            trailing_words(head, 2).1.as_slice(),
            [limit, _] if limit.eq_ignore_ascii_case("LIMIT")
        );
        if offset.eq_ignore_ascii_case("OFFSET") && is_count(n) && !after_limit {
            return format!("{} LIMIT -1 OFFSET {}{}", head, n, terminator);
        }
    }
    sql.to_string()
}

/// Looks up a `Key=value` field of a DSN string (key match is case-insensitive)
pub fn dsn_field<'a>(dsn: &'a str, key: &str) -> Option<&'a str> {
    dsn.split(';')
        .filter_map(|part| part.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim())
}

/// Driver opening SQLite databases
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn connect(&self, dsn: &str, _user: &str, _password: &str) -> DriverResult<SqliteConnection> {
        let path = dsn_field(dsn, "Database")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DriverError::new("DSN has no Database field", "IM002"))?;

        let conn = Connection::open(path)?;
        conn.execute_batch(CATALOG_SQL)?;
        debug!("Opened SQLite database at {}", path);

        Ok(SqliteConnection {
            conn,
            manual_commit: false,
        })
    }
}

/// An open SQLite connection
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
    /// Autocommit disabled: a transaction is kept open between commits
    manual_commit: bool,
}

impl SqliteConnection {
    /// Rebuilds the emulated column catalog for every attached schema
    fn refresh_catalog(&self) -> rusqlite::Result<()> {
        let schemas = {
            let mut stmt = self.conn.prepare("PRAGMA database_list")?;
            let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
            names.collect::<rusqlite::Result<Vec<_>>>()?
        };

        self.conn.execute("DELETE FROM v_catalog.columns", [])?;
        for schema in schemas
            .iter()
            .filter(|s| s.as_str() != CATALOG_SCHEMA && s.as_str() != "temp")
        {
            self.conn.execute(
                &format!(
                    "INSERT INTO v_catalog.columns
                         (table_schema, table_name, column_name, data_type, ordinal_position)
                     SELECT '{schema}', m.name, p.name, p.type, p.cid + 1
                     FROM \"{schema}\".sqlite_master AS m, pragma_table_info(m.name, '{schema}') AS p
                     WHERE m.type = 'table'"
                ),
                [],
            )?;
        }
        Ok(())
    }

    fn dialect(&self, sql: &str) -> String {
        let translated = translate(sql);
        if translated != sql {
            debug!("Translated for SQLite: {}", translated);
        }
        translated
    }

    fn restart_if_manual(&mut self) -> rusqlite::Result<()> {
        if self.manual_commit && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

/// A validated statement; the compiled form lives in the connection's statement cache
#[derive(Debug, Clone)]
pub struct SqliteStatement {
    sql: String,
}

impl DriverConnection for SqliteConnection {
    type Cursor = SqliteCursor;
    type Statement = SqliteStatement;

    fn exec(&mut self, sql: &str) -> DriverResult<SqliteCursor> {
        if sql.contains("v_catalog.") {
            self.refresh_catalog()?;
        }

        let sql = self.dialect(sql);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                (0..column_count)
                    .map(|i| row.get_ref(i).map(value_from_ref))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SqliteCursor {
            columns,
            rows,
            position: 0,
        })
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<SqliteStatement> {
        let sql = self.dialect(sql);
        self.conn.prepare_cached(&sql)?;
        Ok(SqliteStatement { sql })
    }

    fn execute(&mut self, statement: &SqliteStatement, params: &[Value]) -> DriverResult<u64> {
        let mut stmt = self.conn.prepare_cached(&statement.sql)?;
        let affected = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        if enabled {
            self.manual_commit = false;
            if !self.conn.is_autocommit() {
                self.conn.execute_batch("COMMIT")?;
            }
        } else {
            if self.conn.is_autocommit() {
                self.conn.execute_batch("BEGIN")?;
            }
            self.manual_commit = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.restart_if_manual()?;
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.restart_if_manual()?;
        Ok(())
    }

    fn is_fatal(&self, err: &DriverError) -> bool {
        // SQLITE_IOERR, SQLITE_CORRUPT, SQLITE_CANTOPEN, SQLITE_NOTADB
        err.code
            .parse::<i32>()
            .map(|code| matches!(code & 0xff, 10 | 11 | 14 | 26))
            .unwrap_or(false)
    }
}

/// Fully materialized SQLite result set
#[derive(Debug, Clone)]
pub struct SqliteCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: usize,
}

impl Cursor for SqliteCursor {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn open_memory() -> SqliteConnection {
        SqliteDriver
            .connect("Driver=SQLite;Servername=localhost;Port=0;Database=:memory:;", "u", "p")
            .unwrap()
    }

    fn count(conn: &mut SqliteConnection, sql: &str) -> i64 {
        let mut cursor = conn.exec(sql).unwrap();
        cursor.fetch_row(None).unwrap().unwrap()[0].as_i64().unwrap()
    }

    #[test]
    fn test_dsn_field() {
        let dsn = "Driver=Vertica;Servername=db1;Port=5433;Database=analytics;";
        assert_eq!(dsn_field(dsn, "Database"), Some("analytics"));
        assert_eq!(dsn_field(dsn, "servername"), Some("db1"));
        assert_eq!(dsn_field(dsn, "Uid"), None);
    }

    #[test]
    fn test_connect_requires_database_field() {
        let err = SqliteDriver.connect("Driver=SQLite;", "u", "p").unwrap_err();
        assert_eq!(err.code, "IM002");
    }

    #[test]
    fn test_connect_failure_reports_error() {
        let result = SqliteDriver.connect("Database=/nonexistent/path/database.db;", "u", "p");
        assert!(result.is_err());
    }

    #[test]
    fn test_exec_and_fetch() {
        let mut conn = open_memory();
        conn.exec("CREATE TABLE t (id INTEGER, name TEXT)").unwrap();
        let stmt = conn.prepare("INSERT INTO t (id, name) VALUES (?, ?)").unwrap();
        assert_eq!(conn.execute(&stmt, &[Value::from(1), Value::from("a")]).unwrap(), 1);
        assert_eq!(conn.execute(&stmt, &[Value::from(2), Value::Null]).unwrap(), 1);

        let mut cursor = conn.exec("SELECT id, name FROM t ORDER BY id").unwrap();
        assert_eq!(cursor.columns(), &["id".to_string(), "name".to_string()]);
        assert_eq!(
            cursor.fetch_row(None).unwrap(),
            Some(vec![Value::Integer(1), Value::from("a")])
        );
        assert_eq!(
            cursor.fetch_row(None).unwrap(),
            Some(vec![Value::Integer(2), Value::Null])
        );
        assert_eq!(cursor.fetch_row(None).unwrap(), None);
        assert_eq!(
            cursor.fetch_row(Some(0)).unwrap(),
            Some(vec![Value::Integer(1), Value::from("a")])
        );
    }

    #[test]
    fn test_prepare_surfaces_syntax_errors() {
        let mut conn = open_memory();
        let err = conn.prepare("SELEC nonsense").unwrap_err();
        assert!(err.message.contains("syntax error"));
        // SQLITE_ERROR from the parser, not the generic fallback
        assert_eq!(err.code, "1");
    }

    #[test]
    fn test_translate_literal_escapes() {
        assert_eq!(translate(r"UPDATE t SET a = 'O\'Neil'"), "UPDATE t SET a = 'O''Neil'");
        assert_eq!(translate(r#"SELECT 'c:\\tmp', 'say \"hi\"'"#), "SELECT 'c:\\tmp', 'say \"hi\"'");
        assert_eq!(translate(r"SELECT 'a\nb\r'"), "SELECT 'a\nb\r'");
        assert_eq!(translate(r"SELECT 'x\032'"), "SELECT 'x\x1a'");
        assert_eq!(translate(r"SELECT 'a\000b'"), "SELECT 'a' || char(0) || 'b'");
        // standard doubling and text outside literals are left alone
        assert_eq!(translate("SELECT 'it''s' FROM \"we'ird\""), "SELECT 'it''s' FROM \"we'ird\"");
        assert_eq!(translate(r"SELECT a \ b"), r"SELECT a \ b");
    }

    #[test]
    fn test_translate_pagination() {
        assert_eq!(translate("SELECT * FROM t OFFSET 20 LIMIT 10"), "SELECT * FROM t LIMIT 10 OFFSET 20");
        assert_eq!(translate("SELECT * FROM t offset 5;"), "SELECT * FROM t LIMIT -1 OFFSET 5;");
        assert_eq!(translate("SELECT * FROM t LIMIT 10"), "SELECT * FROM t LIMIT 10");
        assert_eq!(translate("SELECT * FROM t LIMIT 10 OFFSET 20"), "SELECT * FROM t LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_escaped_literals_round_trip() {
        let mut conn = open_memory();
        conn.exec("CREATE TABLE t (name TEXT)").unwrap();
        conn.exec("INSERT INTO t VALUES ('x')").unwrap();
        conn.exec(r"UPDATE t SET name = 'O\'Neil \\ path\nline'").unwrap();

        let mut cursor = conn.exec("SELECT name FROM t").unwrap();
        assert_eq!(
            cursor.fetch_row(None).unwrap(),
            Some(vec![Value::from("O'Neil \\ path\nline")])
        );
    }

    #[test]
    fn test_fatal_codes() {
        let conn = open_memory();
        assert!(conn.is_fatal(&DriverError::new("disk I/O error", "266")));
        assert!(conn.is_fatal(&DriverError::new("not a database", "26")));
        assert!(!conn.is_fatal(&DriverError::new("syntax error", "1")));
        assert!(!conn.is_fatal(&DriverError::new("constraint", "2067")));
    }

    #[test]
    fn test_catalog_emulation() {
        let mut conn = open_memory();
        conn.exec("CREATE TABLE users (id INTEGER, email TEXT, age INTEGER)").unwrap();

        let mut cursor = conn
            .exec(
                "SELECT column_name, data_type FROM v_catalog.columns \
                 WHERE table_schema='main' AND table_name='users' ORDER BY ordinal_position;",
            )
            .unwrap();
        let mut names = Vec::new();
        while let Some(row) = cursor.fetch_row(None).unwrap() {
            names.push(row[0].to_string());
        }
        assert_eq!(names, vec!["id", "email", "age"]);

        // Tables created later show up on the next catalog read
        conn.exec("CREATE TABLE posts (id INTEGER)").unwrap();
        assert_eq!(
            count(&mut conn, "SELECT COUNT(*) FROM v_catalog.columns WHERE table_name='posts'"),
            1
        );
    }

    #[test]
    fn test_manual_commit_mode() {
        let mut conn = open_memory();
        conn.exec("CREATE TABLE t (id INTEGER)").unwrap();
        let insert = conn.prepare("INSERT INTO t (id) VALUES (?)").unwrap();

        conn.set_autocommit(false).unwrap();
        conn.execute(&insert, &[Value::from(1)]).unwrap();
        conn.rollback().unwrap();
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM t"), 0);

        // Still in manual mode after rollback
        conn.execute(&insert, &[Value::from(2)]).unwrap();
        conn.commit().unwrap();
        conn.set_autocommit(true).unwrap();
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM t"), 1);
    }
}
