/// Value Module
///
/// Values bound to statement placeholders and read back from result sets,
/// plus the row shapes a fetch can produce.
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Whether the value is numeric (passes through quoting untouched)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered column/value pairs, as supplied to write operations.
pub type Params = Vec<(String, Value)>;

/// Collects any `(column, value)` iterator into [`Params`].
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// How rows are materialized by a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Column name to value, in select-list order
    #[default]
    Array,
    /// A structured record (JSON object) that can be deserialized into a type
    Object,
}

/// One result row in array form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: &[String], values: Vec<Value>) -> Self {
        Row {
            fields: columns.iter().cloned().zip(values).collect(),
        }
    }

    /// Looks up a value by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The first column's value, if any
    pub fn first(&self) -> Option<&Value> {
        self.fields.first().map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts the row into a JSON object keyed by column name
    pub fn to_object(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| {
                let json = match value {
                    Value::Null => serde_json::Value::Null,
                    Value::Integer(i) => serde_json::Value::from(*i),
                    Value::Real(r) => serde_json::Number::from_f64(*r)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                    Value::Text(s) => serde_json::Value::String(s.clone()),
                };
                (name.clone(), json)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

/// A fetched row in the representation chosen by [`FetchMode`]
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Array(Row),
    Object(serde_json::Value),
}

impl Record {
    pub(crate) fn from_row(row: Row, mode: FetchMode) -> Self {
        match mode {
            FetchMode::Array => Record::Array(row),
            FetchMode::Object => Record::Object(row.to_object()),
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Record::Array(row) => Some(row),
            Record::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            Record::Object(obj) => obj.as_object(),
            Record::Array(_) => None,
        }
    }

    /// Deserializes the record into `T`
    pub fn deserialize<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        match self {
            Record::Array(row) => serde_json::from_value(row.to_object()),
            Record::Object(obj) => serde_json::from_value(obj),
        }
    }
}
