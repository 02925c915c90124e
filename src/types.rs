//! Shared value types: rows, model ids and query criteria.

use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// A single row: column name to value
pub type Row = serde_json::Map<String, Value>;

/// Index of a model definition inside a [`Schema`](crate::schema::Schema)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub(crate) usize);

impl ModelId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Build a [`Row`] from `(column, value)` pairs.
///
/// ```rust
/// use ctxmodel::types::row;
///
/// let values = row([("name", "Mary".into()), ("age", 32.into())]);
/// assert_eq!(values.len(), 2);
/// ```
pub fn row<K, I>(pairs: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Single column predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Column equals value (a missing column reads as null)
    Eq(String, Value),
    /// Column value is one of the listed values
    In(String, Vec<Value>),
    /// Column is null or absent
    IsNull(String),
}

impl Condition {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Condition::Eq(column, value) => row.get(column).unwrap_or(&Value::Null) == value,
            Condition::In(column, values) => {
                let current = row.get(column).unwrap_or(&Value::Null);
                !current.is_null() && values.contains(current)
            }
            Condition::IsNull(column) => row.get(column).map_or(true, Value::is_null),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(column, _) | Condition::In(column, _) | Condition::IsNull(column) => {
                column
            }
        }
    }
}

/// Conjunction of conditions plus an optional row limit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub conditions: Vec<Condition>,
    pub limit: Option<usize>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column.into(), value.into()));
        self
    }

    pub fn is_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In(column.into(), values));
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull(column.into()));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Combine with another criteria; the tighter limit wins
    pub fn and(mut self, other: Criteria) -> Self {
        self.conditions.extend(other.conditions);
        self.limit = match (self.limit, other.limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }

    /// Filter rows and apply the limit
    pub fn apply<I: IntoIterator<Item = Row>>(&self, rows: I) -> Vec<Row> {
        let matching = rows.into_iter().filter(|r| self.matches(r));
        match self.limit {
            Some(n) => matching.take(n).collect(),
            None => matching.collect(),
        }
    }
}
