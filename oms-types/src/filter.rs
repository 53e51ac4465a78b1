//! Filter values and row predicates.
//!
//! A [`FilterValue`] carries its runtime type so resolvers can bind it as a
//! typed query parameter. A [`RowFilter`] is the predicate a policy decision
//! attaches to every read; it is always conjunctive equality, never free text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to expected value. Ordered so generated queries and cache keys
/// are stable.
pub type Filters = BTreeMap<String, FilterValue>;

/// A typed filter value. List values become `IN (...)` predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Converts a JSON value into a filter value.
    ///
    /// Objects are rejected; numbers that fit `i64` become `Integer`.
    pub fn from_json(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Integer(i)),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| crate::Error::UnsupportedFilterValue(n.to_string())),
            },
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<crate::Result<Vec<_>>>()
                .map(Self::List),
            Value::Object(_) => Err(crate::Error::UnsupportedFilterValue(
                "object values cannot be used as filters".to_string(),
            )),
        }
    }

    /// Converts back into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Returns true for list values.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for FilterValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for FilterValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// `field = value`, or `field IN (...)` when the value is a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub value: FilterValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Row-level restriction produced by a policy decision.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "conditions")]
pub enum RowFilter {
    /// Every row is visible.
    #[default]
    Unrestricted,
    /// No row is visible (always-false predicate).
    Deny,
    /// Only rows satisfying every condition are visible.
    Match(Vec<Condition>),
}

impl RowFilter {
    /// Returns true for the always-false predicate.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny)
    }

    /// Conditions to AND into a query. Empty for `Unrestricted` and `Deny`;
    /// callers must check [`RowFilter::is_deny`] first.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        match self {
            Self::Match(conditions) => conditions,
            Self::Unrestricted | Self::Deny => &[],
        }
    }

    /// Stable text form used in cache keys.
    #[must_use]
    pub fn signature(&self) -> String {
        match self {
            Self::Unrestricted => "*".to_string(),
            Self::Deny => "!".to_string(),
            Self::Match(conditions) => {
                let mut parts: Vec<String> = conditions
                    .iter()
                    .map(|c| format!("{}={}", c.field, c.value))
                    .collect();
                parts.sort();
                parts.join("&")
            }
        }
    }
}

/// Explicit ordering for `getByFilter`. Without one, result order is unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}
