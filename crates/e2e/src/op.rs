//! Comparison operators over JSON values
//!
//! Values arrive as `serde_json::Value` (API bodies, scraped UI text). Numbers
//! compare numerically regardless of integer/float representation. Ordering
//! and containment are only defined for compatible shapes; callers get `None`
//! back instead of a panic when the shapes don't support the relation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Relation applied between an actual and an expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[default]
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Actual contains expected (subset for sequences, substring for text)
    Contains,
}

impl CompareOp {
    /// Evaluate `actual <op> expected`.
    ///
    /// Returns `None` when the operands cannot be ordered or searched.
    pub fn evaluate(&self, actual: &Value, expected: &Value) -> Option<bool> {
        match self {
            CompareOp::Equal => Some(values_equal(actual, expected)),
            CompareOp::NotEqual => Some(!values_equal(actual, expected)),
            CompareOp::Less => compare_values(actual, expected).map(|o| o == Ordering::Less),
            CompareOp::LessOrEqual => compare_values(actual, expected).map(|o| o != Ordering::Greater),
            CompareOp::Greater => compare_values(actual, expected).map(|o| o == Ordering::Greater),
            CompareOp::GreaterOrEqual => compare_values(actual, expected).map(|o| o != Ordering::Less),
            CompareOp::Contains => value_contains(actual, expected),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::Contains => "contains",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Structural equality with numeric coercion (`1 == 1.0`).
///
/// Mappings compare by key set, not key order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

/// Ordering for numbers, strings, booleans and sequences of those.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                match compare_values(left, right)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

/// Whether `actual` supports membership tests at all
pub fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::String(_) | Value::Object(_))
}

/// `expected in actual`, with full-subset semantics when both are sequences.
///
/// - sequence / sequence: every expected element appears in actual
/// - text / text: substring
/// - sequence / scalar: membership
/// - mapping / text: key membership
///
/// Any other pairing returns `None`.
pub fn value_contains(actual: &Value, expected: &Value) -> Option<bool> {
    match (actual, expected) {
        (Value::Array(items), Value::Array(wanted)) => Some(
            wanted
                .iter()
                .all(|w| items.iter().any(|item| values_equal(item, w))),
        ),
        (Value::String(haystack), Value::String(needle)) => Some(haystack.contains(needle.as_str())),
        (Value::Array(items), scalar) => Some(items.iter().any(|item| values_equal(item, scalar))),
        (Value::Object(map), Value::String(key)) => Some(map.contains_key(key)),
        _ => None,
    }
}

/// Render a value for failure messages (strings quoted)
pub fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
