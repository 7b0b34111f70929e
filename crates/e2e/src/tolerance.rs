//! Percentage-tolerance comparison for numeric values

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use tradecheck_common::numeric::parse_tolerant_number;

/// Values with magnitude below this are treated as zero
pub const EPSILON: f64 = 1e-10;

/// Displayed percent difference when expected is zero but actual is not.
/// Formatting only; nothing derives logic from it.
pub const UNDEFINED_PERCENT: f64 = 999_999.0;

/// Outcome of one tolerance comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub passed: bool,
    pub absolute_diff: String,
    pub percent_diff: String,
    pub tolerance_description: String,
}

impl ComparisonResult {
    fn type_mismatch() -> Self {
        Self {
            passed: false,
            absolute_diff: "0".to_string(),
            percent_diff: "0".to_string(),
            tolerance_description: String::new(),
        }
    }
}

/// Tolerance rules for a dictionary comparison.
///
/// `per_field` wins over the global `percent` when a field appears in both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToleranceSpec {
    /// Global tolerance applied to `fields`
    pub percent: Option<f64>,
    pub fields: Vec<String>,
    pub per_field: IndexMap<String, f64>,
}

impl ToleranceSpec {
    pub fn none() -> Self {
        Self::default()
    }

    /// Global tolerance for the named fields
    pub fn global<I, S>(percent: f64, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            percent: Some(percent),
            fields: fields.into_iter().map(Into::into).collect(),
            per_field: IndexMap::new(),
        }
    }

    /// Scalar tolerance, no field list
    pub fn percent(percent: f64) -> Self {
        Self {
            percent: Some(percent),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, percent: f64) -> Self {
        self.per_field.insert(field.into(), percent);
        self
    }

    /// Percentage governing `field`, if any
    pub fn for_field(&self, field: &str) -> Option<f64> {
        if let Some(p) = self.per_field.get(field) {
            return Some(*p);
        }
        match self.percent {
            Some(p) if self.fields.iter().any(|f| f == field) => Some(p),
            _ => None,
        }
    }

    /// One percentage to show in report headers
    pub fn representative_percent(&self) -> Option<f64> {
        self.percent.or_else(|| self.per_field.values().next().copied())
    }
}

/// Normalize a JSON value to `f64`; numeric-looking text is accepted.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_tolerant_number(s).ok(),
        _ => None,
    }
}

/// Compare `actual` to `expected` within `tolerance_percent` of |expected|.
///
/// The boundary is inclusive. Non-numeric input is a failed comparison,
/// never an error.
pub fn compare_with_tolerance(actual: &Value, expected: &Value, tolerance_percent: f64) -> ComparisonResult {
    let (Some(act), Some(exp)) = (to_number(actual), to_number(expected)) else {
        debug!(
            "Value is not numeric - expected: {} , actual: {}",
            expected, actual
        );
        return ComparisonResult::type_mismatch();
    };

    let diff = (act - exp).abs();

    let (percent_diff, tolerance_value) = if exp.abs() < EPSILON {
        let pct = if diff < EPSILON { 0.0 } else { UNDEFINED_PERCENT };
        (pct, 0.0)
    } else {
        let baseline = exp.abs();
        ((diff / baseline) * 100.0, (tolerance_percent / 100.0) * baseline)
    };

    let passed = diff <= tolerance_value;

    if !passed {
        warn!(
            "Tolerance check failed - Expected: {}, Actual: {}, Tolerance: ±{:.6} ({}%), Diff: {:.6} ({:.2}%)",
            exp, act, tolerance_value, tolerance_percent, diff, percent_diff
        );
    }

    ComparisonResult {
        passed,
        absolute_diff: format!("{:.4}", diff),
        percent_diff: format!("{:.4}", percent_diff),
        tolerance_description: format!("±{:.2} ({:.2}%)", tolerance_value, tolerance_percent),
    }
}
