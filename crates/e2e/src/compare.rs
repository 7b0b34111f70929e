//! Field-by-field dictionary comparison with optional numeric tolerance

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::op::{value_contains, values_equal, CompareOp};
use crate::tolerance::{compare_with_tolerance, ToleranceSpec};

/// Tolerance outcome recorded for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceInfo {
    pub percent_diff: String,
    pub tolerance_description: String,
}

/// Result of comparing two mappings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DictComparisonResult {
    pub passed: bool,
    pub missing_keys: Vec<String>,
    pub redundant_keys: Vec<String>,
    pub diff_keys: Vec<String>,
    /// Present only when tolerance was applied to at least one field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_info: Option<IndexMap<String, ToleranceInfo>>,
}

/// Keep only the keys of `actual` that `expected` mentions, in actual's order.
pub fn filter_to_expected(actual: &Map<String, Value>, expected: &Map<String, Value>) -> Map<String, Value> {
    actual
        .iter()
        .filter(|(k, _)| expected.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Compare `actual` against `expected`.
///
/// Only expected's keys are compared. A missing key fails the comparison but
/// is reported in `missing_keys`, not `diff_keys`. With [`CompareOp::Contains`]
/// actual is first narrowed to expected's keys, so nothing is redundant.
pub fn compare_dict(
    actual: &Map<String, Value>,
    expected: &Map<String, Value>,
    tolerance: &ToleranceSpec,
    op: CompareOp,
) -> DictComparisonResult {
    let filtered;
    let actual = if op == CompareOp::Contains {
        filtered = filter_to_expected(actual, expected);
        &filtered
    } else {
        actual
    };

    let (expected_dbg, actual_dbg) = (Value::Object(expected.clone()), Value::Object(actual.clone()));
    debug!("> Compare data: expected={} actual={}", expected_dbg, actual_dbg);

    let mut all_passed = true;
    let mut diff_keys = Vec::new();
    let mut tolerance_info = IndexMap::new();

    for (key, exp) in expected {
        let Some(act) = actual.get(key) else {
            all_passed = false;
            continue;
        };

        let passed = match tolerance.for_field(key) {
            Some(percent) => {
                let res = compare_with_tolerance(act, exp, percent);
                tolerance_info.insert(
                    key.clone(),
                    ToleranceInfo {
                        percent_diff: res.percent_diff,
                        tolerance_description: res.tolerance_description,
                    },
                );
                res.passed
            }
            None => field_matches(act, exp, op),
        };

        if !passed {
            all_passed = false;
            diff_keys.push(key.clone());
        }
    }

    let missing_keys: Vec<String> = expected
        .keys()
        .filter(|k| !actual.contains_key(*k))
        .cloned()
        .collect();
    let redundant_keys: Vec<String> = actual
        .keys()
        .filter(|k| !expected.contains_key(*k))
        .cloned()
        .collect();

    DictComparisonResult {
        passed: all_passed && missing_keys.is_empty() && redundant_keys.is_empty(),
        missing_keys,
        redundant_keys,
        diff_keys,
        tolerance_info: (!tolerance_info.is_empty()).then_some(tolerance_info),
    }
}

/// Per-field relation. Contains degrades to equality when the actual value
/// is not something that can be searched.
fn field_matches(actual: &Value, expected: &Value, op: CompareOp) -> bool {
    match op {
        CompareOp::Contains => {
            value_contains(actual, expected).unwrap_or_else(|| values_equal(actual, expected))
        }
        other => other.evaluate(actual, expected).unwrap_or_else(|| {
            debug!("Field values {} and {} are not comparable with {}", actual, expected, other);
            false
        }),
    }
}

/// Project both mappings onto `keys` for side-by-side failure output.
///
/// Keys absent on one side show as empty strings.
pub fn extract_diff(
    actual: &Map<String, Value>,
    expected: &Map<String, Value>,
    keys: &[String],
) -> (Map<String, Value>, Map<String, Value>) {
    let project = |source: &Map<String, Value>| {
        keys.iter()
            .map(|k| {
                (
                    k.clone(),
                    source.get(k).cloned().unwrap_or_else(|| Value::String(String::new())),
                )
            })
            .collect::<Map<String, Value>>()
    };
    (project(actual), project(expected))
}
