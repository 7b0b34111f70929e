//! Soft assertions: record a failure, keep the test running
//!
//! Every assertion goes through [`TestContext::soft_assert`]. Mappings are
//! compared field by field (see [`crate::compare`]); everything else is a
//! single relation or tolerance check. Failures are tallied on the context
//! and surfaced together by `TestContext::finish`, so one test can report
//! many independent mismatches.

mod assertions;

pub use assertions::{NotificationOptions, DEFAULT_ALMOST_EQUAL_PERCENT};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::compare::{compare_dict, extract_diff, DictComparisonResult};
use crate::context::TestContext;
use crate::op::{render, value_contains, CompareOp};
use crate::report::verify_table;
use crate::tolerance::{compare_with_tolerance, ToleranceSpec};

const VALIDATION_FAILED: &str = "❌ Validation Failed ! ";

/// What a soft assertion produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertOutcome {
    Dict(DictComparisonResult),
    Scalar(bool),
}

impl AssertOutcome {
    pub fn passed(&self) -> bool {
        match self {
            AssertOutcome::Dict(result) => result.passed,
            AssertOutcome::Scalar(passed) => *passed,
        }
    }

    pub fn into_dict(self) -> Option<DictComparisonResult> {
        match self {
            AssertOutcome::Dict(result) => Some(result),
            AssertOutcome::Scalar(_) => None,
        }
    }
}

impl TestContext {
    /// Compare `actual` with `expected` and record the outcome without
    /// stopping the test.
    ///
    /// Two mappings go through the dictionary comparator and return its full
    /// result. Anything else returns the single pass/fail.
    pub fn soft_assert(
        &mut self,
        actual: &Value,
        expected: &Value,
        op: CompareOp,
        error_message: &str,
        tolerance: &ToleranceSpec,
    ) -> AssertOutcome {
        match (actual, expected) {
            (Value::Object(act), Value::Object(exp)) => {
                AssertOutcome::Dict(self.soft_assert_dict(act, exp, op, error_message, tolerance))
            }
            _ => AssertOutcome::Scalar(self.soft_assert_value(actual, expected, op, error_message, tolerance)),
        }
    }

    fn soft_assert_dict(
        &mut self,
        actual: &Map<String, Value>,
        expected: &Map<String, Value>,
        op: CompareOp,
        error_message: &str,
        tolerance: &ToleranceSpec,
    ) -> DictComparisonResult {
        if let (Some(p), false) = (tolerance.percent, tolerance.fields.is_empty()) {
            debug!("Global tolerance: {}%, apply for fields: {:?}", p, tolerance.fields);
        }
        if !tolerance.per_field.is_empty() {
            debug!("Field-specific tolerances: {:?}", tolerance.per_field);
        }

        let result = compare_dict(actual, expected, tolerance, op);
        let message = dict_failure_message(actual, expected, &result, error_message);

        let passed = self.checks.report(result.passed, &message);
        self.attach_verify_table(actual, expected, op, &result, tolerance);
        if !passed {
            self.handle_failure(&message);
        }

        result
    }

    fn soft_assert_value(
        &mut self,
        actual: &Value,
        expected: &Value,
        op: CompareOp,
        error_message: &str,
        tolerance: &ToleranceSpec,
    ) -> bool {
        let detail = if error_message.is_empty() {
            format!("Actual: {} / Expected: {}", render(actual), render(expected))
        } else {
            error_message.to_string()
        };
        let message = format!("{VALIDATION_FAILED}\n>>> {detail}");

        let passed = match (tolerance.percent, op) {
            (Some(percent), _) => compare_with_tolerance(actual, expected, percent).passed,
            (None, CompareOp::Contains) => value_contains(actual, expected).unwrap_or_else(|| {
                error!(
                    "Cannot check containment: {} is not a container of {}",
                    render(actual),
                    render(expected)
                );
                false
            }),
            (None, op) => op.evaluate(actual, expected).unwrap_or_else(|| {
                error!(
                    "Cannot compare {} {} {}: incompatible types",
                    render(actual),
                    op,
                    render(expected)
                );
                false
            }),
        };

        let passed = self.checks.report(passed, &message);
        if !passed {
            self.handle_failure(&message);
        }
        passed
    }

    fn attach_verify_table(
        &self,
        actual: &Map<String, Value>,
        expected: &Map<String, Value>,
        op: CompareOp,
        result: &DictComparisonResult,
        tolerance: &ToleranceSpec,
    ) {
        let mut title = "Verify Table Details".to_string();
        if let Some(step) = self.steps.last() {
            title.push_str(" - ");
            title.push_str(step);
        }
        let table = verify_table(actual, expected, op, result, tolerance.representative_percent());
        if let Err(e) = self.reporter.attach_text(&self.test_id, &title, &table) {
            debug!("Could not attach verify table: {}", e);
        }
    }

    /// Failure side channel: log, screenshot every driver, record the last
    /// "verify" step. Never fails.
    fn handle_failure(&mut self, message: &str) {
        error!("{}", message);

        self.capture_screenshots("failed");

        if let Some(step) = self.steps.last_matching("verify").map(str::to_lowercase) {
            self.add_failed_log(step, message);
        }
    }
}

fn dict_failure_message(
    actual: &Map<String, Value>,
    expected: &Map<String, Value>,
    result: &DictComparisonResult,
    error_message: &str,
) -> String {
    let mut message = VALIDATION_FAILED.to_string();
    if !error_message.is_empty() {
        message.push_str("\n>>> ");
        message.push_str(error_message);
    }
    if !result.missing_keys.is_empty() {
        message.push_str(&format!("\n>>> Missing Fields: {:?}", result.missing_keys));
    }
    if !result.redundant_keys.is_empty() {
        message.push_str(&format!("\n>>> Redundant Fields: {:?}", result.redundant_keys));
    }
    if !result.diff_keys.is_empty() {
        let (act, exp) = extract_diff(actual, expected, &result.diff_keys);
        message.push_str(&format!(
            "\n>>> Different Fields: \nActual: {} \nExpected: {}",
            Value::Object(act),
            Value::Object(exp)
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> (TestContext, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::default());
        (TestContext::new("test_softcheck", reporter.clone()), reporter)
    }

    #[test]
    fn test_dict_message_lists_only_differing_fields() {
        let (mut ctx, _) = ctx();
        let outcome = ctx.soft_assert(
            &json!({"price": 1.5, "side": "BUY", "extra": true}),
            &json!({"price": 1.2, "side": "BUY", "sl": 1.0}),
            CompareOp::Equal,
            "",
            &ToleranceSpec::none(),
        );
        assert!(!outcome.passed());

        let message = &ctx.checks().failures()[0].message;
        assert!(message.contains(r#"Missing Fields: ["sl"]"#));
        assert!(message.contains(r#"Redundant Fields: ["extra"]"#));
        assert!(message.contains(r#"Actual: {"price":1.5}"#));
        assert!(message.contains(r#"Expected: {"price":1.2}"#));
        assert!(!message.contains("side"));
    }

    #[test]
    fn test_dict_attaches_verify_table_titled_with_last_step() {
        let (mut ctx, reporter) = ctx();
        ctx.step("Verify position details");
        ctx.soft_assert(
            &json!({"side": "BUY"}),
            &json!({"side": "BUY"}),
            CompareOp::Equal,
            "",
            &ToleranceSpec::none(),
        );
        let texts = reporter.texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].1, "Verify Table Details - Verify position details");
    }

    #[test]
    fn test_scalar_default_and_custom_message() {
        let (mut ctx, _) = ctx();
        ctx.soft_assert(&json!(1), &json!(2), CompareOp::Equal, "", &ToleranceSpec::none());
        ctx.soft_assert(&json!(1), &json!(2), CompareOp::Equal, "volume mismatch", &ToleranceSpec::none());

        let failures = ctx.checks().failures();
        assert!(failures[0].message.ends_with("Actual: 1 / Expected: 2"));
        assert!(failures[1].message.ends_with("volume mismatch"));
    }

    #[test]
    fn test_scalar_tolerance_wins_over_op() {
        let (mut ctx, _) = ctx();
        let outcome = ctx.soft_assert(
            &json!("1,000.4"),
            &json!(1000),
            CompareOp::Equal,
            "",
            &ToleranceSpec::percent(0.1),
        );
        assert!(outcome.passed());
    }

    #[test]
    fn test_contains_on_non_container_fails_quietly() {
        let (mut ctx, _) = ctx();
        let outcome = ctx.soft_assert(&json!(12), &json!(1), CompareOp::Contains, "", &ToleranceSpec::none());
        assert_eq!(outcome, AssertOutcome::Scalar(false));
    }

    #[test]
    fn test_failure_records_last_verify_step_lowercased() {
        let (mut ctx, _) = ctx();
        ctx.step("Verify Order Placed");
        ctx.step("Close dialog");
        ctx.soft_assert(&json!("a"), &json!("b"), CompareOp::Equal, "", &ToleranceSpec::none());

        assert_eq!(ctx.failed_logs().len(), 1);
        assert_eq!(ctx.failed_logs()[0].step, "verify order placed");
    }

    #[test]
    fn test_failure_without_verify_step_records_nothing() {
        let (mut ctx, _) = ctx();
        ctx.step("Open app");
        ctx.soft_assert(&json!("a"), &json!("b"), CompareOp::Equal, "", &ToleranceSpec::none());
        assert!(ctx.failed_logs().is_empty());
        assert_eq!(ctx.checks().failures().len(), 1);
    }
}
