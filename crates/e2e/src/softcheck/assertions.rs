//! Named assertion wrappers over [`TestContext::soft_assert`]

use serde_json::{Map, Value};

use crate::compare::{compare_dict, DictComparisonResult};
use crate::context::TestContext;
use crate::error::CheckError;
use crate::notification::{grouped_fields, parse_prices, price_decimals, render_prices, PRICE_FIELDS};
use crate::op::CompareOp;
use crate::tolerance::ToleranceSpec;

/// Tolerance used by [`TestContext::assert_almost_equal`]
pub const DEFAULT_ALMOST_EQUAL_PERCENT: f64 = 1.0;

/// How notification banners are compared
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationOptions {
    /// Allowed price deviation, in percent
    pub tolerance_percent: f64,
    /// Decimals used when re-rendering prices. `None` uses the most precise
    /// price of the expected banner.
    pub decimals: Option<usize>,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            tolerance_percent: 0.1,
            decimals: None,
        }
    }
}

fn reject_mapping(value: &Value, api: &str) -> Result<(), CheckError> {
    if value.is_object() {
        return Err(CheckError::Usage(format!(
            "{api} does not take mappings, use assert_dict for mappings"
        )));
    }
    Ok(())
}

fn expect_mapping(value: Value, api: &str) -> Result<Map<String, Value>, CheckError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CheckError::Usage(format!(
            "{api} takes mappings, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

impl TestContext {
    fn check(&mut self, actual: Value, expected: Value, op: CompareOp, error_message: &str) -> bool {
        self.soft_assert(&actual, &expected, op, error_message, &ToleranceSpec::none())
            .passed()
    }

    pub fn assert_equal(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> Result<bool, CheckError> {
        let (actual, expected) = (actual.into(), expected.into());
        reject_mapping(&actual, "assert_equal")?;
        reject_mapping(&expected, "assert_equal")?;
        Ok(self.check(actual, expected, CompareOp::Equal, error_message))
    }

    pub fn assert_not_equal(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> bool {
        self.check(actual.into(), expected.into(), CompareOp::NotEqual, error_message)
    }

    /// `expected` is a member, substring or subset of `actual`
    pub fn assert_contains(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> Result<bool, CheckError> {
        let (actual, expected) = (actual.into(), expected.into());
        reject_mapping(&actual, "assert_contains")?;
        reject_mapping(&expected, "assert_contains")?;
        Ok(self.check(actual, expected, CompareOp::Contains, error_message))
    }

    pub fn assert_less_than(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> bool {
        self.check(actual.into(), expected.into(), CompareOp::Less, error_message)
    }

    pub fn assert_less_than_or_equal(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> bool {
        self.check(actual.into(), expected.into(), CompareOp::LessOrEqual, error_message)
    }

    pub fn assert_greater_than(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> bool {
        self.check(actual.into(), expected.into(), CompareOp::Greater, error_message)
    }

    pub fn assert_greater_than_or_equal(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> bool {
        self.check(actual.into(), expected.into(), CompareOp::GreaterOrEqual, error_message)
    }

    /// Numeric comparison within [`DEFAULT_ALMOST_EQUAL_PERCENT`]
    pub fn assert_almost_equal(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
    ) -> bool {
        self.assert_almost_equal_within(actual, expected, DEFAULT_ALMOST_EQUAL_PERCENT, error_message)
    }

    pub fn assert_almost_equal_within(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        tolerance_percent: f64,
        error_message: &str,
    ) -> bool {
        self.soft_assert(
            &actual.into(),
            &expected.into(),
            CompareOp::Equal,
            error_message,
            &ToleranceSpec::percent(tolerance_percent),
        )
        .passed()
    }

    pub fn assert_true(&mut self, actual: impl Into<Value>, error_message: &str) -> bool {
        self.check(actual.into(), Value::Bool(true), CompareOp::Equal, error_message)
    }

    pub fn assert_false(&mut self, actual: impl Into<Value>, error_message: &str) -> bool {
        self.check(actual.into(), Value::Bool(false), CompareOp::Equal, error_message)
    }

    /// Field-by-field comparison of two mappings.
    ///
    /// Every key must be present on both sides; `tolerance` decides which
    /// numeric fields may deviate and by how much.
    pub fn assert_dict(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
        tolerance: &ToleranceSpec,
    ) -> Result<DictComparisonResult, CheckError> {
        self.dict_check(actual.into(), expected.into(), CompareOp::Equal, error_message, tolerance, "assert_dict")
    }

    /// Like [`assert_dict`](Self::assert_dict) but keys only `actual` has are
    /// ignored, and list/string fields pass when they contain the expected
    /// value.
    pub fn assert_dict_contains(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        error_message: &str,
        tolerance: &ToleranceSpec,
    ) -> Result<DictComparisonResult, CheckError> {
        self.dict_check(
            actual.into(),
            expected.into(),
            CompareOp::Contains,
            error_message,
            tolerance,
            "assert_dict_contains",
        )
    }

    fn dict_check(
        &mut self,
        actual: Value,
        expected: Value,
        op: CompareOp,
        error_message: &str,
        tolerance: &ToleranceSpec,
        api: &str,
    ) -> Result<DictComparisonResult, CheckError> {
        let actual = Value::Object(expect_mapping(actual, api)?);
        let expected = Value::Object(expect_mapping(expected, api)?);
        let outcome = self.soft_assert(&actual, &expected, op, error_message, tolerance);
        Ok(outcome.into_dict().unwrap_or_default())
    }

    /// Compare two notification banners, letting their prices deviate within
    /// `options.tolerance_percent`.
    pub fn assert_notification(
        &mut self,
        actual: &str,
        expected: &str,
        error_message: &str,
        options: &NotificationOptions,
    ) -> bool {
        let act_prices = parse_prices(actual);
        let exp_prices = parse_prices(expected);

        let mut actual = actual.to_string();
        let mut expected_text = expected.to_string();

        if !act_prices.is_empty() && !exp_prices.is_empty() {
            let tolerance = ToleranceSpec::global(options.tolerance_percent, PRICE_FIELDS.iter().copied());
            let result = compare_dict(
                &act_prices.into_iter().collect(),
                &exp_prices.clone().into_iter().collect(),
                &tolerance,
                CompareOp::Equal,
            );

            if result.passed {
                let decimals = options
                    .decimals
                    .or_else(|| price_decimals(expected))
                    .unwrap_or_default();
                let grouped = grouped_fields(expected);
                actual = render_prices(&actual, &exp_prices, decimals, &grouped);
                expected_text = render_prices(&expected_text, &exp_prices, decimals, &grouped);
            }
        }

        self.check(Value::String(actual), Value::String(expected_text), CompareOp::Equal, error_message)
    }
}
