use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use tradecheck_e2e::{
    ArtifactReporter, CheckError, E2eError, E2eResult, MemoryReporter, Screenshotter, Session, TestContext,
    ToleranceSpec,
};

struct FakeScreen {
    name: &'static str,
    broken: bool,
}

impl Screenshotter for FakeScreen {
    fn name(&self) -> &str {
        self.name
    }

    fn screenshot(&self) -> E2eResult<Vec<u8>> {
        if self.broken {
            Err(E2eError::NoSession)
        } else {
            Ok(b"\x89PNG fake".to_vec())
        }
    }
}

fn context() -> (TestContext, Arc<MemoryReporter>) {
    tradecheck_common::logging::init_logging(false);
    let reporter = Arc::new(MemoryReporter::default());
    (TestContext::new("test_order_flow", reporter.clone()), reporter)
}

/// Per-field tolerance lets a price drift without failing the check.
#[test]
fn dict_with_field_tolerance_passes() {
    let (mut ctx, _) = context();
    let result = ctx
        .assert_dict(
            json!({"price": 100.0, "side": "BUY"}),
            json!({"price": 100.3, "side": "BUY"}),
            "",
            &ToleranceSpec::none().with_field("price", 1.0),
        )
        .unwrap();

    assert!(result.passed);
    assert!(result.diff_keys.is_empty());
    let info = result.tolerance_info.unwrap();
    assert_eq!(info["price"].tolerance_description, "±1.00 (1.00%)");
    ctx.assert_all();
}

#[test]
fn dict_outside_global_tolerance_fails() {
    let (mut ctx, _) = context();
    let result = ctx
        .assert_dict(
            json!({"price": 110.0}),
            json!({"price": 100.0}),
            "",
            &ToleranceSpec::global(5.0, ["price"]),
        )
        .unwrap();

    assert!(!result.passed);
    assert_eq!(result.diff_keys, vec!["price"]);
    assert_eq!(result.tolerance_info.unwrap()["price"].percent_diff, "10.0000");
}

/// Failures are collected, the test keeps running, and finish() lists all of them.
#[test]
fn three_failures_are_all_reported() {
    let (mut ctx, _) = context();
    ctx.step("Verify order placed");

    assert!(!ctx.assert_equal("SELL", "BUY", "").unwrap());
    assert!(!ctx.assert_greater_than(1, 2, ""));
    assert!(!ctx.assert_almost_equal(1.2, 1.0, "price drift"));
    assert!(ctx.assert_not_equal(1, 2, ""));

    assert_eq!(ctx.checks().total(), 4);
    assert_eq!(ctx.failed_logs().len(), 3);

    match ctx.finish() {
        Err(CheckError::SoftAssertions { count, report, .. }) => {
            assert_eq!(count, 3);
            assert!(report.contains("FAILURE #1"));
            assert!(report.contains("FAILURE #2"));
            assert!(report.contains("FAILURE #3"));
            assert!(report.contains("price drift"));
        }
        other => panic!("expected soft assertion failures, got {:?}", other),
    }
}

#[test]
#[should_panic(expected = "1 soft assertion(s) failed in test_order_flow")]
fn assert_all_panics_with_report() {
    let (mut ctx, _) = context();
    ctx.assert_true(false, "");
    ctx.assert_all();
}

#[test]
fn contains_subset_semantics() {
    let (mut ctx, _) = context();
    assert!(ctx.assert_contains(json!([1, 2, 3]), json!([2, 3]), "").unwrap());
    assert!(!ctx.assert_contains(json!([1, 2, 3]), json!([4]), "").unwrap());
    assert!(ctx.assert_contains("Order placed successfully", "placed", "").unwrap());
    assert!(!ctx.assert_contains(12, 1, "").unwrap());
    assert_eq!(ctx.checks().failures().len(), 2);
}

#[test]
fn usage_errors_are_not_counted_as_checks() {
    let (mut ctx, _) = context();
    assert!(matches!(
        ctx.assert_contains(json!({"a": 1}), "a", ""),
        Err(CheckError::Usage(_))
    ));
    assert!(matches!(
        ctx.assert_dict_contains("a", json!({"a": 1}), "", &ToleranceSpec::none()),
        Err(CheckError::Usage(_))
    ));
    assert_eq!(ctx.checks().total(), 0);
    assert!(ctx.finish().is_ok());
}

#[test]
fn failure_captures_screenshot_from_every_driver() {
    let (mut ctx, reporter) = context();
    ctx.attach_driver(Arc::new(FakeScreen {
        name: "chrome",
        broken: false,
    }));
    ctx.attach_driver(Arc::new(FakeScreen {
        name: "mobile",
        broken: true,
    }));

    ctx.step("Verify balance");
    assert!(!ctx.assert_equal(10, 11, "").unwrap());

    // the broken driver is skipped, the check is still recorded
    let images = reporter.images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].1, "failed-chrome");
    assert_eq!(ctx.failed_logs()[0].step, "verify balance");
}

#[test]
fn passing_checks_take_no_screenshots() {
    let (mut ctx, reporter) = context();
    ctx.attach_driver(Arc::new(FakeScreen {
        name: "chrome",
        broken: false,
    }));
    assert!(ctx.assert_equal("BUY", "BUY", "").unwrap());
    assert!(reporter.images().is_empty());
}

#[test]
fn session_writes_summary_and_attachments() {
    let dir = TempDir::new().unwrap();
    let reporter = Arc::new(ArtifactReporter::new(dir.path()).unwrap());
    let mut session = Session::new(reporter.clone());

    let mut ctx = session.start_test("test_positions");
    ctx.step("Verify position");
    let _ = ctx.assert_dict(
        json!({"volume": 0.01, "symbol": "XAUUSD"}),
        json!({"volume": 0.02, "symbol": "XAUUSD"}),
        "",
        &ToleranceSpec::none(),
    );
    assert!(session.finish_test(ctx).is_err());

    let path = reporter.write_summary(&session.summary()).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(summary["failed"], json!(1));
    assert_eq!(summary["all_failed_logs"][0]["step"], json!("verify position"));

    let table_dir = dir.path().join("attachments").join("test_positions");
    let tables: Vec<_> = std::fs::read_dir(table_dir).unwrap().collect();
    assert_eq!(tables.len(), 1);
}
