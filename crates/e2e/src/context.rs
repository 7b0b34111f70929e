//! Per-test state: step history, failed logs, soft-check tally, drivers
//!
//! A [`TestContext`] is created for every test by a [`Session`] and passed by
//! `&mut` to whatever needs it. Nothing here is global, so tests running on
//! separate workers each get their own registries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::driver::Screenshotter;
use crate::error::CheckError;
use crate::report::Reporter;

/// One recorded step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub label: String,
    pub at: DateTime<Utc>,
}

/// Append-only ordered step history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepLog {
    steps: Vec<Step>,
}

impl StepLog {
    pub fn add(&mut self, label: impl Into<String>) {
        self.steps.push(Step {
            label: label.into(),
            at: Utc::now(),
        });
    }

    pub fn last(&self) -> Option<&str> {
        self.steps.last().map(|s| s.label.as_str())
    }

    /// Most recent step whose lowercase label contains `needle`
    pub fn last_matching(&self, needle: &str) -> Option<&str> {
        let needle = needle.to_lowercase();
        self.steps
            .iter()
            .rev()
            .map(|s| s.label.as_str())
            .find(|label| label.to_lowercase().contains(&needle))
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }
}

/// A step that failed, with the failure detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedLog {
    pub step: String,
    pub detail: String,
}

/// One failed soft check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// 1-based position among all checks of the test
    pub index: usize,
    pub message: String,
}

/// Non-fatal check sink: records outcomes, never panics.
#[derive(Debug, Default)]
pub struct SoftChecks {
    total: usize,
    failures: Vec<CheckFailure>,
}

impl SoftChecks {
    /// Record one outcome and hand it back
    pub fn report(&mut self, passed: bool, message: &str) -> bool {
        self.total += 1;
        if !passed {
            self.failures.push(CheckFailure {
                index: self.total,
                message: message.to_string(),
            });
        }
        passed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn failures(&self) -> &[CheckFailure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// All failures, numbered, one block per failure
    pub fn render(&self) -> String {
        render_failures(&self.failures)
    }
}

fn render_failures(failures: &[CheckFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("FAILURE #{}: {}", f.index, f.message.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything a test needs while it runs
pub struct TestContext {
    pub(crate) test_id: String,
    pub(crate) steps: StepLog,
    pub(crate) failed_logs: Vec<FailedLog>,
    pub(crate) checks: SoftChecks,
    pub(crate) drivers: Vec<Arc<dyn Screenshotter>>,
    pub(crate) reporter: Arc<dyn Reporter>,
    started: Instant,
}

impl TestContext {
    pub fn new(test_id: impl Into<String>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            test_id: test_id.into(),
            steps: StepLog::default(),
            failed_logs: Vec::new(),
            checks: SoftChecks::default(),
            drivers: Vec::new(),
            reporter,
            started: Instant::now(),
        }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Record a human-readable step ("Verify order placed", ...)
    pub fn step(&mut self, label: impl Into<String>) {
        let label = label.into();
        info!("- {}", label);
        self.steps.add(label);
    }

    pub fn steps(&self) -> &StepLog {
        &self.steps
    }

    pub fn add_failed_log(&mut self, step: impl Into<String>, detail: impl Into<String>) {
        self.failed_logs.push(FailedLog {
            step: step.into(),
            detail: detail.into(),
        });
    }

    pub fn failed_logs(&self) -> &[FailedLog] {
        &self.failed_logs
    }

    pub fn checks(&self) -> &SoftChecks {
        &self.checks
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Register a driver so failures capture its screen
    pub fn attach_driver(&mut self, driver: Arc<dyn Screenshotter>) {
        debug!("Attached driver '{}' to {}", driver.name(), self.test_id);
        self.drivers.push(driver);
    }

    /// Forget every registered driver
    pub fn detach_drivers(&mut self) -> Vec<Arc<dyn Screenshotter>> {
        std::mem::take(&mut self.drivers)
    }

    pub fn active_drivers(&self) -> &[Arc<dyn Screenshotter>] {
        &self.drivers
    }

    /// Capture one screenshot per registered driver. Best effort.
    pub fn capture_screenshots(&self, name: &str) {
        for driver in &self.drivers {
            match driver.screenshot() {
                Ok(png) => {
                    let attachment = format!("{}-{}", name, driver.name());
                    if let Err(e) = self.reporter.attach_png(&self.test_id, &attachment, &png) {
                        warn!("Failed to attach screenshot '{}': {}", attachment, e);
                    }
                }
                Err(e) => warn!("Screenshot from '{}' failed: {}", driver.name(), e),
            }
        }
    }

    /// Surface every soft failure of this test at once.
    pub fn finish(self) -> Result<TestReport, CheckError> {
        let report = self.into_report();
        if report.passed {
            Ok(report)
        } else {
            Err(CheckError::SoftAssertions {
                test_id: report.test_id.clone(),
                count: report.failures.len(),
                report: report.render_failures(),
            })
        }
    }

    /// Panic with all soft failures, for use at the end of `#[test]` functions.
    pub fn assert_all(self) {
        if let Err(e) = self.finish() {
            panic!("{e}");
        }
    }

    pub fn into_report(self) -> TestReport {
        TestReport {
            passed: !self.checks.has_failures(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            checks: self.checks.total(),
            steps: self.steps.iter().map(|s| s.label.clone()).collect(),
            failures: self.checks.failures,
            failed_logs: self.failed_logs,
            test_id: self.test_id,
        }
    }
}

/// Outcome of one test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub test_id: String,
    pub passed: bool,
    pub duration_ms: u64,
    pub checks: usize,
    pub steps: Vec<String>,
    pub failures: Vec<CheckFailure>,
    pub failed_logs: Vec<FailedLog>,
}

impl TestReport {
    pub fn render_failures(&self) -> String {
        render_failures(&self.failures)
    }
}

/// Results of every test in a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestReport>,
    /// Failed logs across all tests, in the order they happened
    pub all_failed_logs: Vec<FailedLog>,
}

/// Hands out test contexts and collects their reports
pub struct Session {
    reporter: Arc<dyn Reporter>,
    results: Vec<TestReport>,
    started: Instant,
}

impl Session {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            results: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn start_test(&self, test_id: impl Into<String>) -> TestContext {
        let ctx = TestContext::new(test_id, Arc::clone(&self.reporter));
        info!("=== {} ===", ctx.test_id);
        ctx
    }

    /// Record the test outcome; returns the soft failures, if any.
    pub fn finish_test(&mut self, ctx: TestContext) -> Result<(), CheckError> {
        let report = ctx.into_report();
        let outcome = if report.passed {
            info!("✓ {} ({} ms)", report.test_id, report.duration_ms);
            Ok(())
        } else {
            warn!("✗ {} - {} failed check(s)", report.test_id, report.failures.len());
            Err(CheckError::SoftAssertions {
                test_id: report.test_id.clone(),
                count: report.failures.len(),
                report: report.render_failures(),
            })
        };
        self.results.push(report);
        outcome
    }

    pub fn summary(&self) -> SessionSummary {
        let passed = self.results.iter().filter(|r| r.passed).count();
        SessionSummary {
            total: self.results.len(),
            passed,
            failed: self.results.len() - passed,
            duration_ms: self.started.elapsed().as_millis() as u64,
            results: self.results.clone(),
            all_failed_logs: self
                .results
                .iter()
                .flat_map(|r| r.failed_logs.iter().cloned())
                .collect(),
        }
    }
}
