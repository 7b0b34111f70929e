//! TradeCheck E2E Test Framework
//!
//! This crate provides what trading-platform UI/API tests are written
//! against:
//! - Soft assertions that record failures and let the test continue
//! - Field-level dictionary comparison with percentage tolerance for prices
//! - W3C WebDriver sessions with retry of flaky element interactions
//! - A trading API client with exponential backoff
//! - Attachments (verify tables, screenshots) and a JSON run summary
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Session (one per test run)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestContext (one per test)                                 │
//! │    ├── step(label)            -> StepLog                    │
//! │    ├── attach_driver(handle)  -> screenshots on failure     │
//! │    ├── assert_* / soft_assert -> SoftChecks                 │
//! │    │     ├── compare_dict(actual, expected, tolerance, op)  │
//! │    │     └── compare_with_tolerance(actual, expected, pct)  │
//! │    └── finish()               -> TestReport | CheckError    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Reporter                                                   │
//! │    ├── attach_text  (verify tables)                         │
//! │    └── attach_png   (failed / broken screenshots)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use tradecheck_e2e::{MemoryReporter, Session, ToleranceSpec};
//!
//! let mut session = Session::new(Arc::new(MemoryReporter::default()));
//! let mut ctx = session.start_test("test_place_order");
//!
//! ctx.step("Verify order details");
//! ctx.assert_dict(
//!     json!({"price": 100.0, "side": "BUY"}),
//!     json!({"price": 100.3, "side": "BUY"}),
//!     "",
//!     &ToleranceSpec::none().with_field("price", 1.0),
//! )
//! .unwrap();
//!
//! session.finish_test(ctx).unwrap();
//! ```

pub mod api;
pub mod compare;
pub mod context;
pub mod driver;
pub mod error;
pub mod notification;
pub mod op;
pub mod report;
pub mod retry;
pub mod softcheck;
pub mod tolerance;

pub use api::{ApiClient, RequestOptions};
pub use compare::{compare_dict, DictComparisonResult, ToleranceInfo};
pub use context::{Session, SessionSummary, TestContext, TestReport};
pub use driver::{Browser, DriverManager, Locator, Screenshotter, WebDriverSession};
pub use error::{CheckError, E2eError, E2eResult};
pub use op::CompareOp;
pub use report::{ArtifactReporter, MemoryReporter, Reporter};
pub use retry::{retry_interaction, RetryPolicy};
pub use softcheck::{AssertOutcome, NotificationOptions, DEFAULT_ALMOST_EQUAL_PERCENT};
pub use tolerance::{compare_with_tolerance, ComparisonResult, ToleranceSpec};
