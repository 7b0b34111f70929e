//! Retry helpers for flaky element interactions and transient API failures

use std::time::Duration;
use tracing::{error, warn};

use crate::context::TestContext;
use crate::error::E2eResult;

/// Retries after the first attempt for element interactions
pub const INTERACTION_RETRIES: usize = 3;

/// Run a browser interaction, retrying stale / not-interactable /
/// click-intercepted failures.
///
/// After the last attempt the failure is logged. With `raise` set, the
/// current step is recorded as failed, a "broken" screenshot is captured and
/// the error is returned; otherwise `Ok(None)` is returned. Errors that are
/// not flaky-interaction errors are returned immediately.
pub fn retry_interaction<T, F>(
    ctx: &mut TestContext,
    locator: &str,
    raise: bool,
    mut op: F,
) -> E2eResult<Option<T>>
where
    F: FnMut() -> E2eResult<T>,
{
    let attempts = INTERACTION_RETRIES + 1;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(Some(value)),
            Err(e) if !e.is_flaky_interaction() => return Err(e),
            Err(e) if attempt < attempts => {
                warn!(
                    "{} for locator {} (attempt {}/{}), retrying...",
                    e, locator, attempt, attempts
                );
            }
            Err(e) => {
                error!("{} for locator {} after {} attempts", e, locator, attempts);
                if raise {
                    if let Some(step) = ctx.steps().last().map(str::to_string) {
                        ctx.add_failed_log(step, e.to_string());
                        ctx.capture_screenshots("broken");
                    }
                    return Err(e);
                }
            }
        }
    }

    Ok(None)
}

/// Exponential backoff for API requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts, for tests
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_retries,
        }
    }

    /// Delay after the failed attempt number `attempt` (0-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(31) as u32);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Screenshotter;
    use crate::error::E2eError;
    use crate::report::MemoryReporter;
    use std::sync::Arc;

    struct FakeDriver;

    impl Screenshotter for FakeDriver {
        fn name(&self) -> &str {
            "fake"
        }

        fn screenshot(&self) -> E2eResult<Vec<u8>> {
            Ok(vec![1, 2, 3])
        }
    }

    fn stale() -> E2eError {
        E2eError::WebDriver {
            error: "stale element reference".to_string(),
            message: "element is not attached".to_string(),
        }
    }

    #[test]
    fn test_recovers_after_flaky_attempts() {
        let mut ctx = TestContext::new("t", Arc::new(MemoryReporter::default()));
        let mut calls = 0;
        let result = retry_interaction(&mut ctx, "#buy", true, || {
            calls += 1;
            if calls < 3 {
                Err(stale())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), Some(3));
        assert!(ctx.failed_logs().is_empty());
    }

    #[test]
    fn test_gives_up_silently_without_raise() {
        let mut ctx = TestContext::new("t", Arc::new(MemoryReporter::default()));
        let mut calls = 0;
        let result: E2eResult<Option<()>> = retry_interaction(&mut ctx, "#buy", false, || {
            calls += 1;
            Err(stale())
        });
        assert!(result.unwrap().is_none());
        assert_eq!(calls, INTERACTION_RETRIES + 1);
    }

    #[test]
    fn test_raise_records_broken_step() {
        let reporter = Arc::new(MemoryReporter::default());
        let mut ctx = TestContext::new("t", reporter.clone());
        ctx.attach_driver(Arc::new(FakeDriver));
        ctx.step("Click buy button");

        let result: E2eResult<Option<()>> = retry_interaction(&mut ctx, "#buy", true, || Err(stale()));
        assert!(result.is_err());
        assert_eq!(ctx.failed_logs()[0].step, "Click buy button");
        assert_eq!(reporter.images()[0].1, "broken-fake");
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let mut ctx = TestContext::new("t", Arc::new(MemoryReporter::default()));
        let mut calls = 0;
        let result: E2eResult<Option<()>> = retry_interaction(&mut ctx, "#buy", false, || {
            calls += 1;
            Err(E2eError::NoSession)
        });
        assert!(matches!(result, Err(E2eError::NoSession)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for(100), Duration::from_secs(10));
    }
}
