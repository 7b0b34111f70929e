//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("WebDriver error ({error}): {message}")]
    WebDriver { error: String, message: String },

    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),

    #[error("No active WebDriver session")]
    NoSession,

    #[error("API request failed with status_code: {status} - {body}")]
    RequestFailed { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Screenshot decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl E2eError {
    /// Transient element errors that are worth retrying
    pub fn is_flaky_interaction(&self) -> bool {
        matches!(
            self,
            E2eError::WebDriver { error, .. }
                if matches!(
                    error.as_str(),
                    "stale element reference"
                        | "element not interactable"
                        | "element click intercepted"
                )
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Errors that cross the soft-assertion boundary.
///
/// Data mismatches never show up here while a test runs; they are tallied
/// and surfaced once by `TestContext::finish`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("{count} soft assertion(s) failed in {test_id}:\n{report}")]
    SoftAssertions {
        test_id: String,
        count: usize,
        report: String,
    },
}
