//! Result and error types for the SCADA UI suite.

use thiserror::Error;

/// Result type for suite operations
pub type ScadaResult<T> = Result<T, ScadaError>;

/// Errors that can occur while driving the operator UI
#[derive(Debug, Error)]
pub enum ScadaError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page or driver error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A wait condition never became true within its bound
    #[error("Timed out after {ms}ms waiting for {condition}")]
    Timeout {
        /// What was being waited for
        condition: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The referenced element never matched
    #[error("No element matches {selector}")]
    ElementNotFound {
        /// Selector description
        selector: String,
    },

    /// An action targeted a selector that matched several elements
    #[error("Strict mode violation: {selector} resolved to {count} elements")]
    StrictModeViolation {
        /// Selector description
        selector: String,
        /// Number of matches
        count: usize,
    },

    /// Element exists but cannot take the requested action
    #[error("Cannot {action} {selector}: {reason}")]
    NotActionable {
        /// Action name (fill, click)
        action: &'static str,
        /// Selector description
        selector: String,
        /// Why the action was refused
        reason: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Fixture error (setup/teardown failed)
    #[error("Fixture error: {message}")]
    FixtureError {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ScadaError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(condition: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            condition: condition.into(),
            ms,
        }
    }

    /// True for wait-deadline failures
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Fail with an assertion error unless `condition` holds.
///
/// # Errors
///
/// Returns [`ScadaError::AssertionFailed`] carrying `message`.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> ScadaResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ScadaError::assertion(message()))
    }
}
