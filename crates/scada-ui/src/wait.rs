//! Wait Mechanisms
//!
//! Bounded condition waits: a probe is sampled every poll interval until it
//! yields a value or the deadline passes. The loop itself reports a
//! [`WaitOutcome`]; only callers that give up turn a timeout into an error.

use crate::driver::ElementSnapshot;
use crate::result::{ScadaError, ScadaResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for locator waits and expectations (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// ELEMENT STATES
// =============================================================================

/// Element states a locator can wait for (Playwright's `wait_for(state=...)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// Present in the page tree
    Attached,
    /// Absent from the page tree
    Detached,
    /// Present and rendered
    Visible,
    /// Absent or not rendered
    Hidden,
}

impl ElementState {
    /// Check a snapshot (or its absence) against this state
    #[must_use]
    pub fn is_satisfied_by(&self, snapshot: Option<&ElementSnapshot>) -> bool {
        match self {
            Self::Attached => snapshot.is_some(),
            Self::Detached => snapshot.is_none(),
            Self::Visible => snapshot.is_some_and(|s| s.visible),
            Self::Hidden => !snapshot.is_some_and(|s| s.visible),
        }
    }

    /// Lowercase name used in messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// Result of a bounded wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The probe produced a value before the deadline
    Ready {
        /// Value produced by the probe
        value: T,
        /// Time spent waiting
        elapsed: Duration,
    },
    /// The deadline passed without the probe producing a value
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
    },
}

impl<T> WaitOutcome<T> {
    /// Whether the condition was met
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Time spent waiting
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. } | Self::TimedOut { elapsed } => *elapsed,
        }
    }

    /// Turn a timeout into [`ScadaError::Timeout`]
    pub fn into_result(self, condition: impl Into<String>, timeout_ms: u64) -> ScadaResult<T> {
        match self {
            Self::Ready { value, .. } => Ok(value),
            Self::TimedOut { .. } => Err(ScadaError::timeout(condition, timeout_ms)),
        }
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Sample `probe` until it yields `Some`, or until the deadline passes.
///
/// The probe is always sampled once more at the deadline, so a condition that
/// becomes true exactly at the bound still counts. Probe errors abort the wait
/// immediately.
pub async fn poll_until<T, F, Fut>(
    options: WaitOptions,
    mut probe: F,
) -> ScadaResult<WaitOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScadaResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();

    loop {
        if let Some(value) = probe().await? {
            return Ok(WaitOutcome::Ready {
                value,
                elapsed: start.elapsed(),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome::TimedOut {
                elapsed: start.elapsed(),
            });
        }
        tokio::time::sleep(options.poll_interval().min(deadline - now)).await;
    }
}

/// [`poll_until`] that fails with a timeout error naming `condition`.
pub async fn wait_for<T, F, Fut>(
    options: WaitOptions,
    condition: impl Into<String>,
    probe: F,
) -> ScadaResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScadaResult<Option<T>>>,
{
    let condition = condition.into();
    let outcome = poll_until(options, probe).await?;
    if !outcome.is_ready() {
        tracing::debug!(%condition, timeout_ms = options.timeout_ms, "wait timed out");
    }
    outcome.into_result(condition, options.timeout_ms)
}
