//! Retrying expectations on locators (Playwright's `expect()`).
//!
//! Each expectation polls the live page until it holds or its timeout
//! passes. A failure reports the expected and the last observed state.

use crate::driver::ElementSnapshot;
use crate::locator::Locator;
use crate::result::{ScadaError, ScadaResult};
use crate::wait::{self, WaitOptions};

/// Create an expectation for a locator
///
/// # Example
///
/// ```ignore
/// expect(&dashboard.status_indicator()).to_have_text("Connected").await?;
/// ```
#[must_use]
pub fn expect(locator: &Locator) -> Expect {
    Expect {
        locator: locator.clone(),
        options: locator.options(),
    }
}

/// Expectation builder bound to one locator
#[derive(Debug, Clone)]
pub struct Expect {
    locator: Locator,
    options: WaitOptions,
}

impl Expect {
    /// Override the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.with_timeout(timeout_ms);
        self
    }

    /// Poll until `check` accepts the current snapshot
    async fn hold<F>(&self, expectation: &str, check: F) -> ScadaResult<()>
    where
        F: Fn(Option<&ElementSnapshot>) -> bool + Send + Sync,
    {
        let locator = &self.locator;
        let check = &check;
        let outcome = wait::poll_until(self.options, move || async move {
            let snapshot = locator.snapshot().await?;
            Ok(check(snapshot.as_ref()).then_some(()))
        })
        .await?;

        if outcome.is_ready() {
            return Ok(());
        }

        let actual = match locator.snapshot().await? {
            None => "no matching element".to_string(),
            Some(s) => format!(
                "{} element with text {:?} (visible: {}, enabled: {})",
                s.tag,
                s.text.unwrap_or_default(),
                s.visible,
                s.enabled
            ),
        };
        tracing::debug!(
            selector = %locator.description(),
            expectation,
            %actual,
            "expectation failed"
        );
        Err(ScadaError::assertion(format!(
            "expected {} {expectation} within {}ms, found {actual}",
            locator.description(),
            self.options.timeout_ms
        )))
    }

    /// Element is rendered
    pub async fn to_be_visible(&self) -> ScadaResult<()> {
        self.hold("to be visible", |s| s.is_some_and(|s| s.visible))
            .await
    }

    /// Element is absent or not rendered
    pub async fn to_be_hidden(&self) -> ScadaResult<()> {
        self.hold("to be hidden", |s| !s.is_some_and(|s| s.visible))
            .await
    }

    /// Element exists and is enabled
    pub async fn to_be_enabled(&self) -> ScadaResult<()> {
        self.hold("to be enabled", |s| s.is_some_and(|s| s.enabled))
            .await
    }

    /// Trimmed text equals `expected`
    pub async fn to_have_text(&self, expected: &str) -> ScadaResult<()> {
        self.hold(&format!("to have text {expected:?}"), |s| {
            text_of(s).is_some_and(|t| t.trim() == expected)
        })
        .await
    }

    /// Trimmed text differs from `unexpected` (an element must be present)
    pub async fn not_to_have_text(&self, unexpected: &str) -> ScadaResult<()> {
        self.hold(&format!("not to have text {unexpected:?}"), |s| {
            text_of(s).is_some_and(|t| t.trim() != unexpected)
        })
        .await
    }

    /// Text contains `fragment`
    pub async fn to_contain_text(&self, fragment: &str) -> ScadaResult<()> {
        self.hold(&format!("to contain text {fragment:?}"), |s| {
            text_of(s).is_some_and(|t| t.contains(fragment))
        })
        .await
    }

    /// Selector matches exactly `expected` elements
    pub async fn to_have_count(&self, expected: usize) -> ScadaResult<()> {
        let locator = &self.locator;
        let outcome = wait::poll_until(self.options, move || async move {
            Ok((locator.count().await? == expected).then_some(()))
        })
        .await?;
        if outcome.is_ready() {
            return Ok(());
        }
        let actual = locator.count().await?;
        Err(ScadaError::assertion(format!(
            "expected {} to match {expected} elements within {}ms, found {actual}",
            locator.selector(),
            self.options.timeout_ms
        )))
    }
}

fn text_of(snapshot: Option<&ElementSnapshot>) -> Option<&str> {
    snapshot.map(|s| s.text.as_deref().unwrap_or_default())
}
