//! Page Object Model Support
//!
//! A page object owns a fixed set of locators for one view of the UI and
//! exposes actions and checks in the vocabulary of that view. Locators are
//! resolved lazily, so a page object stays valid across reloads.

use crate::locator::Locator;
use crate::result::ScadaResult;
use crate::wait::ElementState;
use async_trait::async_trait;

/// Trait for page objects representing one top-level view of the UI.
///
/// # Example
///
/// ```ignore
/// impl PageObject for LoginPage {
///     fn root(&self) -> &Locator {
///         &self.login_section
///     }
/// }
///
/// assert!(login_page.is_visible().await?);
/// ```
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Locator of the section that contains this view
    fn root(&self) -> &Locator;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether the view is currently rendered
    async fn is_visible(&self) -> ScadaResult<bool> {
        self.root().is_visible().await
    }

    /// Wait until the view is rendered
    async fn wait_until_shown(&self, timeout_ms: u64) -> ScadaResult<()> {
        tracing::debug!(page = self.page_name(), timeout_ms, "waiting for view");
        self.root()
            .wait_for_state(ElementState::Visible, timeout_ms)
            .await
    }

    /// Wait until the view is no longer rendered
    async fn wait_until_gone(&self, timeout_ms: u64) -> ScadaResult<()> {
        self.root()
            .wait_for_state(ElementState::Hidden, timeout_ms)
            .await
    }
}
