//! Locator abstraction for element selection and interaction.
//!
//! # Design Philosophy
//!
//! - **Lazy**: a locator stores only a selector; it is resolved against the
//!   live page on every query and never caches an element across reloads
//! - **Auto-Waiting**: actions wait for the target to be visible and enabled
//! - **Strict Selection**: actions fail if several elements match and no
//!   index was chosen with [`Locator::nth`]

use crate::driver::{ElementSnapshot, PageDriver};
use crate::result::{ScadaError, ScadaResult};
use crate::wait::{self, ElementState, WaitOptions};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// ARIA roles recognised by [`Selector::Role`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    /// `h1`-`h6`
    Heading,
    /// `button`
    Button,
    /// `input`
    Textbox,
    /// `table`
    Table,
    /// `tr`
    Row,
    /// `td`
    Cell,
}

impl AriaRole {
    /// Role name as written in ARIA
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Button => "button",
            Self::Textbox => "textbox",
            Self::Table => "table",
            Self::Row => "row",
            Self::Cell => "cell",
        }
    }

    /// Implicit role of an HTML tag
    #[must_use]
    pub fn for_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(Self::Heading),
            "button" => Some(Self::Button),
            "input" | "textarea" => Some(Self::Textbox),
            "table" => Some(Self::Table),
            "tr" => Some(Self::Row),
            "td" => Some(Self::Cell),
            _ => None,
        }
    }

    /// CSS selecting elements with this role
    #[must_use]
    pub const fn css(&self) -> &'static str {
        match self {
            Self::Heading => "h1, h2, h3, h4, h5, h6, [role=heading]",
            Self::Button => "button, [role=button]",
            Self::Textbox => "input, textarea, [role=textbox]",
            Self::Table => "table, [role=table]",
            Self::Row => "tr, [role=row]",
            Self::Cell => "td, [role=cell]",
        }
    }
}

/// Accessible-name match used by role selectors: case-insensitive substring
/// of the trimmed text.
#[must_use]
pub fn accessible_name_matches(name: &str, text: &str) -> bool {
    text.trim().to_lowercase().contains(&name.to_lowercase())
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., "#sensors-body tr")
    Css(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// Role plus accessible name (e.g., heading "Dashboard")
    Role {
        /// ARIA role
        role: AriaRole,
        /// Accessible name to match
        name: String,
    },
    /// Text content selector
    Text(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: AriaRole, name: impl Into<String>) -> Self {
        Self::Role {
            role,
            name: name.into(),
        }
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// JavaScript expression evaluating to an array of every match, in
    /// document order
    #[must_use]
    pub fn to_js_all(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::TestId(id) => {
                let css = format!("[data-testid=\"{id}\"]");
                format!("Array.from(document.querySelectorAll({}))", js_string(&css))
            }
            Self::Role { role, name } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => (el.textContent || '').trim().toLowerCase().includes({}))",
                js_string(role.css()),
                js_string(&name.to_lowercase())
            ),
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => el.children.length === 0 && (el.textContent || '').includes({}))",
                js_string(t)
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => f.write_str(s),
            Self::TestId(id) => write!(f, "[data-testid=\"{id}\"]"),
            Self::Role { role, name } => write!(f, "role={}[name=\"{name}\"]", role.as_str()),
            Self::Text(t) => write!(f, "text=\"{t}\""),
        }
    }
}

/// Quote a string as a JavaScript literal
#[must_use]
pub fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Capability every UI region handle offers to page objects
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Replace the element's value
    async fn fill(&self, text: &str) -> ScadaResult<()>;
    /// Click the element
    async fn click(&self) -> ScadaResult<()>;
    /// Wait until the element reaches `state` within `timeout_ms`
    async fn wait_for(&self, state: ElementState, timeout_ms: u64) -> ScadaResult<()>;
    /// Text content of the element
    async fn text_content(&self) -> ScadaResult<String>;
}

/// A locator for finding and interacting with elements.
#[derive(Debug, Clone)]
pub struct Locator {
    driver: Arc<dyn PageDriver>,
    selector: Selector,
    index: Option<usize>,
    options: WaitOptions,
}

impl Locator {
    /// Create a new locator bound to a page driver
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, selector: Selector) -> Self {
        Self {
            driver,
            selector,
            index: None,
            options: WaitOptions::default(),
        }
    }

    /// Narrow to the `index`-th match (zero-based)
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self {
            index: Some(index),
            ..self.clone()
        }
    }

    /// Narrow to the first match
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Override the auto-wait timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.with_timeout(timeout_ms);
        self
    }

    /// Override wait options
    #[must_use]
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Wait options used by auto-waiting operations
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    /// Human readable description used in errors
    #[must_use]
    pub fn description(&self) -> String {
        match self.index {
            Some(i) => format!("{} >> nth={i}", self.selector),
            None => self.selector.to_string(),
        }
    }

    /// Number of elements currently matching the selector
    pub async fn count(&self) -> ScadaResult<usize> {
        self.driver.count(&self.selector).await
    }

    /// Resolve the target now, enforcing strictness when no index was chosen
    async fn resolve(&self) -> ScadaResult<Option<ElementSnapshot>> {
        match self.index {
            Some(index) => self.driver.snapshot(&self.selector, index).await,
            None => {
                let count = self.driver.count(&self.selector).await?;
                match count {
                    0 => Ok(None),
                    1 => self.driver.snapshot(&self.selector, 0).await,
                    _ => Err(ScadaError::StrictModeViolation {
                        selector: self.description(),
                        count,
                    }),
                }
            }
        }
    }

    /// Snapshot of the target as it is right now
    pub async fn snapshot(&self) -> ScadaResult<Option<ElementSnapshot>> {
        self.resolve().await
    }

    /// Whether the target is currently visible (no waiting)
    pub async fn is_visible(&self) -> ScadaResult<bool> {
        Ok(self.resolve().await?.is_some_and(|s| s.visible))
    }

    /// Whether the target is currently enabled (no waiting)
    pub async fn is_enabled(&self) -> ScadaResult<bool> {
        Ok(self.resolve().await?.is_some_and(|s| s.enabled))
    }

    /// Text of every match, read in one pass
    pub async fn all_text_contents(&self) -> ScadaResult<Vec<String>> {
        let snapshots = self.driver.snapshot_all(&self.selector).await?;
        Ok(snapshots
            .into_iter()
            .map(|s| s.text.unwrap_or_default())
            .collect())
    }

    /// Wait until the target reaches `state` within `timeout_ms`
    pub async fn wait_for_state(&self, state: ElementState, timeout_ms: u64) -> ScadaResult<()> {
        let options = self.options.with_timeout(timeout_ms);
        let condition = format!("{} to be {state}", self.description());
        wait::wait_for(options, condition, move || async move {
            let snapshot = self.resolve().await?;
            Ok(state.is_satisfied_by(snapshot.as_ref()).then_some(()))
        })
        .await
    }

    /// Wait until the target is visible and enabled, then return it
    async fn wait_actionable(&self, action: &'static str) -> ScadaResult<ElementSnapshot> {
        let outcome = wait::poll_until(self.options, move || async move {
            Ok(self
                .resolve()
                .await?
                .filter(|s| s.visible && s.enabled))
        })
        .await?;

        if let wait::WaitOutcome::Ready { value, .. } = outcome {
            return Ok(value);
        }

        tracing::debug!(selector = %self.description(), action, "target not actionable");
        match self.resolve().await? {
            None => Err(ScadaError::timeout(
                format!("{} to {action}", self.description()),
                self.options.timeout_ms,
            )),
            Some(snapshot) => Err(ScadaError::NotActionable {
                action,
                selector: self.description(),
                reason: if snapshot.visible {
                    "element is disabled".into()
                } else {
                    "element is not visible".into()
                },
            }),
        }
    }

    /// Fill the target after it becomes actionable
    pub async fn fill(&self, text: &str) -> ScadaResult<()> {
        self.wait_actionable("fill").await?;
        tracing::debug!(selector = %self.description(), "fill");
        self.driver
            .fill(&self.selector, self.index.unwrap_or(0), text)
            .await
    }

    /// Click the target after it becomes actionable
    pub async fn click(&self) -> ScadaResult<()> {
        self.wait_actionable("click").await?;
        tracing::debug!(selector = %self.description(), "click");
        self.driver.click(&self.selector, self.index.unwrap_or(0)).await
    }

    /// Text content of the target, waiting for it to be attached.
    ///
    /// Fails with [`ScadaError::ElementNotFound`] if nothing ever matches.
    pub async fn text_content(&self) -> ScadaResult<String> {
        let outcome = wait::poll_until(self.options, move || self.resolve()).await?;
        match outcome {
            wait::WaitOutcome::Ready { value, .. } => Ok(value.text.unwrap_or_default()),
            wait::WaitOutcome::TimedOut { .. } => Err(ScadaError::ElementNotFound {
                selector: self.description(),
            }),
        }
    }
}

#[async_trait]
impl ElementHandle for Locator {
    async fn fill(&self, text: &str) -> ScadaResult<()> {
        Self::fill(self, text).await
    }

    async fn click(&self) -> ScadaResult<()> {
        Self::click(self).await
    }

    async fn wait_for(&self, state: ElementState, timeout_ms: u64) -> ScadaResult<()> {
        self.wait_for_state(state, timeout_ms).await
    }

    async fn text_content(&self) -> ScadaResult<String> {
        Self::text_content(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_display_forms() {
            assert_eq!(Selector::css("#sensors-body tr").to_string(), "#sensors-body tr");
            assert_eq!(
                Selector::test_id("sensor-value").to_string(),
                "[data-testid=\"sensor-value\"]"
            );
            assert_eq!(
                Selector::role(AriaRole::Heading, "Dashboard").to_string(),
                "role=heading[name=\"Dashboard\"]"
            );
        }

        #[test]
        fn test_js_all_for_test_id() {
            let js = Selector::test_id("username").to_js_all();
            assert!(js.starts_with("Array.from(document.querySelectorAll("));
            assert!(js.contains(r#"[data-testid=\"username\"]"#));
        }

        #[test]
        fn test_js_all_role_filters_by_name() {
            let js = Selector::role(AriaRole::Heading, "Login").to_js_all();
            assert!(js.contains("h1, h2"));
            assert!(js.contains("\"login\""));
        }

        #[test]
        fn test_js_string_escapes_quotes() {
            assert_eq!(js_string("a\"b"), r#""a\"b""#);
        }
    }

    mod role_tests {
        use super::*;

        #[test]
        fn test_roles_for_tags() {
            assert_eq!(AriaRole::for_tag("h1"), Some(AriaRole::Heading));
            assert_eq!(AriaRole::for_tag("td"), Some(AriaRole::Cell));
            assert_eq!(AriaRole::for_tag("section"), None);
        }

        #[test]
        fn test_accessible_name_is_case_insensitive_substring() {
            assert!(accessible_name_matches("dashboard", "  SCADA Dashboard "));
            assert!(accessible_name_matches("Login", "Login"));
            assert!(!accessible_name_matches("Login", "Dashboard"));
        }
    }

    mod locator_tests {
        use super::*;
        use crate::browser::Browser;
        use crate::context::ContextConfig;
        use crate::page::Page;

        async fn login_page() -> (Page, tempfile::TempDir) {
            let dir = tempfile::tempdir().unwrap();
            let html = dir.path().join("scada_ui.html");
            std::fs::write(&html, "<html></html>").unwrap();
            let context = Browser::simulated()
                .new_context(ContextConfig::default())
                .await
                .unwrap();
            let page = context.new_page().await.unwrap();
            page.goto(&format!("file://{}", html.display())).await.unwrap();
            (page, dir)
        }

        #[tokio::test(start_paused = true)]
        async fn test_ambiguous_selector_is_strict_violation() {
            let (page, _dir) = login_page().await;
            let err = page.locator("section").is_visible().await.unwrap_err();
            assert!(matches!(err, ScadaError::StrictModeViolation { count: 2, .. }));
            assert!(page.locator("section").first().is_visible().await.is_ok());
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_target_is_not_actionable() {
            let (page, _dir) = login_page().await;
            let err = page
                .locator("#dashboard-page")
                .with_timeout(200)
                .click()
                .await
                .unwrap_err();
            assert!(err.to_string().contains("not visible"), "{err}");
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_text_target_is_not_found() {
            let (page, _dir) = login_page().await;
            let err = page
                .get_by_test_id("sensor-value")
                .nth(0)
                .with_timeout(150)
                .text_content()
                .await
                .unwrap_err();
            assert!(matches!(err, ScadaError::ElementNotFound { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_drives_login_to_dashboard() {
            let (page, _dir) = login_page().await;
            let handles: [&dyn ElementHandle; 2] = [
                &page.get_by_test_id("username"),
                &page.get_by_test_id("password"),
            ];
            for handle in handles {
                handle.fill("operator").await.unwrap();
            }

            let button: &dyn ElementHandle = &page.get_by_test_id("login-button");
            button.click().await.unwrap();

            let table: &dyn ElementHandle = &page.get_by_test_id("sensors-table");
            table.wait_for(ElementState::Visible, 2000).await.unwrap();
            let heading = page.locator("#dashboard-page h1");
            assert_eq!(ElementHandle::text_content(&heading).await.unwrap(), "Dashboard");
        }
    }
}
