//! Suite fixtures: the HTML document under test, mocked pages and an
//! authenticated context.

use crate::backend::MockBackend;
use crate::browser::Browser;
use crate::config::SuiteConfig;
use crate::context::{BrowserContext, ContextConfig};
use crate::page::Page;
use crate::pages::LoginPage;
use crate::result::{ScadaError, ScadaResult};
use crate::wait::{ElementState, WaitOptions};
use std::path::{Path, PathBuf};

/// Bundled operator UI document, relative to this crate
pub const HTML_FIXTURE: &str = "fixtures/scada_ui.html";

/// Credentials used to build the authenticated context
const STORAGE_USERNAME: &str = "operator";
const STORAGE_PASSWORD: &str = "password";

/// Browser plus the document every scenario loads
#[derive(Debug)]
pub struct ScadaFixture {
    browser: Browser,
    html_path: PathBuf,
    options: WaitOptions,
}

impl ScadaFixture {
    /// Wrap an already launched browser
    #[must_use]
    pub fn new(browser: Browser, html_path: impl Into<PathBuf>) -> Self {
        Self {
            browser,
            html_path: html_path.into(),
            options: WaitOptions::default(),
        }
    }

    /// Launch the configured engine and check that the document exists
    pub async fn launch(config: &SuiteConfig) -> ScadaResult<Self> {
        config.validate()?;
        let html_path = config.resolved_html_path();
        if !html_path.is_file() {
            return Err(ScadaError::FixtureError {
                message: format!("HTML fixture not found: {}", html_path.display()),
            });
        }
        let browser = Browser::launch(config.browser_config()).await?;
        Ok(Self::new(browser, html_path).with_wait_options(config.wait_options()))
    }

    /// Path of the bundled document
    #[must_use]
    pub fn default_html_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(HTML_FIXTURE)
    }

    /// Wait options applied to every page this fixture opens
    #[must_use]
    pub const fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Underlying browser
    #[must_use]
    pub const fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Document path
    #[must_use]
    pub fn html_path(&self) -> &Path {
        &self.html_path
    }

    /// Wait options of opened pages
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.options
    }

    /// `file://` URL of the document
    #[must_use]
    pub fn file_url(&self) -> String {
        let path = self
            .html_path
            .canonicalize()
            .unwrap_or_else(|_| self.html_path.clone());
        format!("file://{}", path.display())
    }

    /// Operator session settings: 1280x720, `ru-RU`
    #[must_use]
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig::new("scada-operator")
    }

    /// Fresh isolated context
    pub async fn new_context(&self) -> ScadaResult<BrowserContext> {
        self.browser.new_context(self.context_config()).await
    }

    /// Blank page carrying the fixture's wait options
    pub async fn new_page(&self, context: &BrowserContext) -> ScadaResult<Page> {
        Ok(context.new_page().await?.with_wait_options(self.options))
    }

    /// Page with the default login and sensor mocks, navigated to the
    /// document
    pub async fn page_with_routes(&self, context: &BrowserContext) -> ScadaResult<Page> {
        let page = self.new_page(context).await?;
        MockBackend::new().install(&page)?;
        page.goto(&self.file_url()).await?;
        Ok(page)
    }

    /// Fresh context seeded with the storage of a completed login.
    ///
    /// The login runs without routes in a throwaway context, so the
    /// document signs in offline.
    pub async fn context_with_storage(&self) -> ScadaResult<BrowserContext> {
        let seed = self.new_context().await?;
        let page = self.new_page(&seed).await?;
        page.goto(&self.file_url()).await?;
        LoginPage::new(&page)
            .login(STORAGE_USERNAME, STORAGE_PASSWORD)
            .await?;
        page.get_by_test_id("sensors-table")
            .wait_for_state(ElementState::Visible, self.options.timeout_ms)
            .await?;

        let state = seed.storage_state().await?;
        seed.close().await?;
        if state.is_empty() {
            return Err(ScadaError::FixtureError {
                message: "login left no session in local storage".into(),
            });
        }
        tracing::debug!(origins = state.local_storage.len(), "captured storage state");
        self.browser
            .new_context(self.context_config().with_storage_state(state))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FILE_ORIGIN;
    use crate::pages::DashboardPage;
    use crate::page_object::PageObject;
    use crate::sim::SESSION_KEY;

    fn fixture() -> (ScadaFixture, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("scada_ui.html");
        std::fs::write(&html, "<html></html>").unwrap();
        (ScadaFixture::new(Browser::simulated(), html), dir)
    }

    #[test]
    fn test_bundled_document_exists() {
        assert!(ScadaFixture::default_html_path().is_file());
    }

    #[test]
    fn test_file_url() {
        let (fixture, _dir) = fixture();
        let url = fixture.file_url();
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("scada_ui.html"));
    }

    #[test]
    fn test_context_config_matches_operator_session() {
        let (fixture, _dir) = fixture();
        let config = fixture.context_config();
        assert_eq!((config.viewport_width, config.viewport_height), (1280, 720));
        assert_eq!(config.locale, "ru-RU");
        assert!(config.storage_state.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_rejects_missing_document() {
        let config = SuiteConfig::default().with_html_path("/no/such/scada_ui.html");
        let err = ScadaFixture::launch(&config).await.unwrap_err();
        assert!(matches!(err, ScadaError::FixtureError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_with_routes_shows_login() {
        let (fixture, _dir) = fixture();
        let context = fixture.new_context().await.unwrap();
        let page = fixture.page_with_routes(&context).await.unwrap();
        assert_eq!(page.network().route_count(), 2);
        assert!(LoginPage::new(&page).is_visible().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_with_storage_restores_session() {
        let (fixture, _dir) = fixture();
        let context = fixture.context_with_storage().await.unwrap();
        let seeded = context.config().storage_state.clone().unwrap();
        assert!(seeded.get_item(FILE_ORIGIN, SESSION_KEY).is_some());

        let page = fixture.new_page(&context).await.unwrap();
        page.goto(&fixture.file_url()).await.unwrap();
        assert!(DashboardPage::new(&page).is_visible().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_inherit_wait_options() {
        let (fixture, _dir) = fixture();
        let fixture = fixture.with_wait_options(WaitOptions::new().with_timeout(777));
        let context = fixture.new_context().await.unwrap();
        let page = fixture.new_page(&context).await.unwrap();
        assert_eq!(page.locator("#app").options().timeout_ms, 777);
    }
}
