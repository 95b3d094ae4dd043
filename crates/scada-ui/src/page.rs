//! Page handle: locator factories, navigation and per-page interception.

use crate::context::StorageState;
use crate::driver::{FetchResponse, PageDriver};
use crate::locator::{AriaRole, Locator, Selector};
use crate::network::{
    HttpMethod, InterceptedRequest, Network, ResponseEvent, ResponseWaiter, Route, RouteAction,
    UrlPattern,
};
use crate::result::ScadaResult;
use crate::wait::WaitOptions;
use std::sync::Arc;

/// One browser page
#[derive(Debug, Clone)]
pub struct Page {
    id: String,
    driver: Arc<dyn PageDriver>,
    network: Arc<Network>,
    options: WaitOptions,
}

impl Page {
    /// Wrap a driver and its network layer
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, network: Arc<Network>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            driver,
            network,
            options: WaitOptions::default(),
        }
    }

    /// Page identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set timeout and poll interval used by locators created afterwards
    #[must_use]
    pub const fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Default wait options for this page
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.options
    }

    /// Network layer of this page
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    // -------------------------------------------------------------------------
    // Locators
    // -------------------------------------------------------------------------

    fn bind(&self, selector: Selector) -> Locator {
        Locator::new(self.driver.clone(), selector).with_options(self.options)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn locator(&self, css: &str) -> Locator {
        self.bind(Selector::css(css))
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn get_by_test_id(&self, id: &str) -> Locator {
        self.bind(Selector::test_id(id))
    }

    /// Locate by ARIA role and accessible name
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, name: &str) -> Locator {
        self.bind(Selector::role(role, name))
    }

    /// Locate by visible text
    #[must_use]
    pub fn get_by_text(&self, text: &str) -> Locator {
        self.bind(Selector::text(text))
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Navigate to `url` and wait for the document to load
    pub async fn goto(&self, url: &str) -> ScadaResult<()> {
        tracing::info!(page = %self.id, %url, "goto");
        self.driver.goto(url).await
    }

    /// Current document URL
    pub async fn url(&self) -> ScadaResult<String> {
        self.driver.current_url().await
    }

    /// Issue a `fetch` from the page context
    pub async fn fetch(&self, method: HttpMethod, url: &str) -> ScadaResult<FetchResponse> {
        tracing::debug!(page = %self.id, %method, %url, "fetch");
        self.driver.fetch(method, url).await
    }

    /// Local storage visible to this page
    pub async fn storage_state(&self) -> ScadaResult<StorageState> {
        self.driver.storage_state().await
    }

    /// Close the page
    pub async fn close(&self) -> ScadaResult<()> {
        self.driver.close().await
    }

    // -------------------------------------------------------------------------
    // Interception
    // -------------------------------------------------------------------------

    /// Intercept requests matching `pattern` with a handler
    pub fn route<F>(&self, pattern: impl Into<UrlPattern>, handler: F)
    where
        F: Fn(&InterceptedRequest) -> RouteAction + Send + Sync + 'static,
    {
        self.network
            .route(Route::new(pattern.into(), HttpMethod::Any, handler));
    }

    /// Observe every response the page receives
    pub fn on_response<F>(&self, listener: F)
    where
        F: Fn(&ResponseEvent) + Send + Sync + 'static,
    {
        self.network.on_response(listener);
    }

    /// Expect a response matching `pattern`; create before the triggering
    /// action
    #[must_use]
    pub fn expect_response(&self, pattern: impl Into<UrlPattern>) -> ResponseWaiter {
        self.network.expect_response(pattern.into())
    }

    /// Default timeout for [`ResponseWaiter::wait`] on this page
    #[must_use]
    pub const fn default_timeout_ms(&self) -> u64 {
        self.options.timeout_ms
    }
}
