//! Chromium engine over CDP.
//!
//! Selectors resolve through injected JavaScript, so the Chromium engine
//! answers the same primitive questions as the simulated one. Every request
//! is paused with the Fetch domain and answered from the page's
//! [`Network`]; responses are reported from the Network domain.

use crate::browser::BrowserConfig;
use crate::context::{BrowserContext, ContextConfig, ContextEngine, StorageState, FILE_ORIGIN};
use crate::driver::{ElementSnapshot, FetchResponse, PageDriver};
use crate::locator::{js_string, Selector};
use crate::network::{HttpMethod, InterceptedRequest, Network, ResponseEvent, RouteAction};
use crate::result::{ScadaError, ScadaResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, FulfillRequestParams,
    HeaderEntry, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    self as cdp_network, ErrorReason, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Serializes one element into an [`ElementSnapshot`]
const SNAPSHOT_FN: &str = "el => { \
    const style = getComputedStyle(el); \
    const rect = el.getBoundingClientRect(); \
    return { \
        tag: el.tagName.toLowerCase(), \
        text: el.textContent, \
        visible: style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0, \
        enabled: !el.disabled \
    }; \
}";

/// Origin key of the current document, matching [`FILE_ORIGIN`] for files
const ORIGIN_EXPR: &str = "(location.protocol === 'file:' ? 'file://' : location.origin)";

fn page_error(err: impl std::fmt::Display) -> ScadaError {
    ScadaError::page(err.to_string())
}

fn launch_error(err: impl std::fmt::Display) -> ScadaError {
    ScadaError::BrowserLaunchError {
        message: err.to_string(),
    }
}

// =============================================================================
// BROWSER
// =============================================================================

/// Launched Chromium process
#[derive(Debug)]
pub(crate) struct ChromiumBrowser {
    inner: Arc<Mutex<CdpBrowser>>,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub(crate) async fn launch(config: &BrowserConfig) -> ScadaResult<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .enable_request_intercept();

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(launch_error)?;
        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("Could not auto detect") {
                ScadaError::BrowserNotFound
            } else {
                ScadaError::BrowserLaunchError { message }
            }
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    pub(crate) async fn new_context(&self, config: ContextConfig) -> ScadaResult<BrowserContext> {
        let id = self
            .inner
            .lock()
            .await
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(page_error)?;
        Ok(BrowserContext::new(
            config,
            ContextEngine::Chromium(ChromiumContext {
                browser: self.inner.clone(),
                id,
            }),
        ))
    }

    pub(crate) async fn close(&self) -> ScadaResult<()> {
        let mut browser = self.inner.lock().await;
        browser.close().await.map_err(launch_error)?;
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Isolated CDP browser context
#[derive(Debug)]
pub(crate) struct ChromiumContext {
    browser: Arc<Mutex<CdpBrowser>>,
    id: BrowserContextId,
}

impl ChromiumContext {
    pub(crate) async fn new_page(
        &self,
        network: Arc<Network>,
        config: &ContextConfig,
    ) -> ScadaResult<ChromiumPage> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.id.clone())
            .build()
            .map_err(ScadaError::page)?;
        let page = self
            .browser
            .lock()
            .await
            .new_page(params)
            .await
            .map_err(page_error)?;
        ChromiumPage::attach(page, network, config).await
    }

    pub(crate) async fn dispose(&self) -> ScadaResult<()> {
        self.browser
            .lock()
            .await
            .dispose_browser_context(self.id.clone())
            .await
            .map_err(page_error)
    }
}

// =============================================================================
// PAGE
// =============================================================================

#[derive(Debug, Deserialize)]
struct PageStorage {
    origin: String,
    items: HashMap<String, String>,
}

/// Page driven over CDP
#[derive(Debug)]
pub(crate) struct ChromiumPage {
    page: CdpPage,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumPage {
    /// Apply the context settings and start interception
    async fn attach(
        page: CdpPage,
        network: Arc<Network>,
        config: &ContextConfig,
    ) -> ScadaResult<Self> {
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(config.viewport_width),
            i64::from(config.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(page_error)?;
        page.execute(
            SetLocaleOverrideParams::builder()
                .locale(config.locale.clone())
                .build(),
        )
        .await
        .map_err(page_error)?;

        if let Some(state) = config.storage_state.as_ref().filter(|s| !s.is_empty()) {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(seed_script(state)?))
                .await
                .map_err(page_error)?;
        }

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(page_error)?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(page_error)?;

        let intercept = {
            let page = page.clone();
            let network = network.clone();
            tokio::spawn(async move {
                while let Some(event) = paused.next().await {
                    if let Err(err) = answer(&page, &network, &event).await {
                        tracing::warn!(
                            url = %event.request.url,
                            %err,
                            "failed to answer paused request"
                        );
                    }
                }
            })
        };
        let observe = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                network.publish_response(ResponseEvent {
                    url: event.response.url.clone(),
                    status: u16::try_from(event.response.status).unwrap_or(0),
                    method: HttpMethod::Any,
                });
            }
        });

        page.execute(cdp_network::EnableParams::default())
            .await
            .map_err(page_error)?;
        page.execute(
            fetch::EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern("*").build())
                .build(),
        )
        .await
        .map_err(page_error)?;

        Ok(Self {
            page,
            tasks: vec![intercept, observe],
        })
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> ScadaResult<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(ScadaError::page)?;
        self.page
            .evaluate_expression(params)
            .await
            .map_err(page_error)?
            .into_value()
            .map_err(page_error)
    }

    /// Run `action` (a JS function body over `el`) on the `index`-th match
    async fn act(&self, selector: &Selector, index: usize, action: &str) -> ScadaResult<()> {
        let found: bool = self
            .eval(format!(
                "(() => {{ const el = {}[{index}]; if (!el) return false; {action} return true; }})()",
                selector.to_js_all()
            ))
            .await?;
        if !found {
            return Err(ScadaError::ElementNotFound {
                selector: format!("{selector} >> nth={index}"),
            });
        }
        Ok(())
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Answer one paused request from the routes of `network`
async fn answer(page: &CdpPage, network: &Network, event: &EventRequestPaused) -> ScadaResult<()> {
    let request = InterceptedRequest::new(
        &event.request.url,
        HttpMethod::parse(&event.request.method),
    );
    match network.dispatch(request) {
        RouteAction::Fulfill(response) => {
            let headers: Vec<HeaderEntry> = response
                .wire_headers()
                .into_iter()
                .map(|(name, value)| HeaderEntry::new(name, value))
                .collect();
            let params = FulfillRequestParams::builder()
                .request_id(event.request_id.clone())
                .response_code(i64::from(response.status))
                .response_headers(headers)
                .body(BASE64_STANDARD.encode(&response.body))
                .build()
                .map_err(ScadaError::page)?;
            page.execute(params).await.map_err(page_error)?;
        }
        RouteAction::Abort => {
            page.execute(FailRequestParams::new(
                event.request_id.clone(),
                ErrorReason::Failed,
            ))
            .await
            .map_err(page_error)?;
        }
        RouteAction::Continue => {
            page.execute(ContinueRequestParams::new(event.request_id.clone()))
                .await
                .map_err(page_error)?;
        }
    }
    Ok(())
}

/// Script writing `state` into local storage before any document script
fn seed_script(state: &StorageState) -> ScadaResult<String> {
    let seed = serde_json::to_string(&state.local_storage)?;
    Ok(format!(
        "(() => {{ const items = ({seed})[{ORIGIN_EXPR}]; if (!items) return; \
         try {{ for (const [k, v] of Object.entries(items)) {{ \
         if (localStorage.getItem(k) === null) localStorage.setItem(k, v); }} }} catch (e) {{}} }})();"
    ))
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> ScadaResult<()> {
        tracing::debug!(%url, "cdp navigate");
        self.page
            .goto(url)
            .await
            .map_err(|e| ScadaError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> ScadaResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(page_error)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn count(&self, selector: &Selector) -> ScadaResult<usize> {
        self.eval(format!("{}.length", selector.to_js_all())).await
    }

    async fn snapshot(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ScadaResult<Option<ElementSnapshot>> {
        self.eval(format!(
            "(() => {{ const el = {}[{index}]; return el ? ({SNAPSHOT_FN})(el) : null; }})()",
            selector.to_js_all()
        ))
        .await
    }

    async fn snapshot_all(&self, selector: &Selector) -> ScadaResult<Vec<ElementSnapshot>> {
        self.eval(format!("{}.map({SNAPSHOT_FN})", selector.to_js_all()))
            .await
    }

    async fn fill(&self, selector: &Selector, index: usize, text: &str) -> ScadaResult<()> {
        let action = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            js_string(text)
        );
        self.act(selector, index, &action).await
    }

    async fn click(&self, selector: &Selector, index: usize) -> ScadaResult<()> {
        self.act(selector, index, "el.click();").await
    }

    async fn fetch(&self, method: HttpMethod, url: &str) -> ScadaResult<FetchResponse> {
        let method = match method {
            HttpMethod::Any => HttpMethod::Get,
            other => other,
        };
        self.eval(format!(
            "(async () => {{ \
                const r = await fetch({}, {{ method: {} }}); \
                const headers = {{}}; \
                r.headers.forEach((v, k) => {{ headers[k] = v; }}); \
                return {{ status: r.status, headers, body: await r.text() }}; \
            }})()",
            js_string(url),
            js_string(method.as_str())
        ))
        .await
    }

    async fn storage_state(&self) -> ScadaResult<StorageState> {
        let storage: Option<PageStorage> = self
            .eval(format!(
                "(() => {{ try {{ \
                    const items = {{}}; \
                    for (let i = 0; i < localStorage.length; i++) {{ \
                        const k = localStorage.key(i); items[k] = localStorage.getItem(k); \
                    }} \
                    return {{ origin: {ORIGIN_EXPR}, items }}; \
                }} catch (e) {{ return null; }} }})()"
            ))
            .await?;

        let mut state = StorageState::new();
        if let Some(storage) = storage {
            for (key, value) in &storage.items {
                state.set_item(&storage.origin, key, value);
            }
        }
        tracing::debug!(
            file_origin = state.local_storage.contains_key(FILE_ORIGIN),
            "read storage"
        );
        Ok(state)
    }

    async fn close(&self) -> ScadaResult<()> {
        for task in &self.tasks {
            task.abort();
        }
        self.page.clone().close().await.map_err(page_error)
    }
}
