//! Simulated Engine
//!
//! An in-process model of the operator UI fixture. It renders the same DOM
//! contract as `fixtures/scada_ui.html` (login section, dashboard section,
//! sensor table) from application state and the tokio clock, and sends its
//! backend calls through the page's [`Network`] so routes intercept them
//! exactly as they would in a real browser.
//!
//! Like the fixture page, the app signs in offline and shows a built-in
//! sensor set when its backend calls reach no route.

pub mod app;
pub mod dom;

use crate::backend::{LoginReply, SensorsReply, LOGIN_URL, SENSORS_URL};
use crate::context::{StorageState, FILE_ORIGIN};
use crate::driver::{ElementSnapshot, FetchResponse, PageDriver};
use crate::locator::Selector;
use crate::network::{HttpMethod, InterceptedRequest, Network, ResponseEvent, RouteAction};
use crate::result::{ScadaError, ScadaResult};
use app::{App, SensorFeed};
use async_trait::async_trait;
use dom::Dom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Local storage key holding the session token
pub const SESSION_KEY: &str = "scada.session";

/// Timings of the simulated UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay between a successful login reply and the dashboard appearing
    pub login_latency_ms: u64,
    /// Delay between the dashboard appearing and its first rows
    pub render_delay_ms: u64,
    /// Interval between sensor value updates
    pub update_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            login_latency_ms: 250,
            render_delay_ms: 100,
            update_interval_ms: 1000,
        }
    }
}

/// Page driver backed by the simulated UI
#[derive(Debug)]
pub struct SimulatedPage {
    network: Arc<Network>,
    storage: Arc<Mutex<StorageState>>,
    app: Mutex<App>,
    closed: AtomicBool,
}

impl SimulatedPage {
    /// Blank page sharing `storage` with the rest of its context
    #[must_use]
    pub fn new(
        config: SimulationConfig,
        network: Arc<Network>,
        storage: Arc<Mutex<StorageState>>,
    ) -> Self {
        Self {
            network,
            storage,
            app: Mutex::new(App::new(config)),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> ScadaResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScadaError::page("page has been closed"));
        }
        Ok(())
    }

    fn with_app<T>(&self, f: impl FnOnce(&mut App) -> T) -> ScadaResult<T> {
        self.app
            .lock()
            .map(|mut app| f(&mut app))
            .map_err(|_| ScadaError::page("page state poisoned"))
    }

    fn render(&self) -> ScadaResult<Dom> {
        self.ensure_open()?;
        let now = Instant::now();
        self.with_app(|app| {
            app.settle(now);
            app.render(now)
        })
    }

    fn session_token(&self) -> Option<String> {
        self.storage
            .lock()
            .ok()
            .and_then(|s| s.get_item(FILE_ORIGIN, SESSION_KEY).map(str::to_string))
    }

    /// Send a request through the interception layer
    fn request(&self, request: InterceptedRequest) -> ScadaResult<FetchResponse> {
        let url = request.url.clone();
        let method = request.method;
        match self.network.dispatch(request) {
            RouteAction::Fulfill(response) => {
                self.network.publish_response(ResponseEvent {
                    url,
                    status: response.status,
                    method,
                });
                Ok(FetchResponse {
                    status: response.status,
                    headers: response.wire_headers().into_iter().collect(),
                    body: response.body_string(),
                })
            }
            RouteAction::Abort => Err(ScadaError::page(format!("net::ERR_FAILED {method} {url}"))),
            RouteAction::Continue => {
                tracing::warn!(
                    %method,
                    %url,
                    "no route for request, the simulated engine has no network"
                );
                Err(ScadaError::page(format!(
                    "net::ERR_NAME_NOT_RESOLVED {method} {url}"
                )))
            }
        }
    }

    fn load_sensors(&self) -> SensorFeed {
        match self.request(InterceptedRequest::new(SENSORS_URL, HttpMethod::Get)) {
            Ok(response) if response.ok() => match response.json::<SensorsReply>() {
                Ok(reply) => SensorFeed {
                    sensors: reply.sensors,
                    connected: true,
                },
                Err(err) => {
                    tracing::debug!(%err, "malformed sensors reply");
                    SensorFeed::disconnected()
                }
            },
            Ok(response) => {
                tracing::debug!(status = response.status, "sensors request failed");
                SensorFeed::disconnected()
            }
            Err(_) => SensorFeed {
                sensors: SensorsReply::offline().sensors,
                connected: true,
            },
        }
    }

    fn submit_login(&self) -> ScadaResult<()> {
        let Some((username, password)) = self.with_app(|app| app.credentials())? else {
            return self.with_app(|app| app.reject("Enter username and password"));
        };

        let body = serde_json::to_vec(&serde_json::json!({
            "username": username,
            "password": password,
        }))?;
        let request = InterceptedRequest::new(LOGIN_URL, HttpMethod::Post).with_body(body);
        let reply = match self.request(request) {
            Ok(response) if response.ok() => response
                .json::<LoginReply>()
                .unwrap_or_else(|_| LoginReply::rejected("Malformed login response")),
            Ok(response) => LoginReply::rejected(&format!("Login failed ({})", response.status)),
            Err(err) => {
                tracing::debug!(%err, "login endpoint unreachable, signing in offline");
                LoginReply::accepted("offline-session")
            }
        };

        if !reply.success {
            let message = reply.message.as_deref().unwrap_or("Invalid credentials");
            tracing::debug!(%username, message, "login rejected");
            return self.with_app(|app| app.reject(message));
        }

        let feed = self.load_sensors();
        if let Ok(mut storage) = self.storage.lock() {
            storage.set_item(
                FILE_ORIGIN,
                SESSION_KEY,
                reply.session_token().unwrap_or("active"),
            );
        }
        self.with_app(|app| app.begin_session(feed, Instant::now()))
    }

    fn resolve(dom: &Dom, selector: &Selector, index: usize) -> ScadaResult<usize> {
        dom.query_all(selector)?
            .get(index)
            .copied()
            .ok_or_else(|| ScadaError::ElementNotFound {
                selector: format!("{selector} >> nth={index}"),
            })
    }
}

#[async_trait]
impl PageDriver for SimulatedPage {
    async fn goto(&self, url: &str) -> ScadaResult<()> {
        self.ensure_open()?;
        let navigation_error = |message: &str| ScadaError::NavigationError {
            url: url.to_string(),
            message: message.to_string(),
        };

        let status = if let Some(path) = url.strip_prefix("file://") {
            if !Path::new(path).exists() {
                return Err(navigation_error("net::ERR_FILE_NOT_FOUND"));
            }
            Some(200)
        } else if url == "about:blank" {
            None
        } else {
            match self.network.dispatch(InterceptedRequest::new(url, HttpMethod::Get)) {
                RouteAction::Fulfill(response) => Some(response.status),
                RouteAction::Abort => return Err(navigation_error("net::ERR_FAILED")),
                RouteAction::Continue => return Err(navigation_error("net::ERR_NAME_NOT_RESOLVED")),
            }
        };

        self.with_app(|app| app.load(url))?;
        if let Some(status) = status {
            self.network.publish_response(ResponseEvent {
                url: url.to_string(),
                status,
                method: HttpMethod::Get,
            });
        }

        if status.is_some() && self.session_token().is_some() {
            tracing::debug!(%url, "restoring stored session");
            let feed = self.load_sensors();
            self.with_app(|app| app.restore_session(feed, Instant::now()))?;
        }
        Ok(())
    }

    async fn current_url(&self) -> ScadaResult<String> {
        self.ensure_open()?;
        self.with_app(|app| app.url().unwrap_or("about:blank").to_string())
    }

    async fn count(&self, selector: &Selector) -> ScadaResult<usize> {
        Ok(self.render()?.query_all(selector)?.len())
    }

    async fn snapshot(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ScadaResult<Option<ElementSnapshot>> {
        let dom = self.render()?;
        Ok(dom.query_all(selector)?.get(index).map(|&i| dom.snapshot(i)))
    }

    async fn snapshot_all(&self, selector: &Selector) -> ScadaResult<Vec<ElementSnapshot>> {
        let dom = self.render()?;
        Ok(dom
            .query_all(selector)?
            .into_iter()
            .map(|i| dom.snapshot(i))
            .collect())
    }

    async fn fill(&self, selector: &Selector, index: usize, text: &str) -> ScadaResult<()> {
        let dom = self.render()?;
        let target = Self::resolve(&dom, selector, index)?;
        let node = dom.node(target).ok_or_else(|| ScadaError::page("stale element"))?;
        let filled = node.tag == "input"
            && node
                .test_id
                .is_some_and(|id| self.with_app(|app| app.fill(id, text)).unwrap_or(false));
        if !filled {
            return Err(ScadaError::NotActionable {
                action: "fill",
                selector: selector.to_string(),
                reason: "element is not an input".into(),
            });
        }
        Ok(())
    }

    async fn click(&self, selector: &Selector, index: usize) -> ScadaResult<()> {
        let dom = self.render()?;
        let target = Self::resolve(&dom, selector, index)?;
        let snapshot = dom.snapshot(target);
        if !(snapshot.visible && snapshot.enabled) {
            return Err(ScadaError::NotActionable {
                action: "click",
                selector: selector.to_string(),
                reason: "element is not visible and enabled".into(),
            });
        }
        if dom.node(target).and_then(|n| n.test_id) == Some("login-button") {
            self.submit_login()?;
        }
        Ok(())
    }

    async fn fetch(&self, method: HttpMethod, url: &str) -> ScadaResult<FetchResponse> {
        self.ensure_open()?;
        self.request(InterceptedRequest::new(url, method))
    }

    async fn storage_state(&self) -> ScadaResult<StorageState> {
        Ok(self.storage.lock().map(|s| s.clone()).unwrap_or_default())
    }

    async fn close(&self) -> ScadaResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
