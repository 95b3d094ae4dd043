//! Network Request Interception
//!
//! Declarative request interception for a page: routes match request URLs
//! and decide whether to fulfill them with a canned [`MockResponse`], abort
//! them, or let them continue. Every response the engine observes is
//! published as a [`ResponseEvent`] to `on_response` listeners and to
//! [`ResponseWaiter`]s created with [`Network::expect_response`].

use crate::result::{ScadaError, ScadaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Capacity of the response event channel
const RESPONSE_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// HTTP METHOD
// =============================================================================

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// Any method
    Any,
}

impl HttpMethod {
    /// Parse from string; unknown methods map to [`HttpMethod::Any`]
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            _ => Self::Any,
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Any => "*",
        }
    }

    /// Check if this method matches another
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        *self == Self::Any || *other == Self::Any || *self == *other
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// MOCK RESPONSE
// =============================================================================

/// A mocked HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            content_type: "application/json".to_string(),
        }
    }
}

impl MockResponse {
    /// Create a new mock response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response
    pub fn json<T: Serialize>(data: &T) -> ScadaResult<Self> {
        Ok(Self {
            body: serde_json::to_vec(data)?,
            ..Self::default()
        })
    }

    /// Create a JSON response from an already-encoded body
    #[must_use]
    pub fn json_text(body: &str) -> Self {
        Self {
            body: body.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            body: content.as_bytes().to_vec(),
            content_type: "text/plain".to_string(),
            ..Self::default()
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string().into_bytes(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_lowercase(), value.to_string());
        self
    }

    /// Set content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Allow cross-origin reads, required for fetches from a `file://` page
    #[must_use]
    pub fn with_cors(self) -> Self {
        self.with_header("access-control-allow-origin", "*")
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Headers as sent on the wire, including `content-type`
    #[must_use]
    pub fn wire_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !self.headers.contains_key("content-type") {
            headers.push(("content-type".to_string(), self.content_type.clone()));
        }
        headers.sort();
        headers
    }
}

// =============================================================================
// URL PATTERN
// =============================================================================

/// Pattern for matching request URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Contains substring
    Contains(String),
    /// Regex match, compiled when the pattern is built
    Regex(UrlRegex),
    /// Glob pattern (e.g., "**/api/login")
    Glob(UrlGlob),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Glob pattern; `**` matches any run of characters, `*` stops at `/`
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(UrlGlob::new(pattern))
    }

    /// Regex pattern
    ///
    /// # Errors
    ///
    /// Returns [`ScadaError::ConfigError`] if `pattern` is not a valid regex
    pub fn regex(pattern: &str) -> ScadaResult<Self> {
        UrlRegex::new(pattern).map(Self::Regex)
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(regex) => regex.is_match(url),
            Self::Glob(glob) => glob.matches(url),
            Self::Any => true,
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(pattern: &str) -> Self {
        if pattern.contains('*') {
            Self::glob(pattern)
        } else {
            Self::Exact(pattern.to_string())
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "exact:{s}"),
            Self::Contains(s) => write!(f, "contains:{s}"),
            Self::Regex(r) => write!(f, "regex:{}", r.as_str()),
            Self::Glob(g) => write!(f, "glob:{}", g.as_str()),
            Self::Any => write!(f, "*"),
        }
    }
}

/// Compiled URL regex; two regexes are equal when their sources are
#[derive(Debug, Clone)]
pub struct UrlRegex(regex::Regex);

impl UrlRegex {
    /// Compile `pattern`
    ///
    /// # Errors
    ///
    /// Returns [`ScadaError::ConfigError`] if `pattern` is not a valid regex
    pub fn new(pattern: &str) -> ScadaResult<Self> {
        regex::Regex::new(pattern)
            .map(Self)
            .map_err(|e| ScadaError::ConfigError {
                message: format!("invalid URL regex {pattern:?}: {e}"),
            })
    }

    /// Source of the regex
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether `url` matches anywhere
    #[must_use]
    pub fn is_match(&self, url: &str) -> bool {
        self.0.is_match(url)
    }
}

impl PartialEq for UrlRegex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for UrlRegex {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GlobToken {
    Literal(String),
    /// `*`: any run of characters except `/`
    Star,
    /// `**`: any run of characters
    DoubleStar,
}

/// URL glob, tokenized once.
///
/// The query string is ignored unless the pattern itself mentions one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGlob {
    source: String,
    tokens: Vec<GlobToken>,
}

impl UrlGlob {
    /// Tokenize `pattern`
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '*' {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                tokens.push(GlobToken::Literal(std::mem::take(&mut literal)));
            }
            if chars.peek() == Some(&'*') {
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                tokens.push(GlobToken::DoubleStar);
            } else {
                tokens.push(GlobToken::Star);
            }
        }
        if !literal.is_empty() {
            tokens.push(GlobToken::Literal(literal));
        }
        Self { source, tokens }
    }

    /// Source of the glob
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the whole `url` matches
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url = if self.source.contains('?') {
            url
        } else {
            url.split('?').next().unwrap_or(url)
        };
        match_tokens(&self.tokens, url)
    }
}

fn match_tokens(tokens: &[GlobToken], text: &str) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return text.is_empty();
    };
    let span = match token {
        GlobToken::Literal(literal) => {
            return text
                .strip_prefix(literal.as_str())
                .is_some_and(|tail| match_tokens(rest, tail));
        }
        GlobToken::Star => text.find('/').unwrap_or(text.len()),
        GlobToken::DoubleStar => text.len(),
    };
    (0..=span)
        .filter(|&i| text.is_char_boundary(i))
        .any(|i| match_tokens(rest, &text[i..]))
}

// =============================================================================
// REQUESTS AND ROUTES
// =============================================================================

/// A request seen by the interception layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Milliseconds since the network layer was created
    pub timestamp_ms: u64,
}

impl InterceptedRequest {
    /// Create a request record
    #[must_use]
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
            timestamp_ms: 0,
        }
    }

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Body as string
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse the body as JSON
    pub fn body_json<T: for<'de> Deserialize<'de>>(&self) -> ScadaResult<T> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| ScadaError::page(format!("{} {} has no body", self.method, self.url)))?;
        Ok(serde_json::from_slice(body)?)
    }
}

/// Action to take when a route matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// Respond with a mock response
    Fulfill(MockResponse),
    /// Fail the request with a network error
    Abort,
    /// Let the request through to the real network
    Continue,
}

/// Route handler invoked with each matching request
pub type RouteHandler = Arc<dyn Fn(&InterceptedRequest) -> RouteAction + Send + Sync>;

/// A route definition for interception
#[derive(Clone)]
pub struct Route {
    /// URL pattern to match
    pub pattern: UrlPattern,
    /// HTTP method to match
    pub method: HttpMethod,
    handler: RouteHandler,
    /// Number of times this route should be used (None = unlimited)
    pub times: Option<usize>,
    /// Number of times this route has been matched
    pub match_count: usize,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("times", &self.times)
            .field("match_count", &self.match_count)
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Create a route with a handler closure
    pub fn new<F>(pattern: UrlPattern, method: HttpMethod, handler: F) -> Self
    where
        F: Fn(&InterceptedRequest) -> RouteAction + Send + Sync + 'static,
    {
        Self {
            pattern,
            method,
            handler: Arc::new(handler),
            times: None,
            match_count: 0,
        }
    }

    /// Create a route that always fulfills with `response`
    #[must_use]
    pub fn fulfill(pattern: UrlPattern, response: MockResponse) -> Self {
        Self::new(pattern, HttpMethod::Any, move |_| {
            RouteAction::Fulfill(response.clone())
        })
    }

    /// Set how many times this route should match
    #[must_use]
    pub const fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Check if this route matches a request
    #[must_use]
    pub fn matches(&self, url: &str, method: &HttpMethod) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.pattern.matches(url) && self.method.matches(method)
    }

    /// Check if route is exhausted
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.times.is_some_and(|max| self.match_count >= max)
    }
}

// =============================================================================
// RESPONSE EVENTS
// =============================================================================

/// A response observed on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Response URL
    pub url: String,
    /// HTTP status (0 for opaque local documents)
    pub status: u16,
    /// Method of the originating request, `Any` when the engine cannot tell
    pub method: HttpMethod,
}

impl ResponseEvent {
    /// Success status; local documents report 0 and count as ok
    #[must_use]
    pub fn ok(&self) -> bool {
        self.status == 0 || (200..300).contains(&self.status)
    }
}

/// Listener invoked for every observed response
pub type ResponseListener = Arc<dyn Fn(&ResponseEvent) + Send + Sync>;

/// Pending expectation for a response matching a pattern.
///
/// Create it before the action that triggers the request, then await
/// [`ResponseWaiter::wait`].
#[derive(Debug)]
pub struct ResponseWaiter {
    pattern: UrlPattern,
    receiver: broadcast::Receiver<ResponseEvent>,
}

impl ResponseWaiter {
    /// Pattern this waiter expects
    #[must_use]
    pub const fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    /// Wait for the first matching response
    pub async fn wait(mut self, timeout_ms: u64) -> ScadaResult<ResponseEvent> {
        let pattern = self.pattern.clone();
        let receive = async {
            loop {
                match self.receiver.recv().await {
                    Ok(event) if pattern.matches(&event.url) => return Ok(event),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "response waiter lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(ScadaError::page("page closed while waiting for response"));
                    }
                }
            }
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), receive).await {
            Ok(result) => result,
            Err(_) => Err(ScadaError::timeout(
                format!("response matching {pattern}"),
                timeout_ms,
            )),
        }
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// Per-page interception and response observation
pub struct Network {
    routes: Mutex<Vec<Route>>,
    captured: Mutex<Vec<InterceptedRequest>>,
    listeners: Mutex<Vec<ResponseListener>>,
    events: broadcast::Sender<ResponseEvent>,
    start_time: std::time::Instant,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("routes", &self.route_count())
            .field("captured", &self.captured_requests().len())
            .finish_non_exhaustive()
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create an empty network layer
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(RESPONSE_CHANNEL_CAPACITY);
        Self {
            routes: Mutex::new(Vec::new()),
            captured: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            events,
            start_time: std::time::Instant::now(),
        }
    }

    /// Register a route; the first registered match wins
    pub fn route(&self, route: Route) {
        tracing::debug!(pattern = %route.pattern, method = %route.method, "route registered");
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }

    /// Number of registered routes
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Decide what happens to an outgoing request.
    ///
    /// The handler runs outside the route table lock, so handlers may
    /// register further routes.
    pub fn dispatch(&self, mut request: InterceptedRequest) -> RouteAction {
        request.timestamp_ms = self.start_time.elapsed().as_millis() as u64;

        let handler = self.routes.lock().ok().and_then(|mut routes| {
            routes
                .iter_mut()
                .find(|route| route.matches(&request.url, &request.method))
                .map(|route| {
                    route.match_count += 1;
                    route.handler.clone()
                })
        });

        let action = match handler {
            Some(handler) => {
                if let Ok(mut captured) = self.captured.lock() {
                    captured.push(request.clone());
                }
                handler(&request)
            }
            None => RouteAction::Continue,
        };

        tracing::debug!(
            url = %request.url,
            method = %request.method,
            action = match &action {
                RouteAction::Fulfill(_) => "fulfill",
                RouteAction::Abort => "abort",
                RouteAction::Continue => "continue",
            },
            "request routed"
        );
        action
    }

    /// Register a listener for every observed response
    pub fn on_response<F>(&self, listener: F)
    where
        F: Fn(&ResponseEvent) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Arc::new(listener));
        }
    }

    /// Start expecting a response matching `pattern`
    #[must_use]
    pub fn expect_response(&self, pattern: UrlPattern) -> ResponseWaiter {
        ResponseWaiter {
            pattern,
            receiver: self.events.subscribe(),
        }
    }

    /// Publish an observed response to listeners and waiters
    pub fn publish_response(&self, event: ResponseEvent) {
        tracing::debug!(url = %event.url, status = event.status, "response");
        let listeners: Vec<ResponseListener> = self
            .listeners
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default();
        for listener in &listeners {
            listener(&event);
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Get all intercepted requests
    #[must_use]
    pub fn captured_requests(&self) -> Vec<InterceptedRequest> {
        self.captured.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Intercepted requests matching a pattern
    #[must_use]
    pub fn requests_matching(&self, pattern: &UrlPattern) -> Vec<InterceptedRequest> {
        self.captured_requests()
            .into_iter()
            .filter(|r| pattern.matches(&r.url))
            .collect()
    }

    /// Assert a request matching `pattern` was intercepted
    pub fn assert_requested(&self, pattern: &UrlPattern) -> ScadaResult<()> {
        if self.requests_matching(pattern).is_empty() {
            return Err(ScadaError::assertion(format!(
                "expected a request matching {pattern}, none was intercepted"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// INTERCEPTION LOG
// =============================================================================

/// Scenario-local record of which mocked endpoints were hit.
///
/// Clones share the same log, so a clone can be moved into each route
/// handler while the scenario keeps its own.
#[derive(Debug, Clone, Default)]
pub struct InterceptionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl InterceptionLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an endpoint name
    pub fn record(&self, name: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(name.to_string());
        }
    }

    /// Whether `name` was recorded at least once
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .map(|e| e.iter().any(|entry| entry == name))
            .unwrap_or(false)
    }

    /// Everything recorded so far, in order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_glob_double_star_prefix() {
            let pattern = UrlPattern::glob("**/api/login");
            assert!(pattern.matches("https://mock.local/api/login"));
            assert!(pattern.matches("http://localhost:8080/api/login"));
            assert!(!pattern.matches("https://mock.local/api/login/extra"));
            assert!(!pattern.matches("https://mock.local/api/sensors"));
        }

        #[test]
        fn test_glob_ignores_query_string() {
            let pattern = UrlPattern::glob("**/api/sensors");
            assert!(pattern.matches("https://mock.local/api/sensors?since=10"));
        }

        #[test]
        fn test_glob_repeated_suffix() {
            let pattern = UrlPattern::glob("**/api/sensors");
            assert!(pattern.matches("https://mock.local/api/sensors/api/sensors"));
        }

        #[test]
        fn test_glob_anchored_prefix() {
            let pattern = UrlPattern::glob("https://mock.local/**");
            assert!(pattern.matches("https://mock.local/api/login"));
            assert!(!pattern.matches("https://other.local/api/login"));
        }

        #[test]
        fn test_glob_single_star_stays_in_segment() {
            let pattern = UrlPattern::glob("https://mock.local/*");
            assert!(pattern.matches("https://mock.local/login"));
            assert!(!pattern.matches("https://mock.local/api/login"));

            let pattern = UrlPattern::glob("**/api/*/latest");
            assert!(pattern.matches("https://mock.local/api/sensors/latest"));
            assert!(!pattern.matches("https://mock.local/api/sensors/TEMP-1/latest"));

            let pattern = UrlPattern::glob("https://mock.local/**/login");
            assert!(pattern.matches("https://mock.local/v2/api/login"));
        }

        #[test]
        fn test_regex_and_contains() {
            assert!(UrlPattern::regex(r"/api/(login|sensors)$")
                .unwrap()
                .matches("https://mock.local/api/sensors"));
            let err = UrlPattern::regex("(").unwrap_err();
            assert!(matches!(err, ScadaError::ConfigError { .. }));
            assert!(UrlPattern::Contains("scada_ui.html".into())
                .matches("file:///tmp/fixtures/scada_ui.html"));
        }

        #[test]
        fn test_patterns_compare_by_source() {
            assert_eq!(UrlPattern::regex("a+").unwrap(), UrlPattern::regex("a+").unwrap());
            assert_ne!(UrlPattern::regex("a+").unwrap(), UrlPattern::regex("b+").unwrap());
            assert_eq!(UrlPattern::glob("**/x").to_string(), "glob:**/x");
        }

        #[test]
        fn test_from_str_picks_glob_or_exact() {
            assert_eq!(
                UrlPattern::from("**/api/login"),
                UrlPattern::glob("**/api/login")
            );
            assert_eq!(
                UrlPattern::from("https://mock.local/api/login"),
                UrlPattern::Exact("https://mock.local/api/login".into())
            );
        }
    }

    mod mock_response_tests {
        use super::*;

        #[test]
        fn test_cors_header() {
            let response = MockResponse::json_text(r#"{"success":true}"#).with_cors();
            assert_eq!(
                response.headers.get("access-control-allow-origin"),
                Some(&"*".to_string())
            );
            let wire = response.wire_headers();
            assert!(wire.contains(&("content-type".into(), "application/json".into())));
        }

        #[test]
        fn test_json_body() {
            let response = MockResponse::json(&serde_json::json!({"token": "mock-token"})).unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.body_string(), r#"{"token":"mock-token"}"#);
        }

        #[test]
        fn test_error_response() {
            let response = MockResponse::error(401, "bad credentials");
            assert_eq!(response.status, 401);
            assert!(response.body_string().contains("bad credentials"));
        }
    }

    mod dispatch_tests {
        use super::*;

        #[test]
        fn test_first_matching_route_wins() {
            let network = Network::new();
            network.route(Route::fulfill(
                UrlPattern::glob("**/api/*"),
                MockResponse::text("first"),
            ));
            network.route(Route::fulfill(
                UrlPattern::glob("**/api/login"),
                MockResponse::text("second"),
            ));

            let action = network.dispatch(InterceptedRequest::new(
                "https://mock.local/api/login",
                HttpMethod::Post,
            ));
            assert_eq!(action, RouteAction::Fulfill(MockResponse::text("first")));
        }

        #[test]
        fn test_unmatched_continues_and_is_not_captured() {
            let network = Network::new();
            let action = network.dispatch(InterceptedRequest::new(
                "https://mock.local/api/login",
                HttpMethod::Post,
            ));
            assert_eq!(action, RouteAction::Continue);
            assert!(network.captured_requests().is_empty());
        }

        #[test]
        fn test_method_filter() {
            let network = Network::new();
            network.route(Route::new(
                UrlPattern::glob("**/api/login"),
                HttpMethod::Post,
                |_| RouteAction::Abort,
            ));
            let get = network.dispatch(InterceptedRequest::new(
                "https://mock.local/api/login",
                HttpMethod::Get,
            ));
            assert_eq!(get, RouteAction::Continue);
        }

        #[test]
        fn test_times_exhausts_route() {
            let network = Network::new();
            network.route(
                Route::fulfill(UrlPattern::Any, MockResponse::text("once")).times(1),
            );
            let request = InterceptedRequest::new("https://mock.local/x", HttpMethod::Get);
            assert!(matches!(network.dispatch(request.clone()), RouteAction::Fulfill(_)));
            assert_eq!(network.dispatch(request), RouteAction::Continue);
        }

        #[test]
        fn test_handler_records_into_shared_log() {
            let network = Network::new();
            let log = InterceptionLog::new();
            let handler_log = log.clone();
            network.route(Route::new(
                UrlPattern::glob("**/api/sensors"),
                HttpMethod::Any,
                move |_| {
                    handler_log.record("sensors");
                    RouteAction::Fulfill(MockResponse::json_text(r#"{"sensors":[]}"#))
                },
            ));

            network.dispatch(InterceptedRequest::new(
                "https://mock.local/api/sensors",
                HttpMethod::Get,
            ));
            assert!(log.contains("sensors"));
            assert!(!log.contains("login"));
            network
                .assert_requested(&UrlPattern::Contains("/api/sensors".into()))
                .unwrap();
        }

        #[test]
        fn test_request_body_json() {
            let request = InterceptedRequest::new("https://mock.local/api/login", HttpMethod::Post)
                .with_body(br#"{"username":"admin"}"#.to_vec());
            let value: serde_json::Value = request.body_json().unwrap();
            assert_eq!(value["username"], "admin");
        }
    }

    mod response_tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        fn event(url: &str) -> ResponseEvent {
            ResponseEvent {
                url: url.into(),
                status: 200,
                method: HttpMethod::Get,
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_waiter_receives_matching_response() {
            let network = Network::new();
            let waiter = network.expect_response(UrlPattern::glob("**/api/sensors"));
            network.publish_response(event("https://mock.local/api/login"));
            network.publish_response(event("https://mock.local/api/sensors"));

            let received = waiter.wait(1000).await.unwrap();
            assert_eq!(received.url, "https://mock.local/api/sensors");
            assert!(received.ok());
        }

        #[tokio::test(start_paused = true)]
        async fn test_waiter_times_out() {
            let network = Network::new();
            let waiter = network.expect_response(UrlPattern::glob("**/api/sensors"));
            let err = waiter.wait(500).await.unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("500ms"));
        }

        #[test]
        fn test_listeners_see_every_response() {
            let network = Network::new();
            let seen = Arc::new(AtomicUsize::new(0));
            let counter = seen.clone();
            network.on_response(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            network.publish_response(event("file:///tmp/scada_ui.html"));
            network.publish_response(event("https://mock.local/api/login"));
            assert_eq!(seen.load(Ordering::SeqCst), 2);
        }

        #[test]
        fn test_local_document_status_zero_is_ok() {
            let local = ResponseEvent {
                url: "file:///tmp/scada_ui.html".into(),
                status: 0,
                method: HttpMethod::Get,
            };
            assert!(local.ok());
            let failed = ResponseEvent { status: 500, ..local };
            assert!(!failed.ok());
        }
    }
}
