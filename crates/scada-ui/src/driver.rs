//! PageDriver - Abstract Browser Engine Trait
//!
//! The engine boundary of the suite. A driver answers primitive, non-waiting
//! questions about the live page (how many elements match, what does the nth
//! match look like right now) and performs primitive actions. Auto-waiting,
//! strictness and expectations are layered on top in [`crate::locator`], so
//! every engine gets identical timing semantics.
//!
//! # Implementations
//!
//! - [`crate::sim::SimulatedPage`] - in-process model of the operator UI
//! - `ChromiumPage` - real headless Chromium over CDP (`browser` feature)

use crate::context::StorageState;
use crate::locator::Selector;
use crate::network::HttpMethod;
use crate::result::ScadaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Point-in-time view of one matched element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,
    /// `textContent`, if the element has any
    pub text: Option<String>,
    /// Rendered with a non-empty box
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
}

/// Response to a `fetch()` issued from the page context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercase names)
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body text
    pub body: String,
}

impl FetchResponse {
    /// Status in the 2xx range
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> ScadaResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Abstract driver trait for one browser page
///
/// Element operations address "the `index`-th element matching `selector`",
/// resolved against the page as it is at the moment of the call.
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Navigate to URL and wait for the document to load
    async fn goto(&self, url: &str) -> ScadaResult<()>;

    /// Current document URL
    async fn current_url(&self) -> ScadaResult<String>;

    /// Number of elements currently matching `selector`
    async fn count(&self, selector: &Selector) -> ScadaResult<usize>;

    /// Snapshot of the `index`-th match, `None` if there is no such element
    async fn snapshot(&self, selector: &Selector, index: usize)
        -> ScadaResult<Option<ElementSnapshot>>;

    /// Snapshots of every match, taken in a single pass
    async fn snapshot_all(&self, selector: &Selector) -> ScadaResult<Vec<ElementSnapshot>>;

    /// Replace the value of the `index`-th match
    async fn fill(&self, selector: &Selector, index: usize, text: &str) -> ScadaResult<()>;

    /// Click the `index`-th match
    async fn click(&self, selector: &Selector, index: usize) -> ScadaResult<()>;

    /// Issue `fetch(url, { method })` from the page and read the response
    async fn fetch(&self, method: HttpMethod, url: &str) -> ScadaResult<FetchResponse>;

    /// Local storage of the page's context
    async fn storage_state(&self) -> ScadaResult<StorageState>;

    /// Close the page
    async fn close(&self) -> ScadaResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_ok_range() {
        let mut response = FetchResponse {
            status: 200,
            headers: HashMap::new(),
            body: String::new(),
        };
        assert!(response.ok());
        response.status = 204;
        assert!(response.ok());
        response.status = 404;
        assert!(!response.ok());
    }

    #[test]
    fn test_fetch_response_json() {
        let response = FetchResponse {
            status: 200,
            headers: HashMap::new(),
            body: r#"{"success": true, "sessionId": "test-session-123"}"#.into(),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["sessionId"], "test-session-123");
    }

    #[test]
    fn test_snapshot_deserializes_from_page_json() {
        let json = r#"{"tag":"td","text":"20.5","visible":true,"enabled":true}"#;
        let snapshot: ElementSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.tag, "td");
        assert_eq!(snapshot.text.as_deref(), Some("20.5"));
    }
}
