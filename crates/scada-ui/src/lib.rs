//! SCADA Operator UI Suite
//!
//! End-to-end checks for a SCADA-style operator dashboard: a login flow
//! followed by a live sensor-readings table. Scenarios drive a page through
//! page objects, mock the backend by intercepting requests, and assert on
//! what the page renders over time.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Scenario ──► LoginPage / DashboardPage ──► Locator (waits)   │
//! │     │                                          │              │
//! │     ▼                                          ▼              │
//! │  MockBackend ──► Network (routes) ◄──── PageDriver            │
//! │                                         ├─ simulated engine   │
//! │                                         └─ chromium (CDP)     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let fixture = ScadaFixture::launch(&SuiteConfig::default()).await?;
//! let report = SuiteRunner::new(fixture)
//!     .with_filter(ScenarioFilter::new().with_tag(Tag::Smoke))
//!     .run(scenarios::ALL)
//!     .await;
//! assert!(report.all_passed());
//! ```

#![warn(missing_docs)]

mod assertion;
pub mod backend;
mod browser;
#[cfg(feature = "browser")]
mod cdp;
mod config;
mod context;
mod driver;
mod fixture;
mod locator;
pub mod network;
mod page;
mod page_object;
pub mod pages;
mod result;
mod scenario;
pub mod scenarios;
pub mod sim;
pub mod wait;

pub use assertion::{expect, Expect};
pub use backend::{LoginReply, MockBackend, SensorReading, SensorsReply};
pub use browser::{Browser, BrowserConfig, Engine};
pub use config::SuiteConfig;
pub use context::{BrowserContext, ContextConfig, StorageState, FILE_ORIGIN};
pub use driver::{ElementSnapshot, FetchResponse, PageDriver};
pub use fixture::{ScadaFixture, HTML_FIXTURE};
pub use locator::{AriaRole, ElementHandle, Locator, Selector};
pub use network::{
    HttpMethod, InterceptedRequest, InterceptionLog, MockResponse, Network, ResponseEvent,
    ResponseWaiter, Route, RouteAction, UrlGlob, UrlPattern, UrlRegex,
};
pub use page::Page;
pub use page_object::PageObject;
pub use pages::{DashboardPage, LoginPage, SensorRow};
pub use result::{ensure, ScadaError, ScadaResult};
pub use scenario::{
    Scenario, ScenarioContext, ScenarioFilter, ScenarioFn, ScenarioFuture, ScenarioResult,
    ScenarioStatus, StepRecord, SuiteReport, SuiteRunner, Tag,
};
pub use sim::SimulationConfig;
pub use wait::{ElementState, WaitOptions};
