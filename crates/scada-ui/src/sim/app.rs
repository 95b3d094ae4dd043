//! State machine of the simulated operator UI and its rendering.
//!
//! Rendering is a pure function of the state and the tokio clock, so paused
//! test clocks drive sensor updates deterministically.

use super::dom::{Dom, Node};
use super::SimulationConfig;
use crate::backend::SensorReading;
use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::Instant;

/// Status text while the feed is live
pub const STATUS_CONNECTED: &str = "Connected";
/// Status text before the first readings arrive
pub const STATUS_CONNECTING: &str = "Connecting";
/// Status text when the sensors endpoint failed
pub const STATUS_DISCONNECTED: &str = "Disconnected";

/// Readings the dashboard was started with
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFeed {
    /// Base readings
    pub sensors: Vec<SensorReading>,
    /// Whether the sensors endpoint answered
    pub connected: bool,
}

impl SensorFeed {
    /// Feed of a failed sensors request
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            sensors: Vec::new(),
            connected: false,
        }
    }
}

#[derive(Debug, Clone)]
enum Session {
    SignedOut,
    SigningIn {
        ready_at: Instant,
        feed: SensorFeed,
    },
    SignedIn {
        since: Instant,
        clock: DateTime<Local>,
        feed: SensorFeed,
    },
}

/// Displayed value of sensor `index` after `tick` update intervals
#[must_use]
pub fn drifted_value(base: f64, index: usize, tick: u64) -> String {
    let step = ((3 * tick) % 7) as f64 * 0.1;
    let value = if index % 2 == 0 { base + step } else { base - step };
    format!("{value:.1}")
}

/// The operator UI loaded in one page
#[derive(Debug)]
pub struct App {
    config: SimulationConfig,
    url: Option<String>,
    username: String,
    password: String,
    error: Option<String>,
    session: Session,
}

impl App {
    /// Blank page
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            url: None,
            username: String::new(),
            password: String::new(),
            error: None,
            session: Session::SignedOut,
        }
    }

    /// Loaded document URL
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Load the UI document, discarding all page state
    pub fn load(&mut self, url: &str) {
        *self = Self::new(self.config.clone());
        if url != "about:blank" {
            self.url = Some(url.to_string());
        }
    }

    /// Set an input by test id; false if there is no such input
    pub fn fill(&mut self, test_id: &str, value: &str) -> bool {
        match test_id {
            "username" => self.username = value.to_string(),
            "password" => self.password = value.to_string(),
            _ => return false,
        }
        true
    }

    /// Entered credentials, if both fields are filled
    #[must_use]
    pub fn credentials(&self) -> Option<(String, String)> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((username.to_string(), self.password.clone()))
        }
    }

    /// Show a login error and stay on the login view
    pub fn reject(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.session = Session::SignedOut;
    }

    /// Start the sign-in transition; the dashboard appears after the login
    /// latency
    pub fn begin_session(&mut self, feed: SensorFeed, now: Instant) {
        self.error = None;
        self.session = Session::SigningIn {
            ready_at: now + Duration::from_millis(self.config.login_latency_ms),
            feed,
        };
    }

    /// Show the dashboard immediately (session restored from storage)
    pub fn restore_session(&mut self, feed: SensorFeed, now: Instant) {
        self.error = None;
        self.session = Session::SignedIn {
            since: now,
            clock: Local::now(),
            feed,
        };
    }

    /// Complete a pending sign-in whose latency has elapsed
    pub fn settle(&mut self, now: Instant) {
        let completed = match &self.session {
            Session::SigningIn { ready_at, feed } if now >= *ready_at => {
                let late = chrono::Duration::from_std(now - *ready_at)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                Some(Session::SignedIn {
                    since: *ready_at,
                    clock: Local::now() - late,
                    feed: feed.clone(),
                })
            }
            _ => None,
        };
        if let Some(session) = completed {
            self.session = session;
        }
    }

    /// Whether the dashboard is the current view
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self.session, Session::SignedIn { .. })
    }

    /// Build the element tree as of `now`
    #[must_use]
    pub fn render(&self, now: Instant) -> Dom {
        let mut dom = Dom::new();
        if self.url.is_none() {
            return dom;
        }

        let signing_in = matches!(self.session, Session::SigningIn { .. });
        let main = dom.append(None, Node::element("main").id("app"));

        let login = dom.append(
            Some(main),
            Node::element("section")
                .id("login-page")
                .displayed(!self.is_signed_in()),
        );
        dom.append(Some(login), Node::element("h1").text("Login"));
        let form = dom.append(Some(login), Node::element("form").id("login-form"));
        dom.append(
            Some(form),
            Node::element("input").test_id("username").input_type("text"),
        );
        dom.append(
            Some(form),
            Node::element("input")
                .test_id("password")
                .input_type("password"),
        );
        dom.append(
            Some(form),
            Node::element("button")
                .test_id("login-button")
                .text(if signing_in { "Signing in" } else { "Sign in" })
                .enabled(!signing_in),
        );
        dom.append(
            Some(form),
            Node::element("p")
                .test_id("login-error")
                .class("error")
                .text(self.error.clone().unwrap_or_default())
                .displayed(self.error.is_some()),
        );

        let dashboard = dom.append(
            Some(main),
            Node::element("section")
                .id("dashboard-page")
                .displayed(self.is_signed_in()),
        );
        dom.append(Some(dashboard), Node::element("h1").text("Dashboard"));

        let Session::SignedIn { since, clock, feed } = &self.session else {
            dom.append(
                Some(dashboard),
                Node::element("span")
                    .class("status")
                    .text(STATUS_CONNECTING),
            );
            Self::render_table(&mut dom, dashboard, None);
            return dom;
        };

        let render_delay = Duration::from_millis(self.config.render_delay_ms);
        let rendered = now.checked_duration_since(*since + render_delay);
        let status = match rendered {
            None => STATUS_CONNECTING,
            Some(_) if feed.connected => STATUS_CONNECTED,
            Some(_) => STATUS_DISCONNECTED,
        };
        dom.append(
            Some(dashboard),
            Node::element("span")
                .class("status")
                .class(if feed.connected { "online" } else { "offline" })
                .text(status),
        );

        let rows = rendered.map(|age| {
            let interval = self.config.update_interval_ms.max(1);
            let tick = age.as_millis() as u64 / interval;
            let offset_ms = self.config.render_delay_ms + tick * interval;
            let stamp = *clock + chrono::Duration::milliseconds(offset_ms as i64);
            (feed, tick, stamp.format("%H:%M:%S").to_string())
        });
        Self::render_table(&mut dom, dashboard, rows);
        dom
    }

    fn render_table(
        dom: &mut Dom,
        dashboard: usize,
        rows: Option<(&SensorFeed, u64, String)>,
    ) {
        let table = dom.append(
            Some(dashboard),
            Node::element("table").test_id("sensors-table"),
        );
        let head = dom.append(Some(table), Node::element("thead"));
        let header = dom.append(Some(head), Node::element("tr"));
        for title in ["Sensor", "Value", "Updated"] {
            dom.append(Some(header), Node::element("th").text(title));
        }

        let body = dom.append(Some(table), Node::element("tbody").id("sensors-body"));
        let Some((feed, tick, stamp)) = rows else {
            return;
        };
        for (index, sensor) in feed.sensors.iter().enumerate() {
            let row = dom.append(Some(body), Node::element("tr"));
            dom.append(
                Some(row),
                Node::element("td").test_id("sensor-id").text(sensor.id.clone()),
            );
            dom.append(
                Some(row),
                Node::element("td")
                    .test_id("sensor-value")
                    .text(drifted_value(sensor.value, index, tick)),
            );
            dom.append(
                Some(row),
                Node::element("td").test_id("sensor-updated").text(stamp.clone()),
            );
        }
    }
}
