//! Mock Backend
//!
//! Payloads of the two logical endpoints of the operator UI, `login` and
//! `sensors`, and a [`MockBackend`] that installs CORS-permissive routes for
//! them on a page. Every hit is recorded in an [`InterceptionLog`].

use crate::network::{InterceptionLog, MockResponse, RouteAction, UrlPattern};
use crate::page::Page;
use crate::result::ScadaResult;
use serde::{Deserialize, Serialize};

/// Login endpoint called by the operator UI
pub const LOGIN_URL: &str = "https://mock.local/api/login";

/// Sensor readings endpoint called by the operator UI
pub const SENSORS_URL: &str = "https://mock.local/api/sensors";

/// Route pattern for the login endpoint
pub const LOGIN_PATTERN: &str = "**/api/login";

/// Route pattern for the sensors endpoint
pub const SENSORS_PATTERN: &str = "**/api/sensors";

/// Body of a login reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginReply {
    /// Whether the credentials were accepted
    pub success: bool,
    /// Session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Session id, accepted in place of `token`
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Rejection message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginReply {
    /// Accepted login carrying `token`
    #[must_use]
    pub fn accepted(token: &str) -> Self {
        Self {
            success: true,
            token: Some(token.to_string()),
            session_id: None,
            message: None,
        }
    }

    /// Accepted login carrying a `sessionId`
    #[must_use]
    pub fn accepted_session(session_id: &str) -> Self {
        Self {
            success: true,
            token: None,
            session_id: Some(session_id.to_string()),
            message: None,
        }
    }

    /// Bare acceptance, `{"success": true}`, with no session to store
    #[must_use]
    pub const fn succeeded() -> Self {
        Self {
            success: true,
            token: None,
            session_id: None,
            message: None,
        }
    }

    /// Rejected login
    #[must_use]
    pub fn rejected(message: &str) -> Self {
        Self {
            success: false,
            token: None,
            session_id: None,
            message: Some(message.to_string()),
        }
    }

    /// Bare rejection, `{"success": false}`
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            success: false,
            token: None,
            session_id: None,
            message: None,
        }
    }

    /// `token`, falling back to `sessionId`
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.token.as_deref().or(self.session_id.as_deref())
    }
}

/// One sensor reading as served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor identifier
    pub id: String,
    /// Reading
    pub value: f64,
}

/// Body of a sensors reply
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorsReply {
    /// Readings in display order
    pub sensors: Vec<SensorReading>,
}

impl SensorsReply {
    /// Build from `(id, value)` pairs
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self {
            sensors: pairs
                .iter()
                .map(|(id, value)| SensorReading {
                    id: (*id).to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    /// Readings the UI shows when the backend is unreachable
    #[must_use]
    pub fn offline() -> Self {
        Self::from_pairs(&[("TEMP-1", 21.0), ("PRESS-2", 101.3), ("FLOW-3", 12.7)])
    }
}

/// JSON response with CORS headers for fetches from a `file://` document
pub fn fulfill_json<T: Serialize>(body: &T) -> ScadaResult<MockResponse> {
    Ok(MockResponse::json(body)?.with_cors())
}

/// Canned backend for the `login` and `sensors` endpoints
#[derive(Debug, Clone)]
pub struct MockBackend {
    login: LoginReply,
    sensors: SensorsReply,
    log: InterceptionLog,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            login: LoginReply::accepted("mock-token"),
            sensors: SensorsReply::from_pairs(&[("TEMP-1", 20.5), ("PRESS-2", 100.2)]),
            log: InterceptionLog::new(),
        }
    }
}

impl MockBackend {
    /// Backend accepting any credentials and serving two sensors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the login reply
    #[must_use]
    pub fn with_login(mut self, login: LoginReply) -> Self {
        self.login = login;
        self
    }

    /// Replace the sensors reply
    #[must_use]
    pub fn with_sensors(mut self, sensors: SensorsReply) -> Self {
        self.sensors = sensors;
        self
    }

    /// Record hits into an existing log
    #[must_use]
    pub fn with_log(mut self, log: InterceptionLog) -> Self {
        self.log = log;
        self
    }

    /// Sensors this backend serves
    #[must_use]
    pub const fn sensors(&self) -> &SensorsReply {
        &self.sensors
    }

    /// Log of endpoint hits
    #[must_use]
    pub const fn log(&self) -> &InterceptionLog {
        &self.log
    }

    /// Register the `login` and `sensors` routes on `page`
    pub fn install(&self, page: &Page) -> ScadaResult<()> {
        let login = fulfill_json(&self.login)?;
        let sensors = fulfill_json(&self.sensors)?;

        let log = self.log.clone();
        page.route(UrlPattern::glob(LOGIN_PATTERN), move |_| {
            log.record("login");
            RouteAction::Fulfill(login.clone())
        });

        let log = self.log.clone();
        page.route(UrlPattern::glob(SENSORS_PATTERN), move |_| {
            log.record("sensors");
            RouteAction::Fulfill(sensors.clone())
        });

        tracing::debug!(sensors = self.sensors.sensors.len(), "mock backend installed");
        Ok(())
    }
}
