//! Suite configuration, loadable from YAML.
//!
//! ```yaml
//! engine: chromium
//! headless: true
//! timeout_ms: 8000
//! simulation:
//!   update_interval_ms: 500
//! ```

use crate::browser::{BrowserConfig, Engine};
use crate::fixture::ScadaFixture;
use crate::result::{ScadaError, ScadaResult};
use crate::sim::SimulationConfig;
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration of one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Engine rendering the pages
    pub engine: Engine,
    /// Run Chromium without a window
    pub headless: bool,
    /// Chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Disable the Chromium sandbox (containers/CI)
    pub no_sandbox: bool,
    /// HTML fixture (None = the bundled `fixtures/scada_ui.html`)
    pub html_path: Option<PathBuf>,
    /// Default timeout for locator waits and expectations
    pub timeout_ms: u64,
    /// Interval between condition probes
    pub poll_interval_ms: u64,
    /// Timings of the simulated engine
    pub simulation: SimulationConfig,
    /// Where to write the JSON report
    pub report_path: Option<PathBuf>,
    /// Stop after the first failed scenario
    pub fail_fast: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Simulated,
            headless: true,
            chromium_path: None,
            no_sandbox: false,
            html_path: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            simulation: SimulationConfig::default(),
            report_path: None,
            fail_fast: false,
        }
    }
}

impl SuiteConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> ScadaResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn load(path: &Path) -> ScadaResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ScadaError::ConfigError {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Reject timeouts and intervals that would make every wait meaningless
    pub fn validate(&self) -> ScadaResult<()> {
        if self.timeout_ms == 0 {
            return Err(config_error("timeout_ms must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(config_error("poll_interval_ms must be greater than zero"));
        }
        if self.poll_interval_ms > self.timeout_ms {
            return Err(config_error(format!(
                "poll_interval_ms ({}) exceeds timeout_ms ({})",
                self.poll_interval_ms, self.timeout_ms
            )));
        }
        if self.simulation.update_interval_ms == 0 {
            return Err(config_error(
                "simulation.update_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Set the engine
    #[must_use]
    pub const fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the HTML fixture
    #[must_use]
    pub fn with_html_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_path = Some(path.into());
        self
    }

    /// Set fail-fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// HTML fixture actually used
    #[must_use]
    pub fn resolved_html_path(&self) -> PathBuf {
        self.html_path
            .clone()
            .unwrap_or_else(ScadaFixture::default_html_path)
    }

    /// Wait options derived from the timeouts
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Browser launch configuration
    #[must_use]
    pub fn browser_config(&self) -> BrowserConfig {
        let mut config = BrowserConfig::default()
            .with_engine(self.engine)
            .with_headless(self.headless)
            .with_simulation(self.simulation.clone());
        if let Some(path) = &self.chromium_path {
            config = config.with_chromium_path(path.clone());
        }
        if self.no_sandbox {
            config = config.with_no_sandbox();
        }
        config
    }
}

fn config_error(message: impl Into<String>) -> ScadaError {
    ScadaError::ConfigError {
        message: message.into(),
    }
}
