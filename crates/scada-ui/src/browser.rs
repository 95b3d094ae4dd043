//! Browser launch and engine selection.
//!
//! The simulated engine is always available. The Chromium engine drives a
//! real browser over CDP and needs the `browser` feature.

use crate::context::{BrowserContext, ContextConfig};
use crate::result::ScadaResult;
use crate::sim::SimulationConfig;
use serde::{Deserialize, Serialize};

/// Which engine renders pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// In-process model of the operator UI
    #[default]
    Simulated,
    /// Headless Chromium over CDP
    Chromium,
}

impl Engine {
    /// Lowercase engine name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Chromium => "chromium",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Engine to launch
    pub engine: Engine,
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Timings of the simulated engine
    pub simulation: SimulationConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Simulated,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
            simulation: SimulationConfig::default(),
        }
    }
}

impl BrowserConfig {
    /// Select the engine
    #[must_use]
    pub const fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set simulated engine timings
    #[must_use]
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }
}

#[derive(Debug)]
enum Backend {
    Simulated,
    #[cfg(feature = "browser")]
    Chromium(crate::cdp::ChromiumBrowser),
}

/// A launched browser
#[derive(Debug)]
pub struct Browser {
    config: BrowserConfig,
    backend: Backend,
}

impl Browser {
    /// Launch the configured engine
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched, or if Chromium was
    /// requested from a build without the `browser` feature
    pub async fn launch(config: BrowserConfig) -> ScadaResult<Self> {
        tracing::info!(engine = %config.engine, headless = config.headless, "launching browser");
        let backend = match config.engine {
            Engine::Simulated => Backend::Simulated,
            #[cfg(feature = "browser")]
            Engine::Chromium => {
                Backend::Chromium(crate::cdp::ChromiumBrowser::launch(&config).await?)
            }
            #[cfg(not(feature = "browser"))]
            Engine::Chromium => {
                return Err(crate::result::ScadaError::BrowserLaunchError {
                    message: "chromium engine requires the `browser` feature".into(),
                })
            }
        };
        Ok(Self { config, backend })
    }

    /// Simulated browser with default timings
    #[must_use]
    pub fn simulated() -> Self {
        Self {
            config: BrowserConfig::default(),
            backend: Backend::Simulated,
        }
    }

    /// Get the browser configuration
    #[must_use]
    pub const fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Create an isolated context
    pub async fn new_context(&self, config: ContextConfig) -> ScadaResult<BrowserContext> {
        match &self.backend {
            Backend::Simulated => Ok(BrowserContext::simulated(
                config,
                self.config.simulation.clone(),
            )),
            #[cfg(feature = "browser")]
            Backend::Chromium(browser) => browser.new_context(config).await,
        }
    }

    /// Close the browser
    pub async fn close(&self) -> ScadaResult<()> {
        match &self.backend {
            Backend::Simulated => Ok(()),
            #[cfg(feature = "browser")]
            Backend::Chromium(browser) => browser.close().await,
        }
    }
}
