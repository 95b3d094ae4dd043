//! Browser Context Management
//!
//! Isolated browser contexts: each scenario gets its own context so that
//! local storage and routes never leak between scenarios. A context can be
//! seeded with a [`StorageState`] snapshot taken from another context.

use crate::network::Network;
use crate::page::Page;
use crate::result::ScadaResult;
use crate::sim::{SimulatedPage, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Origin under which `file://` documents keep their local storage
pub const FILE_ORIGIN: &str = "file://";

/// Storage state for a context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageState {
    /// Local storage data, keyed by origin
    pub local_storage: HashMap<String, HashMap<String, String>>,
}

impl StorageState {
    /// Create empty storage state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add local storage item
    #[must_use]
    pub fn with_local_storage(mut self, origin: &str, key: &str, value: &str) -> Self {
        self.set_item(origin, key, value);
        self
    }

    /// Set a local storage item in place
    pub fn set_item(&mut self, origin: &str, key: &str, value: &str) {
        self.local_storage
            .entry(origin.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Read a local storage item
    #[must_use]
    pub fn get_item(&self, origin: &str, key: &str) -> Option<&str> {
        self.local_storage
            .get(origin)
            .and_then(|items| items.get(key))
            .map(String::as_str)
    }

    /// Merge another state into this one; `other` wins on conflicts
    pub fn merge(&mut self, other: Self) {
        for (origin, items) in other.local_storage {
            self.local_storage.entry(origin).or_default().extend(items);
        }
    }

    /// Check if storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local_storage.values().all(HashMap::is_empty)
    }

    /// Clear all storage
    pub fn clear(&mut self) {
        self.local_storage.clear();
    }
}

/// Configuration for a browser context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Context name
    pub name: String,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Locale
    pub locale: String,
    /// Initial storage state
    pub storage_state: Option<StorageState>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            viewport_width: 1280,
            viewport_height: 720,
            locale: "ru-RU".to_string(),
            storage_state: None,
        }
    }
}

impl ContextConfig {
    /// Create a new context config
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Seed storage state
    #[must_use]
    pub fn with_storage_state(mut self, state: StorageState) -> Self {
        self.storage_state = Some(state);
        self
    }
}

/// Engine behind a context
#[derive(Debug)]
pub(crate) enum ContextEngine {
    Simulated {
        storage: Arc<Mutex<StorageState>>,
        simulation: SimulationConfig,
    },
    #[cfg(feature = "browser")]
    Chromium(crate::cdp::ChromiumContext),
}

/// An isolated browser context
#[derive(Debug)]
pub struct BrowserContext {
    id: String,
    config: ContextConfig,
    engine: ContextEngine,
    pages: Mutex<Vec<Page>>,
}

impl BrowserContext {
    pub(crate) fn new(config: ContextConfig, engine: ContextEngine) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(context = %id, name = %config.name, "context created");
        Self {
            id,
            config,
            engine,
            pages: Mutex::new(Vec::new()),
        }
    }

    /// Simulated context seeded from `config.storage_state`
    pub(crate) fn simulated(config: ContextConfig, simulation: SimulationConfig) -> Self {
        let storage = config.storage_state.clone().unwrap_or_default();
        Self::new(
            config,
            ContextEngine::Simulated {
                storage: Arc::new(Mutex::new(storage)),
                simulation,
            },
        )
    }

    /// Context identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Context configuration
    #[must_use]
    pub const fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Open a new page in this context
    pub async fn new_page(&self) -> ScadaResult<Page> {
        let network = Arc::new(Network::new());
        let page = match &self.engine {
            ContextEngine::Simulated {
                storage,
                simulation,
            } => {
                let driver =
                    SimulatedPage::new(simulation.clone(), network.clone(), storage.clone());
                Page::new(Arc::new(driver), network)
            }
            #[cfg(feature = "browser")]
            ContextEngine::Chromium(context) => {
                let driver = context.new_page(network.clone(), &self.config).await?;
                Page::new(Arc::new(driver), network)
            }
        };

        if let Ok(mut pages) = self.pages.lock() {
            pages.push(page.clone());
        }
        Ok(page)
    }

    /// Number of pages opened in this context
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Snapshot of the context's local storage
    pub async fn storage_state(&self) -> ScadaResult<StorageState> {
        match &self.engine {
            ContextEngine::Simulated { storage, .. } => {
                Ok(storage.lock().map(|s| s.clone()).unwrap_or_default())
            }
            #[cfg(feature = "browser")]
            ContextEngine::Chromium(_) => {
                let pages: Vec<Page> = self.pages.lock().map(|p| p.clone()).unwrap_or_default();
                let mut state = self.config.storage_state.clone().unwrap_or_default();
                for page in &pages {
                    state.merge(page.storage_state().await?);
                }
                Ok(state)
            }
        }
    }

    /// Close every page and release the context
    pub async fn close(&self) -> ScadaResult<()> {
        let pages: Vec<Page> = self
            .pages
            .lock()
            .map(|mut p| p.drain(..).collect())
            .unwrap_or_default();
        for page in &pages {
            page.close().await?;
        }

        #[cfg(feature = "browser")]
        if let ContextEngine::Chromium(context) = &self.engine {
            context.dispose().await?;
        }

        tracing::debug!(context = %self.id, pages = pages.len(), "context closed");
        Ok(())
    }
}
