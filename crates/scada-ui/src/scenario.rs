//! Scenario runner.
//!
//! A scenario is an async function over a [`ScenarioContext`]. The runner
//! executes scenarios one after another, each in a fresh browser context,
//! and collects a [`SuiteReport`]. Failures are reported verbatim; nothing is
//! retried.

use crate::browser::Engine;
use crate::context::BrowserContext;
use crate::fixture::ScadaFixture;
use crate::page::Page;
use crate::pages::DEFAULT_VALUE_CHANGE_TIMEOUT_MS;
use crate::result::{ScadaError, ScadaResult};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

// =============================================================================
// TAGS
// =============================================================================

/// Scenario category used for selective runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// Fast checks of the main flow
    Smoke,
    /// Behavior that must not regress
    Regression,
    /// Network interception and direct API calls
    Api,
}

impl Tag {
    /// Every tag
    pub const ALL: [Self; 3] = [Self::Smoke, Self::Regression, Self::Api];

    /// Lowercase tag name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Regression => "regression",
            Self::Api => "api",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = ScadaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScadaError::ConfigError {
                message: format!("unknown tag {s:?} (expected smoke, regression or api)"),
            })
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// Future returned by a scenario body
pub type ScenarioFuture<'a> = BoxFuture<'a, ScadaResult<()>>;

/// Scenario body
pub type ScenarioFn = for<'a> fn(&'a ScenarioContext) -> ScenarioFuture<'a>;

/// A named, tagged scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Unique name
    pub name: &'static str,
    /// Categories
    pub tags: &'static [Tag],
    /// Body
    pub run: ScenarioFn,
}

impl Scenario {
    /// Whether the scenario carries `tag`
    #[must_use]
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Selects scenarios by tag and name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioFilter {
    /// Run scenarios carrying any of these tags (empty = all)
    pub tags: Vec<Tag>,
    /// Run scenarios whose name contains this text
    pub name: Option<String>,
}

impl ScenarioFilter {
    /// Match everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Restrict by name substring
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether `scenario` is selected
    #[must_use]
    pub fn matches(&self, scenario: &Scenario) -> bool {
        let tagged = self.tags.is_empty() || self.tags.iter().any(|t| scenario.has_tag(*t));
        let named = self
            .name
            .as_deref()
            .map_or(true, |name| scenario.name.contains(name));
        tagged && named
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// One recorded step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Whether the step succeeded
    pub passed: bool,
    /// Step duration
    pub duration_ms: u64,
}

/// Everything a running scenario may touch
#[derive(Debug)]
pub struct ScenarioContext {
    fixture: Arc<ScadaFixture>,
    context: BrowserContext,
    extra_contexts: Mutex<Vec<Arc<BrowserContext>>>,
    steps: Mutex<Vec<StepRecord>>,
}

impl ScenarioContext {
    /// Context for one scenario run
    #[must_use]
    pub fn new(fixture: Arc<ScadaFixture>, context: BrowserContext) -> Self {
        Self {
            fixture,
            context,
            extra_contexts: Mutex::new(Vec::new()),
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Suite fixture
    #[must_use]
    pub fn fixture(&self) -> &ScadaFixture {
        &self.fixture
    }

    /// The scenario's browser context
    #[must_use]
    pub const fn context(&self) -> &BrowserContext {
        &self.context
    }

    /// Bound for dashboard and response waits, from the suite timeout
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.fixture.wait_options().timeout_ms
    }

    /// Bound for waits on a changing reading: the suite timeout, capped at
    /// [`DEFAULT_VALUE_CHANGE_TIMEOUT_MS`]
    #[must_use]
    pub fn value_change_timeout_ms(&self) -> u64 {
        self.timeout_ms().min(DEFAULT_VALUE_CHANGE_TIMEOUT_MS)
    }

    /// Page with the default mocks, navigated to the document
    pub async fn page_with_routes(&self) -> ScadaResult<Page> {
        self.fixture.page_with_routes(&self.context).await
    }

    /// Blank page in the scenario's context
    pub async fn new_page(&self) -> ScadaResult<Page> {
        self.fixture.new_page(&self.context).await
    }

    /// Context seeded with a logged-in session; closed with the scenario
    pub async fn authenticated_context(&self) -> ScadaResult<Arc<BrowserContext>> {
        let context = Arc::new(self.fixture.context_with_storage().await?);
        if let Ok(mut extra) = self.extra_contexts.lock() {
            extra.push(context.clone());
        }
        Ok(context)
    }

    /// Run one named step, logging and timing it
    pub async fn step<T, F>(&self, name: &str, fut: F) -> ScadaResult<T>
    where
        F: Future<Output = ScadaResult<T>>,
    {
        tracing::info!(step = name, "step started");
        let start = Instant::now();
        let result = fut.await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(step = name, duration_ms, "step passed"),
            Err(err) => tracing::info!(step = name, duration_ms, error = %err, "step failed"),
        }
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(StepRecord {
                name: name.to_string(),
                passed: result.is_ok(),
                duration_ms,
            });
        }
        result
    }

    /// Steps recorded so far
    #[must_use]
    pub fn steps(&self) -> Vec<StepRecord> {
        self.steps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Close every context opened for the scenario
    pub async fn close(&self) -> ScadaResult<()> {
        let extra: Vec<Arc<BrowserContext>> = self
            .extra_contexts
            .lock()
            .map(|mut e| e.drain(..).collect())
            .unwrap_or_default();
        for context in extra {
            context.close().await?;
        }
        self.context.close().await
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Every step succeeded
    Passed,
    /// A step failed
    Failed,
    /// Not run because an earlier scenario failed in fail-fast mode
    Skipped,
}

/// Result of running a single scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Scenario tags
    pub tags: Vec<Tag>,
    /// Outcome
    pub status: ScenarioStatus,
    /// Error message if failed
    pub error: Option<String>,
    /// Recorded steps
    pub steps: Vec<StepRecord>,
    /// Scenario duration
    pub duration_ms: u64,
}

impl ScenarioResult {
    fn new(scenario: &Scenario, status: ScenarioStatus) -> Self {
        Self {
            name: scenario.name.to_string(),
            tags: scenario.tags.to_vec(),
            status,
            error: None,
            steps: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Whether the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Results from running a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Engine the suite ran on
    pub engine: Engine,
    /// Wall-clock start
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Individual results, in run order
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration_ms: u64,
}

impl SuiteReport {
    /// Check if every executed scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    /// Count skipped scenarios
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(ScenarioStatus::Skipped)
    }

    fn count(&self, status: ScenarioStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results
            .iter()
            .filter(|r| r.status == ScenarioStatus::Failed)
            .collect()
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> ScadaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON rendering to `path`, creating parent directories
    pub fn write_json(&self, path: &Path) -> ScadaResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Sequential scenario runner
#[derive(Debug)]
pub struct SuiteRunner {
    fixture: Arc<ScadaFixture>,
    filter: ScenarioFilter,
    fail_fast: bool,
}

impl SuiteRunner {
    /// Runner over `fixture`
    #[must_use]
    pub fn new(fixture: ScadaFixture) -> Self {
        Self {
            fixture: Arc::new(fixture),
            filter: ScenarioFilter::default(),
            fail_fast: false,
        }
    }

    /// Select scenarios
    #[must_use]
    pub fn with_filter(mut self, filter: ScenarioFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Skip remaining scenarios after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Fixture shared by every scenario
    #[must_use]
    pub fn fixture(&self) -> &ScadaFixture {
        &self.fixture
    }

    /// Scenarios the filter selects, in order
    #[must_use]
    pub fn selected<'a>(&self, scenarios: &'a [Scenario]) -> Vec<&'a Scenario> {
        scenarios.iter().filter(|s| self.filter.matches(s)).collect()
    }

    /// Run the selected scenarios
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteReport {
        self.run_with(scenarios, |_| {}).await
    }

    /// Run the selected scenarios, calling `on_result` after each one
    pub async fn run_with<F>(&self, scenarios: &[Scenario], mut on_result: F) -> SuiteReport
    where
        F: FnMut(&ScenarioResult),
    {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();
        let mut failed = false;

        for scenario in self.selected(scenarios) {
            let result = if failed && self.fail_fast {
                ScenarioResult::new(scenario, ScenarioStatus::Skipped)
            } else {
                self.run_scenario(scenario).await
            };
            failed |= result.status == ScenarioStatus::Failed;
            on_result(&result);
            results.push(result);
        }

        SuiteReport {
            engine: self.fixture.browser().config().engine,
            started_at,
            results,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run one scenario in a fresh context
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        tracing::info!(scenario = scenario.name, "scenario started");
        let start = Instant::now();
        let mut result = ScenarioResult::new(scenario, ScenarioStatus::Passed);

        let outcome = match self.fixture.new_context().await {
            Ok(context) => {
                let ctx = ScenarioContext::new(self.fixture.clone(), context);
                let outcome = (scenario.run)(&ctx).await;
                if let Err(err) = ctx.close().await {
                    tracing::warn!(
                        scenario = scenario.name,
                        error = %err,
                        "failed to close context"
                    );
                }
                result.steps = ctx.steps();
                outcome
            }
            Err(err) => Err(err),
        };

        result.duration_ms = start.elapsed().as_millis() as u64;
        if let Err(err) = outcome {
            result.status = ScenarioStatus::Failed;
            result.error = Some(err.to_string());
        }
        tracing::info!(
            scenario = scenario.name,
            status = ?result.status,
            duration_ms = result.duration_ms,
            "scenario finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Browser;
    use crate::result::ScadaError;

    fn passing(_ctx: &ScenarioContext) -> ScenarioFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn failing(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
        Box::pin(async move {
            ctx.step("first", async { Ok(()) }).await?;
            ctx.step("second", async { Err(ScadaError::assertion("boom")) })
                .await
        })
    }

    const SCENARIOS: &[Scenario] = &[
        Scenario {
            name: "alpha_passes",
            tags: &[Tag::Smoke],
            run: passing,
        },
        Scenario {
            name: "beta_fails",
            tags: &[Tag::Regression],
            run: failing,
        },
        Scenario {
            name: "gamma_passes",
            tags: &[Tag::Api, Tag::Regression],
            run: passing,
        },
    ];

    fn runner() -> (SuiteRunner, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("scada_ui.html");
        std::fs::write(&html, "<html></html>").unwrap();
        (
            SuiteRunner::new(ScadaFixture::new(Browser::simulated(), html)),
            dir,
        )
    }

    mod tag_tests {
        use super::*;

        #[test]
        fn test_parse_and_display() {
            assert_eq!("smoke".parse::<Tag>().unwrap(), Tag::Smoke);
            assert_eq!(" API ".parse::<Tag>().unwrap(), Tag::Api);
            assert!("perf".parse::<Tag>().is_err());
            assert_eq!(Tag::Regression.to_string(), "regression");
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn test_empty_filter_matches_all() {
            let filter = ScenarioFilter::new();
            assert!(SCENARIOS.iter().all(|s| filter.matches(s)));
        }

        #[test]
        fn test_tag_and_name() {
            let filter = ScenarioFilter::new().with_tag(Tag::Regression);
            let names: Vec<_> = SCENARIOS
                .iter()
                .filter(|s| filter.matches(s))
                .map(|s| s.name)
                .collect();
            assert_eq!(names, vec!["beta_fails", "gamma_passes"]);

            let filter = filter.with_name("gamma");
            assert!(!filter.matches(&SCENARIOS[1]));
            assert!(filter.matches(&SCENARIOS[2]));
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_failure_recorded_with_steps() {
            let (runner, _dir) = runner();
            let report = runner.run(SCENARIOS).await;
            assert_eq!(report.total(), 3);
            assert_eq!(report.passed_count(), 2);
            assert_eq!(report.failed_count(), 1);
            assert!(!report.all_passed());

            let failure = report.failures()[0];
            assert_eq!(failure.name, "beta_fails");
            assert!(failure.error.as_deref().unwrap().contains("boom"));
            assert_eq!(failure.steps.len(), 2);
            assert!(failure.steps[0].passed);
            assert!(!failure.steps[1].passed);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fail_fast_skips_rest() {
            let (runner, _dir) = runner();
            let report = runner.with_fail_fast(true).run(SCENARIOS).await;
            assert_eq!(report.results[2].status, ScenarioStatus::Skipped);
            assert_eq!(report.skipped_count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_filter_limits_run_and_callback_sees_each() {
            let (runner, _dir) = runner();
            let runner = runner.with_filter(ScenarioFilter::new().with_tag(Tag::Smoke));
            let mut seen = Vec::new();
            let report = runner
                .run_with(SCENARIOS, |r| seen.push(r.name.clone()))
                .await;
            assert_eq!(seen, vec!["alpha_passes"]);
            assert!(report.all_passed());
        }

        #[tokio::test(start_paused = true)]
        async fn test_report_json_round_trip() {
            let (runner, dir) = runner();
            let report = runner.run(SCENARIOS).await;
            let path = dir.path().join("reports/suite.json");
            report.write_json(&path).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(text.contains("\"status\": \"failed\""));
            let parsed: SuiteReport = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed, report);
        }
    }

    mod context_tests {
        use super::*;
        use crate::wait::WaitOptions;

        async fn context_with_timeout(timeout_ms: u64) -> (ScenarioContext, tempfile::TempDir) {
            let dir = tempfile::tempdir().unwrap();
            let html = dir.path().join("scada_ui.html");
            let fixture = ScadaFixture::new(Browser::simulated(), html)
                .with_wait_options(WaitOptions::new().with_timeout(timeout_ms));
            let context = fixture.new_context().await.unwrap();
            (ScenarioContext::new(Arc::new(fixture), context), dir)
        }

        #[tokio::test]
        async fn test_waits_follow_suite_timeout() {
            let (ctx, _dir) = context_with_timeout(1200).await;
            assert_eq!(ctx.timeout_ms(), 1200);
            assert_eq!(ctx.value_change_timeout_ms(), 1200);

            let (ctx, _dir) = context_with_timeout(8000).await;
            assert_eq!(ctx.timeout_ms(), 8000);
            assert_eq!(ctx.value_change_timeout_ms(), DEFAULT_VALUE_CHANGE_TIMEOUT_MS);
        }
    }
}
