//! Built-in scenarios on the simulated engine.
//!
//! Every scenario must pass against the bundled fixture document.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use scada_ui::{
    scenarios, Browser, ScadaFixture, ScenarioFilter, ScenarioStatus, SuiteConfig, SuiteRunner,
    Tag,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn runner() -> SuiteRunner {
    init_tracing();
    SuiteRunner::new(ScadaFixture::new(
        Browser::simulated(),
        ScadaFixture::default_html_path(),
    ))
}

async fn run_one(name: &str) {
    let scenario = scenarios::find(name).expect("scenario exists");
    let result = runner().run_scenario(scenario).await;
    assert_eq!(
        result.status,
        ScenarioStatus::Passed,
        "{name} failed: {:?}",
        result.error
    );
    assert!(!result.steps.is_empty());
    assert!(result.steps.iter().all(|s| s.passed));
}

// ============================================================================
// Individual scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_successful_login() {
    run_one("successful_login").await;
}

#[tokio::test(start_paused = true)]
async fn test_sensors_table_display() {
    run_one("sensors_table_display").await;
}

#[tokio::test(start_paused = true)]
async fn test_sensor_values_update() {
    run_one("sensor_values_update").await;
}

#[tokio::test(start_paused = true)]
async fn test_network_response_and_api_interception() {
    run_one("network_response_and_api_interception").await;
}

#[tokio::test(start_paused = true)]
async fn test_authenticated_context_restores_dashboard() {
    run_one("authenticated_context_restores_dashboard").await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_login_keeps_login_visible() {
    run_one("rejected_login_keeps_login_visible").await;
}

// ============================================================================
// Suite runs
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_suite_passes() {
    let report = runner().run(scenarios::ALL).await;
    assert_eq!(report.total(), scenarios::ALL.len());
    assert!(
        report.all_passed(),
        "failures: {:?}",
        report.failures().iter().map(|r| (&r.name, &r.error)).collect::<Vec<_>>()
    );
}

#[tokio::test(start_paused = true)]
async fn test_tag_selection() {
    let report = runner()
        .with_filter(ScenarioFilter::new().with_tag(Tag::Smoke))
        .run(scenarios::ALL)
        .await;
    let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["successful_login", "sensors_table_display"]);

    let report = runner()
        .with_filter(ScenarioFilter::new().with_tag(Tag::Api))
        .run(scenarios::ALL)
        .await;
    assert_eq!(report.total(), 1);
    assert!(report.all_passed());
}

#[tokio::test(start_paused = true)]
async fn test_launch_from_default_config() {
    let fixture = ScadaFixture::launch(&SuiteConfig::default()).await.unwrap();
    let report = SuiteRunner::new(fixture)
        .with_filter(ScenarioFilter::new().with_name("successful_login"))
        .run(scenarios::ALL)
        .await;
    assert_eq!(report.passed_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_bounds_value_waits() {
    init_tracing();
    let mut config = SuiteConfig::default().with_timeout(400);
    config.simulation.update_interval_ms = 60_000;
    let fixture = ScadaFixture::launch(&config).await.unwrap();
    let scenario = scenarios::find("sensor_values_update").unwrap();
    let result = SuiteRunner::new(fixture).run_scenario(scenario).await;

    assert_eq!(result.status, ScenarioStatus::Failed);
    let error = result.error.unwrap();
    assert!(error.contains("Timed out after 400ms"), "{error}");
    let step = result
        .steps
        .iter()
        .find(|s| s.name == "first value changes")
        .unwrap();
    assert!(!step.passed);
    assert!((400..3000).contains(&step.duration_ms), "{}", step.duration_ms);
}
