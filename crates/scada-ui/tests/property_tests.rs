//! Property-based tests for URL matching and dashboard reads.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use scada_ui::{
    Browser, ContextConfig, DashboardPage, LoginPage, MockBackend, ScadaFixture, SensorsReply,
    UrlPattern,
};

// === URL Pattern Property Tests ===

proptest! {
    /// `**/api/<endpoint>` matches that endpoint on any host, with or
    /// without a query string.
    #[test]
    fn prop_endpoint_glob_matches_any_host(
        host in "[a-z]{1,10}(\\.[a-z]{2,5})?",
        endpoint in "[a-z]{1,12}",
        query in proptest::option::of("[a-z]{1,5}=[0-9]{1,3}")
    ) {
        let pattern = UrlPattern::glob(format!("**/api/{endpoint}"));
        let mut url = format!("https://{host}/api/{endpoint}");
        if let Some(q) = query {
            url = format!("{url}?{q}");
        }
        prop_assert!(pattern.matches(&url), "{} should match {}", pattern, url);
    }

    /// A different endpoint never matches.
    #[test]
    fn prop_endpoint_glob_rejects_other_endpoints(
        endpoint in "[a-z]{1,12}",
        other in "[a-z]{1,12}"
    ) {
        prop_assume!(!other.ends_with(&endpoint));
        let pattern = UrlPattern::glob(format!("**/api/{endpoint}"));
        let url = format!("https://mock.local/api/{other}");
        prop_assert!(!pattern.matches(&url), "{} should not match {}", pattern, url);
    }

    /// A single `*` covers one path segment and never crosses `/`.
    #[test]
    fn prop_single_star_stays_in_one_segment(
        first in "[a-z0-9-]{1,10}",
        second in "[a-z0-9-]{1,10}"
    ) {
        let pattern = UrlPattern::glob("https://mock.local/api/*");
        let one = format!("https://mock.local/api/{first}");
        prop_assert!(pattern.matches(&one), "{} should match {}", pattern, one);
        let two = format!("https://mock.local/api/{first}/{second}");
        prop_assert!(!pattern.matches(&two), "{} should not match {}", pattern, two);
    }
}

// === Dashboard Read Property Tests ===

fn sensor_sets() -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec(("[A-Z]{3,5}-[0-9]", 0.0f64..500.0), 1..6)
}

async fn rendered_dashboard(sensors: &[(String, f64)]) -> (usize, Vec<String>, Vec<String>) {
    let pairs: Vec<(&str, f64)> = sensors.iter().map(|(id, v)| (id.as_str(), *v)).collect();
    let fixture = ScadaFixture::new(Browser::simulated(), ScadaFixture::default_html_path());
    let context = Browser::simulated()
        .new_context(ContextConfig::default())
        .await
        .unwrap();
    let page = context.new_page().await.unwrap();
    MockBackend::new()
        .with_sensors(SensorsReply::from_pairs(&pairs))
        .install(&page)
        .unwrap();
    page.goto(&fixture.file_url()).await.unwrap();
    LoginPage::new(&page).login("operator", "password").await.unwrap();

    let dashboard = DashboardPage::new(&page);
    let count = dashboard.get_sensors_count().await.unwrap();
    let first = dashboard.get_all_sensor_values().await.unwrap();
    let second = dashboard.get_all_sensor_values().await.unwrap();
    (count, first, second)
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every mocked sensor is rendered, and two immediate reads agree.
    #[test]
    fn prop_rendered_rows_cover_mock_and_reads_are_stable(sensors in sensor_sets()) {
        let (count, first, second) = paused_runtime().block_on(rendered_dashboard(&sensors));
        prop_assert!(count >= sensors.len());
        prop_assert_eq!(first.len(), sensors.len());
        prop_assert_eq!(first, second);
    }
}
