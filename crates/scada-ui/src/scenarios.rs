//! Built-in scenarios for the operator UI.
//!
//! Each scenario is self-contained: it builds its own pages and mocks in the
//! fresh context the runner hands it.

use crate::assertion::expect;
use crate::backend::{
    LoginReply, MockBackend, SensorsReply, LOGIN_PATTERN, LOGIN_URL, SENSORS_PATTERN, SENSORS_URL,
};
use crate::network::{HttpMethod, InterceptionLog, ResponseEvent, UrlPattern};
use crate::page_object::PageObject;
use crate::pages::{DashboardPage, LoginPage};
use crate::result::ensure;
use crate::scenario::{Scenario, ScenarioContext, ScenarioFuture, Tag};
use std::sync::{Arc, Mutex};

/// Every built-in scenario, in run order
pub const ALL: &[Scenario] = &[
    Scenario {
        name: "successful_login",
        tags: &[Tag::Smoke],
        run: successful_login,
    },
    Scenario {
        name: "sensors_table_display",
        tags: &[Tag::Smoke],
        run: sensors_table_display,
    },
    Scenario {
        name: "sensor_values_update",
        tags: &[Tag::Regression],
        run: sensor_values_update,
    },
    Scenario {
        name: "network_response_and_api_interception",
        tags: &[Tag::Api],
        run: network_response_and_api_interception,
    },
    Scenario {
        name: "authenticated_context_restores_dashboard",
        tags: &[Tag::Regression],
        run: authenticated_context_restores_dashboard,
    },
    Scenario {
        name: "rejected_login_keeps_login_visible",
        tags: &[Tag::Regression],
        run: rejected_login_keeps_login_visible,
    },
];

/// Look up a built-in scenario by exact name
#[must_use]
pub fn find(name: &str) -> Option<&'static Scenario> {
    ALL.iter().find(|s| s.name == name)
}

/// Valid credentials lead from the login view to a fully loaded dashboard
fn successful_login(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
    Box::pin(async move {
        let page = ctx.page_with_routes().await?;
        let login = LoginPage::new(&page);
        let dashboard = DashboardPage::new(&page);

        ctx.step("login view rendered", login.assert_login_page_loaded())
            .await?;
        ctx.step("submit credentials", login.login("operator", "securepassword"))
            .await?;
        ctx.step("dashboard replaces login", async {
            dashboard.wait_for_dashboard(ctx.timeout_ms()).await?;
            login.wait_until_gone(ctx.timeout_ms()).await?;
            dashboard.wait_until_shown(ctx.timeout_ms()).await
        })
        .await?;
        ctx.step("dashboard loaded", dashboard.assert_dashboard_loaded())
            .await
    })
}

/// The sensor table lists every mocked sensor with a value
fn sensors_table_display(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
    Box::pin(async move {
        let page = ctx.page_with_routes().await?;
        let login = LoginPage::new(&page);
        let dashboard = DashboardPage::new(&page);
        let mocked = MockBackend::new().sensors().sensors.len();

        ctx.step("log in", login.login("operator", "password123"))
            .await?;
        ctx.step("sensor table visible", async {
            dashboard.wait_for_dashboard(ctx.timeout_ms()).await?;
            expect(dashboard.sensors_table()).to_be_visible().await
        })
        .await?;
        ctx.step("at least one sensor", dashboard.assert_minimum_sensors(1))
            .await?;
        ctx.step("every mocked sensor rendered", async {
            let count = dashboard.get_sensors_count().await?;
            ensure(count == mocked, || {
                format!("expected {mocked} rendered sensors, found {count}")
            })
        })
        .await?;
        ctx.step("first value present", async {
            let value = dashboard.get_sensor_value(0).await?;
            ensure(!value.trim().is_empty(), || {
                "expected a value in the first sensor row, found empty text".to_string()
            })
        })
        .await
    })
}

/// Displayed readings change over time without a reload
fn sensor_values_update(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
    Box::pin(async move {
        let page = ctx.page_with_routes().await?;
        let login = LoginPage::new(&page);
        let dashboard = DashboardPage::new(&page);

        ctx.step("log in", login.login("admin", "admin123")).await?;
        ctx.step("rows rendered", async {
            dashboard.wait_for_dashboard(ctx.timeout_ms()).await?;
            dashboard.get_sensors_count().await.map(drop)
        })
        .await?;

        let initial = ctx
            .step("read first value", dashboard.get_sensor_value(0))
            .await?;
        let updated = ctx
            .step(
                "first value changes",
                dashboard.wait_for_value_change(&initial, 0, ctx.value_change_timeout_ms()),
            )
            .await?;
        ensure(updated != initial, || {
            format!("expected value to differ from {initial:?}, found {updated:?}")
        })?;

        let before = ctx
            .step("read all values", dashboard.get_all_sensor_values())
            .await?;
        ctx.step(
            "some value changes",
            dashboard.wait_for_any_value_change(&before, ctx.value_change_timeout_ms()),
        )
        .await
        .map(drop)
    })
}

/// Document and API responses are observed; direct fetches hit the mocks
fn network_response_and_api_interception(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
    Box::pin(async move {
        let page = ctx.new_page().await?;
        let login = LoginPage::new(&page);
        let dashboard = DashboardPage::new(&page);
        let timeout_ms = page.default_timeout_ms();

        let log = InterceptionLog::new();
        MockBackend::new()
            .with_login(LoginReply::accepted_session("test-session-123"))
            .with_sensors(SensorsReply::from_pairs(&[("TEMP-1", 25.5), ("PRESS-2", 101.3)]))
            .with_log(log.clone())
            .install(&page)?;

        let responses: Arc<Mutex<Vec<ResponseEvent>>> = Arc::default();
        let sink = responses.clone();
        page.on_response(move |event| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(event.clone());
            }
        });

        let document_name = ctx
            .fixture()
            .html_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document_pattern = UrlPattern::regex(&format!("{}$", regex::escape(&document_name)))?;

        ctx.step("document response observed", async {
            let waiter = page.expect_response(document_pattern.clone());
            page.goto(&ctx.fixture().file_url()).await?;
            let event = waiter.wait(timeout_ms).await?;
            ensure(event.ok(), || {
                format!("expected document to load, got status {}", event.status)
            })
        })
        .await?;

        ctx.step("log in through the UI", async {
            login.login("test_user", "test_password").await?;
            dashboard.wait_for_dashboard(ctx.timeout_ms()).await?;
            dashboard.assert_minimum_sensors(1).await
        })
        .await?;

        ctx.step("direct login call", async {
            let waiter = page.expect_response(LOGIN_PATTERN);
            let reply = page.fetch(HttpMethod::Post, LOGIN_URL).await?;
            waiter.wait(timeout_ms).await?;
            let body: LoginReply = reply.json()?;
            ensure(body.success, || {
                format!("expected a successful login reply, found {body:?}")
            })
        })
        .await?;

        ctx.step("direct sensors call", async {
            let waiter = page.expect_response(SENSORS_PATTERN);
            let reply = page.fetch(HttpMethod::Get, SENSORS_URL).await?;
            waiter.wait(timeout_ms).await?;
            let body: SensorsReply = reply.json()?;
            ensure(!body.sensors.is_empty(), || {
                "expected at least one sensor in the reply, found none".to_string()
            })
        })
        .await?;

        ctx.step("interceptions recorded", async {
            ensure(log.contains("login") && log.contains("sensors"), || {
                format!(
                    "expected login and sensors in the interception log, found {:?}",
                    log.entries()
                )
            })?;
            let seen = responses.lock().map(|r| r.clone()).unwrap_or_default();
            ensure(seen.iter().any(|e| document_pattern.matches(&e.url)), || {
                format!("expected a response for {document_name}, saw {} responses", seen.len())
            })
        })
        .await
    })
}

/// A context seeded with a stored session opens straight onto the dashboard
fn authenticated_context_restores_dashboard(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
    Box::pin(async move {
        let context = ctx
            .step("capture session", ctx.authenticated_context())
            .await?;
        let page = ctx.fixture().new_page(&context).await?;
        let login = LoginPage::new(&page);
        let dashboard = DashboardPage::new(&page);

        ctx.step("reopen document", page.goto(&ctx.fixture().file_url()))
            .await?;
        ctx.step("dashboard shown without login", async {
            dashboard.wait_for_dashboard(ctx.timeout_ms()).await?;
            ensure(!login.is_visible().await?, || {
                "expected login view hidden for a stored session, found it visible".to_string()
            })
        })
        .await?;
        ctx.step("sensors listed", dashboard.assert_minimum_sensors(1))
            .await
    })
}

/// A rejected login shows an error and never reaches the dashboard
fn rejected_login_keeps_login_visible(ctx: &ScenarioContext) -> ScenarioFuture<'_> {
    Box::pin(async move {
        let page = ctx.new_page().await?;
        let login = LoginPage::new(&page);
        let dashboard = DashboardPage::new(&page);

        let backend = MockBackend::new().with_login(LoginReply::denied());
        backend.install(&page)?;
        page.goto(&ctx.fixture().file_url()).await?;

        ctx.step("submit wrong credentials", login.login("operator", "wrong-password"))
            .await?;
        ctx.step("error shown", async {
            expect(login.error_message()).to_be_visible().await?;
            expect(login.error_message())
                .to_have_text("Invalid credentials")
                .await?;
            expect(&page.get_by_text("Invalid credentials"))
                .to_have_count(1)
                .await
        })
        .await?;
        ctx.step("login view stays", async {
            expect(login.login_section()).to_be_visible().await?;
            expect(dashboard.dashboard_section()).to_be_hidden().await
        })
        .await?;
        ctx.step("sensors never requested", async {
            ensure(!backend.log().contains("sensors"), || {
                format!("expected no sensors request, log was {:?}", backend.log().entries())
            })
        })
        .await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = ALL.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_every_tag_used() {
        for tag in Tag::ALL {
            assert!(ALL.iter().any(|s| s.has_tag(tag)), "no scenario tagged {tag}");
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("successful_login").map(|s| s.tags), Some(&[Tag::Smoke][..]));
        assert!(find("missing").is_none());
    }
}
