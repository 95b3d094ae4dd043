use crate::assertion::expect;
use crate::locator::{AriaRole, Locator};
use crate::page::Page;
use crate::page_object::PageObject;
use crate::result::{ensure, ScadaResult};
use crate::wait::{self, ElementState};
use serde::{Deserialize, Serialize};

/// Default bound for [`DashboardPage::wait_for_dashboard`]
pub const DEFAULT_DASHBOARD_TIMEOUT_MS: u64 = 5000;

/// Default bound for [`DashboardPage::wait_for_value_change`]
pub const DEFAULT_VALUE_CHANGE_TIMEOUT_MS: u64 = 3000;

/// One displayed row of the sensor table, as raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRow {
    /// Sensor identifier
    pub id: String,
    /// Displayed value
    pub value: String,
    /// Displayed update time
    pub updated: String,
}

/// Page object for the dashboard view
#[derive(Debug, Clone)]
pub struct DashboardPage {
    dashboard_section: Locator,
    sensors_table: Locator,
    sensor_rows: Locator,
    status_indicator: Locator,
    dashboard_heading: Locator,
    sensor_ids: Locator,
    sensor_values: Locator,
    sensor_timestamps: Locator,
}

impl DashboardPage {
    /// Bind the dashboard's locators to `page`
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            dashboard_section: page.locator("#dashboard-page"),
            sensors_table: page.get_by_test_id("sensors-table"),
            sensor_rows: page.locator("#sensors-body tr"),
            status_indicator: page.locator(".status"),
            dashboard_heading: page.get_by_role(AriaRole::Heading, "Dashboard"),
            sensor_ids: page.get_by_test_id("sensor-id"),
            sensor_values: page.get_by_test_id("sensor-value"),
            sensor_timestamps: page.get_by_test_id("sensor-updated"),
        }
    }

    /// Sensor table
    #[must_use]
    pub const fn sensors_table(&self) -> &Locator {
        &self.sensors_table
    }

    /// Connection status indicator
    #[must_use]
    pub const fn status_indicator(&self) -> &Locator {
        &self.status_indicator
    }

    /// Whole dashboard section
    #[must_use]
    pub const fn dashboard_section(&self) -> &Locator {
        &self.dashboard_section
    }

    /// Wait for the sensor table, then the status indicator, to be visible
    pub async fn wait_for_dashboard(&self, timeout_ms: u64) -> ScadaResult<()> {
        self.sensors_table
            .wait_for_state(ElementState::Visible, timeout_ms)
            .await?;
        self.status_indicator
            .wait_for_state(ElementState::Visible, timeout_ms)
            .await
    }

    /// Number of rendered sensor rows, once the first row is visible
    pub async fn get_sensors_count(&self) -> ScadaResult<usize> {
        self.sensor_rows
            .first()
            .wait_for_state(ElementState::Visible, self.sensor_rows.options().timeout_ms)
            .await?;
        self.sensor_rows.count().await
    }

    /// Value text of the sensor at `index`
    pub async fn get_sensor_value(&self, index: usize) -> ScadaResult<String> {
        self.sensor_values.nth(index).text_content().await
    }

    /// Every rendered value, read in one pass
    pub async fn get_all_sensor_values(&self) -> ScadaResult<Vec<String>> {
        self.sensor_values.all_text_contents().await
    }

    /// Every rendered row as `(id, value, updated)` text
    pub async fn get_sensor_rows(&self) -> ScadaResult<Vec<SensorRow>> {
        let ids = self.sensor_ids.all_text_contents().await?;
        let values = self.sensor_values.all_text_contents().await?;
        let stamps = self.sensor_timestamps.all_text_contents().await?;
        Ok(ids
            .into_iter()
            .zip(values)
            .zip(stamps)
            .map(|((id, value), updated)| SensorRow { id, value, updated })
            .collect())
    }

    /// Wait until the value at `index` differs from `initial_value`; returns
    /// the new value
    pub async fn wait_for_value_change(
        &self,
        initial_value: &str,
        index: usize,
        timeout_ms: u64,
    ) -> ScadaResult<String> {
        let value = self.sensor_values.nth(index);
        let options = value.options().with_timeout(timeout_ms);
        let value = &value;
        wait::wait_for(
            options,
            format!("sensor value {index} to change from {initial_value:?}"),
            move || async move {
                let current = value.snapshot().await?.and_then(|s| s.text);
                Ok(current.filter(|text| text.trim() != initial_value.trim()))
            },
        )
        .await
    }

    /// Wait until at least one value differs positionally from
    /// `initial_values`; returns the new values
    pub async fn wait_for_any_value_change(
        &self,
        initial_values: &[String],
        timeout_ms: u64,
    ) -> ScadaResult<Vec<String>> {
        let values = &self.sensor_values;
        let options = values.options().with_timeout(timeout_ms);
        wait::wait_for(
            options,
            format!("any of {} sensor values to change", initial_values.len()),
            move || async move {
                let current = values.all_text_contents().await?;
                let changed = current
                    .iter()
                    .zip(initial_values)
                    .any(|(now, before)| now != before);
                Ok(changed.then_some(current))
            },
        )
        .await
    }

    /// Heading "Dashboard", table and status visible, status "Connected"
    pub async fn assert_dashboard_loaded(&self) -> ScadaResult<()> {
        expect(&self.dashboard_heading).to_be_visible().await?;
        expect(&self.sensors_table).to_be_visible().await?;
        expect(&self.status_indicator).to_be_visible().await?;
        expect(&self.status_indicator).to_have_text("Connected").await
    }

    /// At least `min_count` rows rendered
    pub async fn assert_minimum_sensors(&self, min_count: usize) -> ScadaResult<()> {
        let actual = self.get_sensors_count().await?;
        ensure(actual >= min_count, || {
            format!("expected at least {min_count} sensors, found {actual}")
        })
    }
}

impl PageObject for DashboardPage {
    fn root(&self) -> &Locator {
        &self.dashboard_section
    }

    fn page_name(&self) -> &str {
        "dashboard"
    }
}
