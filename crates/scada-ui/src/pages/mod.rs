//! Page objects of the operator UI.

mod dashboard;
mod login;

pub use dashboard::{
    DashboardPage, SensorRow, DEFAULT_DASHBOARD_TIMEOUT_MS, DEFAULT_VALUE_CHANGE_TIMEOUT_MS,
};
pub use login::LoginPage;
