use crate::assertion::expect;
use crate::locator::{AriaRole, Locator};
use crate::page::Page;
use crate::page_object::PageObject;
use crate::result::ScadaResult;

/// Page object for the login view
#[derive(Debug, Clone)]
pub struct LoginPage {
    username_input: Locator,
    password_input: Locator,
    login_button: Locator,
    login_section: Locator,
    login_heading: Locator,
    error_message: Locator,
}

impl LoginPage {
    /// Bind the login view's locators to `page`
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            username_input: page.get_by_test_id("username"),
            password_input: page.get_by_test_id("password"),
            login_button: page.get_by_test_id("login-button"),
            login_section: page.locator("#login-page"),
            login_heading: page.get_by_role(AriaRole::Heading, "Login"),
            error_message: page.get_by_test_id("login-error"),
        }
    }

    /// Username input
    #[must_use]
    pub const fn username_input(&self) -> &Locator {
        &self.username_input
    }

    /// Password input
    #[must_use]
    pub const fn password_input(&self) -> &Locator {
        &self.password_input
    }

    /// Submit button
    #[must_use]
    pub const fn login_button(&self) -> &Locator {
        &self.login_button
    }

    /// Whole login section
    #[must_use]
    pub const fn login_section(&self) -> &Locator {
        &self.login_section
    }

    /// Rejection message shown under the form
    #[must_use]
    pub const fn error_message(&self) -> &Locator {
        &self.error_message
    }

    /// Fill both inputs and submit. The resulting transition is awaited by
    /// the caller.
    pub async fn login(&self, username: &str, password: &str) -> ScadaResult<()> {
        tracing::info!(%username, "logging in");
        self.username_input.fill(username).await?;
        self.password_input.fill(password).await?;
        self.login_button.click().await
    }

    /// Heading and both inputs visible, submit enabled
    pub async fn assert_login_page_loaded(&self) -> ScadaResult<()> {
        expect(&self.login_heading).to_be_visible().await?;
        expect(&self.username_input).to_be_visible().await?;
        expect(&self.password_input).to_be_visible().await?;
        expect(&self.login_button).to_be_enabled().await
    }
}

impl PageObject for LoginPage {
    fn root(&self) -> &Locator {
        &self.login_section
    }

    fn page_name(&self) -> &str {
        "login"
    }
}
