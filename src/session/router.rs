//! Top-level page state machine.

use serde::Serialize;
use tracing::info;

use crate::models::launch::LaunchContext;

/// Pages of the client.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    /// New-report form.
    #[default]
    Form,
    /// The actor's own reports.
    MyReports,
    /// Triage queue.
    Admin,
}

impl Page {
    /// All pages in navigation order.
    pub const ALL: [Self; 3] = [Self::Form, Self::MyReports, Self::Admin];

    /// Stable identifier used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::MyReports => "my-reports",
            Self::Admin => "admin",
        }
    }
}

/// Pick the landing page from the launch context and the admin check.
///
/// Rules are evaluated in order:
/// 1. admin with an admin deep link lands on the queue,
/// 2. admin without a deep link lands on the queue,
/// 3. a non-admin deep link lands on the actor's reports,
/// 4. everything else stays on the form.
#[must_use]
pub fn decide_initial(ctx: &LaunchContext, is_admin: bool) -> Page {
    match (is_admin, ctx.admin_intent, ctx.has_deep_link()) {
        (true, true, true) | (true, _, false) => Page::Admin,
        (_, false, true) => Page::MyReports,
        _ => Page::Form,
    }
}

/// Render-ready visibility of every page-level element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    /// The one visible page.
    pub active: Page,
    /// `(page, visible)` for every page.
    pub pages: Vec<(Page, bool)>,
    /// The primary submission control is shown.
    pub submit_control_visible: bool,
    /// The navigation entry to the queue is shown.
    pub admin_entry_visible: bool,
}

/// Current page and admin visibility.
#[derive(Debug, Clone, Default)]
pub struct SessionRouter {
    page: Page,
    is_admin: bool,
}

impl SessionRouter {
    /// Router on the form page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active page.
    #[must_use]
    pub fn page(&self) -> Page {
        self.page
    }

    /// Whether the admin check succeeded.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Record the admin check result.
    pub fn set_admin(&mut self, is_admin: bool) {
        self.is_admin = is_admin;
    }

    /// Make `page` the only visible page and return the resulting view.
    ///
    /// The queue is unreachable for non-admins; such a switch leaves the
    /// router where it is.
    pub fn switch(&mut self, page: Page) -> PageView {
        if page == Page::Admin && !self.is_admin {
            info!(from = self.page.as_str(), "admin page refused");
        } else if page != self.page {
            info!(from = self.page.as_str(), to = page.as_str(), "page switched");
            self.page = page;
        }
        self.view()
    }

    /// View of the current state.
    #[must_use]
    pub fn view(&self) -> PageView {
        PageView {
            active: self.page,
            pages: Page::ALL.iter().map(|p| (*p, *p == self.page)).collect(),
            submit_control_visible: self.page == Page::Form,
            admin_entry_visible: self.is_admin,
        }
    }
}
