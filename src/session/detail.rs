//! Report detail view-models and the edit payloads they produce.

use serde::Serialize;

use crate::api::ReportUpdate;
use crate::models::report::{ReportStatus, ReportSummary};

/// Shown instead of the save control on a locked report.
pub const LOCKED_MESSAGE: &str = "editing is locked: the report status has changed";

fn title(report: &ReportSummary) -> String {
    format!("Report #{}", report.report_number)
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map_or_else(|| "-".to_owned(), ToOwned::to_owned)
}

/// A reporter's view of one of their reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReportDetail {
    /// The report as cached or fetched.
    pub report: ReportSummary,
    /// Heading, e.g. `Report #12`.
    pub title: String,
    /// Status label.
    pub status_label: &'static str,
    /// The reporter may still edit the report.
    pub editable: bool,
    /// Admin comment asking for more detail.
    pub revision_comment: Option<String>,
    /// Tracker id, or `Not assigned`.
    pub tracking: String,
    /// Creation time for display.
    pub created: String,
    /// Reason the form is read-only.
    pub lock_message: Option<&'static str>,
}

impl UserReportDetail {
    /// Build the view for `report`.
    #[must_use]
    pub fn new(report: ReportSummary) -> Self {
        let editable = report.status.editable_by_owner();
        let revision_comment = (report.status == ReportStatus::Revision)
            .then(|| report.status_comment.clone())
            .flatten()
            .filter(|c| !c.is_empty());
        Self {
            title: title(&report),
            status_label: report.status.label(),
            editable,
            revision_comment,
            tracking: report
                .tracking_id
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Not assigned".into()),
            created: report.created_display(),
            lock_message: (!editable).then_some(LOCKED_MESSAGE),
            report,
        }
    }

    /// Edit form prefilled from the report.
    #[must_use]
    pub fn edit_form(&self) -> UserReportEdit {
        let r = &self.report;
        UserReportEdit {
            user_login: r.user_login.clone().unwrap_or_default(),
            platform: r.platform.clone(),
            platform_version: r.platform_version.clone().unwrap_or_default(),
            error_time: r.error_time.clone().unwrap_or_default(),
            server: r.server.clone(),
            subscriber_info: r.subscriber_info.clone().unwrap_or_default(),
            description: r.description.clone(),
        }
    }
}

/// Fields a reporter can change on their own report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserReportEdit {
    /// Login on the reported service.
    pub user_login: String,
    /// Platform.
    pub platform: String,
    /// Platform version.
    pub platform_version: String,
    /// When the bug occurred.
    pub error_time: String,
    /// Server.
    pub server: String,
    /// Subscriber details.
    pub subscriber_info: String,
    /// Description.
    pub description: String,
}

impl UserReportEdit {
    /// Update carrying all seven reporter fields.
    #[must_use]
    pub fn into_update(self, report_id: i64) -> ReportUpdate {
        ReportUpdate {
            report_id,
            user_login: Some(self.user_login),
            platform: Some(self.platform),
            platform_version: Some(self.platform_version),
            error_time: Some(self.error_time),
            server: Some(self.server),
            subscriber_info: Some(self.subscriber_info),
            description: Some(self.description),
            ..ReportUpdate::default()
        }
    }
}

/// An admin's view of a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminReportDetail {
    /// The report as cached or fetched.
    pub report: ReportSummary,
    /// Heading, e.g. `Report #12`.
    pub title: String,
    /// `@username`, or `Unknown`.
    pub reporter: String,
    /// `(label, value)` rows with `-` for blanks.
    pub fields: Vec<(&'static str, String)>,
    /// Creation time for display.
    pub created: String,
}

impl AdminReportDetail {
    /// Build the view for `report`.
    #[must_use]
    pub fn new(report: ReportSummary) -> Self {
        let reporter = report
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map_or_else(|| "Unknown".to_owned(), |u| format!("@{u}"));
        let fields = vec![
            ("Login", or_dash(report.user_login.as_deref())),
            ("Platform", or_dash(Some(&report.platform))),
            ("Version", or_dash(report.platform_version.as_deref())),
            ("Error time", or_dash(report.error_time.as_deref())),
            ("Server", or_dash(Some(&report.server))),
            ("Subscriber", or_dash(report.subscriber_info.as_deref())),
            ("Description", or_dash(Some(&report.description))),
        ];
        Self {
            title: title(&report),
            reporter,
            fields,
            created: report.created_display(),
            report,
        }
    }

    /// Triage form prefilled from the report.
    #[must_use]
    pub fn edit_form(&self) -> AdminReportEdit {
        AdminReportEdit {
            status: self.report.status,
            tracking_id: self.report.tracking_id.clone().unwrap_or_default(),
            status_comment: self.report.status_comment.clone().unwrap_or_default(),
        }
    }
}

/// Triage fields an admin can change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminReportEdit {
    /// New status.
    pub status: ReportStatus,
    /// External tracker id.
    pub tracking_id: String,
    /// Comment for the reporter; only kept for `revision`.
    pub status_comment: String,
}

impl AdminReportEdit {
    /// Whether the comment input is shown for the selected status.
    #[must_use]
    pub fn comment_visible(&self) -> bool {
        self.status == ReportStatus::Revision
    }

    /// Update carrying status, tracker id and the effective comment.
    #[must_use]
    pub fn into_update(self, report_id: i64) -> ReportUpdate {
        let status_comment = if self.comment_visible() {
            self.status_comment
        } else {
            String::new()
        };
        ReportUpdate {
            report_id,
            status: Some(self.status),
            tracking_id: Some(self.tracking_id),
            status_comment: Some(status_comment),
            ..ReportUpdate::default()
        }
    }
}
