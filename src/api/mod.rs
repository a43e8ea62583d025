//! Remote report store interface.
//!
//! The [`ReportApi`] trait decouples the session engine (collections,
//! router, upload pipeline) from the transport. [`http::HttpReportApi`]
//! speaks the server's JSON/multipart protocol; tests substitute fakes.

pub mod http;
pub mod progress;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::models::form::ReportForm;
use crate::models::report::{ReportPatch, ReportStats, ReportStatus, ReportSummary};
use crate::models::upload::UploadFileEntry;
use crate::Result;

pub use progress::{progress_channel, ProgressSink, ProgressWatch};

/// Boxed future returned by [`ReportApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Paging and filtering parameters for list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Chat scope.
    pub chat_id: Option<i64>,
    /// Maximum number of reports to return.
    pub limit: usize,
    /// Number of reports to skip.
    pub offset: usize,
    /// Optional status filter (admin queue only).
    pub status: Option<ReportStatus>,
    /// Ask the server for queue counters (admin queue only).
    pub include_stats: bool,
}

/// One page of reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportPage {
    /// Reports in server order.
    #[serde(default)]
    pub reports: Vec<ReportSummary>,
    /// Whether another page exists.
    #[serde(default)]
    pub has_more: bool,
    /// Queue counters, when requested.
    #[serde(default)]
    pub stats: Option<ReportStats>,
}

/// Mutable fields sent to `update-report`.
///
/// Unset fields are omitted from the request body and leave the server
/// value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportUpdate {
    /// Report being updated.
    pub report_id: i64,
    /// Reporter login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_login: Option<String>,
    /// Platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Platform version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    /// When the bug occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_time: Option<String>,
    /// Server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Subscriber details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_info: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Triage status (admins only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,
    /// Tracker id (admins only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    /// Status comment (admins only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_comment: Option<String>,
}

impl ReportUpdate {
    /// The local patch mirroring exactly what this update submits.
    #[must_use]
    pub fn to_patch(&self) -> ReportPatch {
        ReportPatch {
            status: self.status,
            platform: self.platform.clone(),
            platform_version: self.platform_version.clone(),
            server: self.server.clone(),
            user_login: self.user_login.clone(),
            description: self.description.clone(),
            error_time: self.error_time.clone(),
            tracking_id: self.tracking_id.clone(),
            status_comment: self.status_comment.clone(),
            subscriber_info: self.subscriber_info.clone(),
        }
    }
}

/// Everything sent in one report submission.
#[derive(Debug, Clone)]
pub struct ReportSubmission {
    /// Form metadata.
    pub form: ReportForm,
    /// Chat the report is filed in.
    pub chat_id: Option<i64>,
    /// Attachments, in selection order.
    pub files: Vec<UploadFileEntry>,
}

impl ReportSubmission {
    /// Sum of attachment sizes, which is what progress is measured against.
    #[must_use]
    pub fn payload_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Settled HTTP exchange of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body `success` flag; `false` when the body was not readable.
    pub success: bool,
    /// Body `error` message, if any.
    pub error: Option<String>,
    /// Number assigned to the new report.
    pub report_number: Option<i64>,
}

/// Protocol-agnostic interface to the report server.
///
/// Every request carries the host authentication token; implementations
/// own it.
pub trait ReportApi: Send + Sync {
    /// Whether the current actor administers `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the server cannot be reached.
    fn check_admin(&self, chat_id: Option<i64>) -> ApiFuture<'_, bool>;

    /// Page through the actor's own reports.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Server` when the server reports a failure.
    fn user_reports(&self, query: PageQuery) -> ApiFuture<'_, ReportPage>;

    /// Page through a chat's report queue.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` on a 403 and `AppError::Server` on
    /// other failures.
    fn chat_reports(&self, query: PageQuery) -> ApiFuture<'_, ReportPage>;

    /// Full-text search within a chat's queue (not paginated).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Server` when the server reports a failure.
    fn search_reports(&self, chat_id: i64, query: String) -> ApiFuture<'_, Vec<ReportSummary>>;

    /// Fetch a single report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the report does not exist.
    fn get_report(&self, report_id: i64) -> ApiFuture<'_, ReportSummary>;

    /// Persist edits to a report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Server` with the server's message on rejection.
    fn update_report(&self, update: ReportUpdate) -> ApiFuture<'_, ()>;

    /// Submit a new report with attachments, publishing sent byte counts to
    /// `progress` as the body streams out.
    ///
    /// Any HTTP response settles as `Ok`; only transport failures are `Err`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request could not complete.
    fn submit_report(
        &self,
        submission: ReportSubmission,
        progress: ProgressSink,
    ) -> ApiFuture<'_, SubmitResponse>;

    /// Download the chat's reports as CSV.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Server` on a non-success status.
    fn export_csv(&self, chat_id: i64) -> ApiFuture<'_, Bytes>;
}
