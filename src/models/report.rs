//! Report summary entity, status taxonomy, and in-place patching.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Triage status of a report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Freshly filed, not yet looked at.
    #[default]
    New,
    /// Sent back to the reporter for more detail.
    Revision,
    /// Being worked on.
    InProgress,
    /// Resolved.
    Completed,
    /// Rejected.
    Trash,
}

impl ReportStatus {
    /// Every status, in queue-filter order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Revision,
        Self::InProgress,
        Self::Completed,
        Self::Trash,
    ];

    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Revision => "revision",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Trash => "trash",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Revision => "Needs revision",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Trash => "Rejected",
        }
    }

    /// Parse the wire representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw)
    }

    /// Whether the reporter may still edit a report in this status.
    #[must_use]
    pub fn editable_by_owner(self) -> bool {
        matches!(self, Self::New | Self::Revision)
    }
}

fn null_status_as_new<'de, D>(deserializer: D) -> std::result::Result<ReportStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ReportStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Per-chat queue counters returned alongside the first admin page.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReportStats {
    /// All reports in the chat.
    #[serde(default)]
    pub total: u64,
    /// Reports in `new`.
    #[serde(default)]
    pub new: u64,
    /// Reports in `in_progress`.
    #[serde(default)]
    pub in_progress: u64,
    /// Reports in `completed`.
    #[serde(default)]
    pub completed: u64,
}

/// A report as listed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReportSummary {
    /// Server-assigned identifier.
    pub id: i64,
    /// Sequential per-chat number shown to users.
    pub report_number: i64,
    /// Current triage status.
    #[serde(default, deserialize_with = "null_status_as_new")]
    pub status: ReportStatus,
    /// Client platform the bug was seen on.
    #[serde(default)]
    pub platform: String,
    /// Client platform version.
    #[serde(default)]
    pub platform_version: Option<String>,
    /// Server the reporter was connected to.
    #[serde(default)]
    pub server: String,
    /// Reporter's login on the reported service.
    #[serde(default)]
    pub user_login: Option<String>,
    /// Free-form bug description.
    #[serde(default)]
    pub description: String,
    /// When the bug occurred, as entered by the reporter.
    #[serde(default)]
    pub error_time: Option<String>,
    /// External tracker identifier set by an admin.
    #[serde(default)]
    pub tracking_id: Option<String>,
    /// Admin comment attached to a status change.
    #[serde(default)]
    pub status_comment: Option<String>,
    /// Creation timestamp as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Reporter's chat username (admin listings only).
    #[serde(default)]
    pub username: Option<String>,
    /// Subscriber details supplied by the reporter.
    #[serde(default)]
    pub subscriber_info: Option<String>,
    /// Chat the report was filed in.
    #[serde(default)]
    pub chat_id: Option<i64>,
}

impl ReportSummary {
    /// Merge a patch into this summary in place.
    pub fn apply(&mut self, patch: &ReportPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(platform) = &patch.platform {
            self.platform.clone_from(platform);
        }
        if let Some(server) = &patch.server {
            self.server.clone_from(server);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        assign(&mut self.platform_version, patch.platform_version.as_ref());
        assign(&mut self.user_login, patch.user_login.as_ref());
        assign(&mut self.error_time, patch.error_time.as_ref());
        assign(&mut self.tracking_id, patch.tracking_id.as_ref());
        assign(&mut self.status_comment, patch.status_comment.as_ref());
        assign(&mut self.subscriber_info, patch.subscriber_info.as_ref());
    }

    /// Platform with its version, e.g. `Android 14`.
    #[must_use]
    pub fn platform_line(&self) -> String {
        match self.platform_version.as_deref().filter(|v| !v.is_empty()) {
            Some(version) => format!("{} {version}", self.platform),
            None => self.platform.clone(),
        }
    }

    /// Creation time rendered as `DD.MM.YYYY HH:MM`.
    #[must_use]
    pub fn created_display(&self) -> String {
        format_timestamp(self.created_at.as_deref())
    }
}

fn assign(slot: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value {
        *slot = Some(value.clone());
    }
}

/// Render a server timestamp for display.
///
/// RFC 3339 input is shown in local time and naive ISO timestamps as
/// written; unparseable input is shown as-is and a missing value as `-`.
#[must_use]
pub fn format_timestamp(raw: Option<&str>) -> String {
    const DISPLAY: &str = "%d.%m.%Y %H:%M";
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return "-".into();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format(DISPLAY).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(DISPLAY).to_string();
        }
    }
    raw.to_owned()
}

/// Field overwrites applied to a cached summary after a successful save.
///
/// `None` leaves the field untouched; `Some` overwrites it, so applying the
/// same patch twice is a no-op the second time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPatch {
    /// New status.
    pub status: Option<ReportStatus>,
    /// New platform.
    pub platform: Option<String>,
    /// New platform version.
    pub platform_version: Option<String>,
    /// New server.
    pub server: Option<String>,
    /// New reporter login.
    pub user_login: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New error time.
    pub error_time: Option<String>,
    /// New tracker id.
    pub tracking_id: Option<String>,
    /// New status comment.
    pub status_comment: Option<String>,
    /// New subscriber details.
    pub subscriber_info: Option<String>,
}
