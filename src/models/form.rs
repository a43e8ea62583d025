//! New-report form metadata and required-field validation.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Format of the `error_time` field, matching a `datetime-local` input.
pub const ERROR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Metadata entered on the report form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReportForm {
    /// Reporter's login on the reported service.
    pub login: String,
    /// Client platform.
    pub platform: String,
    /// Client version.
    pub version: String,
    /// When the bug occurred.
    pub error_time: String,
    /// Server the reporter was connected to.
    pub server: String,
    /// Optional subscriber details.
    #[serde(default)]
    pub subscriber: String,
    /// Bug description.
    pub description: String,
}

impl ReportForm {
    /// An empty form with `error_time` preset to the current local time.
    #[must_use]
    pub fn with_current_time() -> Self {
        Self {
            error_time: Local::now().format(ERROR_TIME_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Names of required fields that are blank after trimming.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("login", &self.login),
            ("platform", &self.platform),
            ("version", &self.version),
            ("error_time", &self.error_time),
            ("server", &self.server),
            ("description", &self.description),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Whether every required field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Ensure all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming the blank fields.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "fill in all required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Text fields as multipart `(name, value)` pairs, trimmed.
    ///
    /// `error_time` and `platform`/`server` come from pickers and are sent
    /// untrimmed, the rest are trimmed.
    #[must_use]
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("login", self.login.trim().to_owned()),
            ("platform", self.platform.clone()),
            ("version", self.version.trim().to_owned()),
            ("error_time", self.error_time.clone()),
            ("server", self.server.clone()),
            ("subscriber", self.subscriber.trim().to_owned()),
            ("description", self.description.trim().to_owned()),
        ]
    }
}
