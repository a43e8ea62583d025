//! Client configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

const KEYRING_SERVICE: &str = "bugdesk-client";
const SERVER_PAGE_CAP: usize = 100;

/// Pagination settings shared by both report collections.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PaginationConfig {
    /// Number of reports requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

/// Limits and timings for the attachment upload pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UploadConfig {
    /// Maximum number of attachments per report.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Per-file size ceiling in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Hard ceiling for a whole submission.
    #[serde(default = "default_upload_timeout")]
    pub timeout_seconds: u64,
    /// Minimum wall time between throughput recomputations.
    #[serde(default = "default_progress_sample")]
    pub progress_sample_ms: u64,
    /// Delay between a successful submission and closing the host.
    #[serde(default = "default_close_delay")]
    pub close_delay_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size_bytes: default_max_file_size(),
            timeout_seconds: default_upload_timeout(),
            progress_sample_ms: default_progress_sample(),
            close_delay_ms: default_close_delay(),
        }
    }
}

impl UploadConfig {
    /// Submission timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Throughput sampling window as a [`Duration`].
    #[must_use]
    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.progress_sample_ms)
    }

    /// Host close delay as a [`Duration`].
    #[must_use]
    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    500 * 1024 * 1024
}

fn default_upload_timeout() -> u64 {
    300
}

fn default_progress_sample() -> u64 {
    500
}

fn default_close_delay() -> u64 {
    1500
}

/// JSON request timing and admin-check retry policy.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NetworkConfig {
    /// Timeout for every JSON request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Extra admin-check attempts after a transport failure.
    #[serde(default)]
    pub admin_check_retries: u32,
    /// Pause between admin-check attempts.
    #[serde(default = "default_admin_retry_delay")]
    pub admin_check_retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            admin_check_retries: 0,
            admin_check_retry_delay_ms: default_admin_retry_delay(),
        }
    }
}

impl NetworkConfig {
    /// JSON request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Admin-check retry delay as a [`Duration`].
    #[must_use]
    pub fn admin_check_retry_delay(&self) -> Duration {
        Duration::from_millis(self.admin_check_retry_delay_ms)
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_admin_retry_delay() -> u64 {
    500
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Client configuration parsed from `bugdesk.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Origin of the report server, e.g. `https://bugs.example.com`.
    pub base_url: String,
    /// Directory that receives CSV exports.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Collection paging.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Upload limits and timings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Request timeouts and retry policy.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Build an endpoint URL below `/api/`.
    #[must_use]
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{name}", self.base_url)
    }

    fn validate(&mut self) -> Result<()> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_owned();
        reqwest::Url::parse(&trimmed)
            .map_err(|err| AppError::Config(format!("base_url invalid: {err}")))?;
        self.base_url = trimmed;

        if self.pagination.page_size == 0 || self.pagination.page_size > SERVER_PAGE_CAP {
            return Err(AppError::Config(format!(
                "page_size must be between 1 and {SERVER_PAGE_CAP}"
            )));
        }

        if self.upload.max_files == 0 {
            return Err(AppError::Config(
                "max_files must be greater than zero".into(),
            ));
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err(AppError::Config(
                "max_file_size_bytes must be greater than zero".into(),
            ));
        }

        if self.upload.timeout_seconds == 0 {
            return Err(AppError::Config(
                "upload timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load the host authentication token from OS keychain with env-var fallback.
///
/// Tries the `bugdesk-client` keyring service first, then falls back to the
/// `BUGDESK_INIT_DATA` environment variable.
///
/// # Errors
///
/// Returns `AppError::Config` if neither source provides a value.
pub async fn load_init_data() -> Result<String> {
    load_credential("init_data", "BUGDESK_INIT_DATA").await
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
