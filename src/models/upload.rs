//! Attachment and upload-progress types.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::upload::estimator::{format_eta, format_megabytes, format_speed};
use crate::{AppError, Result};

/// Backing storage for an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// File on the local file system, streamed at submission time.
    Path(PathBuf),
    /// In-memory payload.
    Bytes(Bytes),
}

/// A user-selected attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileEntry {
    /// File name; unique within a file set.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type sent with the multipart part.
    pub mime_type: String,
    /// Where the bytes come from.
    pub source: FileSource,
}

impl UploadFileEntry {
    /// Build an entry from an in-memory payload.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            size_bytes: data.len() as u64,
            mime_type: mime_type.into(),
            source: FileSource::Bytes(data),
        }
    }

    /// Build an entry for a file on disk, reading its size and guessing its
    /// MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the path cannot be inspected, or
    /// `AppError::Validation` if it is not a regular file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(AppError::Validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Validation(format!("{} has no file name", path.display())))?;
        Ok(Self {
            mime_type: guess_mime(&name).into(),
            name,
            size_bytes: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Whether the attachment is an image (previewed inline by the UI).
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Guess a MIME type from a file name's extension.
#[must_use]
pub fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Phase of a submission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    /// No submission running.
    #[default]
    Idle,
    /// Request body is being sent.
    Transferring,
    /// Body fully sent; the server is relaying it onwards.
    Forwarding,
    /// Submission accepted.
    Done,
    /// Submission failed; the user may retry.
    Failed,
}

impl UploadStage {
    /// Whether a submission is in flight.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Transferring | Self::Forwarding)
    }

    /// Overlay heading for the active stages.
    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Self::Transferring => "Stage 1 of 2: uploading to server",
            Self::Forwarding => "Stage 2 of 2: forwarding to chat",
            Self::Idle | Self::Done | Self::Failed => "",
        }
    }
}

/// Snapshot emitted on every progress tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    /// Current phase.
    pub stage: UploadStage,
    /// Bytes handed to the transport so far.
    pub bytes_sent: u64,
    /// Total bytes to send.
    pub bytes_total: u64,
    /// Windowed throughput estimate in bytes per second; `0.0` while unset.
    pub speed_bps: f64,
    /// Estimated seconds remaining; `None` while speed is unknown or the
    /// transfer has finished.
    pub eta_seconds: Option<u64>,
}

impl UploadProgress {
    /// Transfer percentage, or `None` while forwarding (indeterminate).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        if self.stage != UploadStage::Transferring {
            return None;
        }
        if self.bytes_total == 0 {
            return Some(0.0);
        }
        Some(self.bytes_sent as f64 / self.bytes_total as f64 * 100.0)
    }

    /// Percentage text, or `Processing...` while forwarding.
    #[must_use]
    pub fn indicator(&self) -> String {
        match self.percent() {
            Some(percent) => format!("{}%", percent.round()),
            None => "Processing...".into(),
        }
    }

    /// Hint line under the overlay heading.
    #[must_use]
    pub fn hint(&self) -> String {
        if self.stage == UploadStage::Forwarding {
            return "This may take a while for large files...".into();
        }
        let mut hint = format!(
            "{} / {} MB",
            format_megabytes(self.bytes_sent),
            format_megabytes(self.bytes_total)
        );
        if let Some(speed) = format_speed(self.speed_bps) {
            hint.push_str(" \u{2022} ");
            hint.push_str(&speed);
        }
        if let Some(eta) = self.eta_seconds {
            hint.push_str(" \u{2022} ~");
            hint.push_str(&format_eta(eta));
        }
        hint
    }
}
