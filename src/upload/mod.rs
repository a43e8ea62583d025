//! Report submission: attachment admission, the multipart transfer, and the
//! two-stage progress signal.
//!
//! A submission runs `Idle -> Transferring -> Forwarding -> Done | Failed`.
//! Progress is only observable on the outbound body; once every byte has
//! been handed to the transport the server is still relaying the report
//! onwards, so the pipeline reports [`UploadStage::Forwarding`] with no
//! percentage until the response settles.

pub mod admission;
pub mod estimator;

use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::{progress_channel, ReportApi, ReportSubmission, SubmitResponse};
use crate::config::UploadConfig;
use crate::models::form::ReportForm;
use crate::models::upload::{UploadFileEntry, UploadProgress, UploadStage};
use crate::{AppError, Result};

use self::admission::{AdmissionReport, FileSet};
use self::estimator::ThroughputEstimator;

/// Signal emitted while a submission runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// A progress snapshot.
    Progress(UploadProgress),
    /// The single terminal result.
    Settled(UploadOutcome),
}

/// How a submission settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server accepted the report.
    Done {
        /// Number assigned to the new report, when returned.
        report_number: Option<i64>,
    },
    /// The submission failed; the user may retry.
    Failed(UploadFailure),
}

impl UploadOutcome {
    /// Whether the report was accepted.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Reason a submission failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    /// A 2xx response with `success: false`.
    Rejected(String),
    /// Non-200 status.
    Status(u16),
    /// The request did not complete.
    Network(String),
    /// The submission exceeded its time limit.
    Timeout,
    /// The caller cancelled the submission.
    Cancelled,
}

impl Display for UploadFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(msg) => write!(f, "submission failed: {msg}"),
            Self::Status(code) => write!(f, "server error: {code}"),
            Self::Network(_) => write!(f, "network error"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Cancelled => write!(f, "submission cancelled"),
        }
    }
}

/// Attachment set plus the submission state machine.
#[derive(Debug)]
pub struct UploadPipeline {
    files: FileSet,
    stage: UploadStage,
    progress: Option<UploadProgress>,
    sample_window: Duration,
    timeout: Duration,
}

impl UploadPipeline {
    /// Create an idle pipeline with the configured limits.
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            files: FileSet::new(config.max_files, config.max_file_size_bytes),
            stage: UploadStage::Idle,
            progress: None,
            sample_window: config.sample_window(),
            timeout: config.timeout(),
        }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> UploadStage {
        self.stage
    }

    /// Latest progress snapshot of the running submission.
    #[must_use]
    pub fn progress(&self) -> Option<UploadProgress> {
        self.progress
    }

    /// Selected attachments.
    #[must_use]
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    /// Admit newly selected files.
    pub fn add_files(&mut self, batch: impl IntoIterator<Item = UploadFileEntry>) -> AdmissionReport {
        self.files.admit(batch)
    }

    /// Drop the attachment at `index`.
    pub fn remove_file(&mut self, index: usize) -> Option<UploadFileEntry> {
        self.files.remove(index)
    }

    /// Whether the submission control is enabled.
    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        !self.stage.is_active()
    }

    /// Whether the progress overlay is shown.
    #[must_use]
    pub fn overlay_visible(&self) -> bool {
        self.stage.is_active()
    }

    /// Send the form and every accepted attachment in one multipart request.
    ///
    /// Progress snapshots go to `events` (dropped when the receiver lags),
    /// followed by exactly one [`UploadEvent::Settled`]. Every failure
    /// branch settles as [`UploadOutcome::Failed`] and leaves the pipeline
    /// ready for a resubmission of the full file set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if required form fields are blank; no
    /// request is issued in that case.
    pub async fn submit(
        &mut self,
        api: &dyn ReportApi,
        form: &ReportForm,
        chat_id: Option<i64>,
        events: &mpsc::Sender<UploadEvent>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome> {
        self.stage = UploadStage::Idle;
        self.progress = None;
        form.validate()?;

        let submission = ReportSubmission {
            form: form.clone(),
            chat_id,
            files: self.files.entries().to_vec(),
        };
        let span = info_span!(
            "submission",
            submission_id = %Uuid::new_v4(),
            files = submission.files.len(),
            bytes_total = submission.payload_bytes(),
        );
        self.run(api, submission, events, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &mut self,
        api: &dyn ReportApi,
        submission: ReportSubmission,
        events: &mpsc::Sender<UploadEvent>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome> {
        let total = submission.payload_bytes();
        let (sink, mut watch) = progress_channel();
        let mut estimator = ThroughputEstimator::new(self.sample_window, Instant::now());

        self.publish(estimator.observe(0, total, Instant::now()), events);
        info!("submission started");

        let mut request = api.submit_report(submission, sink);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut watching = true;

        let settled: std::result::Result<SubmitResponse, UploadFailure> = loop {
            tokio::select! {
                result = &mut request => break result.map_err(transport_failure),
                sent = watch.changed(), if watching => match sent {
                    Some(loaded) => {
                        self.publish(estimator.observe(loaded, total, Instant::now()), events);
                    }
                    None => watching = false,
                },
                () = &mut deadline => break Err(UploadFailure::Timeout),
                () = cancel.cancelled() => break Err(UploadFailure::Cancelled),
            }
        };
        drop(request);
        if let (Ok(_), Some(loaded)) = (&settled, watch.take_unseen()) {
            self.publish(estimator.observe(loaded, total, Instant::now()), events);
        }

        let outcome = match settled {
            Ok(response) if response.success => UploadOutcome::Done {
                report_number: response.report_number,
            },
            Ok(response) if (200..300).contains(&response.status) => UploadOutcome::Failed(
                UploadFailure::Rejected(response.error.unwrap_or_else(|| "unknown error".into())),
            ),
            Ok(response) => UploadOutcome::Failed(UploadFailure::Status(response.status)),
            Err(failure) => UploadOutcome::Failed(failure),
        };

        match &outcome {
            UploadOutcome::Done { report_number } => {
                self.stage = UploadStage::Done;
                info!(?report_number, "submission accepted");
            }
            UploadOutcome::Failed(failure) => {
                self.stage = UploadStage::Failed;
                warn!(reason = %failure, "submission failed");
            }
        }
        self.progress = None;
        let _ = events.send(UploadEvent::Settled(outcome.clone())).await;
        Ok(outcome)
    }

    fn publish(&mut self, progress: UploadProgress, events: &mpsc::Sender<UploadEvent>) {
        self.stage = progress.stage;
        self.progress = Some(progress);
        let _ = events.try_send(UploadEvent::Progress(progress));
    }
}

fn transport_failure(err: AppError) -> UploadFailure {
    match err {
        AppError::Timeout(_) => UploadFailure::Timeout,
        AppError::Cancelled(_) => UploadFailure::Cancelled,
        other => UploadFailure::Network(other.to_string()),
    }
}
