//! The per-launch session object.
//!
//! [`Session`] owns the launch context, the router, both report collections
//! and the upload pipeline, and sequences startup: resolve the launch
//! parameter, ask the server for admin rights, land on a page, fetch its
//! first page and fire the one-shot deep link.

pub mod detail;
pub mod router;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::ReportApi;
use crate::collection::sources::{AdminQueueSource, MyReportsSource};
use crate::collection::{LoadOutcome, PageSource, ReportCollection};
use crate::config::ClientConfig;
use crate::host::Host;
use crate::launch::resolve_launch_param;
use crate::models::form::ReportForm;
use crate::models::launch::LaunchContext;
use crate::models::report::{ReportStatus, ReportSummary};
use crate::upload::{UploadEvent, UploadOutcome, UploadPipeline};
use crate::{AppError, ErrorClass, Result};

use self::detail::{
    AdminReportDetail, AdminReportEdit, UserReportDetail, UserReportEdit, LOCKED_MESSAGE,
};
use self::router::{decide_initial, Page, PageView, SessionRouter};

/// Alert raised after a successful edit.
pub const SAVED_ALERT: &str = "Changes saved";

/// File name CSV exports are written to.
pub const EXPORT_FILE_NAME: &str = "reports.csv";

/// The detail currently open, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenedReport {
    /// A reporter's own report.
    User(UserReportDetail),
    /// A queue item.
    Admin(AdminReportDetail),
}

/// Client session for one launch.
pub struct Session {
    config: ClientConfig,
    api: Arc<dyn ReportApi>,
    host: Arc<dyn Host>,
    launch: LaunchContext,
    router: SessionRouter,
    my_reports: ReportCollection<MyReportsSource>,
    admin_queue: ReportCollection<AdminQueueSource>,
    upload: UploadPipeline,
    opened: Option<OpenedReport>,
    close_task: Option<JoinHandle<()>>,
}

impl Session {
    /// Build a session, decoding the host's launch parameter.
    #[must_use]
    pub fn new(config: ClientConfig, api: Arc<dyn ReportApi>, host: Arc<dyn Host>) -> Self {
        let launch = resolve_launch_param(host.launch_param().as_deref());
        let page_size = config.pagination.page_size;
        Self {
            my_reports: ReportCollection::new(
                MyReportsSource::new(Arc::clone(&api), launch.chat_id),
                page_size,
            ),
            admin_queue: ReportCollection::new(
                AdminQueueSource::new(Arc::clone(&api), launch.chat_id),
                page_size,
            ),
            upload: UploadPipeline::new(&config.upload),
            router: SessionRouter::new(),
            opened: None,
            close_task: None,
            config,
            api,
            host,
            launch,
        }
    }

    /// Decoded launch context; `report_id` is cleared once the deep link
    /// has fired.
    #[must_use]
    pub fn launch(&self) -> &LaunchContext {
        &self.launch
    }

    /// Page state machine.
    #[must_use]
    pub fn router(&self) -> &SessionRouter {
        &self.router
    }

    /// The actor's own reports.
    #[must_use]
    pub fn my_reports(&self) -> &ReportCollection<MyReportsSource> {
        &self.my_reports
    }

    /// The chat's triage queue.
    #[must_use]
    pub fn admin_queue(&self) -> &ReportCollection<AdminQueueSource> {
        &self.admin_queue
    }

    /// Attachment set and submission state.
    #[must_use]
    pub fn upload(&self) -> &UploadPipeline {
        &self.upload
    }

    /// Mutable access for file selection.
    pub fn upload_mut(&mut self) -> &mut UploadPipeline {
        &mut self.upload
    }

    /// Detail currently open.
    #[must_use]
    pub fn opened(&self) -> Option<&OpenedReport> {
        self.opened.as_ref()
    }

    /// Close the open detail.
    pub fn close_detail(&mut self) {
        self.opened = None;
    }

    /// Page visibility for rendering.
    #[must_use]
    pub fn view(&self) -> PageView {
        self.router.view()
    }

    /// Run the startup sequence once.
    pub async fn start(&mut self) -> PageView {
        let span = info_span!(
            "session_start",
            chat_id = ?self.launch.chat_id,
            report_id = ?self.launch.report_id,
            admin_intent = self.launch.admin_intent,
        );
        self.run_startup().instrument(span).await
    }

    async fn run_startup(&mut self) -> PageView {
        let is_admin = self.check_admin().await;
        self.router.set_admin(is_admin);

        let page = decide_initial(&self.launch, is_admin);
        info!(is_admin, page = page.as_str(), "initial page decided");
        let view = self.switch_page(page).await;

        if let Some(report_id) = self.launch.report_id.take() {
            let opened = match view.active {
                Page::Admin if self.launch.admin_intent => {
                    self.open_admin_report(report_id).await.map(|_| ())
                }
                Page::MyReports => self.open_user_report(report_id).await.map(|_| ()),
                _ => Ok(()),
            };
            if let Err(err) = opened {
                warn!(report_id, %err, "deep-linked report could not be opened");
            }
            self.launch.admin_intent = false;
        }
        view
    }

    /// Ask the server for admin rights; any failure reads as "not admin".
    ///
    /// Transport failures are retried `network.admin_check_retries` times.
    async fn check_admin(&self) -> bool {
        let retries = self.config.network.admin_check_retries;
        let mut attempt = 0;
        loop {
            match self.api.check_admin(self.launch.chat_id).await {
                Ok(is_admin) => return is_admin,
                Err(err) if err.class() == ErrorClass::Transport && attempt < retries => {
                    attempt += 1;
                    warn!(attempt, %err, "admin check failed, retrying");
                    tokio::time::sleep(self.config.network.admin_check_retry_delay()).await;
                }
                Err(err) => {
                    warn!(%err, "admin check failed, continuing without admin rights");
                    return false;
                }
            }
        }
    }

    /// Show `page`; its collection is fetched on first entry only.
    pub async fn switch_page(&mut self, page: Page) -> PageView {
        let view = self.router.switch(page);
        match view.active {
            Page::MyReports if !self.my_reports.is_loaded().await => {
                self.my_reports.load(true).await;
            }
            Page::Admin if !self.admin_queue.is_loaded().await => {
                if self.launch.chat_id.is_some() {
                    self.admin_queue.load(true).await;
                } else {
                    debug!("admin queue not loaded: no chat id");
                }
            }
            _ => {}
        }
        view
    }

    /// Fetch the next page of the actor's reports.
    pub async fn load_more_mine(&self) -> LoadOutcome {
        self.my_reports.load(false).await
    }

    /// Fetch the next page of the queue.
    pub async fn load_more_admin(&self) -> LoadOutcome {
        self.admin_queue.load(false).await
    }

    /// Narrow the queue to `status` (or show all) and reload it.
    pub async fn filter_admin(&self, status: Option<ReportStatus>) -> LoadOutcome {
        self.admin_queue.apply_filter(status).await
    }

    /// Search the queue; a blank query restores the paged listing.
    pub async fn search_admin(&self, query: &str) -> LoadOutcome {
        self.admin_queue.search(query).await
    }

    async fn lookup<S: PageSource>(
        &self,
        collection: &ReportCollection<S>,
        report_id: i64,
    ) -> Result<ReportSummary> {
        if let Some(report) = collection.find(report_id).await {
            return Ok(report);
        }
        debug!(report_id, "report not cached, fetching");
        self.api.get_report(report_id).await
    }

    /// Open one of the actor's reports.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the report is not cached and cannot be
    /// loaded.
    pub async fn open_user_report(&mut self, report_id: i64) -> Result<UserReportDetail> {
        let report = self.lookup(&self.my_reports, report_id).await?;
        let detail = UserReportDetail::new(report);
        self.opened = Some(OpenedReport::User(detail.clone()));
        Ok(detail)
    }

    /// Save the reporter's edits, patch the cached copy and confirm.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the report is locked, otherwise the
    /// server's error (its message is shown verbatim) or a transport error.
    pub async fn save_user_report(&mut self, report_id: i64, edit: UserReportEdit) -> Result<()> {
        let current = match self.my_reports.find(report_id).await {
            Some(report) => Some(report),
            None => match &self.opened {
                Some(OpenedReport::User(detail)) if detail.report.id == report_id => {
                    Some(detail.report.clone())
                }
                _ => None,
            },
        };
        if current.is_some_and(|r| !r.status.editable_by_owner()) {
            return Err(AppError::Validation(LOCKED_MESSAGE.into()));
        }

        let update = edit.into_update(report_id);
        let patch = update.to_patch();
        if let Err(err) = self.api.update_report(update).await {
            warn!(report_id, %err, "report update failed");
            return Err(err);
        }
        let cached = self.my_reports.patch(report_id, &patch).await;
        info!(report_id, cached, "report updated");
        self.opened = None;
        self.host.show_alert(SAVED_ALERT);
        Ok(())
    }

    /// Open a queue item.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the item is not cached and cannot be
    /// loaded.
    pub async fn open_admin_report(&mut self, report_id: i64) -> Result<AdminReportDetail> {
        let report = self.lookup(&self.admin_queue, report_id).await?;
        let detail = AdminReportDetail::new(report);
        self.opened = Some(OpenedReport::Admin(detail.clone()));
        Ok(detail)
    }

    /// Save a triage decision, patch the cached copy, confirm and reload
    /// the queue.
    ///
    /// # Errors
    ///
    /// Returns the server's error (its message is shown verbatim) or a
    /// transport error.
    pub async fn save_admin_report(&mut self, report_id: i64, edit: AdminReportEdit) -> Result<()> {
        let update = edit.into_update(report_id);
        let patch = update.to_patch();
        if let Err(err) = self.api.update_report(update).await {
            warn!(report_id, %err, "triage update failed");
            return Err(err);
        }
        let cached = self.admin_queue.patch(report_id, &patch).await;
        info!(report_id, cached, status = ?patch.status, "report triaged");
        self.opened = None;
        self.host.show_alert(SAVED_ALERT);
        self.admin_queue.load(true).await;
        Ok(())
    }

    /// Download the chat's reports as CSV into the download directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` without a chat id, otherwise the
    /// request or write error; the host is alerted in both cases.
    pub async fn export_csv(&self) -> Result<PathBuf> {
        let Some(chat_id) = self.launch.chat_id else {
            return Err(AppError::Validation("export needs a chat id".into()));
        };
        let result = match self.api.export_csv(chat_id).await {
            Ok(body) => {
                let path = self.config.download_dir.join(EXPORT_FILE_NAME);
                tokio::fs::write(&path, &body)
                    .await
                    .map(|()| path)
                    .map_err(AppError::from)
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(path) => {
                info!(chat_id, path = %path.display(), "reports exported");
                Ok(path)
            }
            Err(err) => {
                warn!(chat_id, %err, "export failed");
                let alert = if err.class() == ErrorClass::Transport {
                    "connection error"
                } else {
                    "export failed"
                };
                self.host.show_alert(alert);
                Err(err)
            }
        }
    }

    /// Submit a new report with the selected attachments.
    ///
    /// On success the host is closed after the configured delay.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if required form fields are blank.
    pub async fn submit_report(
        &mut self,
        form: &ReportForm,
        events: &mpsc::Sender<UploadEvent>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome> {
        let outcome = self
            .upload
            .submit(self.api.as_ref(), form, self.launch.chat_id, events, cancel)
            .await?;
        if outcome.is_done() {
            let host = Arc::clone(&self.host);
            let delay = self.config.upload.close_delay();
            self.close_task = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                host.close();
            }));
        }
        Ok(outcome)
    }

    /// Handle of the pending delayed close, if a submission succeeded.
    pub fn take_close_task(&mut self) -> Option<JoinHandle<()>> {
        self.close_task.take()
    }
}
