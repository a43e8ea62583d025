//! The two page sources backing the session's collections.

use std::sync::Arc;

use crate::api::{ApiFuture, PageQuery, ReportApi, ReportPage};
use crate::models::report::ReportSummary;
use crate::AppError;

use super::{Page, PageRequest, PageSource};

impl From<ReportPage> for Page {
    fn from(page: ReportPage) -> Self {
        Self {
            items: page.reports,
            has_more: page.has_more,
            stats: page.stats,
        }
    }
}

/// The actor's own reports (`user-reports`). Ignores status filters.
pub struct MyReportsSource {
    api: Arc<dyn ReportApi>,
    chat_id: Option<i64>,
}

impl MyReportsSource {
    /// Source scoped to `chat_id`.
    #[must_use]
    pub fn new(api: Arc<dyn ReportApi>, chat_id: Option<i64>) -> Self {
        Self { api, chat_id }
    }
}

impl PageSource for MyReportsSource {
    fn name(&self) -> &'static str {
        "mine"
    }

    fn fetch_page(&self, request: PageRequest) -> ApiFuture<'_, Page> {
        let query = PageQuery {
            chat_id: self.chat_id,
            limit: request.limit,
            offset: request.offset,
            status: None,
            include_stats: false,
        };
        Box::pin(async move { Ok(self.api.user_reports(query).await?.into()) })
    }
}

/// A chat's triage queue (`chat-reports` / `search-reports`).
///
/// Requests queue counters with every first page.
pub struct AdminQueueSource {
    api: Arc<dyn ReportApi>,
    chat_id: Option<i64>,
}

impl AdminQueueSource {
    /// Source scoped to `chat_id`.
    #[must_use]
    pub fn new(api: Arc<dyn ReportApi>, chat_id: Option<i64>) -> Self {
        Self { api, chat_id }
    }

    fn require_chat(&self) -> Result<i64, AppError> {
        self.chat_id
            .ok_or_else(|| AppError::Validation("the admin queue needs a chat id".into()))
    }
}

impl PageSource for AdminQueueSource {
    fn name(&self) -> &'static str {
        "admin-queue"
    }

    fn fetch_page(&self, request: PageRequest) -> ApiFuture<'_, Page> {
        Box::pin(async move {
            let chat_id = self.require_chat()?;
            let query = PageQuery {
                chat_id: Some(chat_id),
                limit: request.limit,
                offset: request.offset,
                status: request.filter,
                include_stats: request.first_page,
            };
            Ok(self.api.chat_reports(query).await?.into())
        })
    }

    fn search(&self, query: String) -> ApiFuture<'_, Vec<ReportSummary>> {
        Box::pin(async move {
            let chat_id = self.require_chat()?;
            self.api.search_reports(chat_id, query).await
        })
    }
}
