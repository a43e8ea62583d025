//! HTTP implementation of [`ReportApi`] over `reqwest`.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::progress::open_counted;
use super::{
    ApiFuture, PageQuery, ProgressSink, ReportApi, ReportPage, ReportSubmission, ReportUpdate,
    SubmitResponse,
};
use crate::config::ClientConfig;
use crate::models::report::{ReportStatus, ReportSummary};
use crate::{AppError, Result};

const LOAD_FAILED: &str = "failed to load reports";

/// Request body wrapper adding the host authentication token.
#[derive(Serialize)]
struct Authed<'a, T: Serialize> {
    init_data: &'a str,
    #[serde(flatten)]
    body: T,
}

/// Common `{success, error, ...}` response envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: T,
}

#[derive(Serialize)]
struct ChatBody {
    chat_id: Option<i64>,
}

#[derive(Serialize)]
struct ListBody {
    chat_id: Option<i64>,
    limit: usize,
    offset: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    include_stats: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ReportStatus>,
}

impl From<PageQuery> for ListBody {
    fn from(query: PageQuery) -> Self {
        Self {
            chat_id: query.chat_id,
            limit: query.limit,
            offset: query.offset,
            include_stats: query.include_stats,
            status: query.status,
        }
    }
}

#[derive(Serialize)]
struct SearchBody {
    chat_id: i64,
    query: String,
}

#[derive(Serialize)]
struct ReportIdBody {
    report_id: i64,
}

#[derive(Deserialize)]
struct AdminFlag {
    #[serde(default)]
    is_admin: bool,
}

#[derive(Deserialize)]
struct SearchData {
    #[serde(default)]
    reports: Vec<ReportSummary>,
}

#[derive(Deserialize)]
struct ReportData {
    report: ReportSummary,
}

#[derive(Deserialize)]
struct Empty {}

#[derive(Deserialize)]
struct SubmitBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    report_number: Option<i64>,
}

/// `reqwest`-backed client for the report server.
#[derive(Debug, Clone)]
pub struct HttpReportApi {
    client: reqwest::Client,
    config: ClientConfig,
    init_data: String,
}

impl HttpReportApi {
    /// Build a client for `config.base_url` authenticating with `init_data`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, init_data: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            init_data: init_data.into(),
        })
    }

    async fn post<B: Serialize>(&self, name: &str, body: B) -> Result<(StatusCode, Bytes)> {
        let response = self
            .client
            .post(self.config.endpoint(name))
            .timeout(self.config.network.request_timeout())
            .json(&Authed {
                init_data: &self.init_data,
                body,
            })
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(endpoint = name, status = status.as_u16(), len = bytes.len(), "response received");
        Ok((status, bytes))
    }

    /// POST a JSON body and unwrap the `{success, error}` envelope.
    ///
    /// `fallback` is reported when the server fails without a message.
    async fn call<B, T>(&self, name: &str, body: B, fallback: &str) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let (status, bytes) = self.post(name, body).await?;
        let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => return Err(err.into()),
            Err(_) => return Err(status_error(status, None)),
        };
        if envelope.success {
            return Ok(envelope.data);
        }
        let message = envelope
            .error
            .or_else(|| status.is_success().then(|| fallback.to_owned()));
        Err(status_error(status, message))
    }
}

/// Map a failed response onto the error taxonomy.
fn status_error(status: StatusCode, message: Option<String>) -> AppError {
    let message = message.unwrap_or_else(|| format!("server error: {}", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Server(message),
    }
}

impl ReportApi for HttpReportApi {
    fn check_admin(&self, chat_id: Option<i64>) -> ApiFuture<'_, bool> {
        Box::pin(async move {
            let (status, bytes) = self.post("check-admin", ChatBody { chat_id }).await?;
            let flag: AdminFlag = serde_json::from_slice(&bytes).map_err(|err| {
                warn!(status = status.as_u16(), %err, "unreadable admin check response");
                AppError::from(err)
            })?;
            Ok(flag.is_admin)
        })
    }

    fn user_reports(&self, query: PageQuery) -> ApiFuture<'_, ReportPage> {
        Box::pin(async move {
            let mut body = ListBody::from(query);
            body.status = None;
            body.include_stats = false;
            self.call("user-reports", body, LOAD_FAILED).await
        })
    }

    fn chat_reports(&self, query: PageQuery) -> ApiFuture<'_, ReportPage> {
        Box::pin(async move {
            self.call("chat-reports", ListBody::from(query), LOAD_FAILED)
                .await
        })
    }

    fn search_reports(&self, chat_id: i64, query: String) -> ApiFuture<'_, Vec<ReportSummary>> {
        Box::pin(async move {
            let data: SearchData = self
                .call("search-reports", SearchBody { chat_id, query }, "search failed")
                .await?;
            Ok(data.reports)
        })
    }

    fn get_report(&self, report_id: i64) -> ApiFuture<'_, ReportSummary> {
        Box::pin(async move {
            let data: ReportData = self
                .call("get-report", ReportIdBody { report_id }, "report not found")
                .await?;
            Ok(data.report)
        })
    }

    fn update_report(&self, update: ReportUpdate) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let _: Empty = self.call("update-report", update, "save failed").await?;
            Ok(())
        })
    }

    fn submit_report(
        &self,
        submission: ReportSubmission,
        progress: ProgressSink,
    ) -> ApiFuture<'_, SubmitResponse> {
        Box::pin(async move {
            let mut form = Form::new();
            for (name, value) in submission.form.text_fields() {
                form = form.text(name, value);
            }
            form = form.text("init_data", self.init_data.clone());
            if let Some(chat_id) = submission.chat_id.filter(|id| *id != 0) {
                form = form.text("chat_id", chat_id.to_string());
            }

            for file in &submission.files {
                let stream = open_counted(&file.source, progress.clone()).await?;
                let part = Part::stream_with_length(Body::wrap_stream(stream), file.size_bytes)
                    .file_name(file.name.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|err| {
                        AppError::Validation(format!("invalid mime type {}: {err}", file.mime_type))
                    })?;
                form = form.part("media", part);
            }
            drop(progress);

            let response = self
                .client
                .post(self.config.endpoint("report"))
                .multipart(form)
                .send()
                .await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            let body: Option<SubmitBody> = serde_json::from_slice(&bytes).ok();

            let (success, error, report_number) = match body {
                Some(body) => (body.success, body.error, body.report_number),
                None => (false, None, None),
            };
            Ok(SubmitResponse {
                status: status.as_u16(),
                success: status.is_success() && success,
                error,
                report_number,
            })
        })
    }

    fn export_csv(&self, chat_id: i64) -> ApiFuture<'_, Bytes> {
        Box::pin(async move {
            let (status, bytes) = self
                .post(
                    "export-csv",
                    ChatBody {
                        chat_id: Some(chat_id),
                    },
                )
                .await?;
            if status.is_success() {
                Ok(bytes)
            } else {
                let message = serde_json::from_slice::<Envelope<Empty>>(&bytes)
                    .ok()
                    .and_then(|e| e.error);
                Err(status_error(status, message))
            }
        })
    }
}
