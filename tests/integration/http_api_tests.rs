//! Integration tests for the JSON endpoints of `HttpReportApi`.
//!
//! Each test spawns the mock report server, drives one call and checks
//! both the request body the server saw and the decoded result.

use std::time::Duration;

use bugdesk_client::api::{PageQuery, ReportApi, ReportUpdate};
use bugdesk_client::models::report::ReportStatus;
use bugdesk_client::AppError;
use serde_json::json;

use super::test_helpers::{page_json, report_json, spawn_mock, Reply, CHAT, INIT_DATA};

// ── check-admin ───────────────────────────────────────────────

#[tokio::test]
async fn check_admin_sends_token_and_chat() {
    let server = spawn_mock().await;
    server.reply("check-admin", Reply::ok(&json!({"is_admin": true})));

    let is_admin = server.api().check_admin(Some(CHAT)).await.expect("admin check");

    assert!(is_admin);
    assert_eq!(
        server.requests("check-admin"),
        vec![json!({"init_data": INIT_DATA, "chat_id": CHAT})]
    );
}

#[tokio::test]
async fn check_admin_without_chat_sends_null() {
    let server = spawn_mock().await;
    server.reply("check-admin", Reply::ok(&json!({"is_admin": false})));

    let is_admin = server.api().check_admin(None).await.expect("admin check");

    assert!(!is_admin);
    assert_eq!(server.requests("check-admin")[0]["chat_id"], json!(null));
}

#[tokio::test]
async fn unreadable_admin_response_is_a_decode_error() {
    let server = spawn_mock().await;
    server.reply("check-admin", Reply::raw(502, "text/html", b"<html>bad gateway</html>"));

    let err = server.api().check_admin(Some(CHAT)).await.expect_err("decode");

    assert!(matches!(err, AppError::Decode(_)));
}

// ── list endpoints ────────────────────────────────────────────

#[tokio::test]
async fn chat_reports_sends_paging_filter_and_stats() {
    let server = spawn_mock().await;
    let mut body = page_json(21, 2, true);
    body["stats"] = json!({"total": 40, "new": 12, "in_progress": 3, "completed": 25});
    server.reply("chat-reports", Reply::ok(&body));

    let page = server
        .api()
        .chat_reports(PageQuery {
            chat_id: Some(CHAT),
            limit: 20,
            offset: 20,
            status: Some(ReportStatus::InProgress),
            include_stats: true,
        })
        .await
        .expect("page");

    assert_eq!(page.reports.len(), 2);
    assert_eq!(page.reports[0].id, 21);
    assert!(page.has_more);
    let stats = page.stats.expect("stats");
    assert_eq!((stats.total, stats.new, stats.in_progress, stats.completed), (40, 12, 3, 25));
    assert_eq!(
        server.requests("chat-reports"),
        vec![json!({
            "init_data": INIT_DATA,
            "chat_id": CHAT,
            "limit": 20,
            "offset": 20,
            "include_stats": true,
            "status": "in_progress"
        })]
    );
}

#[tokio::test]
async fn user_reports_never_sends_filter_or_stats() {
    let server = spawn_mock().await;
    server.reply("user-reports", Reply::ok(&page_json(1, 3, false)));

    let page = server
        .api()
        .user_reports(PageQuery {
            chat_id: Some(CHAT),
            limit: 20,
            offset: 0,
            status: Some(ReportStatus::New),
            include_stats: true,
        })
        .await
        .expect("page");

    assert_eq!(page.reports.len(), 3);
    assert_eq!(
        server.requests("user-reports"),
        vec![json!({"init_data": INIT_DATA, "chat_id": CHAT, "limit": 20, "offset": 0})]
    );
}

#[tokio::test]
async fn null_status_in_listing_reads_as_new() {
    let server = spawn_mock().await;
    let mut item = report_json(1, "new");
    item["status"] = json!(null);
    server.reply(
        "user-reports",
        Reply::ok(&json!({"success": true, "reports": [item], "has_more": false})),
    );

    let page = server
        .api()
        .user_reports(PageQuery::default())
        .await
        .expect("page");

    assert_eq!(page.reports[0].status, ReportStatus::New);
}

#[tokio::test]
async fn forbidden_queue_maps_to_unauthorized() {
    let server = spawn_mock().await;
    server.reply(
        "chat-reports",
        Reply::json(403, &json!({"success": false, "error": "not a chat admin"})),
    );

    let err = server
        .api()
        .chat_reports(PageQuery::default())
        .await
        .expect_err("forbidden");

    assert!(matches!(err, AppError::Unauthorized(ref msg) if msg == "not a chat admin"));
}

#[tokio::test]
async fn failure_without_message_uses_default_text() {
    let server = spawn_mock().await;
    server.reply("user-reports", Reply::ok(&json!({"success": false})));

    let err = server
        .api()
        .user_reports(PageQuery::default())
        .await
        .expect_err("failed");

    assert_eq!(err.user_message(), "failed to load reports");
}

#[tokio::test]
async fn server_error_without_body_reports_status() {
    let server = spawn_mock().await;
    server.reply("chat-reports", Reply::raw(500, "text/plain", b""));

    let err = server
        .api()
        .chat_reports(PageQuery::default())
        .await
        .expect_err("500");

    assert!(matches!(err, AppError::Server(ref msg) if msg == "server error: 500"));
}

// ── single report ─────────────────────────────────────────────

#[tokio::test]
async fn get_report_unwraps_envelope() {
    let server = spawn_mock().await;
    server.reply(
        "get-report",
        Reply::ok(&json!({"success": true, "report": report_json(42, "revision")})),
    );

    let report = server.api().get_report(42).await.expect("report");

    assert_eq!(report.id, 42);
    assert_eq!(report.status, ReportStatus::Revision);
    assert_eq!(
        server.requests("get-report"),
        vec![json!({"init_data": INIT_DATA, "report_id": 42})]
    );
}

#[tokio::test]
async fn missing_report_maps_to_not_found() {
    let server = spawn_mock().await;
    server.reply(
        "get-report",
        Reply::json(404, &json!({"success": false, "error": "report not found"})),
    );

    let err = server.api().get_report(7).await.expect_err("missing");

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn update_sends_only_set_fields() {
    let server = spawn_mock().await;
    server.reply("update-report", Reply::ok(&json!({"success": true})));

    server
        .api()
        .update_report(ReportUpdate {
            report_id: 5,
            status: Some(ReportStatus::Revision),
            tracking_id: Some(String::new()),
            status_comment: Some("add logs".into()),
            ..ReportUpdate::default()
        })
        .await
        .expect("saved");

    assert_eq!(
        server.requests("update-report"),
        vec![json!({
            "init_data": INIT_DATA,
            "report_id": 5,
            "status": "revision",
            "tracking_id": "",
            "status_comment": "add logs"
        })]
    );
}

#[tokio::test]
async fn rejected_update_surfaces_server_message() {
    let server = spawn_mock().await;
    server.reply(
        "update-report",
        Reply::ok(&json!({"success": false, "error": "report is locked"})),
    );

    let err = server
        .api()
        .update_report(ReportUpdate {
            report_id: 5,
            ..ReportUpdate::default()
        })
        .await
        .expect_err("rejected");

    assert!(matches!(err, AppError::Server(ref msg) if msg == "report is locked"));
}

#[tokio::test]
async fn search_returns_all_matches() {
    let server = spawn_mock().await;
    let mut body = page_json(3, 4, false);
    body.as_object_mut().expect("object").remove("has_more");
    server.reply("search-reports", Reply::ok(&body));

    let found = server
        .api()
        .search_reports(CHAT, "login crash".into())
        .await
        .expect("search");

    assert_eq!(found.len(), 4);
    assert_eq!(
        server.requests("search-reports"),
        vec![json!({"init_data": INIT_DATA, "chat_id": CHAT, "query": "login crash"})]
    );
}

// ── export ────────────────────────────────────────────────────

#[tokio::test]
async fn export_returns_raw_csv() {
    let server = spawn_mock().await;
    server.reply("export-csv", Reply::raw(200, "text/csv", b"id,status\n1,new\n"));

    let body = server.api().export_csv(CHAT).await.expect("csv");

    assert_eq!(&body[..], b"id,status\n1,new\n");
}

#[tokio::test]
async fn export_failure_keeps_server_message() {
    let server = spawn_mock().await;
    server.reply(
        "export-csv",
        Reply::json(403, &json!({"success": false, "error": "admins only"})),
    );

    let err = server.api().export_csv(CHAT).await.expect_err("forbidden");

    assert!(matches!(err, AppError::Unauthorized(ref msg) if msg == "admins only"));
}

// ── transport ─────────────────────────────────────────────────

#[tokio::test]
async fn slow_server_times_out() {
    let server = spawn_mock().await;
    server.reply(
        "get-report",
        Reply::ok(&json!({"success": true, "report": report_json(1, "new")}))
            .delayed(Duration::from_secs(3)),
    );

    let err = server.api().get_report(1).await.expect_err("timeout");

    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(err.user_message(), "request timed out");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let server = spawn_mock().await;
    let mut config = server.config();
    config.base_url = "http://127.0.0.1:9".into();
    let api = bugdesk_client::api::http::HttpReportApi::new(&config, INIT_DATA).expect("client");

    let err = api.check_admin(None).await.expect_err("refused");

    assert_eq!(err.user_message(), "connection error");
}
