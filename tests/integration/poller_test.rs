// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{build_pipeline, page_text, FakeLlm, FakeProvider, ANALYSIS_REPLY, API_KEY};
use seocrawl::application::use_cases::crawl_use_case::CrawlUseCase;
use seocrawl::client::status_poller::{PollError, StatusPoller};
use seocrawl::domain::services::status_service::ReportedStatus;
use seocrawl::presentation::middleware::auth_middleware::AuthState;
use seocrawl::presentation::routes;
use seocrawl::workers::manager::WorkerManager;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVAL: Duration = Duration::from_millis(20);

fn status_body(run_id: Uuid, status: &str, step: &str) -> serde_json::Value {
    json!({ "runId": run_id, "status": status, "currentStep": step })
}

async fn mount_status(server: &MockServer, run_id: Uuid, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/crawl/{}", run_id)))
        .and(header("Authorization", format!("Bearer {}", API_KEY).as_str()))
        .respond_with(response)
        .up_to_n_times(times)
        .mount(server)
        .await;
}

fn poller(server: &MockServer) -> StatusPoller {
    StatusPoller::new(&server.uri(), API_KEY, INTERVAL).unwrap()
}

/// 到达第一个终态后停止轮询
#[tokio::test]
async fn test_watch_stops_at_terminal_status() {
    let server = MockServer::start().await;
    let run_id = Uuid::new_v4();
    mount_status(
        &server,
        run_id,
        ResponseTemplate::new(200).set_body_json(status_body(run_id, "running", "scraping")),
        2,
    )
    .await;
    mount_status(
        &server,
        run_id,
        ResponseTemplate::new(200).set_body_json(status_body(run_id, "completed", "completed")),
        u64::MAX,
    )
    .await;

    let handle = poller(&server).watch(run_id);
    let receiver = handle.subscribe();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.run_id, run_id);
    assert_eq!(report.status, ReportedStatus::Completed);
    assert_eq!(
        receiver.borrow().as_ref().map(|r| r.status),
        Some(ReportedStatus::Completed)
    );

    tokio::time::sleep(INTERVAL * 5).await;
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

/// 临时错误不会中断轮询
#[tokio::test]
async fn test_watch_survives_transient_errors() {
    let server = MockServer::start().await;
    let run_id = Uuid::new_v4();
    mount_status(&server, run_id, ResponseTemplate::new(503), 1).await;
    mount_status(
        &server,
        run_id,
        ResponseTemplate::new(200).set_body_json(status_body(run_id, "failed", "failed")),
        u64::MAX,
    )
    .await;

    let report = poller(&server).watch(run_id).wait().await.unwrap();

    assert_eq!(report.status, ReportedStatus::Failed);
}

/// 未知运行立即停止轮询
#[tokio::test]
async fn test_watch_unknown_run() {
    let server = MockServer::start().await;
    let run_id = Uuid::new_v4();
    mount_status(&server, run_id, ResponseTemplate::new(404), u64::MAX).await;

    let result = poller(&server).watch(run_id).wait().await;

    assert!(matches!(result, Err(PollError::UnknownRun(id)) if id == run_id));
}

#[tokio::test]
async fn test_fetch_status_unauthorized() {
    let server = MockServer::start().await;
    let run_id = Uuid::new_v4();

    // No mock matches a wrong key, so answer 401 for any request
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let poller = StatusPoller::new(&server.uri(), "wrong-key", INTERVAL).unwrap();
    let result = poller.fetch_status(run_id).await;

    assert!(matches!(result, Err(PollError::Unauthorized)));
}

/// 无法识别的状态值解析为 Unknown，轮询继续
#[tokio::test]
async fn test_unrecognized_status_keeps_polling() {
    let server = MockServer::start().await;
    let run_id = Uuid::new_v4();
    mount_status(
        &server,
        run_id,
        ResponseTemplate::new(200).set_body_json(status_body(run_id, "paused", "processing")),
        1,
    )
    .await;
    mount_status(
        &server,
        run_id,
        ResponseTemplate::new(200).set_body_json(status_body(run_id, "cancelled", "cancelled")),
        u64::MAX,
    )
    .await;

    let poller = poller(&server);
    let first = poller.fetch_status(run_id).await.unwrap();
    assert_eq!(first.status, ReportedStatus::Unknown);
    assert!(!first.status.is_terminal());

    let report = poller.watch(run_id).wait().await.unwrap();
    assert_eq!(report.status, ReportedStatus::Cancelled);
}

/// 取消只停止客户端轮询
#[tokio::test]
async fn test_cancel_watch() {
    let server = MockServer::start().await;
    let run_id = Uuid::new_v4();
    mount_status(
        &server,
        run_id,
        ResponseTemplate::new(200).set_body_json(status_body(run_id, "running", "analyzing")),
        u64::MAX,
    )
    .await;

    let handle = poller(&server).watch(run_id);
    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(
        handle.latest().map(|r| r.status),
        Some(ReportedStatus::Running)
    );

    handle.cancel();
    assert!(matches!(handle.wait().await, Err(PollError::Cancelled)));
}

/// 对真实服务轮询一次完整的爬取
#[tokio::test]
async fn test_poll_live_server_until_completed() {
    let site = "https://acme-plumbing.test/";
    let provider = FakeProvider::new()
        .native()
        .with_page(site, page_text("home"));
    let pipeline = build_pipeline(provider, FakeLlm::new(ANALYSIS_REPLY)).await;

    let use_case = Arc::new(CrawlUseCase::new(
        pipeline.runs.clone(),
        WorkerManager::new(pipeline.worker.clone()),
        pipeline.providers.clone(),
        pipeline.settings.crawl.clone(),
    ));
    let app = routes::build_router(use_case, AuthState::from_settings(&pipeline.settings.auth));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base_url = format!("http://{}", addr);

    let accepted: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/v1/crawl", base_url))
        .bearer_auth(API_KEY)
        .json(&json!({ "url": site, "clientId": "client-1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let run_id = Uuid::parse_str(accepted["runId"].as_str().unwrap()).unwrap();

    let poller = StatusPoller::new(&base_url, API_KEY, INTERVAL).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(10), poller.watch(run_id).wait())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.status, ReportedStatus::Completed);
    let outcome = report.result.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.pages_scraped, 1);
}
