//! Scan lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through `ReqwestTransport`. Validates that
//! request building, transport and response parsing agree with the server.

use std::net::SocketAddr;
use std::time::Duration;

use mock_server::MockConfig;
use urlscan_core::{
    ClientConfig, ReqwestTransport, SearchQuery, SubmitRequest, Task, TaskState, UrlscanClient,
    UrlscanError, Visibility, WaitContext,
};

async fn start_server(config: MockConfig) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener, config));
    addr
}

fn client(addr: SocketAddr, key: &str) -> UrlscanClient<ReqwestTransport> {
    let config = ClientConfig::new(key).with_base_url(format!("http://{addr}/api/v1"));
    let transport = ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap();
    UrlscanClient::with_transport(&config, transport)
}

#[tokio::test]
async fn scan_lifecycle() {
    let addr = start_server(MockConfig::default()).await;
    let client = client(addr, "test-key");

    // Step 1: submit.
    let request = SubmitRequest::new("https://example.com/login")
        .custom_agent("urlscan-it/1.0")
        .visibility(Visibility::Public);
    let mut task = client.submit(&request).await.unwrap();
    assert_eq!(task.state(), TaskState::Created);
    assert_eq!(task.receipt().visibility, "public");
    assert_eq!(
        task.report_location(),
        format!("http://{addr}/api/v1/result/{}/", task.id())
    );

    // Step 2: wait; the report is ready on the first poll.
    client.wait_for_report(&mut task, &WaitContext::new()).await.unwrap();
    assert_eq!(task.state(), TaskState::Completed);
    let report = task.result().unwrap();
    let page = report.page().unwrap();
    assert_eq!(page.domain, "example.com");
    assert_eq!(report.task().unwrap().uuid, task.id());
    assert_eq!(report.task().unwrap().options.useragent, "urlscan-it/1.0");

    let cookies = report.cookies();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "session");
    assert!(cookies[0].http_only);

    let requests = report.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].status, 200);
    assert_eq!(requests[0].mime_type, "text/html");

    // Step 3: waiting again is a no-op.
    client.wait_for_report(&mut task, &WaitContext::new()).await.unwrap();
    assert_eq!(task.state(), TaskState::Completed);

    // Step 4: search finds the scan.
    let found = client
        .search(&SearchQuery::new().query("domain:example.com").size(10))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.results[0].id, task.id());
    assert_eq!(found.results[0].page.domain, "example.com");
    assert_eq!(found.results[0].stats.uniq_ips, 1);
}

#[tokio::test]
async fn wait_retries_until_report_is_ready() {
    let addr = start_server(MockConfig {
        pending_polls: 1,
        ..MockConfig::default()
    })
    .await;
    let client = client(addr, "test-key");

    let task = client
        .scan(&SubmitRequest::new("https://example.org"), &WaitContext::new())
        .await
        .unwrap();
    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(task.into_result().unwrap().page().unwrap().domain, "example.org");
}

#[tokio::test]
async fn wait_gives_up_at_deadline() {
    let addr = start_server(MockConfig {
        pending_polls: 10,
        ..MockConfig::default()
    })
    .await;
    let client = client(addr, "test-key");

    let mut task = client.submit(&SubmitRequest::new("https://slow.example")).await.unwrap();
    let ctx = WaitContext::new().with_timeout(Duration::from_millis(300));
    let err = client.wait_for_report(&mut task, &ctx).await.unwrap_err();
    assert!(matches!(err, UrlscanError::Cancelled { .. }), "{err:?}");
    assert_eq!(task.state(), TaskState::Created);
    assert!(task.result().is_none());
}

#[tokio::test]
async fn unknown_task_id_fails_the_task() {
    let addr = start_server(MockConfig::default()).await;
    let client = client(addr, "test-key");

    let mut task = Task::resume("not-a-uuid", "").unwrap();
    let err = client.wait_for_report(&mut task, &WaitContext::new()).await.unwrap_err();
    match err {
        UrlscanError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid UUID");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(task.state(), TaskState::Failed);

    let err = client.wait_for_report(&mut task, &WaitContext::new()).await.unwrap_err();
    assert!(matches!(err, UrlscanError::TaskFinished { state: TaskState::Failed, .. }));
}

#[tokio::test]
async fn submit_without_url_is_rejected() {
    let addr = start_server(MockConfig::default()).await;
    let client = client(addr, "test-key");

    let err = client.submit(&SubmitRequest::new("")).await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(matches!(err, UrlscanError::Rejected { ref message, .. } if message == "Missing URL properties"));
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let addr = start_server(MockConfig {
        api_key: Some("expected".to_string()),
        ..MockConfig::default()
    })
    .await;

    let err = client(addr, "test-key")
        .submit(&SubmitRequest::new("https://example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(401));

    let task = client(addr, "expected")
        .submit(&SubmitRequest::new("https://example.com"))
        .await
        .unwrap();
    assert!(!task.id().is_empty());
}

#[tokio::test]
async fn search_pages_through_results() {
    let addr = start_server(MockConfig::default()).await;
    let client = client(addr, "test-key");
    for url in ["https://a.example", "https://b.example", "https://c.example", "https://other.test"] {
        client.submit(&SubmitRequest::new(url)).await.unwrap();
    }

    let first = client
        .search(&SearchQuery::new().query("domain:example").size(2))
        .await
        .unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.results.len(), 2);

    let rest = client
        .search(&SearchQuery::new().query("domain:example").size(2).offset(2))
        .await
        .unwrap();
    assert_eq!(rest.results.len(), 1);
    assert_eq!(rest.results[0].page.url, "https://c.example");

    let newest = client
        .search(&SearchQuery::new().query("domain:example").sort("date:desc").size(1))
        .await
        .unwrap();
    assert_eq!(newest.results[0].page.url, "https://c.example");
}

#[tokio::test]
async fn unreachable_service_reports_no_status() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = client(addr, "test-key")
        .submit(&SubmitRequest::new("https://example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, UrlscanError::Transport(_)), "{err:?}");
    assert_eq!(err.status_code(), Some(-1));
}
