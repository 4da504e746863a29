//! In-process imitation of the URL scanning service.
//!
//! Serves `POST /api/v1/scan/`, `GET /api/v1/result/{uuid}/` and
//! `GET /api/v1/search/` with the status codes and JSON shapes of the real
//! service. Each submitted scan answers 404 for `pending_polls` result
//! requests before its report becomes available.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::HOST, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Behavior knobs for the mock service.
#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// Result polls answered with 404 before a report is ready.
    pub pending_polls: u32,
    /// Key the service accepts. `None` accepts any non-empty key.
    pub api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Scan {
    pub uuid: Uuid,
    pub url: String,
    pub visibility: String,
    pub useragent: Option<String>,
    pub referer: Option<String>,
    pub api: String,
    pub result: String,
    pub pending_polls: u32,
}

#[derive(Deserialize)]
pub struct SubmitBody {
    pub url: String,
    pub customagent: Option<String>,
    pub referer: Option<String>,
    pub public: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub size: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<String>,
}

pub type Db = Arc<RwLock<Vec<Scan>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    config: Arc<MockConfig>,
}

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Vec::new())),
        config: Arc::new(config),
    };
    Router::new()
        .route("/api/v1/scan/", post(submit_scan))
        .route("/api/v1/result/{uuid}/", get(get_result))
        .route("/api/v1/search/", get(search))
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn message(status: StatusCode, text: &str) -> Reply {
    (status, Json(json!({ "message": text, "status": status.as_u16() })))
}

fn authorized(headers: &HeaderMap, config: &MockConfig) -> bool {
    let Some(key) = headers.get("api-key").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    match &config.api_key {
        Some(expected) => key == expected,
        None => !key.trim().is_empty(),
    }
}

/// Host part of a URL, without scheme, port or path.
fn domain_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let end = rest.find(['/', ':', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

async fn submit_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SubmitBody>,
) -> Reply {
    if !authorized(&headers, &state.config) {
        return message(StatusCode::UNAUTHORIZED, "API key missing or invalid");
    }
    if input.url.trim().is_empty() {
        return message(StatusCode::BAD_REQUEST, "Missing URL properties");
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let uuid = Uuid::new_v4();
    let visibility = match input.public.as_deref() {
        Some("on") => "public",
        _ => "private",
    };
    let scan = Scan {
        uuid,
        url: input.url,
        visibility: visibility.to_string(),
        useragent: input.customagent,
        referer: input.referer,
        api: format!("http://{host}/api/v1/result/{uuid}/"),
        result: format!("http://{host}/result/{uuid}/"),
        pending_polls: state.config.pending_polls,
    };
    tracing::info!(%uuid, url = %scan.url, "scan submitted");

    let body = json!({
        "message": "Submission successful",
        "uuid": uuid,
        "result": scan.result,
        "api": scan.api,
        "visibility": scan.visibility,
        "options": { "useragent": scan.useragent },
        "url": scan.url,
    });
    state.db.write().await.push(scan);
    (StatusCode::OK, Json(body))
}

async fn get_result(State(state): State<AppState>, Path(raw): Path<String>) -> Reply {
    let Ok(uuid) = Uuid::parse_str(&raw) else {
        return message(StatusCode::BAD_REQUEST, "Invalid UUID");
    };

    let mut scans = state.db.write().await;
    let Some(scan) = scans.iter_mut().find(|scan| scan.uuid == uuid) else {
        return message(StatusCode::NOT_FOUND, "Scan is not finished yet");
    };
    if scan.pending_polls > 0 {
        scan.pending_polls -= 1;
        return message(StatusCode::NOT_FOUND, "Scan is not finished yet");
    }
    (StatusCode::OK, Json(report(scan)))
}

fn report(scan: &Scan) -> Value {
    let domain = domain_of(&scan.url);
    json!({
        "data": {
            "requests": [{
                "request": {
                    "requestId": "1000.1",
                    "documentURL": scan.url,
                    "type": "Document",
                    "request": { "method": "GET", "url": scan.url }
                },
                "response": {
                    "dataLength": 1256,
                    "encodedDataLength": 648,
                    "response": { "status": 200, "mimeType": "text/html", "protocol": "h2" }
                }
            }],
            "cookies": [{ "name": "session", "value": "mock", "domain": domain, "path": "/", "httpOnly": true }],
            "links": [],
            "globals": []
        },
        "lists": { "domains": [domain], "urls": [scan.url] },
        "meta": { "processors": {} },
        "page": { "url": scan.url, "domain": domain, "ip": "127.0.0.1", "country": "ZZ" },
        "stats": { "secureRequests": 1, "uniqCountries": 1, "malicious": 0 },
        "task": {
            "uuid": scan.uuid,
            "url": scan.url,
            "visibility": scan.visibility,
            "method": "api",
            "source": "mock",
            "reportURL": scan.result,
            "options": { "useragent": scan.useragent.clone().unwrap_or_default() }
        }
    })
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Reply {
    // `field:value` expressions match `value` against the scanned URL.
    let term = params
        .q
        .as_deref()
        .map(|q| q.split_once(':').map_or(q, |(_, value)| value).to_string());
    let scans = state.db.read().await;
    let mut matches: Vec<&Scan> = scans
        .iter()
        .filter(|scan| term.as_deref().map_or(true, |t| scan.url.contains(t)))
        .collect();
    if params.sort.as_deref() == Some("date:desc") {
        matches.reverse();
    }

    let total = matches.len();
    let results: Vec<Value> = matches
        .into_iter()
        .skip(params.offset.unwrap_or(0))
        .take(params.size.unwrap_or(100))
        .map(|scan| {
            json!({
                "_id": scan.uuid,
                "page": { "url": scan.url, "domain": domain_of(&scan.url) },
                "result": scan.api,
                "stats": { "requests": 1, "uniqIPs": 1 },
                "task": { "url": scan.url, "visibility": scan.visibility, "method": "api", "source": "mock" }
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "results": results, "total": total })))
}
