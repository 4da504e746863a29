//! Client library for a remote URL scanning service.
//!
//! # Overview
//! Submits a URL for sandboxed analysis, waits for the resulting report and
//! searches earlier scans.
//!
//! ```no_run
//! use urlscan_core::{SubmitRequest, UrlscanClient, WaitContext};
//!
//! # async fn run() -> urlscan_core::Result<()> {
//! let client = UrlscanClient::new("YOUR-API-KEY")?;
//! let task = client
//!     .scan(&SubmitRequest::new("https://example.com"), &WaitContext::new())
//!     .await?;
//! if let Some(report) = task.result() {
//!     for cookie in report.cookies() {
//!         println!("cookie: {} = {}", cookie.name, cookie.value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `Endpoints` builds `HttpRequest` values and parses `HttpResponse` values
//!   without I/O; a `Transport` executes the round-trip in between.
//! - `UrlscanClient` is stateless and shareable; each `Task` is owned by its
//!   caller and carries the only per-scan state.
//! - Waiting polls at most `MAX_ATTEMPTS` times on a fixed backoff curve and
//!   honours cancellation and deadlines through `WaitContext`.
//! - The report is a tolerant JSON tree with typed, independently decoded
//!   sections.

pub mod backoff;
pub mod client;
pub mod codec;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod report;
pub mod task;
pub mod transport;
pub mod types;

pub use backoff::{backoff, MAX_ATTEMPTS};
pub use client::UrlscanClient;
pub use config::{ApiKey, ClientConfig, DEFAULT_BASE_URL};
pub use endpoints::{Endpoints, PollOutcome};
pub use error::{ConfigError, Result, UrlscanError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use report::ScanResult;
pub use task::{CancelReason, Task, TaskState, WaitContext};
pub use transport::{ReqwestTransport, Transport, TransportError, NO_RESPONSE_STATUS};
pub use types::{SearchQuery, SearchResponse, SearchResult, SubmitRequest, SubmitResponse, Visibility};
pub use tokio_util::sync::CancellationToken;
