//! Transport seam: executes one `HttpRequest` and returns its `HttpResponse`.
//!
//! # Design
//! The lifecycle and search code never talk to the network directly; they
//! hand a fully built request to a `Transport`. A transport reports exactly
//! two kinds of outcome: a response with whatever status the service chose,
//! or a `TransportError` when no usable response exists. Status codes are
//! never turned into errors here; interpreting them is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Status reported when the request never produced a response.
pub const NO_RESPONSE_STATUS: i32 = -1;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to obtain a usable response.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure before any status line.
    #[error("no response from {url}: {source}")]
    NoResponse {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A status line arrived but the body could not be read.
    #[error("failed to read response body (status {status}): {source}")]
    Body {
        status: u16,
        #[source]
        source: BoxError,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] BoxError),
}

impl TransportError {
    /// Received status, or [`NO_RESPONSE_STATUS`] when nothing was received.
    pub fn status_code(&self) -> i32 {
        match self {
            TransportError::Body { status, .. } => i32::from(*status),
            TransportError::NoResponse { .. } | TransportError::Client(_) => NO_RESPONSE_STATUS,
        }
    }
}

/// Executes HTTP requests on behalf of the client.
///
/// Implementations must be shareable across concurrently polled tasks and
/// must not keep per-call state.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport, optionally bounding each request by `timeout`.
    ///
    /// # Errors
    /// Returns `TransportError::Client` if the TLS backend cannot be set up.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("urlscan-core/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client (proxies, custom roots, ...).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::NoResponse {
                url: request.url.clone(),
                source: Box::new(source),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Body {
                status,
                source: Box::new(source),
            })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
