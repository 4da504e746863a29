//! Scan service client: submission, report polling and search.
//!
//! # Design
//! `UrlscanClient` pairs the stateless [`Endpoints`] with a [`Transport`] and
//! holds nothing that changes between calls, so one client can drive any
//! number of tasks concurrently. All per-scan state lives in the caller's
//! [`Task`].
//!
//! Waiting is a bounded poll loop. Each attempt fetches the result endpoint
//! and sorts the answer into ready (200), rejected (400) or not ready
//! (anything else). Not-ready answers are retried after [`backoff`]; every
//! other outcome ends the wait immediately. The request and the sleep are
//! both raced against the caller's [`WaitContext`].
//!
//! Logging goes through `tracing`. A client built `with_dispatch` routes all
//! of its events to that dispatcher instead of the ambient default.

use std::future::Future;

use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument};

use crate::backoff::{backoff, MAX_ATTEMPTS};
use crate::config::{ApiKey, ClientConfig};
use crate::endpoints::{Endpoints, PollOutcome};
use crate::error::{Result, UrlscanError};
use crate::http::{HttpRequest, HttpResponse};
use crate::task::{Task, TaskState, WaitContext};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{SearchQuery, SearchResponse, SubmitRequest};

/// Client for the URL scanning service.
pub struct UrlscanClient<T = ReqwestTransport> {
    endpoints: Endpoints,
    transport: T,
    dispatch: Option<Dispatch>,
}

impl UrlscanClient<ReqwestTransport> {
    /// Client for the hosted service using `api_key`.
    ///
    /// # Errors
    /// Returns an error if the key is blank or the HTTP client cannot be
    /// built.
    pub fn new(api_key: impl Into<ApiKey>) -> Result<Self> {
        Self::from_config(ClientConfig::new(api_key))
    }

    /// # Errors
    /// Returns an error if `config` is invalid or the HTTP client cannot be
    /// built.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(&config, transport))
    }
}

impl<T: Transport> UrlscanClient<T> {
    /// Client that sends its requests through `transport`.
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            endpoints: Endpoints::new(&config.base_url, config.api_key.clone()),
            transport,
            dispatch: None,
        }
    }

    /// Route this client's log events to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Submit `request` for scanning.
    ///
    /// # Errors
    /// `Transport` when the service could not be reached, `Rejected` for any
    /// status other than 200, `Decode`/`MissingField` for a malformed
    /// acknowledgement.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<Task> {
        self.scoped(async move {
            let span = tracing::info_span!("submit", url = %request.url());
            async {
                let http = self.endpoints.build_submit(request)?;
                let response = self.execute(http).await?;
                let receipt = self.endpoints.parse_submit(response)?;
                tracing::info!(uuid = %receipt.uuid, visibility = %receipt.visibility, "scan submitted");
                Ok::<_, UrlscanError>(Task::from_receipt(receipt))
            }
            .instrument(span)
            .await
        })
        .await
    }

    /// Poll until the report of `task` is available, then store it in the
    /// task.
    ///
    /// Makes at most [`MAX_ATTEMPTS`] requests. Waiting on a completed task
    /// returns immediately.
    ///
    /// # Errors
    /// - `Rejected` when the service answers 400; the task becomes `Failed`.
    /// - `Timeout` when no attempt returned 200 or 400; the task becomes
    ///   `TimedOut`.
    /// - `Cancelled` when `ctx` fires; the task returns to `Created`.
    /// - `Transport`/`Decode` on the first infrastructure failure, without
    ///   retrying; the task returns to `Created`.
    /// - `TaskFinished` when the task already failed or timed out.
    pub async fn wait_for_report(&self, task: &mut Task, ctx: &WaitContext) -> Result<()> {
        self.scoped(async move {
            let span = tracing::info_span!("wait_for_report", uuid = %task.id());
            self.poll(task, ctx).instrument(span).await
        })
        .await
    }

    /// Submit `request` and wait for its report.
    ///
    /// # Errors
    /// Any error of [`submit`](Self::submit) or
    /// [`wait_for_report`](Self::wait_for_report).
    pub async fn scan(&self, request: &SubmitRequest, ctx: &WaitContext) -> Result<Task> {
        let mut task = self.submit(request).await?;
        self.wait_for_report(&mut task, ctx).await?;
        Ok(task)
    }

    /// Search earlier scans. One request, no paging.
    ///
    /// # Errors
    /// `Transport` when the service could not be reached, `Rejected` for any
    /// status other than 200, `Decode` for a malformed body.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.scoped(async move {
            let span = tracing::info_span!("search", q = ?query.query);
            async {
                let http = self.endpoints.build_search(query);
                let response = self.execute(http).await?;
                let found = self.endpoints.parse_search(response)?;
                tracing::debug!(total = found.total, returned = found.results.len(), "search finished");
                Ok::<_, UrlscanError>(found)
            }
            .instrument(span)
            .await
        })
        .await
    }

    async fn poll(&self, task: &mut Task, ctx: &WaitContext) -> Result<()> {
        match task.state() {
            TaskState::Completed => return Ok(()),
            state @ (TaskState::Failed | TaskState::TimedOut) => {
                return Err(UrlscanError::TaskFinished {
                    uuid: task.id().to_string(),
                    state,
                });
            }
            TaskState::Created | TaskState::Polling => {}
        }

        task.begin_polling();
        for attempt in 0..MAX_ATTEMPTS {
            let request = self.endpoints.build_result(task.id());
            let outcome = tokio::select! {
                biased;
                reason = ctx.interrupted() => {
                    task.suspend();
                    tracing::info!(attempt, %reason, "wait interrupted during request");
                    return Err(UrlscanError::Cancelled { uuid: task.id().to_string(), reason });
                }
                response = self.execute(request) => {
                    response.and_then(|response| self.endpoints.parse_result(response))
                }
            };

            match outcome {
                Ok(PollOutcome::Ready(report)) => {
                    tracing::info!(attempt, "report ready");
                    task.complete(report);
                    return Ok(());
                }
                Ok(PollOutcome::Rejected { status, message }) => {
                    tracing::warn!(attempt, status, %message, "task rejected");
                    task.fail();
                    return Err(UrlscanError::Rejected { status, message });
                }
                Ok(PollOutcome::NotReady { status }) => {
                    tracing::debug!(attempt, status, "report not ready");
                }
                Err(err) => {
                    task.suspend();
                    tracing::warn!(attempt, error = %err, "polling failed");
                    return Err(err);
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                let delay = backoff(attempt);
                tokio::select! {
                    biased;
                    reason = ctx.interrupted() => {
                        task.suspend();
                        tracing::info!(attempt, %reason, "wait interrupted during backoff");
                        return Err(UrlscanError::Cancelled { uuid: task.id().to_string(), reason });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        task.time_out();
        tracing::warn!(attempts = MAX_ATTEMPTS, "gave up waiting for report");
        Err(UrlscanError::Timeout {
            uuid: task.id().to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %request.method, url = %request.url, query = ?request.query, "sending request");
        let response = self.transport.send(request).await?;
        tracing::debug!(status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }

    async fn scoped<F: Future>(&self, future: F) -> F::Output {
        match &self.dispatch {
            Some(dispatch) => future.with_subscriber(dispatch.clone()).await,
            None => future.await,
        }
    }
}
