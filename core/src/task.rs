//! Scan task handle and its lifecycle state.
//!
//! # Design
//! A `Task` is created by a successful submission and owned by the caller.
//! It holds no reference to the client: waiting borrows the client and the
//! task separately, so many tasks can be polled concurrently through one
//! client. The report slot is written at most once, when the service answers
//! 200, and is never cleared afterwards.
//!
//! ```text
//! Created ──wait──▶ Polling ──200──▶ Completed
//!    ▲                 │ ├───400────▶ Failed
//!    │                 │ └─30 tries─▶ TimedOut
//!    └─cancel / I/O error
//! ```

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, UrlscanError};
use crate::report::ScanResult;
use crate::types::SubmitResponse;

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::TimedOut)
    }
}

/// Handle to a submitted scan.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    report_location: String,
    receipt: SubmitResponse,
    result: Option<ScanResult>,
    state: TaskState,
}

impl Task {
    pub(crate) fn from_receipt(receipt: SubmitResponse) -> Self {
        Self {
            id: receipt.uuid.clone(),
            report_location: receipt.api.clone(),
            receipt,
            result: None,
            state: TaskState::Created,
        }
    }

    /// Handle for a scan submitted earlier, e.g. by another process.
    ///
    /// # Errors
    /// Returns `UrlscanError::MissingField` when `id` is blank.
    pub fn resume(id: impl Into<String>, report_location: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UrlscanError::MissingField { field: "uuid" });
        }
        let report_location = report_location.into();
        Ok(Self::from_receipt(SubmitResponse {
            uuid: id,
            api: report_location,
            ..SubmitResponse::default()
        }))
    }

    /// Server-issued task identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// API location of the report.
    pub fn report_location(&self) -> &str {
        &self.report_location
    }

    /// The full submission acknowledgement.
    pub fn receipt(&self) -> &SubmitResponse {
        &self.receipt
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// The report, once a wait has completed.
    pub fn result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<ScanResult> {
        self.result
    }

    pub(crate) fn begin_polling(&mut self) {
        debug_assert!(!self.state.is_terminal());
        self.state = TaskState::Polling;
    }

    pub(crate) fn complete(&mut self, report: ScanResult) {
        debug_assert!(self.result.is_none(), "report slot written twice");
        self.result = Some(report);
        self.state = TaskState::Completed;
    }

    pub(crate) fn fail(&mut self) {
        self.state = TaskState::Failed;
    }

    pub(crate) fn time_out(&mut self) {
        self.state = TaskState::TimedOut;
    }

    /// Back to `Created` after an interrupted wait; waiting again is allowed.
    pub(crate) fn suspend(&mut self) {
        if self.state == TaskState::Polling {
            self.state = TaskState::Created;
        }
    }
}

/// Why a wait stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Token,
    /// The wait's deadline passed.
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Token => f.write_str("cancelled by caller"),
            CancelReason::Deadline => f.write_str("deadline exceeded"),
        }
    }
}

/// Cancellation and deadline for one wait.
///
/// Both the in-flight request and the backoff sleep are raced against it.
#[derive(Debug, Clone, Default)]
pub struct WaitContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl WaitContext {
    /// A context that never fires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reason the context has already fired, if it has.
    pub fn check(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Token);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::Deadline),
            _ => None,
        }
    }

    /// Resolves once the token fires or the deadline passes.
    pub async fn interrupted(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => CancelReason::Token,
                _ = tokio::time::sleep_until(deadline) => CancelReason::Deadline,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Token
            }
        }
    }
}
