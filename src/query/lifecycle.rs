//! Query lifecycle: submission, the poll loop, terminal classification.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::engine::{ExecutionStatistics, ExecutionState, ExecutionStatus, QueryEngine};
use crate::query::assembler::ResultAssembler;
use crate::query::error::QueryError;
use crate::query::poller::{with_transient_retry, PollSettings};
use crate::query::request::QueryRequest;
use crate::query::result::QueryResult;

/// Opaque engine-issued identifier for one submitted query execution.
///
/// Valid only between submission and the first observed terminal state;
/// never persisted or shared across calls.
#[derive(Debug, Clone)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Classification of a terminal engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Succeeded,
    Failed,
    Cancelled,
}

/// The engine's final word on a query, observed by the poll loop.
#[derive(Debug, Clone)]
pub struct TerminalStatus {
    pub kind: TerminalKind,
    pub reason: Option<String>,
    pub statistics: Option<ExecutionStatistics>,
}

impl TerminalStatus {
    /// Classify a status observation; `None` while the query is in flight.
    fn from_execution(status: ExecutionStatus) -> Option<Self> {
        let kind = match status.state {
            ExecutionState::Succeeded => TerminalKind::Succeeded,
            ExecutionState::Failed => TerminalKind::Failed,
            ExecutionState::Cancelled => TerminalKind::Cancelled,
            ExecutionState::Queued | ExecutionState::Running => return None,
        };
        Some(Self {
            kind,
            reason: status.state_change_reason,
            statistics: status.statistics,
        })
    }
}

/// Outcome of waiting for a query to leave the in-flight states.
#[derive(Debug)]
pub enum WaitOutcome {
    /// The engine reported a terminal state.
    Terminal(TerminalStatus),
    /// The wait budget ran out while the query was still queued or running.
    /// The remote query keeps running server-side; no cancellation is sent.
    TimedOut,
}

/// Drives one query from submission through its terminal state.
///
/// Each tool invocation owns its own lifecycle value; nothing is shared
/// between concurrent queries and no state survives past the call.
pub struct QueryLifecycle {
    engine: Arc<dyn QueryEngine>,
    poll: PollSettings,
}

impl QueryLifecycle {
    pub fn new(engine: Arc<dyn QueryEngine>, poll: PollSettings) -> Self {
        Self { engine, poll }
    }

    /// Forward the request verbatim to the engine's submission API.
    ///
    /// A synchronous rejection (malformed SQL, missing output location,
    /// unknown workgroup) surfaces as [`QueryError::Submission`] and is
    /// never retried.
    pub async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle, QueryError> {
        let submission = request.submission();
        debug!(
            workgroup = %submission.workgroup,
            database = submission.database.as_deref().unwrap_or("-"),
            "submitting query"
        );

        match self.engine.start_query_execution(&submission).await {
            Ok(id) => {
                info!(query_execution_id = %id, "query submitted");
                Ok(QueryHandle::new(id))
            }
            Err(e) => Err(QueryError::Submission(e.to_string())),
        }
    }

    /// Poll the engine until the query reaches a terminal state or the
    /// deadline passes.
    ///
    /// Polls follow the backoff schedule in [`PollSettings`], sleeping
    /// between checks without holding any lock; sleeps are clamped to the
    /// remaining budget so the call returns within one polling interval of
    /// the deadline. Transient transport failures are retried on their own
    /// short ladder before surfacing as [`QueryError::Poll`].
    pub async fn await_terminal(
        &self,
        handle: &QueryHandle,
        deadline: Instant,
    ) -> Result<WaitOutcome, QueryError> {
        let mut attempt: u32 = 0;
        loop {
            let status = with_transient_retry(&self.poll, "get_query_execution", || {
                self.engine.get_query_execution(handle.id())
            })
            .await?;

            if let Some(terminal) = TerminalStatus::from_execution(status) {
                debug!(
                    query_execution_id = handle.id(),
                    kind = ?terminal.kind,
                    "query reached terminal state"
                );
                return Ok(WaitOutcome::Terminal(terminal));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }

            let interval = self.poll.jittered_interval_for(attempt);
            tokio::time::sleep(interval.min(deadline - now)).await;
            attempt = attempt.saturating_add(1);
        }
    }

    /// Run the whole lifecycle: submit, wait, then assemble results.
    ///
    /// The wall-clock budget covers polling and paging together. On timeout
    /// the remote query is left running unobserved; it may still consume
    /// engine resources or eventually complete.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        let started = Instant::now();
        let deadline = started + request.max_wait;

        let handle = self.submit(request).await?;

        let terminal = match self.await_terminal(&handle, deadline).await? {
            WaitOutcome::TimedOut => {
                info!(
                    query_execution_id = handle.id(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "wait budget exhausted, abandoning poll loop"
                );
                return Err(QueryError::Timeout(request.max_wait.as_secs()));
            }
            WaitOutcome::Terminal(terminal) => terminal,
        };

        match terminal.kind {
            TerminalKind::Succeeded => {
                let assembler = ResultAssembler::new(self.engine.as_ref(), &self.poll);
                let mut result = assembler
                    .fetch(&handle, request.max_results, deadline, request.max_wait)
                    .await?;
                result.statistics = terminal.statistics;
                result.elapsed_ms = started.elapsed().as_millis() as u64;
                Ok(result)
            }
            TerminalKind::Failed => Err(QueryError::Engine(terminal.reason.unwrap_or_else(
                || "query failed with no reason reported".to_string(),
            ))),
            TerminalKind::Cancelled => Err(QueryError::Cancelled(terminal.reason)),
        }
    }
}
