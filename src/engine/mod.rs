//! Interface to the remote query engine.
//!
//! The engine executes queries asynchronously: submission returns an
//! execution id immediately and results are obtained later by polling.
//! Everything above this module talks to the [`QueryEngine`] trait so the
//! lifecycle, pagination and catalog logic can be tested against fakes.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use client::AthenaClient;
pub use types::{
    EngineColumn, EngineTableMetadata, ExecutionState, ExecutionStatistics, ExecutionStatus,
    NamePage, QuerySubmission, ResultPage,
};

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level errors from the remote engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    /// The engine rejected the request synchronously (malformed SQL, missing
    /// output location, unknown workgroup). Never retried.
    #[error("engine rejected the request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("engine error (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// Returns true for failures worth a bounded retry: the request may
    /// succeed on a later attempt without any change on our side.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Connection(_) | EngineError::Timeout => true,
            EngineError::Service { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Operations the remote engine exposes over its network API.
///
/// Methods map one-to-one onto engine API calls; no retry or pagination
/// logic lives at this level.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit a query for asynchronous execution. Returns the engine-issued
    /// execution id.
    async fn start_query_execution(
        &self,
        submission: &QuerySubmission,
    ) -> Result<String, EngineError>;

    /// Fetch the current status of a submitted query.
    async fn get_query_execution(
        &self,
        query_execution_id: &str,
    ) -> Result<ExecutionStatus, EngineError>;

    /// Fetch one page of results for a successfully completed query.
    /// Consuming a continuation token invalidates it for re-fetch.
    async fn get_query_results(
        &self,
        query_execution_id: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError>;

    /// List one page of database names in a catalog.
    async fn list_databases(
        &self,
        catalog: &str,
        next_token: Option<&str>,
    ) -> Result<NamePage, EngineError>;

    /// List one page of table names in a database.
    async fn list_table_metadata(
        &self,
        catalog: &str,
        database: &str,
        next_token: Option<&str>,
    ) -> Result<NamePage, EngineError>;

    /// Fetch metadata for a single table.
    async fn get_table_metadata(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<EngineTableMetadata, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::Connection("refused".into()).is_transient());
        assert!(EngineError::Timeout.is_transient());
        assert!(EngineError::Service {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(EngineError::Service {
            status: 429,
            message: "throttled".into()
        }
        .is_transient());

        assert!(!EngineError::BadRequest("bad sql".into()).is_transient());
        assert!(!EngineError::NotFound("no such database".into()).is_transient());
        assert!(!EngineError::Service {
            status: 403,
            message: "denied".into()
        }
        .is_transient());
        assert!(!EngineError::InvalidResponse("garbage".into()).is_transient());
    }
}
