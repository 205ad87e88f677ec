//! Error taxonomy for the query execution path.

use thiserror::Error;

use crate::engine::EngineError;

/// Everything that can go wrong between submission and an assembled result.
///
/// Each variant maps to one machine-readable kind in the tool envelope; no
/// variant is ever silently swallowed or disguised as a partial result.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The engine rejected the submission synchronously. User-fixable,
    /// never retried.
    #[error("submission rejected: {0}")]
    Submission(String),

    /// Talking to the engine kept failing after bounded retries. The query
    /// itself may still be running server-side.
    #[error("status polling failed after {attempts} attempt(s): {source}")]
    Poll {
        attempts: u32,
        #[source]
        source: EngineError,
    },

    /// The engine completed the query and reported failure. The message is
    /// the engine's, verbatim.
    #[error("query failed: {0}")]
    Engine(String),

    /// The query was cancelled on the engine side.
    #[error("query was cancelled: {}", .0.as_deref().unwrap_or("no reason reported"))]
    Cancelled(Option<String>),

    /// The wait budget ran out while the query was still queued or running.
    /// The remote query keeps running unobserved; no cancellation is issued.
    #[error("query exceeded maximum wait time of {0} seconds")]
    Timeout(u64),

    /// A later result page disagreed with the first page's column count.
    #[error("result pages disagree on column count: expected {expected}, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
}
