//! Engine-side data shapes.
//!
//! These mirror what the remote engine reports over its network API:
//! execution status records, paginated result sets, and catalog metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// State of a query execution as reported by the engine.
///
/// Transitions are driven entirely by the engine; this process only observes
/// them. `Succeeded`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,    // terminal
    Cancelled, // terminal
}

impl ExecutionState {
    /// Returns true if no further transition can occur from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }
}

/// One status observation for a submitted query.
#[derive(Debug, Clone)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    /// Engine-provided reason for the most recent state change, if any.
    /// For failed queries this carries the engine's error message verbatim.
    pub state_change_reason: Option<String>,
    /// Engine-side timing and scan statistics, present once available.
    pub statistics: Option<ExecutionStatistics>,
}

/// Engine-side statistics for one query execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_scanned_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_queue_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_processing_time_ms: Option<u64>,
}

/// A fully-resolved query submission, forwarded verbatim to the engine.
///
/// Defaults have already been applied by the time this is constructed; the
/// engine sees exactly these values.
#[derive(Debug, Clone)]
pub struct QuerySubmission {
    pub sql: String,
    pub catalog: Option<String>,
    pub database: Option<String>,
    pub workgroup: String,
    pub output_location: Option<String>,
}

/// Column metadata as reported by the engine, prior to normalization.
#[derive(Debug, Clone)]
pub struct EngineColumn {
    pub name: String,
    /// Engine type name, e.g. `varchar`, `bigint`, `decimal(10,2)`.
    pub type_name: String,
    /// `Some(true)` nullable, `Some(false)` not null, `None` unknown.
    pub nullable: Option<bool>,
}

/// One page of a query's result set.
///
/// Rows are in engine order. Cells are the engine's textual representation,
/// `None` where the engine reported a null marker. The continuation token is
/// opaque and single-use.
#[derive(Debug, Clone)]
pub struct ResultPage {
    pub columns: Vec<EngineColumn>,
    pub rows: Vec<Vec<Option<String>>>,
    pub next_token: Option<String>,
}

/// One page of a catalog listing (database or table names).
#[derive(Debug, Clone)]
pub struct NamePage {
    pub names: Vec<String>,
    pub next_token: Option<String>,
}

/// Raw table metadata as reported by the engine's catalog.
///
/// The engine may intermix partition keys with regular columns; callers are
/// expected to normalize the split.
#[derive(Debug, Clone)]
pub struct EngineTableMetadata {
    pub name: String,
    pub columns: Vec<EngineColumn>,
    pub partition_keys: Vec<EngineColumn>,
    pub parameters: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_state_is_terminal() {
        assert!(!ExecutionState::Queued.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Succeeded.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(ExecutionState::Cancelled.is_terminal());
    }

    #[test]
    fn test_execution_state_serialization() {
        let json = serde_json::to_string(&ExecutionState::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");

        let state: ExecutionState = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(state, ExecutionState::Cancelled);
    }

    #[test]
    fn test_execution_state_as_str_round_trip() {
        for state in [
            ExecutionState::Queued,
            ExecutionState::Running,
            ExecutionState::Succeeded,
            ExecutionState::Failed,
            ExecutionState::Cancelled,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }
}
