//! Tool dispatcher.
//!
//! Exposes exactly four operations over the registry: `list_databases`,
//! `list_tables`, `get_table_metadata` and `execute_query`. Handlers apply
//! configuration defaults, validate parameters before any remote call, and
//! shape every outcome into one of two disjoint envelopes: a success payload
//! or `{"error": {"kind", "message"}}` with the MCP error flag set.

pub mod catalog;
pub mod query;

use serde::Serialize;
use thiserror::Error;

use super::protocol::{McpError, ToolResultContent, ToolsCallResult};
use super::registry::{ToolRegistry, ToolResult};
use crate::catalog::CatalogError;
use crate::query::QueryError;

/// Register all tools with the registry
pub fn register_all_tools(registry: &mut ToolRegistry) {
    catalog::register_tools(registry);
    query::register_tools(registry);
}

/// Dispatcher-level failure, carrying a machine-readable kind.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Missing or malformed tool parameter, rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ToolError {
    /// Stable kind string for the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation_error",
            ToolError::Query(QueryError::Submission(_)) => "submission_error",
            ToolError::Query(QueryError::Poll { .. }) => "poll_error",
            ToolError::Query(QueryError::Engine(_)) => "engine_failure",
            ToolError::Query(QueryError::Cancelled(_)) => "query_cancelled",
            ToolError::Query(QueryError::Timeout(_)) => "query_timeout",
            ToolError::Query(QueryError::SchemaMismatch { .. }) => "result_schema_mismatch",
            ToolError::Catalog(CatalogError::NotFound(_)) => "not_found",
            ToolError::Catalog(CatalogError::Engine(_)) => "engine_error",
        }
    }
}

/// Shape a success payload into the envelope.
pub(crate) fn success<T: Serialize>(payload: &T) -> ToolResult {
    ToolsCallResult::json(payload).map_err(|e| McpError::InternalError(e.to_string()))
}

/// Shape a dispatcher failure into the error envelope.
///
/// Domain failures are data, not protocol errors: the envelope always
/// reaches the caller as a tool result with `is_error` set.
pub(crate) fn failure(err: ToolError) -> ToolResult {
    let body = serde_json::json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    });
    Ok(ToolsCallResult {
        content: vec![ToolResultContent::Text {
            text: body.to_string(),
        }],
        is_error: Some(true),
    })
}
