//! The execute_query tool.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::catalog::{non_empty, parse_params};
use super::{failure, success, ToolError};
use crate::config::{MAX_RESULTS_CEILING, MAX_WAIT_CEILING_SECS};
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};
use crate::query::{QueryLifecycle, QueryRequest};

/// Register query tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(execute_query_tool());
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecuteQueryParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    catalog: Option<String>,
    #[serde(default)]
    output_location: Option<String>,
    #[serde(default)]
    workgroup: Option<String>,
    #[serde(default)]
    max_results: Option<u64>,
    #[serde(default)]
    max_wait_seconds: Option<u64>,
}

fn execute_query_tool() -> RegisteredTool {
    ToolBuilder::new("execute_query")
        .description(
            "Execute a SQL query on the remote engine and wait for its results. \
             The engine runs queries asynchronously; this tool polls until the \
             query finishes or max_wait_seconds elapses. On timeout the query \
             is NOT cancelled: it keeps running server-side and may still \
             consume engine resources or eventually complete unobserved.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "SQL query to execute"
                },
                "database": {
                    "type": "string",
                    "description": "Database name (defaults to the configured database)"
                },
                "catalog": {
                    "type": "string",
                    "description": "Catalog name (defaults to the configured catalog)"
                },
                "output_location": {
                    "type": "string",
                    "description": "Storage location for query output, e.g. s3://bucket/prefix/ (defaults to the configured location)"
                },
                "workgroup": {
                    "type": "string",
                    "description": "Workgroup to run the query in (defaults to the configured workgroup)"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of result rows to return (default from config)",
                    "minimum": 1,
                    "maximum": 1000
                },
                "max_wait_seconds": {
                    "type": "integer",
                    "description": "Maximum time to wait for query completion in seconds (default from config)",
                    "minimum": 1,
                    "maximum": 3600
                }
            },
            "required": ["query"]
        }))
        .build(execute_query_handler)
}

async fn execute_query_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: ExecuteQueryParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return failure(e),
    };

    let request = match build_request(&ctx, params) {
        Ok(r) => r,
        Err(e) => return failure(e),
    };

    let lifecycle = QueryLifecycle::new(ctx.engine.clone(), ctx.poll.clone());
    match lifecycle.execute(&request).await {
        Ok(result) => {
            let row_count = result.rows.len();
            success(&serde_json::json!({
                "query_execution_id": result.query_execution_id,
                "status": "SUCCEEDED",
                "columns": result.schema,
                "rows": result.rows,
                "row_count": row_count,
                "truncated": result.truncated,
                "elapsed_ms": result.elapsed_ms,
                "statistics": result.statistics,
            }))
        }
        Err(e) => failure(e.into()),
    }
}

/// Apply defaults and validate; every rejection happens before any remote
/// call is made.
fn build_request(ctx: &ToolContext, params: ExecuteQueryParams) -> Result<QueryRequest, ToolError> {
    let Some(sql) = non_empty(params.query) else {
        return Err(ToolError::Validation("query is required".to_string()));
    };

    let defaults = &ctx.defaults;

    let output_location = non_empty(params.output_location)
        .or_else(|| defaults.output_location.clone());
    if output_location.is_none() {
        return Err(ToolError::Validation(
            "output_location is required: supply it per call or configure a default".to_string(),
        ));
    }

    let max_results = params.max_results.unwrap_or(defaults.max_results as u64);
    if max_results == 0 || max_results > MAX_RESULTS_CEILING as u64 {
        return Err(ToolError::Validation(format!(
            "max_results must be between 1 and {}, got {}",
            MAX_RESULTS_CEILING, max_results
        )));
    }

    let max_wait_seconds = params
        .max_wait_seconds
        .unwrap_or(defaults.max_wait_seconds);
    if max_wait_seconds == 0 || max_wait_seconds > MAX_WAIT_CEILING_SECS {
        return Err(ToolError::Validation(format!(
            "max_wait_seconds must be between 1 and {}, got {}",
            MAX_WAIT_CEILING_SECS, max_wait_seconds
        )));
    }

    Ok(QueryRequest {
        sql,
        catalog: non_empty(params.catalog).or_else(|| Some(defaults.catalog.clone())),
        database: non_empty(params.database).or_else(|| defaults.database.clone()),
        workgroup: non_empty(params.workgroup).unwrap_or_else(|| defaults.workgroup.clone()),
        output_location,
        max_results: max_results as usize,
        max_wait: Duration::from_secs(max_wait_seconds),
    })
}
