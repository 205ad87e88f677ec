//! Catalog tools: list_databases, list_tables, get_table_metadata.

use serde::Deserialize;
use serde_json::Value;

use super::{failure, success, ToolError};
use crate::catalog::CatalogAdapter;
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{RegisteredTool, ToolBuilder, ToolRegistry, ToolResult};

/// Register catalog tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(list_databases_tool());
    registry.register_tool(list_tables_tool());
    registry.register_tool(get_table_metadata_tool());
}

// ============================================================================
// list_databases
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListDatabasesParams {
    #[serde(default)]
    catalog: Option<String>,
}

fn list_databases_tool() -> RegisteredTool {
    ToolBuilder::new("list_databases")
        .description("List the databases available in a catalog")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "catalog": {
                    "type": "string",
                    "description": "Catalog name (defaults to the configured catalog)"
                }
            }
        }))
        .build(list_databases_handler)
}

async fn list_databases_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: ListDatabasesParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return failure(e),
    };

    let catalog = params.catalog.unwrap_or_else(|| ctx.defaults.catalog.clone());

    let adapter = CatalogAdapter::new(ctx.engine.clone());
    match adapter.list_databases(&catalog).await {
        Ok(databases) => {
            let count = databases.len();
            success(&serde_json::json!({
                "catalog": catalog,
                "databases": databases,
                "count": count,
            }))
        }
        Err(e) => failure(e.into()),
    }
}

// ============================================================================
// list_tables
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListTablesParams {
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    catalog: Option<String>,
}

fn list_tables_tool() -> RegisteredTool {
    ToolBuilder::new("list_tables")
        .description("List the tables in a database")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "database": {
                    "type": "string",
                    "description": "Database name"
                },
                "catalog": {
                    "type": "string",
                    "description": "Catalog name (defaults to the configured catalog)"
                }
            },
            "required": ["database"]
        }))
        .build(list_tables_handler)
}

async fn list_tables_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: ListTablesParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return failure(e),
    };

    let Some(database) = non_empty(params.database) else {
        return failure(ToolError::Validation("database is required".to_string()));
    };
    let catalog = params.catalog.unwrap_or_else(|| ctx.defaults.catalog.clone());

    let adapter = CatalogAdapter::new(ctx.engine.clone());
    match adapter.list_tables(&database, &catalog).await {
        Ok(tables) => {
            let count = tables.len();
            success(&serde_json::json!({
                "catalog": catalog,
                "database": database,
                "tables": tables,
                "count": count,
            }))
        }
        Err(e) => failure(e.into()),
    }
}

// ============================================================================
// get_table_metadata
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetTableMetadataParams {
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    catalog: Option<String>,
}

fn get_table_metadata_tool() -> RegisteredTool {
    ToolBuilder::new("get_table_metadata")
        .description(
            "Get metadata for a table: columns, partition keys and table parameters",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "table": {
                    "type": "string",
                    "description": "Table name"
                },
                "database": {
                    "type": "string",
                    "description": "Database name"
                },
                "catalog": {
                    "type": "string",
                    "description": "Catalog name (defaults to the configured catalog)"
                }
            },
            "required": ["table", "database"]
        }))
        .build(get_table_metadata_handler)
}

async fn get_table_metadata_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: GetTableMetadataParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return failure(e),
    };

    let Some(table) = non_empty(params.table) else {
        return failure(ToolError::Validation("table is required".to_string()));
    };
    let Some(database) = non_empty(params.database) else {
        return failure(ToolError::Validation("database is required".to_string()));
    };
    let catalog = params.catalog.unwrap_or_else(|| ctx.defaults.catalog.clone());

    let adapter = CatalogAdapter::new(ctx.engine.clone());
    match adapter.describe_table(&table, &database, &catalog).await {
        Ok(metadata) => success(&serde_json::json!({
            "catalog": catalog,
            "database": database,
            "table": metadata,
        })),
        Err(e) => failure(e.into()),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

pub(super) fn parse_params<T: serde::de::DeserializeOwned>(
    params: Value,
) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::Validation(e.to_string()))
}

pub(super) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
