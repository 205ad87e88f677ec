//! MCP WebSocket handler.
//!
//! The WebSocket loop is a thin shell around [`handle_message`], which is
//! transport-independent so the whole dispatch path can be exercised in
//! tests without a socket.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use super::context::ToolContext;
use super::protocol::{
    methods, InitializeParams, InitializeResult, McpError, McpRequest, McpResponse, PingResult,
    ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCapability, ToolsListResult,
    MCP_PROTOCOL_VERSION,
};
use super::registry::ToolRegistry;
use crate::server::AppState;

/// State shared across MCP connections
pub struct McpState {
    pub registry: Arc<ToolRegistry>,
    pub context: ToolContext,
}

/// Create the MCP state with all tools registered.
pub fn create_mcp_state(context: ToolContext) -> McpState {
    let mut registry = ToolRegistry::new();
    super::tools::register_all_tools(&mut registry);

    info!(
        tool_count = registry.tool_count(),
        "MCP registry initialized"
    );

    McpState {
        registry: Arc::new(registry),
        context,
    }
}

/// WebSocket upgrade handler for MCP
pub async fn mcp_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_mcp_socket(socket, state))
}

/// Handle an established MCP WebSocket connection.
///
/// Each connection runs independently; if the client goes away mid-call the
/// loop simply ends and any in-flight poll loop is abandoned with it.
async fn handle_mcp_socket(socket: WebSocket, state: Arc<AppState>) {
    debug!("MCP connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut initialized = false;

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response = handle_message(&text, &state.mcp, &mut initialized).await;

                if let Some(response) = response {
                    match serde_json::to_string(&response) {
                        Ok(json) => {
                            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to serialize MCP response: {}", e);
                        }
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                // Axum answers pings automatically
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }

    debug!("MCP connection closed");
}

/// Handle a single MCP message.
///
/// Returns `None` for notifications, which get no response.
pub async fn handle_message(
    text: &str,
    state: &McpState,
    initialized: &mut bool,
) -> Option<McpResponse> {
    let request: McpRequest = match serde_json::from_str(text) {
        Ok(req) => req,
        Err(e) => {
            return Some(McpResponse::error(
                None,
                McpError::ParseError(e.to_string()),
            ));
        }
    };

    let request_id = request.id.clone();

    let result = match request.method.as_str() {
        methods::INITIALIZE => handle_initialize(&request, initialized),
        methods::INITIALIZED => {
            // Notification, no response needed
            return None;
        }
        methods::PING => serde_json::to_value(PingResult {})
            .map_err(|e| McpError::InternalError(e.to_string())),
        methods::TOOLS_LIST => {
            if !*initialized {
                Err(McpError::InvalidRequest("Not initialized".to_string()))
            } else {
                handle_tools_list(state)
            }
        }
        methods::TOOLS_CALL => {
            if !*initialized {
                Err(McpError::InvalidRequest("Not initialized".to_string()))
            } else {
                handle_tools_call(&request, state).await
            }
        }
        methods::SHUTDOWN => {
            // Client is disconnecting gracefully
            return None;
        }
        other => Err(McpError::MethodNotFound(other.to_string())),
    };

    Some(match result {
        Ok(value) => McpResponse::success(request_id, value),
        Err(error) => McpResponse::error(Some(request_id), error),
    })
}

fn handle_initialize(
    request: &McpRequest,
    initialized: &mut bool,
) -> Result<serde_json::Value, McpError> {
    let _params: Option<InitializeParams> = request
        .params
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?;

    *initialized = true;

    let result = InitializeResult {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability { list_changed: None },
        },
        server_info: ServerInfo {
            name: "athena-mcp".to_string(),
            version: format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
        },
    };

    serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
}

fn handle_tools_list(state: &McpState) -> Result<serde_json::Value, McpError> {
    let result = ToolsListResult {
        tools: state.registry.definitions(),
    };

    serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
}

async fn handle_tools_call(
    request: &McpRequest,
    state: &McpState,
) -> Result<serde_json::Value, McpError> {
    let params: ToolsCallParams = request
        .params
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))?;

    let tool = state
        .registry
        .get(&params.name)
        .ok_or_else(|| McpError::MethodNotFound(format!("Unknown tool: {}", params.name)))?;

    let ctx = state.context.clone();
    let arguments = params.arguments.unwrap_or(serde_json::json!({}));

    debug!(tool = %params.name, "dispatching tool call");
    let result = (tool.handler)(ctx, arguments).await?;

    serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
}
