//! HTTP server: health/info endpoints plus the MCP WebSocket route.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::catalog::CatalogAdapter;
use crate::config::AppConfig;
use crate::engine::QueryEngine;
use crate::mcp::{create_mcp_state, mcp_handler, McpState, ToolContext};

/// Shared server state: one MCP registry + context, plus the startup config
/// for health reporting.
pub struct AppState {
    pub mcp: McpState,
    pub config: AppConfig,
}

fn server_version() -> String {
    format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"))
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn root(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({
        "status": "MCP server running",
        "name": "athena-mcp",
        "version": server_version(),
        "uptime": format_uptime(state.mcp.context.start_time.elapsed()),
        "endpoints": ["/health", "/v1/mcp"],
    }))
    .into_response()
}

/// Liveness probe: verifies the engine's catalog is reachable by listing
/// databases in the default catalog.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    let config = &state.config;
    let adapter = CatalogAdapter::new(state.mcp.context.engine.clone());

    match adapter.list_databases(&config.catalog).await {
        Ok(databases) => Json(serde_json::json!({
            "status": "ok",
            "region": config.region,
            "default_catalog": config.catalog,
            "default_database": config.database,
            "default_workgroup": config.workgroup,
            "databases_count": databases.len(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "message": e.to_string(),
                "region": config.region,
            })),
        )
            .into_response(),
    }
}

/// Build the router. Exposed separately from [`run_server`] so tests can
/// drive the app without binding a port.
pub fn make_app(config: AppConfig, engine: Arc<dyn QueryEngine>) -> Router {
    let context = ToolContext {
        engine,
        defaults: config.query_defaults(),
        poll: config.poll.clone(),
        server_version: server_version(),
        start_time: Instant::now(),
    };

    let state = Arc::new(AppState {
        mcp: create_mcp_state(context),
        config,
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/v1/mcp", get(mcp_handler))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run_server(config: AppConfig, engine: Arc<dyn QueryEngine>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = make_app(config, engine);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(addr = %addr, "serving MCP endpoint at /v1/mcp");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install ctrl-c handler");
    info!("shutdown signal received");
}
