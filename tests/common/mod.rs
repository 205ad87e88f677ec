//! Shared test helpers: a scripted engine and MCP client plumbing.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use athena_mcp_server::config::QueryDefaults;
use athena_mcp_server::engine::{
    EngineColumn, EngineError, EngineTableMetadata, ExecutionState, ExecutionStatus, NamePage,
    QueryEngine, QuerySubmission, ResultPage,
};
use athena_mcp_server::mcp::protocol::{McpResponse, RequestId};
use athena_mcp_server::mcp::{create_mcp_state, handle_message, McpState, ToolContext};
use athena_mcp_server::query::PollSettings;

/// A [`QueryEngine`] driven by scripted responses, with call counters.
///
/// When the status queue runs dry the engine keeps reporting RUNNING,
/// which models a query that never completes.
#[derive(Default)]
pub struct ScriptedEngine {
    pub submissions: Mutex<VecDeque<Result<String, EngineError>>>,
    pub statuses: Mutex<VecDeque<Result<ExecutionStatus, EngineError>>>,
    pub pages: Mutex<VecDeque<Result<ResultPage, EngineError>>>,
    pub database_pages: Mutex<VecDeque<Result<NamePage, EngineError>>>,
    pub table_pages: Mutex<VecDeque<Result<NamePage, EngineError>>>,
    pub tables: Mutex<VecDeque<Result<EngineTableMetadata, EngineError>>>,

    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
    pub catalog_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn push_status(&self, state: ExecutionState) {
        self.statuses.lock().unwrap().push_back(Ok(ExecutionStatus {
            state,
            state_change_reason: None,
            statistics: None,
        }));
    }

    pub fn push_status_with_reason(&self, state: ExecutionState, reason: &str) {
        self.statuses.lock().unwrap().push_back(Ok(ExecutionStatus {
            state,
            state_change_reason: Some(reason.to_string()),
            statistics: None,
        }));
    }

    pub fn push_page(
        &self,
        columns: &[(&str, &str)],
        rows: Vec<Vec<Option<&str>>>,
        token: Option<&str>,
    ) {
        let page = ResultPage {
            columns: columns
                .iter()
                .map(|(name, ty)| EngineColumn {
                    name: name.to_string(),
                    type_name: ty.to_string(),
                    nullable: None,
                })
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
            next_token: token.map(str::to_string),
        };
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_database_page(&self, names: &[&str], token: Option<&str>) {
        self.database_pages.lock().unwrap().push_back(Ok(NamePage {
            names: names.iter().map(|s| s.to_string()).collect(),
            next_token: token.map(str::to_string),
        }));
    }

    pub fn remote_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
            + self.status_calls.load(Ordering::SeqCst)
            + self.result_calls.load(Ordering::SeqCst)
            + self.catalog_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn start_query_execution(
        &self,
        _submission: &QuerySubmission,
    ) -> Result<String, EngineError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("qe-test-1".to_string()))
    }

    async fn get_query_execution(
        &self,
        _query_execution_id: &str,
    ) -> Result<ExecutionStatus, EngineError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ExecutionStatus {
                state: ExecutionState::Running,
                state_change_reason: None,
                statistics: None,
            })
        })
    }

    async fn get_query_results(
        &self,
        _query_execution_id: &str,
        _max_results: u32,
        _next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(EngineError::InvalidResponse(
                "no more scripted pages".to_string(),
            ))
        })
    }

    async fn list_databases(
        &self,
        _catalog: &str,
        _next_token: Option<&str>,
    ) -> Result<NamePage, EngineError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.database_pages.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(NamePage {
                names: Vec::new(),
                next_token: None,
            })
        })
    }

    async fn list_table_metadata(
        &self,
        _catalog: &str,
        _database: &str,
        _next_token: Option<&str>,
    ) -> Result<NamePage, EngineError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.table_pages.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(NamePage {
                names: Vec::new(),
                next_token: None,
            })
        })
    }

    async fn get_table_metadata(
        &self,
        _catalog: &str,
        _database: &str,
        table: &str,
    ) -> Result<EngineTableMetadata, EngineError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(EngineError::NotFound(format!("Table {} not found", table)))
        })
    }
}

/// Poll settings tight enough for tests to run in milliseconds.
pub fn fast_poll() -> PollSettings {
    PollSettings {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(4),
        multiplier: 2.0,
        jitter_fraction: 0.0,
        transient_retries: 2,
        transient_backoff: Duration::from_millis(1),
    }
}

pub fn test_defaults() -> QueryDefaults {
    QueryDefaults {
        catalog: "AwsDataCatalog".to_string(),
        database: Some("default".to_string()),
        workgroup: "primary".to_string(),
        output_location: Some("s3://test-bucket/results/".to_string()),
        max_results: 100,
        max_wait_seconds: 300,
    }
}

/// An initialized MCP dispatch state over a scripted engine.
pub struct TestHarness {
    pub engine: Arc<ScriptedEngine>,
    pub state: McpState,
    initialized: bool,
    next_id: i64,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_defaults(test_defaults())
    }

    pub fn with_defaults(defaults: QueryDefaults) -> Self {
        let engine = Arc::new(ScriptedEngine::default());
        let context = ToolContext {
            engine: engine.clone(),
            defaults,
            poll: fast_poll(),
            server_version: "test".to_string(),
            start_time: Instant::now(),
        };
        Self {
            engine,
            state: create_mcp_state(context),
            initialized: false,
            next_id: 0,
        }
    }

    /// Send one JSON-RPC message and return the response, if any.
    pub async fn send(&mut self, body: serde_json::Value) -> Option<McpResponse> {
        handle_message(&body.to_string(), &self.state, &mut self.initialized).await
    }

    /// Perform the initialize handshake.
    pub async fn initialize(&mut self) {
        let id = self.bump_id();
        let response = self
            .send(serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "initialize",
                "params": {"protocolVersion": "2024-11-05"}
            }))
            .await
            .expect("initialize must produce a response");
        assert!(response.error.is_none(), "initialize failed: {:?}", response.error);
    }

    /// Call a tool and return the parsed text payload of its result.
    pub async fn call_tool(&mut self, name: &str, arguments: serde_json::Value) -> ToolOutcome {
        let id = self.bump_id();
        let response = self
            .send(serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            }))
            .await
            .expect("tools/call must produce a response");

        let result = response
            .result
            .unwrap_or_else(|| panic!("tools/call failed: {:?}", response.error));

        let is_error = result["is_error"].as_bool().unwrap_or(false);
        let text = result["content"][0]["text"]
            .as_str()
            .expect("tool result must carry text content")
            .to_string();
        let payload: serde_json::Value =
            serde_json::from_str(&text).expect("tool payload must be JSON");

        ToolOutcome { is_error, payload }
    }

    fn bump_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId::Number(self.next_id)
    }
}

/// Parsed outcome of one tool call.
pub struct ToolOutcome {
    pub is_error: bool,
    pub payload: serde_json::Value,
}

impl ToolOutcome {
    /// The machine-readable error kind, for error envelopes.
    pub fn error_kind(&self) -> &str {
        self.payload["error"]["kind"].as_str().unwrap_or("")
    }
}
