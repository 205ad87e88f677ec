//! Scripted in-memory engine for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{
    EngineColumn, EngineTableMetadata, ExecutionState, ExecutionStatus, NamePage, QuerySubmission,
    ResultPage,
};
use super::{EngineError, QueryEngine};

/// A [`QueryEngine`] driven by scripted responses.
///
/// Each operation pops from its own queue; when the status queue runs dry
/// the engine keeps reporting `idle_state`, which models a query that never
/// leaves RUNNING. Call counters let tests assert how often the remote was
/// actually hit.
pub struct FakeEngine {
    pub submissions: Mutex<VecDeque<Result<String, EngineError>>>,
    pub statuses: Mutex<VecDeque<Result<ExecutionStatus, EngineError>>>,
    pub pages: Mutex<VecDeque<Result<ResultPage, EngineError>>>,
    pub database_pages: Mutex<VecDeque<Result<NamePage, EngineError>>>,
    pub table_pages: Mutex<VecDeque<Result<NamePage, EngineError>>>,
    pub tables: Mutex<VecDeque<Result<EngineTableMetadata, EngineError>>>,
    pub idle_state: ExecutionState,

    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
    pub catalog_calls: AtomicUsize,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            submissions: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            pages: Mutex::new(VecDeque::new()),
            database_pages: Mutex::new(VecDeque::new()),
            table_pages: Mutex::new(VecDeque::new()),
            tables: Mutex::new(VecDeque::new()),
            idle_state: ExecutionState::Running,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            catalog_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeEngine {
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

    pub fn push_page(&self, columns: &[(&str, &str)], rows: Vec<Vec<Option<&str>>>, token: Option<&str>) {
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
}

#[async_trait]
impl QueryEngine for FakeEngine {
    async fn start_query_execution(
        &self,
        _submission: &QuerySubmission,
    ) -> Result<String, EngineError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("qe-fake-1".to_string()))
    }

    async fn get_query_execution(
        &self,
        _query_execution_id: &str,
    ) -> Result<ExecutionStatus, EngineError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ExecutionStatus {
                state: self.idle_state,
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
