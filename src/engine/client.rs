//! HTTP client for the remote query engine.
//!
//! Speaks the engine's JSON protocol: every operation is a POST to the
//! service endpoint with an `X-Amz-Target` header naming the operation and
//! an `application/x-amz-json-1.1` body. Ambient credential material is
//! passed through verbatim as an `Authorization` header when configured;
//! this client performs no signing of its own.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    EngineColumn, EngineTableMetadata, ExecutionState, ExecutionStatistics, ExecutionStatus,
    NamePage, QuerySubmission, ResultPage,
};
use super::{EngineError, QueryEngine};

const TARGET_PREFIX: &str = "AmazonAthena";
const WIRE_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Client for the engine's query-execution and catalog APIs.
pub struct AthenaClient {
    client: reqwest::Client,
    endpoint: String,
    auth_header: Option<String>,
}

impl AthenaClient {
    /// Create a new engine client.
    ///
    /// # Arguments
    /// * `endpoint` - Service endpoint, e.g. "https://athena.us-east-1.amazonaws.com"
    /// * `timeout_sec` - Per-request timeout in seconds
    /// * `auth_header` - Ambient credential passed through as `Authorization`
    pub fn new(
        endpoint: String,
        timeout_sec: u64,
        auth_header: Option<String>,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .map_err(|e| EngineError::Connection(e.to_string()))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            endpoint,
            auth_header,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<T, EngineError> {
        debug!(operation, endpoint = %self.endpoint, "calling engine");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("x-amz-target", format!("{}.{}", TARGET_PREFIX, operation))
            .header(CONTENT_TYPE, WIRE_CONTENT_TYPE)
            .json(body);

        if let Some(auth) = &self.auth_header {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout
            } else {
                EngineError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))
    }
}

/// Map an engine error body onto the transport taxonomy.
///
/// Error bodies carry a `__type` discriminator like
/// `com.amazonaws.athena#InvalidRequestException` plus a message.
fn classify_error(status: u16, body: &str) -> EngineError {
    let parsed: Option<WireError> = serde_json::from_str(body).ok();
    let (error_type, message) = match parsed {
        Some(e) => {
            let short_type = e
                .error_type
                .rsplit(['#', '.'])
                .next()
                .unwrap_or_default()
                .to_string();
            (short_type, e.message.unwrap_or_else(|| body.to_string()))
        }
        None => (String::new(), body.to_string()),
    };

    if error_type.contains("NotFound") || error_type == "MetadataException" {
        return EngineError::NotFound(message);
    }
    if error_type == "TooManyRequestsException" || error_type == "ThrottlingException" {
        return EngineError::Service {
            status: 429,
            message,
        };
    }
    if error_type == "InvalidRequestException" && status < 500 {
        return EngineError::BadRequest(message);
    }
    EngineError::Service { status, message }
}

#[async_trait]
impl QueryEngine for AthenaClient {
    async fn start_query_execution(
        &self,
        submission: &QuerySubmission,
    ) -> Result<String, EngineError> {
        let context = if submission.catalog.is_some() || submission.database.is_some() {
            Some(WireExecutionContext {
                catalog: submission.catalog.clone(),
                database: submission.database.clone(),
            })
        } else {
            None
        };

        let input = StartQueryExecutionInput {
            query_string: &submission.sql,
            work_group: &submission.workgroup,
            query_execution_context: context,
            result_configuration: submission
                .output_location
                .as_deref()
                .map(|loc| WireResultConfiguration {
                    output_location: loc,
                }),
        };

        let output: StartQueryExecutionOutput =
            self.call("StartQueryExecution", &input).await?;
        Ok(output.query_execution_id)
    }

    async fn get_query_execution(
        &self,
        query_execution_id: &str,
    ) -> Result<ExecutionStatus, EngineError> {
        let input = GetQueryExecutionInput { query_execution_id };
        let output: GetQueryExecutionOutput = self.call("GetQueryExecution", &input).await?;

        let execution = output.query_execution;
        Ok(ExecutionStatus {
            state: execution.status.state,
            state_change_reason: execution.status.state_change_reason,
            statistics: execution.statistics.map(|s| ExecutionStatistics {
                total_execution_time_ms: s.total_execution_time_in_millis,
                data_scanned_bytes: s.data_scanned_in_bytes,
                engine_execution_time_ms: s.engine_execution_time_in_millis,
                query_queue_time_ms: s.query_queue_time_in_millis,
                service_processing_time_ms: s.service_processing_time_in_millis,
            }),
        })
    }

    async fn get_query_results(
        &self,
        query_execution_id: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError> {
        let input = GetQueryResultsInput {
            query_execution_id,
            max_results,
            next_token,
        };
        let output: GetQueryResultsOutput = self.call("GetQueryResults", &input).await?;

        let columns = output
            .result_set
            .result_set_metadata
            .map(|m| m.column_info.into_iter().map(EngineColumn::from).collect())
            .unwrap_or_default();

        let rows = output
            .result_set
            .rows
            .into_iter()
            .map(|row| row.data.into_iter().map(|cell| cell.var_char_value).collect())
            .collect();

        Ok(ResultPage {
            columns,
            rows,
            next_token: output.next_token,
        })
    }

    async fn list_databases(
        &self,
        catalog: &str,
        next_token: Option<&str>,
    ) -> Result<NamePage, EngineError> {
        let input = ListDatabasesInput {
            catalog_name: catalog,
            next_token,
        };
        let output: ListDatabasesOutput = self.call("ListDatabases", &input).await?;

        Ok(NamePage {
            names: output.database_list.into_iter().map(|db| db.name).collect(),
            next_token: output.next_token,
        })
    }

    async fn list_table_metadata(
        &self,
        catalog: &str,
        database: &str,
        next_token: Option<&str>,
    ) -> Result<NamePage, EngineError> {
        let input = ListTableMetadataInput {
            catalog_name: catalog,
            database_name: database,
            next_token,
        };
        let output: ListTableMetadataOutput = self.call("ListTableMetadata", &input).await?;

        Ok(NamePage {
            names: output
                .table_metadata_list
                .into_iter()
                .map(|t| t.name)
                .collect(),
            next_token: output.next_token,
        })
    }

    async fn get_table_metadata(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<EngineTableMetadata, EngineError> {
        let input = GetTableMetadataInput {
            catalog_name: catalog,
            database_name: database,
            table_name: table,
        };
        let output: GetTableMetadataOutput = self.call("GetTableMetadata", &input).await?;

        let meta = output.table_metadata;
        Ok(EngineTableMetadata {
            name: meta.name,
            columns: meta.columns.into_iter().map(EngineColumn::from).collect(),
            partition_keys: meta
                .partition_keys
                .into_iter()
                .map(EngineColumn::from)
                .collect(),
            parameters: meta.parameters,
        })
    }
}

// Wire types

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(rename = "message", alias = "Message", default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionInput<'a> {
    query_string: &'a str,
    work_group: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_execution_context: Option<WireExecutionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_configuration: Option<WireResultConfiguration<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireExecutionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireResultConfiguration<'a> {
    output_location: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionOutput {
    query_execution_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionInput<'a> {
    query_execution_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionOutput {
    query_execution: WireQueryExecution,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireQueryExecution {
    status: WireQueryStatus,
    #[serde(default)]
    statistics: Option<WireStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireQueryStatus {
    state: ExecutionState,
    #[serde(default)]
    state_change_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireStatistics {
    #[serde(default)]
    total_execution_time_in_millis: Option<u64>,
    #[serde(default)]
    data_scanned_in_bytes: Option<u64>,
    #[serde(default)]
    engine_execution_time_in_millis: Option<u64>,
    #[serde(default)]
    query_queue_time_in_millis: Option<u64>,
    #[serde(default)]
    service_processing_time_in_millis: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsInput<'a> {
    query_execution_id: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsOutput {
    result_set: WireResultSet,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireResultSet {
    #[serde(default)]
    result_set_metadata: Option<WireResultSetMetadata>,
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireResultSetMetadata {
    #[serde(default)]
    column_info: Vec<WireColumnInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireColumnInfo {
    name: String,
    #[serde(rename = "Type")]
    type_name: String,
    #[serde(default)]
    nullable: Option<String>,
}

impl From<WireColumnInfo> for EngineColumn {
    fn from(col: WireColumnInfo) -> Self {
        let nullable = match col.nullable.as_deref() {
            Some("NULLABLE") => Some(true),
            Some("NOT_NULL") => Some(false),
            _ => None,
        };
        EngineColumn {
            name: col.name,
            type_name: col.type_name,
            nullable,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRow {
    #[serde(default)]
    data: Vec<WireDatum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDatum {
    #[serde(default)]
    var_char_value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListDatabasesInput<'a> {
    catalog_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListDatabasesOutput {
    #[serde(default)]
    database_list: Vec<WireDatabase>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDatabase {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListTableMetadataInput<'a> {
    catalog_name: &'a str,
    database_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListTableMetadataOutput {
    #[serde(default)]
    table_metadata_list: Vec<WireTableMetadata>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetTableMetadataInput<'a> {
    catalog_name: &'a str,
    database_name: &'a str,
    table_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTableMetadataOutput {
    table_metadata: WireTableMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTableMetadata {
    name: String,
    #[serde(default)]
    columns: Vec<WireTableColumn>,
    #[serde(default)]
    partition_keys: Vec<WireTableColumn>,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTableColumn {
    name: String,
    #[serde(rename = "Type", default)]
    type_name: Option<String>,
}

impl From<WireTableColumn> for EngineColumn {
    fn from(col: WireTableColumn) -> Self {
        EngineColumn {
            name: col.name,
            type_name: col.type_name.unwrap_or_else(|| "string".to_string()),
            // Catalog metadata does not report nullability.
            nullable: None,
        }
    }
}
