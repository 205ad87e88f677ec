//! Query request value.

use std::time::Duration;

use crate::engine::QuerySubmission;

/// Fully-resolved, immutable parameters for one query execution.
///
/// Defaults are applied by the tool dispatcher before construction; this
/// value itself holds no defaults and never changes after creation.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    pub catalog: Option<String>,
    pub database: Option<String>,
    pub workgroup: String,
    pub output_location: Option<String>,
    /// Cap on the total number of rows in the assembled result.
    pub max_results: usize,
    /// Wall-clock budget covering polling plus paging.
    pub max_wait: Duration,
}

impl QueryRequest {
    /// The subset of the request forwarded verbatim to the engine.
    pub fn submission(&self) -> QuerySubmission {
        QuerySubmission {
            sql: self.sql.clone(),
            catalog: self.catalog.clone(),
            database: self.database.clone(),
            workgroup: self.workgroup.clone(),
            output_location: self.output_location.clone(),
        }
    }
}
