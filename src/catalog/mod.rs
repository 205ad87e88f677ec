//! Read-only façade over the engine's catalog.
//!
//! Stateless: each call loops internally on the engine's continuation token
//! until the listing is exhausted, so callers see complete listings even
//! when the catalog spans multiple pages.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::engine::{EngineError, EngineTableMetadata, QueryEngine};
use crate::query::result::ColumnDescriptor;

/// Catalog operation failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The named catalog, database or table does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Engine(EngineError),
}

impl From<EngineError> for CatalogError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NotFound(msg) => CatalogError::NotFound(msg),
            other => CatalogError::Engine(other),
        }
    }
}

/// Metadata for one table: schema, partition keys, free-form parameters.
///
/// Partition-key columns are reported separately from regular columns;
/// callers depend on the split to build partition-aware predicates.
#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub partition_keys: Vec<ColumnDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

impl TableMetadata {
    /// Normalize the engine's raw table record.
    ///
    /// The engine may repeat partition keys inside the regular column list;
    /// such duplicates are dropped from the regular list so the two lists
    /// stay disjoint.
    fn from_engine(raw: EngineTableMetadata) -> Self {
        let partition_keys: Vec<ColumnDescriptor> = raw
            .partition_keys
            .iter()
            .map(ColumnDescriptor::from_engine)
            .collect();

        let columns = raw
            .columns
            .iter()
            .filter(|col| !partition_keys.iter().any(|pk| pk.name == col.name))
            .map(ColumnDescriptor::from_engine)
            .collect();

        let comment = raw.parameters.get("comment").cloned();

        Self {
            name: raw.name,
            columns,
            partition_keys,
            comment,
            parameters: raw.parameters,
        }
    }
}

/// Thin typed adapter over the engine's catalog API. Holds no state.
pub struct CatalogAdapter {
    engine: Arc<dyn QueryEngine>,
}

impl CatalogAdapter {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    /// List all database names in a catalog, in engine order.
    ///
    /// An empty listing is a valid result, not an error.
    pub async fn list_databases(&self, catalog: &str) -> Result<Vec<String>, CatalogError> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .engine
                .list_databases(catalog, next_token.as_deref())
                .await?;
            names.extend(page.names);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        debug!(catalog, count = names.len(), "listed databases");
        Ok(names)
    }

    /// List all table names in a database, in engine order.
    ///
    /// Fails with [`CatalogError::NotFound`] when the database is absent.
    pub async fn list_tables(
        &self,
        database: &str,
        catalog: &str,
    ) -> Result<Vec<String>, CatalogError> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .engine
                .list_table_metadata(catalog, database, next_token.as_deref())
                .await?;
            names.extend(page.names);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        debug!(catalog, database, count = names.len(), "listed tables");
        Ok(names)
    }

    /// Fetch metadata for a single table.
    ///
    /// Fails with [`CatalogError::NotFound`] when the table or database is
    /// absent.
    pub async fn describe_table(
        &self,
        table: &str,
        database: &str,
        catalog: &str,
    ) -> Result<TableMetadata, CatalogError> {
        let raw = self
            .engine
            .get_table_metadata(catalog, database, table)
            .await?;
        Ok(TableMetadata::from_engine(raw))
    }
}
