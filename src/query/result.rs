//! Normalized result-set model.
//!
//! The engine reports every cell as optional text plus a declared column
//! type. Normalization maps that onto a fixed type enumeration and a closed
//! tagged value variant so consumers can pattern-match exhaustively instead
//! of re-parsing strings.

use serde::Serialize;

use crate::engine::{EngineColumn, ExecutionStatistics};

/// Declared column type, reduced to a fixed enumeration.
///
/// Engine type names outside the enumeration degrade to `String`; the raw
/// engine name is not preserved past normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Struct,
    Array,
}

impl ColumnType {
    /// Map an engine type name (e.g. `varchar`, `decimal(10,2)`) onto the
    /// fixed enumeration. Parameter suffixes are ignored.
    pub fn from_engine(type_name: &str) -> Self {
        let base = type_name
            .split(['(', '<'])
            .next()
            .unwrap_or(type_name)
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "tinyint" | "smallint" | "int" | "integer" | "bigint" => ColumnType::Integer,
            "decimal" | "double" | "float" | "real" => ColumnType::Decimal,
            "boolean" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "timestamp" | "timestamp with time zone" => ColumnType::Timestamp,
            "row" | "struct" | "map" | "json" => ColumnType::Struct,
            "array" => ColumnType::Array,
            _ => ColumnType::String,
        }
    }
}

/// One column of a result set or table schema.
///
/// Column order is significant and fixed for the life of a result set.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// `None` when the engine does not report nullability.
    pub nullable: Option<bool>,
}

impl ColumnDescriptor {
    pub fn from_engine(col: &EngineColumn) -> Self {
        Self {
            name: col.name.clone(),
            column_type: ColumnType::from_engine(&col.type_name),
            nullable: col.nullable,
        }
    }
}

/// One cell of a result row.
///
/// Decimals, dates and timestamps keep the engine's exact textual form;
/// converting decimals to floating point would lose precision. `Null` is
/// distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(String),
    Date(String),
    Timestamp(String),
    String(String),
    /// Struct-like and array-like values, passed through as engine text.
    Nested(String),
}

impl CellValue {
    /// Decode one engine cell according to the column's declared type.
    ///
    /// A cell that fails its declared-type parse falls back to string
    /// pass-through rather than being coerced or dropped.
    pub fn decode(raw: Option<&str>, column_type: ColumnType) -> Self {
        let Some(text) = raw else {
            return CellValue::Null;
        };

        match column_type {
            ColumnType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" => CellValue::Boolean(true),
                "false" => CellValue::Boolean(false),
                _ => CellValue::String(text.to_string()),
            },
            ColumnType::Integer => match text.parse::<i64>() {
                Ok(value) => CellValue::Integer(value),
                Err(_) => CellValue::String(text.to_string()),
            },
            ColumnType::Decimal => CellValue::Decimal(text.to_string()),
            ColumnType::Date => CellValue::Date(text.to_string()),
            ColumnType::Timestamp => CellValue::Timestamp(text.to_string()),
            ColumnType::Struct | ColumnType::Array => CellValue::Nested(text.to_string()),
            ColumnType::String => CellValue::String(text.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// The externally visible outcome of one successful query execution.
///
/// Immutable once assembled; never cached server-side. Every row has exactly
/// `schema.len()` cells and the row count never exceeds the caller's cap.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Engine-issued execution id for the query that produced this result.
    pub query_execution_id: String,
    pub schema: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<CellValue>>,
    /// True when the row list was cut short of the true result-set size.
    pub truncated: bool,
    /// Total wall-clock time spent waiting (polling plus paging).
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ExecutionStatistics>,
}
