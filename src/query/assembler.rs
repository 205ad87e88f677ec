//! Assembles paginated engine results into one bounded artifact.
//!
//! Result sets can be arbitrarily large while the caller wants a bounded,
//! fast answer; this is a size-capped assembly path, not a bulk export.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::engine::{QueryEngine, ResultPage};
use crate::query::error::QueryError;
use crate::query::lifecycle::QueryHandle;
use crate::query::poller::{with_transient_retry, PollSettings};
use crate::query::result::{CellValue, ColumnDescriptor, QueryResult};

/// Largest page the engine will serve per result request.
const ENGINE_PAGE_CAP: usize = 1000;

/// Pages through a completed query's result set and normalizes it.
pub struct ResultAssembler<'a> {
    engine: &'a dyn QueryEngine,
    poll: &'a PollSettings,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(engine: &'a dyn QueryEngine, poll: &'a PollSettings) -> Self {
        Self { engine, poll }
    }

    /// Fetch pages until `max_results` rows are accumulated or the engine
    /// reports no further continuation token.
    ///
    /// Invoked only after the query reached SUCCEEDED. The schema is read
    /// once from the first page and later pages must agree on column count.
    /// Paging shares the caller's wall-clock budget with the poll loop;
    /// exceeding `deadline` mid-paging is a timeout, not a partial result.
    pub async fn fetch(
        &self,
        handle: &QueryHandle,
        max_results: usize,
        deadline: Instant,
        budget: Duration,
    ) -> Result<QueryResult, QueryError> {
        let mut schema: Vec<ColumnDescriptor> = Vec::new();
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut truncated = false;
        let mut first_page = true;

        loop {
            if Instant::now() >= deadline {
                return Err(QueryError::Timeout(budget.as_secs()));
            }

            // One extra slot on the first page for the engine's header row.
            let wanted = max_results - rows.len() + usize::from(first_page);
            let page_size = wanted.clamp(1, ENGINE_PAGE_CAP) as u32;

            let page = with_transient_retry(self.poll, "get_query_results", || {
                self.engine
                    .get_query_results(handle.id(), page_size, next_token.as_deref())
            })
            .await?;

            if first_page {
                schema = page.columns.iter().map(ColumnDescriptor::from_engine).collect();
            } else if page.columns.len() != schema.len() {
                return Err(QueryError::SchemaMismatch {
                    expected: schema.len(),
                    actual: page.columns.len(),
                });
            }

            let data_rows = if first_page && starts_with_header(&page, &schema) {
                &page.rows[1..]
            } else {
                &page.rows[..]
            };

            for raw in data_rows {
                if rows.len() == max_results {
                    truncated = true;
                    break;
                }
                rows.push(decode_row(raw, &schema));
            }

            debug!(
                query_execution_id = handle.id(),
                accumulated = rows.len(),
                truncated,
                has_token = page.next_token.is_some(),
                "assembled result page"
            );

            if truncated {
                break;
            }
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
            if rows.len() == max_results {
                // Cap reached with pages still outstanding.
                truncated = true;
                break;
            }
            first_page = false;
        }

        Ok(QueryResult {
            query_execution_id: handle.id().to_string(),
            schema,
            rows,
            truncated,
            elapsed_ms: 0,
            statistics: None,
        })
    }
}

/// The engine prepends a header row (cell values equal to the column names)
/// to the first page of SELECT results. Detect it rather than assuming it:
/// statements without one must not lose their first data row.
fn starts_with_header(page: &ResultPage, schema: &[ColumnDescriptor]) -> bool {
    let Some(first) = page.rows.first() else {
        return false;
    };
    first.len() == schema.len()
        && schema
            .iter()
            .zip(first.iter())
            .all(|(col, cell)| cell.as_deref() == Some(col.name.as_str()))
}

fn decode_row(raw: &[Option<String>], schema: &[ColumnDescriptor]) -> Vec<CellValue> {
    schema
        .iter()
        .enumerate()
        .map(|(i, col)| CellValue::decode(raw.get(i).and_then(|c| c.as_deref()), col.column_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::engine::fake::FakeEngine;
    use crate::query::result::ColumnType;

    fn fast_poll() -> PollSettings {
        PollSettings {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            multiplier: 2.0,
            jitter_fraction: 0.0,
            transient_retries: 2,
            transient_backoff: Duration::from_millis(1),
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    async fn fetch(
        engine: &FakeEngine,
        max_results: usize,
    ) -> Result<QueryResult, QueryError> {
        let poll = fast_poll();
        let assembler = ResultAssembler::new(engine, &poll);
        assembler
            .fetch(
                &QueryHandle::new("qe-1"),
                max_results,
                far_deadline(),
                Duration::from_secs(30),
            )
            .await
    }

    #[tokio::test]
    async fn test_two_pages_assemble_without_truncation() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint"), ("name", "varchar")],
            vec![
                vec![Some("1"), Some("a")],
                vec![Some("2"), Some("b")],
                vec![Some("3"), Some("c")],
                vec![Some("4"), Some("d")],
                vec![Some("5"), Some("e")],
            ],
            Some("tok-1"),
        );
        engine.push_page(
            &[("id", "bigint"), ("name", "varchar")],
            vec![
                vec![Some("6"), Some("f")],
                vec![Some("7"), Some("g")],
                vec![Some("8"), None],
            ],
            None,
        );

        let result = fetch(&engine, 100).await.unwrap();
        assert_eq!(result.rows.len(), 8);
        assert!(!result.truncated);
        assert_eq!(result.schema.len(), 2);
        assert_eq!(result.schema[0].column_type, ColumnType::Integer);
        for row in &result.rows {
            assert_eq!(row.len(), result.schema.len());
        }
        assert_eq!(result.rows[0][0], CellValue::Integer(1));
        assert_eq!(result.rows[7][1], CellValue::Null);
        assert_eq!(engine.result_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cap_discards_page_remainder_and_stops_fetching() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint")],
            vec![
                vec![Some("1")],
                vec![Some("2")],
                vec![Some("3")],
                vec![Some("4")],
            ],
            Some("tok-1"),
        );
        // A second page exists but must never be requested.
        engine.push_page(&[("id", "bigint")], vec![vec![Some("5")]], None);

        let result = fetch(&engine, 3).await.unwrap();
        assert_eq!(result.rows.len(), 3);
        assert!(result.truncated);
        assert_eq!(engine.result_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cap_reached_exactly_with_token_marks_truncated() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint")],
            vec![vec![Some("1")], vec![Some("2")]],
            Some("tok-1"),
        );

        let result = fetch(&engine, 2).await.unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result.truncated);
        assert_eq!(engine.result_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exact_fill_without_token_is_complete() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint")],
            vec![vec![Some("1")], vec![Some("2")]],
            None,
        );

        let result = fetch(&engine, 2).await.unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_header_row_dropped_when_it_matches_column_names() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint"), ("name", "varchar")],
            vec![
                vec![Some("id"), Some("name")],
                vec![Some("1"), Some("a")],
            ],
            None,
        );

        let result = fetch(&engine, 100).await.unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], CellValue::Integer(1));
    }

    #[tokio::test]
    async fn test_data_first_row_kept_when_not_a_header() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint")],
            vec![vec![Some("10")], vec![Some("20")]],
            None,
        );

        let result = fetch(&engine, 100).await.unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_schema_mismatch_across_pages_aborts() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint"), ("name", "varchar")],
            vec![vec![Some("1"), Some("a")]],
            Some("tok-1"),
        );
        engine.push_page(&[("id", "bigint")], vec![vec![Some("2")]], None);

        let err = fetch(&engine, 100).await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::SchemaMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_short_rows_padded_with_null() {
        let engine = FakeEngine::default();
        engine.push_page(
            &[("id", "bigint"), ("name", "varchar")],
            vec![vec![Some("1")]],
            None,
        );

        let result = fetch(&engine, 100).await.unwrap();
        assert_eq!(result.rows[0].len(), 2);
        assert_eq!(result.rows[0][1], CellValue::Null);
    }

    #[tokio::test]
    async fn test_empty_result_set() {
        let engine = FakeEngine::default();
        engine.push_page(&[("id", "bigint")], vec![], None);

        let result = fetch(&engine, 100).await.unwrap();
        assert!(result.rows.is_empty());
        assert!(!result.truncated);
        assert_eq!(result.schema.len(), 1);
    }

    #[tokio::test]
    async fn test_deadline_exceeded_mid_paging_is_timeout() {
        let engine = FakeEngine::default();
        let poll = fast_poll();
        let assembler = ResultAssembler::new(&engine, &poll);

        let err = assembler
            .fetch(
                &QueryHandle::new("qe-1"),
                100,
                Instant::now() - Duration::from_millis(1),
                Duration::from_secs(3),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Timeout(3)));
        assert_eq!(engine.result_calls.load(Ordering::SeqCst), 0);
    }
}
