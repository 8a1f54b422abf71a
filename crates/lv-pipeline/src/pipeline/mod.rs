//! # List-View Pipeline
//!
//! filter → sort → paginate over an in-memory record set. Every stage is a
//! pure function of its inputs; nothing is cached between runs.

pub mod filter;
pub mod paginate;
pub mod sort;

pub use filter::filter;
pub use paginate::paginate;
pub use sort::sort;

use crate::error::Result;
use crate::query::Query;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One page of the filtered, sorted set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub items: Vec<Record>,
    pub total_matched: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
}

impl PageResult {
    /// Build page metadata. `page_size` must be non-zero.
    pub fn new(items: Vec<Record>, total_matched: usize, page: usize, page_size: usize) -> Self {
        Self {
            items,
            total_matched,
            total_pages: total_matched.div_ceil(page_size),
            page,
            page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Run the full pipeline for one query.
pub fn run(records: &[Record], query: &Query) -> Result<PageResult> {
    let start = Instant::now();
    query.validate()?;

    let matched = filter(records, query);
    let sorted = sort(matched, &query.sort_by, query.sort_order);
    let result = paginate(&sorted, query.page, query.page_size)?;

    tracing::debug!(
        records = records.len(),
        matched = result.total_matched,
        page = result.page,
        total_pages = result.total_pages,
        elapsed_us = start.elapsed().as_micros() as u64,
        "pipeline run"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::query::{Predicate, SortOrder};
    use serde_json::json;

    #[test]
    fn test_run_composes_stages() {
        let records: Vec<Record> = (1..=30)
            .map(|i| {
                Record::new()
                    .with("id", i)
                    .with("amount", i * 10)
                    .with("state", if i % 2 == 0 { "done" } else { "draft" })
            })
            .collect();
        let q = Query::default()
            .with_filter("state", Predicate::Eq(json!("done")))
            .sorted_by("amount", SortOrder::Descending)
            .at_page(2);
        let page = run(&records, &q).unwrap();
        assert_eq!(page.total_matched, 15);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].get("amount"), Some(&json!(100)));
    }

    #[test]
    fn test_run_rejects_invalid_query() {
        let mut q = Query::default();
        q.page_size = 0;
        assert!(matches!(run(&[], &q), Err(PipelineError::InvalidQuery(_))));
    }
}
