use super::PageResult;
use crate::error::{PipelineError, Result};
use crate::record::Record;

/// Slice one page out of the sorted set. A page past the end is empty, not an error.
pub fn paginate(sorted: &[&Record], page: usize, page_size: usize) -> Result<PageResult> {
    if page == 0 || page_size == 0 {
        return Err(PipelineError::InvalidQuery(format!(
            "page and page_size must be >= 1 (got page={}, page_size={})",
            page, page_size
        )));
    }

    let items: Vec<Record> = sorted
        .iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(|r| (*r).clone())
        .collect();

    Ok(PageResult::new(items, sorted.len(), page, page_size))
}
