//! # Reload Planning
//!
//! Decides what a query change means for the host: whether the page cursor
//! must go back to the first page, and whether results must be recomputed
//! (or re-queried, for a remote paged source).

use crate::query::Query;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReloadPlan {
    pub should_reset_page: bool,
    pub should_refetch: bool,
}

/// Any change to what is matched or how it is ordered resets the page.
/// Any change at all, page included, needs fresh results.
pub fn plan_reload(previous: &Query, next: &Query) -> ReloadPlan {
    let should_reset_page = previous.search_term != next.search_term
        || previous.filters != next.filters
        || previous.sort_by != next.sort_by
        || previous.sort_order != next.sort_order;

    ReloadPlan {
        should_reset_page,
        should_refetch: previous != next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Predicate, SortOrder};
    use serde_json::json;

    #[test]
    fn test_page_change_refetches_without_reset() {
        let a = Query::default();
        let b = a.clone().at_page(2);
        assert_eq!(
            plan_reload(&a, &b),
            ReloadPlan {
                should_reset_page: false,
                should_refetch: true
            }
        );
    }

    #[test]
    fn test_search_change_resets() {
        let a = Query::default().with_search("a");
        let b = Query::default().with_search("ab");
        assert_eq!(
            plan_reload(&a, &b),
            ReloadPlan {
                should_reset_page: true,
                should_refetch: true
            }
        );
    }

    #[test]
    fn test_filter_and_sort_changes_reset() {
        let a = Query::default();
        assert!(plan_reload(&a, &a.clone().with_filter("state", Predicate::IsSet)).should_reset_page);
        assert!(plan_reload(&a, &a.clone().sorted_by("date", SortOrder::Ascending)).should_reset_page);
        assert!(plan_reload(&a, &a.clone().toggle_sort("id")).should_reset_page);
        let b = a.clone().with_filter("amount", Predicate::Gt(json!(1)));
        let c = a.clone().with_filter("amount", Predicate::Gt(json!(2)));
        assert!(plan_reload(&b, &c).should_reset_page);
    }

    #[test]
    fn test_page_size_and_search_fields_refetch_only() {
        let a = Query::default();
        let mut b = a.clone();
        b.page_size = 25;
        assert_eq!(
            plan_reload(&a, &b),
            ReloadPlan {
                should_reset_page: false,
                should_refetch: true
            }
        );
        let c = a.clone().with_search_fields(["ref"]);
        assert!(!plan_reload(&a, &c).should_reset_page);
        assert!(plan_reload(&a, &c).should_refetch);
    }

    #[test]
    fn test_identical_queries_do_nothing() {
        let a = Query::default().with_search("x");
        assert_eq!(
            plan_reload(&a, &a.clone()),
            ReloadPlan {
                should_reset_page: false,
                should_refetch: false
            }
        );
    }
}
