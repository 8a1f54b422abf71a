use crate::query::Query;
use crate::record::{searchable_text, Record};

/// Records matching every filter and, when a search term is set, the term.
/// Relative order is preserved.
pub fn filter<'a>(records: &'a [Record], query: &Query) -> Vec<&'a Record> {
    let term = query.search_term.to_lowercase();
    records
        .iter()
        .filter(|r| matches_filters(r, query) && matches_search(r, &term, &query.search_fields))
        .collect()
}

fn matches_filters(record: &Record, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|(field, predicate)| predicate.matches(record.get(field)))
}

fn matches_search(record: &Record, term: &str, fields: &[String]) -> bool {
    if term.is_empty() {
        return true;
    }
    fields.iter().any(|field| {
        record
            .get(field)
            .and_then(searchable_text)
            .map_or(false, |text| text.to_lowercase().contains(term))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use serde_json::json;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "Alpha Invoice").with("state", "done"),
            Record::new().with("id", 2).with("name", "Beta").with("description", "invoice copy"),
            Record::new().with("id", 3).with("state", "draft"),
            Record::new().with("id", 4).with("name", "Gamma").with("state", "done"),
        ]
    }

    fn ids(matched: &[&Record]) -> Vec<i64> {
        matched
            .iter()
            .map(|r| r.get("id").and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_query_keeps_everything_in_order() {
        let rs = records();
        let q = Query::default();
        assert_eq!(ids(&filter(&rs, &q)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let rs = records();
        let q = Query::default().with_search("INVOICE");
        assert_eq!(ids(&filter(&rs, &q)), vec![1, 2]);
    }

    #[test]
    fn test_search_and_filters_both_apply() {
        let rs = records();
        let q = Query::default()
            .with_search("a")
            .with_filter("state", Predicate::Eq(json!("done")));
        assert_eq!(ids(&filter(&rs, &q)), vec![1, 4]);
    }

    #[test]
    fn test_missing_search_fields_never_match() {
        let rs = records();
        let q = Query::default().with_search("x").with_search_fields(["nope"]);
        assert!(filter(&rs, &q).is_empty());
        let q = Query::default().with_search("a").with_search_fields(Vec::<String>::new());
        assert!(filter(&rs, &q).is_empty());
    }
}
