use crate::query::SortOrder;
use crate::record::{parse_timestamp, Record};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparable projection of a field value. Variant order ranks mixed kinds
/// so the comparator stays total; `Null` ranks above everything.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Bool(bool),
    Number(f64),
    Timestamp(i64),
    Text(String),
    Other(String),
    Null,
}

impl SortKey {
    fn of(value: Option<&Value>, date_field: bool) -> Self {
        match value {
            None | Some(Value::Null) => Self::Null,
            // Unset dates come back as `false` from relational backends
            Some(Value::Bool(false)) if date_field => Self::Null,
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Null, Self::Number),
            Some(Value::String(s)) => match parse_timestamp(s) {
                Some(ts) => Self::Timestamp(ts),
                None if date_field && s.trim().is_empty() => Self::Null,
                None => Self::Text(s.clone()),
            },
            // Relational pairs sort by display name
            Some(Value::Array(items)) => match items.as_slice() {
                [_, Value::String(name)] => Self::Text(name.clone()),
                _ => Self::Other(Value::Array(items.clone()).to_string()),
            },
            Some(other) => Self::Other(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Number(_) => 1,
            Self::Timestamp(_) => 2,
            Self::Text(_) => 3,
            Self::Other(_) => 4,
            Self::Null => 5,
        }
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) | (Self::Other(a), Self::Other(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Stable sort on `sort_by`. Nulls are larger than any value, so they trail an
/// ascending sort and lead a descending one. Descending mirrors the comparator
/// rather than reversing output, so ties keep their original order.
pub fn sort<'a>(matched: Vec<&'a Record>, sort_by: &str, order: SortOrder) -> Vec<&'a Record> {
    let date_field = sort_by.to_lowercase().contains("date");
    let mut keyed: Vec<(SortKey, &'a Record)> = matched
        .into_iter()
        .map(|r| (SortKey::of(r.get(sort_by), date_field), r))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match order {
        SortOrder::Ascending => a.natural_cmp(b),
        SortOrder::Descending => b.natural_cmp(a),
    });

    keyed.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(sorted: &[&Record]) -> Vec<i64> {
        sorted
            .iter()
            .map(|r| r.get("id").and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    #[test]
    fn test_numbers_ascending_and_descending() {
        let rs = vec![
            Record::new().with("id", 1).with("amount", 30),
            Record::new().with("id", 2).with("amount", 10.5),
            Record::new().with("id", 3).with("amount", 20),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs.clone(), "amount", SortOrder::Ascending)), vec![2, 3, 1]);
        assert_eq!(ids(&sort(refs, "amount", SortOrder::Descending)), vec![1, 3, 2]);
    }

    #[test]
    fn test_dates_compare_as_timestamps() {
        let rs = vec![
            Record::new().with("id", 1).with("date", "2024-03-01"),
            Record::new().with("id", 2).with("date", "2023-12-31 23:59:59"),
            Record::new().with("id", 3).with("date", "2024-01-15T08:00:00+02:00"),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs, "date", SortOrder::Ascending)), vec![2, 3, 1]);
    }

    #[test]
    fn test_nulls_trail_ascending_lead_descending() {
        let rs = vec![
            Record::new().with("id", 1).with("date", Value::Null),
            Record::new().with("id", 2).with("date", "2024-01-02"),
            Record::new().with("id", 3),
            Record::new().with("id", 4).with("date", "2024-01-01"),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs.clone(), "date", SortOrder::Ascending)), vec![4, 2, 1, 3]);
        assert_eq!(ids(&sort(refs, "date", SortOrder::Descending)), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_false_in_date_field_is_null() {
        let rs = vec![
            Record::new().with("id", 1).with("date_due", false),
            Record::new().with("id", 2).with("date_due", "2024-01-01"),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs, "date_due", SortOrder::Ascending)), vec![2, 1]);
    }

    #[test]
    fn test_stable_for_ties_both_directions() {
        let rs = vec![
            Record::new().with("id", 1).with("state", "done"),
            Record::new().with("id", 2).with("state", "draft"),
            Record::new().with("id", 3).with("state", "done"),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs.clone(), "state", SortOrder::Ascending)), vec![1, 3, 2]);
        assert_eq!(ids(&sort(refs, "state", SortOrder::Descending)), vec![2, 1, 3]);
    }

    #[test]
    fn test_absent_field_keeps_original_order() {
        let rs = vec![
            Record::new().with("id", 3),
            Record::new().with("id", 1),
            Record::new().with("id", 2),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs.clone(), "missing", SortOrder::Ascending)), vec![3, 1, 2]);
        assert_eq!(ids(&sort(refs, "missing", SortOrder::Descending)), vec![3, 1, 2]);
    }

    #[test]
    fn test_relational_pairs_sort_by_name() {
        let rs = vec![
            Record::new().with("id", 1).with("partner_id", json!([9, "Zeta"])),
            Record::new().with("id", 2).with("partner_id", json!([4, "Acme"])),
        ];
        let refs: Vec<&Record> = rs.iter().collect();
        assert_eq!(ids(&sort(refs, "partner_id", SortOrder::Ascending)), vec![2, 1]);
    }
}
