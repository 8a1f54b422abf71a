//! # Remote Domains
//!
//! Translates a [`Query`] into the prefix-notation filter expression and
//! order/limit/offset options understood by a remote paged record source:
//!
//! ```text
//! [["state", "=", "done"], "|", ["name", "ilike", "acme"], ["description", "ilike", "acme"]]
//! ```
//!
//! Adjacent terms are implicitly AND-ed; `"|"` ORs the next two terms.

use crate::query::{Predicate, Query};
use crate::stats::Bucket;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainTerm {
    Operator(&'static str),
    Leaf(String, &'static str, Value),
}

pub type Domain = Vec<DomainTerm>;

/// Paging and ordering passed alongside a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    pub order: Option<String>,
}

/// Domain for `query`, appended to the caller's fixed `base` domain.
pub fn build_domain(query: &Query, base: &[DomainTerm]) -> Domain {
    let mut domain: Domain = base.to_vec();

    for (field, predicate) in &query.filters {
        push_predicate(&mut domain, field, predicate);
    }

    if !query.search_term.is_empty() {
        if query.search_fields.is_empty() {
            // Nothing to search in: match nothing, as the local filter does
            domain.push(DomainTerm::Leaf("id".into(), "in", json!([])));
        } else {
            for _ in 1..query.search_fields.len() {
                domain.push(DomainTerm::Operator("|"));
            }
            for field in &query.search_fields {
                domain.push(DomainTerm::Leaf(
                    field.clone(),
                    "ilike",
                    Value::String(query.search_term.clone()),
                ));
            }
        }
    }

    domain
}

fn push_predicate(domain: &mut Domain, field: &str, predicate: &Predicate) {
    let op = predicate.operator();
    let value = match predicate {
        Predicate::All(inner) => {
            for p in inner {
                push_predicate(domain, field, p);
            }
            return;
        }
        // Remote sources spell "unset" as false
        Predicate::Eq(Value::Null) | Predicate::Neq(Value::Null) => Value::Bool(false),
        Predicate::Eq(v)
        | Predicate::Neq(v)
        | Predicate::Gt(v)
        | Predicate::Gte(v)
        | Predicate::Lt(v)
        | Predicate::Lte(v) => v.clone(),
        Predicate::Contains(s) => Value::String(s.clone()),
        Predicate::StartsWith(s) => Value::String(format!("{}%", s)),
        Predicate::In(values) => Value::Array(values.clone()),
        Predicate::IsSet => Value::Bool(false),
    };
    domain.push(DomainTerm::Leaf(field.to_string(), op, value));
}

/// Drill-down term for a statistics card: records dated on or after the
/// start of `bucket`.
pub fn bucket_domain(bucket: Bucket, date_field: &str, today: NaiveDate) -> DomainTerm {
    DomainTerm::Leaf(
        date_field.to_string(),
        ">=",
        Value::String(bucket.start(today).format("%Y-%m-%d").to_string()),
    )
}

/// Order clause, e.g. `"date desc"`.
pub fn build_order(query: &Query) -> String {
    format!("{} {}", query.sort_by, query.sort_order)
}

/// Limit/offset for the query's current page.
pub fn fetch_options(query: &Query) -> FetchOptions {
    FetchOptions {
        limit: Some(query.page_size),
        offset: query.page.saturating_sub(1).saturating_mul(query.page_size),
        order: Some(build_order(query)),
    }
}
