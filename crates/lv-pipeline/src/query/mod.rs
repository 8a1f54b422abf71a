//! # List Queries
//!
//! The user-controlled filter/sort/page state, and the predicate
//! language used for per-field filters. A query is a plain value: every
//! change produces a new `Query`, and [`crate::reload::plan_reload`] decides
//! what the change means for the host.

pub mod parser;

use crate::error::{PipelineError, Result};
use crate::record::{searchable_text, value_timestamp, value_to_f64, value_to_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A test applied to a single field value. Absent fields are tested as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Case-insensitive substring.
    Contains(String),
    StartsWith(String),
    In(Vec<Value>),
    /// Field is present and not null.
    IsSet,
    /// Every inner predicate holds; used for ranges on one field.
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let v = value.unwrap_or(&Value::Null);
        match self {
            Self::Eq(b) => values_equal(v, b),
            Self::Neq(b) => !values_equal(v, b),
            Self::Gt(b) => compare(v, b) == Some(Ordering::Greater),
            Self::Gte(b) => matches!(compare(v, b), Some(Ordering::Greater | Ordering::Equal)),
            Self::Lt(b) => compare(v, b) == Some(Ordering::Less),
            Self::Lte(b) => matches!(compare(v, b), Some(Ordering::Less | Ordering::Equal)),
            Self::Contains(needle) => searchable_text(v)
                .map_or(false, |t| t.to_lowercase().contains(&needle.to_lowercase())),
            Self::StartsWith(prefix) => {
                searchable_text(v).map_or(false, |t| t.starts_with(prefix.as_str()))
            }
            Self::In(values) => values.iter().any(|b| values_equal(v, b)),
            Self::IsSet => !v.is_null(),
            Self::All(inner) => inner.iter().all(|p| p.matches(value)),
        }
    }

    /// Operator name as used in remote filter expressions.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Eq(_) => "=",
            Self::Neq(_) => "!=",
            Self::Gt(_) => ">",
            Self::Gte(_) => ">=",
            Self::Lt(_) => "<",
            Self::Lte(_) => "<=",
            Self::Contains(_) => "ilike",
            Self::StartsWith(_) => "=like",
            Self::In(_) => "in",
            Self::IsSet => "!=",
            Self::All(_) => "&",
        }
    }
}

// Relational pairs compare by their id.
fn key_of(v: &Value) -> &Value {
    match v {
        Value::Array(items) if items.len() == 2 => &items[0],
        other => other,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    let a = key_of(a);
    if a.is_null() || b.is_null() {
        return a.is_null() && b.is_null();
    }
    // Numeric equality only when one side is a number; two strings compare as text
    if a.is_number() || b.is_number() {
        if let (Some(an), Some(bn)) = (value_to_f64(a), value_to_f64(b)) {
            return (an - bn).abs() < f64::EPSILON;
        }
    }
    value_to_string(a) == value_to_string(b)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let a = key_of(a);
    if let (Some(at), Some(bt)) = (value_timestamp(a), value_timestamp(b)) {
        return Some(at.cmp(&bt));
    }
    if let (Some(an), Some(bn)) = (value_to_f64(a), value_to_f64(b)) {
        return an.partial_cmp(&bn);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// An immutable list-view query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    #[serde(default)]
    pub search_term: String,
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, Predicate>,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_search_fields() -> Vec<String> {
    vec!["name".into(), "description".into()]
}
fn default_sort_by() -> String {
    "id".into()
}
fn default_page() -> usize {
    1
}
fn default_page_size() -> usize {
    10
}

impl Default for Query {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            search_fields: default_search_fields(),
            filters: BTreeMap::new(),
            sort_by: default_sort_by(),
            sort_order: SortOrder::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl Query {
    /// Reject queries the pipeline cannot evaluate. Clamping is the caller's job.
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(PipelineError::InvalidQuery("page must be >= 1".into()));
        }
        if self.page_size == 0 {
            return Err(PipelineError::InvalidQuery("page_size must be >= 1".into()));
        }
        Ok(())
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a filter; a second predicate on the same field narrows the first.
    pub fn with_filter(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        let field = field.into();
        let combined = match self.filters.remove(&field) {
            None => predicate,
            Some(Predicate::All(mut inner)) => {
                inner.push(predicate);
                Predicate::All(inner)
            }
            Some(existing) => Predicate::All(vec![existing, predicate]),
        };
        self.filters.insert(field, combined);
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = field.into();
        self.sort_order = order;
        self
    }

    pub fn at_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Clicking the current sort column flips direction; a new column starts descending.
    pub fn toggle_sort(mut self, field: &str) -> Self {
        if self.sort_by == field {
            self.sort_order = self.sort_order.flipped();
        } else {
            self.sort_by = field.to_string();
            self.sort_order = SortOrder::Descending;
        }
        self
    }

    pub fn next_page(mut self, total_pages: usize) -> Self {
        if self.page < total_pages {
            self.page += 1;
        }
        self
    }

    pub fn prev_page(mut self) -> Self {
        if self.page > 1 {
            self.page -= 1;
        }
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self.page = 1;
        self
    }

    pub fn clear_filters(mut self) -> Self {
        self.search_term.clear();
        self.filters.clear();
        self
    }
}
