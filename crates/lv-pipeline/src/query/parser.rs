//! # Query DSL Parser
//!
//! Parses a keyword query string into a structured [`Query`].
//!
//! Syntax:
//! ```text
//! SEARCH "acme" IN name, description WHERE state = "done" AND amount > 100 ORDER BY date DESC PAGE 2 SIZE 10
//! ```
//!
//! Every clause is optional. Clauses that are omitted keep the value of the
//! base query passed to [`parse_with`].

use super::{Predicate, Query, SortOrder};
use crate::error::{PipelineError, Result};
use serde_json::Value;

const CLAUSES: [&str; 5] = ["SEARCH ", "WHERE ", "ORDER BY ", "PAGE ", "SIZE "];

/// Parse a raw query string on top of [`Query::default`].
pub fn parse(input: &str) -> Result<Query> {
    parse_with(input, Query::default())
}

/// Parse a raw query string, keeping `base` for every clause not present.
pub fn parse_with(input: &str, base: Query) -> Result<Query> {
    let input = input.trim();
    let masked = mask(input);
    let mut query = base;

    if let Some(body) = clause(input, &masked, "SEARCH ") {
        let (term, fields) = parse_search(body)?;
        query.search_term = term;
        if let Some(fields) = fields {
            query.search_fields = fields;
        }
    }

    if let Some(body) = clause(input, &masked, "WHERE ") {
        query.filters.clear();
        for (field, predicate) in parse_conditions(body)? {
            query = query.with_filter(field, predicate);
        }
    }

    if let Some(body) = clause(input, &masked, "ORDER BY ") {
        let mut words = body.split_whitespace();
        let field = words
            .next()
            .ok_or_else(|| PipelineError::Parse("ORDER BY needs a field".into()))?;
        let order = match words.next().map(|w| w.to_ascii_uppercase()) {
            None => SortOrder::Ascending,
            Some(w) if w == "ASC" => SortOrder::Ascending,
            Some(w) if w == "DESC" => SortOrder::Descending,
            Some(w) => return Err(PipelineError::Parse(format!("Unknown sort order '{}'", w))),
        };
        query.sort_by = field.to_string();
        query.sort_order = order;
    }

    if let Some(body) = clause(input, &masked, "PAGE ") {
        query.page = parse_count("PAGE", body)?;
    }

    if let Some(body) = clause(input, &masked, "SIZE ") {
        query.page_size = parse_count("SIZE", body)?;
    }

    Ok(query)
}

/// Upper-cases ASCII outside quotes and blanks quoted text, keeping byte offsets.
fn mask(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut quote: Option<u8> = None;
    for &b in input.as_bytes() {
        match quote {
            Some(q) if b == q => {
                quote = None;
                out.push(b);
            }
            Some(_) => out.push(b'_'),
            None if b == b'"' || b == b'\'' => {
                quote = Some(b);
                out.push(b);
            }
            None => out.push(b.to_ascii_uppercase()),
        }
    }
    out
}

fn find_keyword(masked: &[u8], keyword: &str) -> Option<usize> {
    let kw = keyword.as_bytes();
    (0..=masked.len()).find(|&i| {
        masked[i..].starts_with(kw) && (i == 0 || masked[i - 1].is_ascii_whitespace())
    })
}

fn clause<'a>(input: &'a str, masked: &[u8], keyword: &str) -> Option<&'a str> {
    let start = find_keyword(masked, keyword)? + keyword.len();
    let rest = &masked[start..];
    let end = CLAUSES
        .iter()
        .filter_map(|kw| find_keyword(rest, kw))
        .min()
        .map_or(input.len(), |pos| start + pos);
    Some(input[start..end].trim())
}

fn parse_search(body: &str) -> Result<(String, Option<Vec<String>>)> {
    let (term, rest) = match body.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let close = body[1..]
                .find(q)
                .ok_or_else(|| PipelineError::Parse("Unterminated search term".into()))?;
            (&body[1..1 + close], &body[close + 2..])
        }
        _ => match body.find(char::is_whitespace) {
            Some(i) => (&body[..i], &body[i..]),
            None => (body, ""),
        },
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Ok((term.to_string(), None));
    }
    if !rest.get(..3).map_or(false, |p| p.eq_ignore_ascii_case("IN ")) {
        return Err(PipelineError::Parse(format!(
            "Unexpected text after search term: '{}'",
            rest
        )));
    }
    let fields = rest[3..]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok((term.to_string(), Some(fields)))
}

fn parse_count(keyword: &str, body: &str) -> Result<usize> {
    body.parse::<usize>()
        .map_err(|_| PipelineError::Parse(format!("{} expects a number, got '{}'", keyword, body)))
}

fn parse_conditions(s: &str) -> Result<Vec<(String, Predicate)>> {
    let mut conditions = Vec::new();

    for part in split_and(s) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        conditions.push(parse_condition(part)?);
    }

    Ok(conditions)
}

fn parse_condition(part: &str) -> Result<(String, Predicate)> {
    let masked = mask(part);
    let find = |pat: &str| {
        let pat = pat.as_bytes();
        (0..=masked.len()).find(|&i| masked[i..].starts_with(pat))
    };

    if masked.ends_with(b" IS SET") {
        let field = part[..part.len() - 7].trim();
        return Ok((field.to_string(), Predicate::IsSet));
    }

    // Word operators first, then symbols in order of specificity
    let (field, predicate) = if let Some(pos) = find(" CONTAINS ") {
        let value = value_text(&part[pos + 10..]);
        (&part[..pos], Predicate::Contains(value))
    } else if let Some(pos) = find(" STARTSWITH ") {
        let value = value_text(&part[pos + 12..]);
        (&part[..pos], Predicate::StartsWith(value))
    } else if let Some(pos) = find(" IN ") {
        (&part[..pos], Predicate::In(parse_list(&part[pos + 4..])?))
    } else if let Some(pos) = find(">=") {
        (&part[..pos], Predicate::Gte(parse_value(&part[pos + 2..])))
    } else if let Some(pos) = find("<=") {
        (&part[..pos], Predicate::Lte(parse_value(&part[pos + 2..])))
    } else if let Some(pos) = find("!=") {
        (&part[..pos], Predicate::Neq(parse_value(&part[pos + 2..])))
    } else if let Some(pos) = find(">") {
        (&part[..pos], Predicate::Gt(parse_value(&part[pos + 1..])))
    } else if let Some(pos) = find("<") {
        (&part[..pos], Predicate::Lt(parse_value(&part[pos + 1..])))
    } else if let Some(pos) = find("=") {
        (&part[..pos], Predicate::Eq(parse_value(&part[pos + 1..])))
    } else {
        return Err(PipelineError::Parse(format!(
            "Cannot parse condition: '{}'",
            part
        )));
    };

    let field = field.trim();
    if field.is_empty() {
        return Err(PipelineError::Parse(format!(
            "Condition without a field: '{}'",
            part
        )));
    }
    Ok((field.to_string(), predicate))
}

fn split_and(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let masked = mask(s);
    let pattern = b" AND ";
    let mut last = 0;
    let mut search_pos = 0;

    while let Some(pos) = (search_pos..=masked.len()).find(|&i| masked[i..].starts_with(pattern)) {
        parts.push(&s[last..pos]);
        last = pos + pattern.len();
        search_pos = last;
    }
    parts.push(&s[last..]);
    parts
}

fn parse_list(s: &str) -> Result<Vec<Value>> {
    let inner = s
        .trim()
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| PipelineError::Parse(format!("IN expects '(a, b, ...)', got '{}'", s)))?;
    Ok(inner
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_value)
        .collect())
}

fn value_text(s: &str) -> String {
    let s = s.trim();
    unquote(s).unwrap_or(s).to_string()
}

fn unquote(s: &str) -> Option<&str> {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
}

fn parse_value(s: &str) -> Value {
    let s = s.trim();
    if let Some(text) = unquote(s) {
        return Value::String(text.to_string());
    }
    if let Ok(n) = s.parse::<i64>() {
        Value::Number(n.into())
    } else if let Ok(n) = s.parse::<f64>() {
        serde_json::json!(n)
    } else if s == "true" {
        Value::Bool(true)
    } else if s == "false" {
        Value::Bool(false)
    } else if s == "null" {
        Value::Null
    } else {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_query() {
        let q = parse("SEARCH \"acme\" WHERE amount > 100 ORDER BY date DESC PAGE 2 SIZE 5").unwrap();
        assert_eq!(q.search_term, "acme");
        assert_eq!(q.search_fields, vec!["name", "description"]);
        assert_eq!(q.filters["amount"], Predicate::Gt(json!(100)));
        assert_eq!(q.sort_by, "date");
        assert_eq!(q.sort_order, SortOrder::Descending);
        assert_eq!((q.page, q.page_size), (2, 5));
    }

    #[test]
    fn test_search_fields() {
        let q = parse("SEARCH inv IN name, ref").unwrap();
        assert_eq!(q.search_term, "inv");
        assert_eq!(q.search_fields, vec!["name", "ref"]);
    }

    #[test]
    fn test_keywords_inside_quotes_are_text() {
        let q = parse("SEARCH \"page where order by\" WHERE note = \"a AND b\"").unwrap();
        assert_eq!(q.search_term, "page where order by");
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters["note"], Predicate::Eq(json!("a AND b")));
    }

    #[test]
    fn test_complex_where() {
        let q = parse(
            "WHERE state IN (\"draft\", \"done\") AND partner_id IS SET AND name CONTAINS \"x=y\" AND date >= \"2024-01-01\" AND date <= \"2024-01-31\"",
        )
        .unwrap();
        assert_eq!(
            q.filters["state"],
            Predicate::In(vec![json!("draft"), json!("done")])
        );
        assert_eq!(q.filters["partner_id"], Predicate::IsSet);
        assert_eq!(q.filters["name"], Predicate::Contains("x=y".into()));
        assert!(matches!(&q.filters["date"], Predicate::All(inner) if inner.len() == 2));
    }

    #[test]
    fn test_quoted_numbers_stay_strings() {
        let q = parse("WHERE code = \"007\" AND qty != 3").unwrap();
        assert_eq!(q.filters["code"], Predicate::Eq(json!("007")));
        assert_eq!(q.filters["qty"], Predicate::Neq(json!(3)));
        assert!(q.filters["code"].matches(Some(&json!("007"))));
        assert!(!q.filters["code"].matches(Some(&json!("7"))));
    }

    #[test]
    fn test_parse_with_base_keeps_unset_clauses() {
        let base = Query::default()
            .sorted_by("date", SortOrder::Descending)
            .with_page_size(12);
        let q = parse_with("SEARCH foo", base).unwrap();
        assert_eq!(q.sort_by, "date");
        assert_eq!(q.page_size, 12);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("WHERE amount"), Err(PipelineError::Parse(_))));
        assert!(parse("SEARCH \"open").is_err());
        assert!(parse("PAGE two").is_err());
        assert!(parse("ORDER BY date SIDEWAYS").is_err());
        assert!(parse("WHERE = 3").is_err());
    }
}
