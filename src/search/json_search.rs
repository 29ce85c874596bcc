// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Recursive, path-annotated search over arbitrary JSON documents.
//!
//! # Query Modes
//!
//! ```text
//! aspirin          - plain: key-substring → "key" result, value-substring → "value" result
//! name:aspirin     - key-value: key contains "name" AND value contains "aspirin"
//! ```
//!
//! Matching is case-insensitive. Results are produced depth-first with object
//! keys in document order and array elements by index, so the result list is
//! stable for "N of M" navigation.

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Whether a result matched on the field's key or its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Key,
    Value,
}

/// One match inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Keys and array indices from the root to the matched field
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub kind: MatchKind,
    pub matched_text: String,
    pub full_key: String,
    pub full_value: String,
}

/// Split a `key:value` query at its first colon.
///
/// Both raw sides must be non-empty. The returned parts are trimmed but keep
/// their case.
#[must_use]
pub fn parse_key_value_query(query: &str) -> Option<(&str, &str)> {
    let (key, value) = query.split_once(':')?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.trim(), value.trim()))
}

/// Search `document` for `query`. An empty or whitespace-only query matches nothing.
#[must_use]
pub fn search_json(document: &Value, query: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    if query.trim().is_empty() {
        return results;
    }

    let mut path = Vec::new();
    match parse_key_value_query(query) {
        Some((key, value)) => {
            let matcher = KeyValueMatcher {
                key: key.to_lowercase(),
                value: value.to_lowercase(),
            };
            let mut visit = |field: Field<'_>, at: &[String]| matcher.visit(field, at, &mut results);
            walk(document, &mut path, &mut visit);
        }
        None => {
            // Surrounding spaces are part of the needle
            let needle = query.to_lowercase();
            let mut visit = |field: Field<'_>, at: &[String]| {
                visit_plain(&needle, field, at, &mut results)
            };
            walk(document, &mut path, &mut visit);
        }
    }
    results
}

/// Render a scalar the way the explorer displays it. Containers render empty.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// en-US display format: thousands grouping and at most three fraction digits.
fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return group_integer(&i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return group_integer(&u.to_string());
    }

    let f = n.as_f64().unwrap_or_default();
    let fixed = format!("{:.3}", f);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, ""));
    let frac_part = frac_part.trim_end_matches('0');

    let grouped = group_integer(int_part);
    if frac_part.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, frac_part)
    }
}

fn group_integer(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}", sign, grouped)
}

/// Visit every object field depth-first, recursing into nested containers.
fn walk<F>(node: &Value, path: &mut Vec<String>, visit: &mut F)
where
    F: FnMut(Field<'_>, &[String]),
{
    match node {
        Value::Object(map) => walk_object(map, path, visit),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                walk(item, path, visit);
                path.pop();
            }
        }
        _ => {}
    }
}

fn walk_object<F>(map: &Map<String, Value>, path: &mut Vec<String>, visit: &mut F)
where
    F: FnMut(Field<'_>, &[String]),
{
    for (key, value) in map {
        path.push(key.clone());
        visit(Field { key, value }, path);
        if value.is_object() || value.is_array() {
            walk(value, path, visit);
        }
        path.pop();
    }
}

#[derive(Clone, Copy)]
struct Field<'a> {
    key: &'a str,
    value: &'a Value,
}

struct KeyValueMatcher {
    key: String,
    value: String,
}

impl KeyValueMatcher {
    fn visit(&self, field: Field<'_>, path: &[String], results: &mut Vec<SearchResult>) {
        if !field.key.to_lowercase().contains(&self.key) {
            return;
        }
        let rendered = format_value(field.value);
        if rendered.to_lowercase().contains(&self.value) {
            results.push(SearchResult {
                path: path.to_vec(),
                kind: MatchKind::Key,
                matched_text: format!("{}:{}", field.key, rendered),
                full_key: field.key.to_string(),
                full_value: rendered,
            });
        }
    }
}

fn visit_plain(needle: &str, field: Field<'_>, path: &[String], results: &mut Vec<SearchResult>) {
    let rendered = format_value(field.value);

    if field.key.to_lowercase().contains(needle) {
        results.push(SearchResult {
            path: path.to_vec(),
            kind: MatchKind::Key,
            matched_text: field.key.to_string(),
            full_key: field.key.to_string(),
            full_value: rendered.clone(),
        });
    }

    if rendered.to_lowercase().contains(needle) {
        results.push(SearchResult {
            path: path.to_vec(),
            kind: MatchKind::Value,
            matched_text: rendered.clone(),
            full_key: field.key.to_string(),
            full_value: rendered,
        });
    }
}
