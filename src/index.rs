//! Country index parsing and display ordering.

use crate::slug::is_combining_mark;
use serde_json::Value;
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

/// Primary collation key: case- and accent-insensitive.
fn collation_key(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Swap letter case so that lowercase sorts ahead of uppercase on ties.
fn case_inverted(s: &str) -> String {
    s.chars()
        .flat_map(|c| {
            if c.is_lowercase() {
                c.to_uppercase().collect::<Vec<_>>()
            } else {
                c.to_lowercase().collect::<Vec<_>>()
            }
        })
        .collect()
}

/// Locale-style comparison: folded keys first; ties put unaccented before
/// accented and lowercase before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| case_inverted(a).cmp(&case_inverted(b)))
}

pub fn locale_sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| locale_cmp(a, b));
    names
}

fn entry_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("name").and_then(entry_name_scalar),
        _ => None,
    }
}

fn entry_name_scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Turn an index payload into sorted country names.
///
/// Accepts `["Argentina", ...]` or `[{"name": "Argentina", ...}, ...]`, and
/// mixes of both. Names are trimmed and blanks dropped. Anything that is not
/// an array yields an empty list.
pub fn parse_index(payload: &Value) -> Vec<String> {
    let Some(items) = payload.as_array() else {
        return Vec::new();
    };
    let names = items
        .iter()
        .filter_map(entry_name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    locale_sorted(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_trimmed_and_sorted() {
        let v = json!([" Japan", "France ", "", "   ", "argentina"]);
        assert_eq!(parse_index(&v), vec!["argentina", "France", "Japan"]);
    }

    #[test]
    fn objects_with_name() {
        let v = json!([{"name": "Peru", "count": 4}, {"name": null}, {"title": "x"}, "Chile"]);
        assert_eq!(parse_index(&v), vec!["Chile", "Peru"]);
    }

    #[test]
    fn non_array_is_empty() {
        assert!(parse_index(&json!({"countries": ["France"]})).is_empty());
        assert!(parse_index(&Value::Null).is_empty());
    }

    #[test]
    fn ties_put_lowercase_and_plain_letters_first() {
        let names = vec![
            "Polska".to_string(),
            "Éire".to_string(),
            "polska".to_string(),
            "eire".to_string(),
        ];
        assert_eq!(locale_sorted(names), vec!["eire", "Éire", "polska", "Polska"]);
    }

    #[test]
    fn accents_sort_with_base_letter() {
        let names = vec![
            "Uruguay".to_string(),
            "Österreich".to_string(),
            "Norway".to_string(),
            "Poland".to_string(),
        ];
        assert_eq!(
            locale_sorted(names),
            vec!["Norway", "Österreich", "Poland", "Uruguay"]
        );
    }
}
