//! Output formatting: plain text (human-readable) and JSON.

use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable tables and key-value
    #[default]
    Plain,
    /// JSON (pretty-printed)
    Json,
}

/// Format value as plain text (tables for arrays of objects, key-value for objects).
pub fn format_plain(value: &Value) -> String {
    let mut out = String::new();
    format_plain_impl(value, &mut out, 0);
    out
}

fn format_plain_impl(v: &Value, out: &mut String, indent: usize) {
    let pad = "  ".repeat(indent);
    match v {
        Value::Null => {
            let _ = writeln!(out, "{}not found", pad);
        }
        Value::Array(arr) if arr.is_empty() => {
            let _ = writeln!(out, "{}<empty>", pad);
        }
        Value::Array(arr) => {
            let columns = table_columns(arr);
            if columns.is_empty() {
                for (i, item) in arr.iter().enumerate() {
                    let _ = writeln!(out, "{}[{}]", pad, i + 1);
                    format_plain_impl(item, out, indent + 1);
                }
                return;
            }
            let header = columns
                .iter()
                .map(|c| format!("{:>14}", c))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "{}{}", pad, header);
            let _ = writeln!(out, "{}{}", pad, "-".repeat(header.len().min(80)));
            for row in arr {
                let cells = columns
                    .iter()
                    .map(|c| {
                        let cell = row.get(c).and_then(scalar).unwrap_or_else(|| "-".into());
                        format!("{:>14}", truncate(&cell, 14))
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(out, "{}{}", pad, cells);
            }
        }
        Value::Object(map) => {
            for (k, val) in map {
                match scalar(val) {
                    Some(s) => {
                        let _ = writeln!(out, "{}{}: {}", pad, k, s);
                    }
                    None => {
                        let _ = writeln!(out, "{}{}:", pad, k);
                        format_plain_impl(val, out, indent + 1);
                    }
                }
            }
        }
        scalar_value => {
            let _ = writeln!(out, "{}{}", pad, scalar(scalar_value).unwrap_or_default());
        }
    }
}

/// Scalar columns shared by the first row of an array of objects.
fn table_columns(arr: &[Value]) -> Vec<String> {
    match arr.first() {
        Some(Value::Object(first)) => first
            .iter()
            .filter(|(_, v)| scalar(v).is_some())
            .map(|(k, _)| k.clone())
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max {
        s
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

/// Format value as JSON (pretty).
pub fn format_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_plain_absent() {
        assert!(format_plain(&Value::Null).contains("not found"));
    }

    #[test]
    fn format_plain_empty_array() {
        assert!(format_plain(&json!([])).contains("<empty>"));
    }

    #[test]
    fn format_plain_nested_object() {
        let out = format_plain(&json!({"id": 3, "warehouse": {"name": "snowflake"}}));
        assert!(out.contains("id: 3"));
        assert!(out.contains("warehouse:"));
        assert!(out.contains("  name: snowflake"));
    }

    #[test]
    fn format_plain_table_of_checks() {
        let out = format_plain(&json!([
            {"check_id": 10, "ref": "row_count", "config": {"check": "RowCount"}},
            {"check_id": 11, "ref": "a_very_long_reference_name"}
        ]));
        let mut lines = out.lines();
        let header = lines.next().unwrap();
        assert!(header.contains("check_id"));
        assert!(header.contains("ref"));
        assert!(!header.contains("config"));
        assert!(out.contains("row_count"));
        assert!(out.contains('…'));
    }

    #[test]
    fn format_json_pretty() {
        let v = json!({"ping": "pong"});
        let s = format_json(&v).unwrap();
        assert!(s.contains('\n'));
        assert_eq!(serde_json::from_str::<Value>(&s).unwrap(), v);
    }
}
