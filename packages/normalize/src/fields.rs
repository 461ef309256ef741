//! Alias-tolerant accessors for JSON source objects.

use arrest_leads_extract::{collapse_whitespace, parse_money};
use serde_json::Value;

/// First non-empty value among `keys`, as collapsed text.
///
/// Numbers are rendered without quotes so `{"id": 991}` reads as `"991"`.
#[must_use]
pub fn text(obj: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .map(|value| match value {
            Value::String(s) => collapse_whitespace(s),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Like [`text`], but `None` when every alias is blank.
#[must_use]
pub fn optional_text(obj: &Value, keys: &[&str]) -> Option<String> {
    Some(text(obj, keys)).filter(|s| !s.is_empty())
}

/// A boolean flag, accepting JSON booleans and `"true"`/`"Y"`/`"1"` text.
#[must_use]
pub fn flag(obj: &Value, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "TRUE" | "Y" | "YES" | "1" => Some(true),
            "FALSE" | "N" | "NO" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A non-negative dollar amount from a number or formatted text.
#[must_use]
pub fn money(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|key| obj.get(*key)).find_map(|value| match value {
        Value::Number(n) => n.as_f64().filter(|a| a.is_finite() && *a >= 0.0),
        Value::String(s) => parse_money(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_skips_blank_aliases() {
        let obj = json!({ "name": "  ", "full_name": "SMITH,  JOHN", "id": 42 });
        assert_eq!(text(&obj, &["name", "full_name"]), "SMITH, JOHN");
        assert_eq!(text(&obj, &["missing", "id"]), "42");
        assert_eq!(optional_text(&obj, &["name"]), None);
    }

    #[test]
    fn flag_reads_bools_and_text() {
        let obj = json!({ "a": true, "b": "N", "c": "maybe", "d": 0 });
        assert_eq!(flag(&obj, "a"), Some(true));
        assert_eq!(flag(&obj, "b"), Some(false));
        assert_eq!(flag(&obj, "c"), None);
        assert_eq!(flag(&obj, "d"), Some(false));
        assert_eq!(flag(&obj, "missing"), None);
    }

    #[test]
    fn money_reads_numbers_and_text() {
        let obj = json!({ "n": 2500, "s": "$1,000.50", "neg": -3 });
        assert_eq!(money(&obj, &["n"]), Some(2500.0));
        assert_eq!(money(&obj, &["s"]), Some(1000.5));
        assert_eq!(money(&obj, &["neg"]), None);
        assert_eq!(money(&obj, &["missing"]), None);
    }
}
