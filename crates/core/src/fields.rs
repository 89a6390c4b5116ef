//! Caller-supplied report fields and their display coercion.

use serde_json::{Map, Value};

/// Report fields as sent by the caller: arbitrary keys, loosely typed values.
pub type FieldMap = Map<String, Value>;

/// Coerce a field value to the string placed into the deck.
///
/// Returns `None` for `null`, which callers treat as absent.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Look up `key` and coerce it, treating null and empty strings as absent.
pub fn non_empty(fields: &FieldMap, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(display_value)
        .filter(|s| !s.is_empty())
}

/// Wrap a field name in the placeholder delimiters.
pub fn token(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value_scalars() {
        assert_eq!(display_value(&json!("Acme")), Some("Acme".to_string()));
        assert_eq!(display_value(&json!(42)), Some("42".to_string()));
        assert_eq!(display_value(&json!(3.5)), Some("3.5".to_string()));
        assert_eq!(display_value(&json!(true)), Some("true".to_string()));
        assert_eq!(display_value(&Value::Null), None);
    }

    #[test]
    fn test_display_value_nested_is_compact_json() {
        assert_eq!(
            display_value(&json!({"a": [1, 2]})),
            Some(r#"{"a":[1,2]}"#.to_string())
        );
    }

    #[test]
    fn test_non_empty_skips_blank_strings() {
        let fields = json!({"a": "", "b": null, "c": "x"});
        let fields = fields.as_object().unwrap();
        assert_eq!(non_empty(fields, "a"), None);
        assert_eq!(non_empty(fields, "b"), None);
        assert_eq!(non_empty(fields, "c"), Some("x".to_string()));
        assert_eq!(non_empty(fields, "missing"), None);
    }

    #[test]
    fn test_token() {
        assert_eq!(token("brand_name"), "{{brand_name}}");
        assert_eq!(token("Current Clicks"), "{{Current Clicks}}");
    }
}
