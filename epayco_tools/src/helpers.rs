use serde_json::Value;

/// Renders a scalar JSON value as text. Strings are returned as-is, numbers and booleans are formatted.
/// `null`, empty strings, arrays and objects yield `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Tries each JSON pointer in turn and returns the first one that resolves to non-empty scalar text.
///
/// Gateway and backend payloads move the same datum between the top level and nested envelopes, so callers list
/// every known location in priority order, e.g. `&["/session_id", "/data/sessionId"]`.
pub fn first_text_at(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| value.pointer(p).and_then(scalar_text))
}

/// Like [`first_text_at`] but for integer identifiers, which backends send either as numbers or numeric strings.
pub fn first_i64_at(value: &Value, pointers: &[&str]) -> Option<i64> {
    pointers.iter().find_map(|p| {
        value.pointer(p).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    })
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalar_rendering() {
        assert_eq!(scalar_text(&json!("abc")), Some("abc".to_string()));
        assert_eq!(scalar_text(&json!(12345)), Some("12345".to_string()));
        assert_eq!(scalar_text(&json!("")), None);
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!({"a": 1})), None);
    }

    #[test]
    fn pointer_fallbacks() {
        let v = json!({ "session_id": "", "data": { "sessionId": "s-1", "order_id": "42" } });
        assert_eq!(first_text_at(&v, &["/session_id", "/data/sessionId"]), Some("s-1".to_string()));
        assert_eq!(first_i64_at(&v, &["/order_id", "/data/order_id"]), Some(42));
        assert_eq!(first_text_at(&v, &["/nope"]), None);
    }
}
