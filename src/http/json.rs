use std::collections::BTreeMap;

use serde_json::Value;

/// A JSON value as far as the update routes care about it. Nested objects
/// are not part of the flat body format and are kept only as a marker so
/// they can be reported as the wrong type.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<JsonValue>),
    Object,
}

impl JsonValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Integer(i) => Some(*i as f64),
            JsonValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Short name used in "wrong type" reports
    pub fn kind(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "bool",
            JsonValue::Integer(_) => "integer",
            JsonValue::Float(_) => "float",
            JsonValue::Text(_) => "string",
            JsonValue::List(_) => "list",
            JsonValue::Object => "object",
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => JsonValue::Integer(i),
                None => JsonValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => JsonValue::Text(s),
            Value::Array(items) => JsonValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(_) => JsonValue::Object,
        }
    }
}

/// Outcome of looking for a JSON object inside a request.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonBody {
    /// No `{` anywhere in the request
    Absent,
    /// A flat object, keyed by field name
    Fields(BTreeMap<String, JsonValue>),
    /// Braces were found but the text between them is not a JSON object
    Malformed(String),
}

impl JsonBody {
    pub fn is_malformed(&self) -> bool {
        matches!(self, JsonBody::Malformed(_))
    }
}

/// Find the object spanning the first `{` and the last `}` of the request
/// and parse it. A missing or misplaced closing brace is malformed, never a
/// partial map.
pub fn extract_body(request: &str) -> JsonBody {
    let Some(start) = request.find('{') else {
        return JsonBody::Absent;
    };

    let end = match request.rfind('}') {
        Some(end) if end > start => end,
        _ => return JsonBody::Malformed("missing closing brace".to_string()),
    };

    match serde_json::from_str::<serde_json::Map<String, Value>>(&request[start..=end]) {
        Ok(map) => JsonBody::Fields(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        Err(e) => JsonBody::Malformed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flat_object() {
        let request = "POST /update HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"brightness\": 0.5, \"rainbow_enable\": true, \"static_color\": [10, 20, 30]}";
        let JsonBody::Fields(fields) = extract_body(request) else {
            panic!("expected fields");
        };
        assert_eq!(fields["brightness"], JsonValue::Float(0.5));
        assert_eq!(fields["rainbow_enable"], JsonValue::Bool(true));
        assert_eq!(
            fields["static_color"],
            JsonValue::List(vec![
                JsonValue::Integer(10),
                JsonValue::Integer(20),
                JsonValue::Integer(30)
            ])
        );
    }

    #[test]
    fn test_missing_closing_brace() {
        let body = extract_body("POST /update HTTP/1.1\r\n\r\n{\"brightness\": 0.5");
        assert!(body.is_malformed());
    }

    #[test]
    fn test_closing_brace_before_opening() {
        assert!(extract_body("} stray {").is_malformed());
    }

    #[test]
    fn test_no_body() {
        assert_eq!(extract_body("GET / HTTP/1.1\r\n\r\n"), JsonBody::Absent);
    }

    #[test]
    fn test_garbage_between_braces() {
        assert!(extract_body("{not json at all}").is_malformed());
        assert!(extract_body("{\"a\": }").is_malformed());
    }

    #[test]
    fn test_nested_object_is_kept_as_marker() {
        let JsonBody::Fields(fields) = extract_body("{\"a\": {\"b\": 1}, \"n\": null}") else {
            panic!("expected fields");
        };
        assert_eq!(fields["a"], JsonValue::Object);
        assert_eq!(fields["n"], JsonValue::Null);
    }

    #[test]
    fn test_huge_integer_becomes_float() {
        let JsonBody::Fields(fields) = extract_body("{\"speed\": 18446744073709551615}") else {
            panic!("expected fields");
        };
        assert!(matches!(fields["speed"], JsonValue::Float(_)));
    }
}
