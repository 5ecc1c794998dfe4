use serde_json::{Map, Value};

/// Returns the outermost `{...}` span of a model reply, which drops
/// markdown fences or a stray sentence around the JSON object.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parses a model reply that must be a single JSON object.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, String> {
    let candidate = extract_json(text).unwrap_or(text);
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(err) => Err(format!("invalid JSON: {}", err)),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
