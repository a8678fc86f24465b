use serde_json::Value;

/// First `max` characters of `s`, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Keys from `required` that the JSON object `value` lacks, in `required` order.
/// A non-object is missing every key.
pub fn missing_keys<'a>(value: &Value, required: &[&'a str]) -> Vec<&'a str> {
    let object = value.as_object();
    required
        .iter()
        .copied()
        .filter(|key| !object.is_some_and(|o| o.contains_key(*key)))
        .collect()
}

/// Short name of a JSON value's type, for structure mismatch messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identifier text of a JSON scalar: strings verbatim, numbers formatted.
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
