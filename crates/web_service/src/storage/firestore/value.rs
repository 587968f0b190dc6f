//! Conversion between plain JSON and Firestore's typed `Value` encoding.
//!
//! ```json
//! {"mapValue": {"fields": {"day": {"integerValue": "1"}}}}
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Encodes a JSON value. Integers become `integerValue` (sent as a string,
/// as the REST API does for int64), other numbers `doubleValue`.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

pub fn encode_timestamp(at: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": at.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

/// Decodes a Firestore value back into plain JSON. Timestamps and references
/// come back as strings.
pub fn decode(value: &Value) -> Result<Value, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a typed value, got {value}"))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("booleanValue is not a bool: {inner}")),
        "integerValue" => decode_integer(inner),
        "doubleValue" => Ok(inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values.iter().map(decode).collect::<Result<_, _>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            _ => Ok(Value::Object(Map::new())),
        },
        other => Err(format!("unsupported value type {other}")),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(key, value)| decode(value).map(|decoded| (key.clone(), decoded)))
        .collect()
}

fn decode_integer(inner: &Value) -> Result<Value, String> {
    let parsed = match inner {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed
        .map(Value::from)
        .ok_or_else(|| format!("integerValue is not an int64: {inner}"))
}
