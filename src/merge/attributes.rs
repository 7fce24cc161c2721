use geojson::JsonObject;
use serde_json::Value;

use crate::schema::CombinedSchema;

/// Attribute values are carried as text so layers that disagree on a
/// field's type can share it. `null` stays empty.
pub fn to_text(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(text) => Value::String(text.clone()),
        other => Value::String(other.to_string()),
    }
}

/// Maps a feature's properties onto the combined schema. Names match exactly
/// (case-sensitive); anything outside the schema is dropped and schema fields
/// the feature lacks are written as `null`.
pub fn project_attributes(properties: Option<&JsonObject>, schema: &CombinedSchema) -> JsonObject {
    schema
        .fields()
        .map(|name| {
            let value = properties
                .and_then(|props| props.get(name))
                .map(to_text)
                .unwrap_or(Value::Null);
            (name.to_string(), value)
        })
        .collect()
}
