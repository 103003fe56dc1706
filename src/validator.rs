//! Payload validation against canonical schemas.

use serde_json::{json, Map, Value as JsonValue};

use crate::error::{SchemaError, ValidateError};
use crate::replacer::is_visible;
use crate::schema::Schema;
use crate::state::ReplaceState;
use crate::types::Direction;

/// Validate `content` against `schema` as seen in `direction`.
///
/// Properties invisible in the direction (`readOnly` in requests,
/// `writeOnly` in responses) are not required.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` with one entry per violation.
pub fn validate_content(
    schema: &Schema,
    content: &JsonValue,
    direction: Direction,
) -> Result<(), ValidateError> {
    validate_against_schema(&to_json_schema(schema, direction), content)
}

/// Validate a payload against a JSON Schema document.
pub fn validate_against_schema(schema: &JsonValue, payload: &JsonValue) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

/// Render a canonical schema as JSON Schema.
///
/// `nullable` becomes a `[type, "null"]` union.
pub fn to_json_schema(schema: &Schema, direction: Direction) -> JsonValue {
    let state = ReplaceState::new(direction);
    let mut out = Map::new();

    let ty = schema.schema_type.as_str();
    out.insert(
        "type".into(),
        if schema.nullable {
            json!([ty, "null"])
        } else {
            json!(ty)
        },
    );

    if !schema.properties.is_empty() {
        let properties: Map<String, JsonValue> = schema
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), to_json_schema(prop, direction)))
            .collect();
        out.insert("properties".into(), JsonValue::Object(properties));
    }

    let required: Vec<&String> = schema
        .required
        .iter()
        .filter(|name| {
            schema
                .properties
                .get(name.as_str())
                .map_or(true, |prop| is_visible(prop, &state))
        })
        .collect();
    if !required.is_empty() {
        out.insert("required".into(), json!(required));
    }

    if let Some(items) = &schema.items {
        out.insert("items".into(), to_json_schema(items, direction));
    }
    // A normalized `not` is always an object schema; without required or
    // declared properties it would reject every object.
    if let Some(not) = schema
        .not
        .as_deref()
        .filter(|not| !not.properties.is_empty() || !not.required.is_empty())
    {
        out.insert("not".into(), to_json_schema(not, direction));
    }

    if !schema.enum_values.is_empty() {
        let mut values: Vec<JsonValue> = schema.enum_values.iter().map(|v| v.to_json()).collect();
        if schema.nullable && !values.contains(&JsonValue::Null) {
            values.push(JsonValue::Null);
        }
        out.insert("enum".into(), JsonValue::Array(values));
    }

    if let Some(format) = &schema.format {
        out.insert("format".into(), json!(format));
    }
    if let Some(pattern) = &schema.pattern {
        out.insert("pattern".into(), json!(pattern));
    }

    let numbers = [
        ("minimum", schema.minimum),
        ("maximum", schema.maximum),
        ("exclusiveMinimum", schema.exclusive_minimum),
        ("exclusiveMaximum", schema.exclusive_maximum),
        ("multipleOf", schema.multiple_of),
    ];
    for (key, value) in numbers {
        if let Some(n) = value {
            out.insert(key.into(), json!(n));
        }
    }

    let counts = [
        ("minLength", schema.min_length),
        ("maxLength", schema.max_length),
        ("minItems", schema.min_items),
        ("maxItems", schema.max_items),
        ("minProperties", schema.min_properties),
        ("maxProperties", schema.max_properties),
    ];
    for (key, value) in counts {
        if let Some(n) = value {
            out.insert(key.into(), json!(n));
        }
    }

    JsonValue::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::types::ParseConfig;

    fn pet() -> Schema {
        normalize(
            &json!({
                "type": "object",
                "required": ["id", "name"],
                "properties": {
                    "id": {"type": "integer", "readOnly": true},
                    "name": {"type": "string", "minLength": 1},
                    "tag": {"type": "string", "nullable": true}
                }
            }),
            &json!({}),
            &ParseConfig::new(),
        )
        .unwrap()
    }

    #[test]
    fn valid_payload() {
        let content = json!({"id": 1, "name": "Rex", "tag": null});
        assert!(validate_content(&pet(), &content, Direction::Response).is_ok());
    }

    #[test]
    fn missing_required_field() {
        let err = validate_content(&pet(), &json!({"name": "Rex"}), Direction::Response).unwrap_err();
        match err {
            ValidateError::Invalid { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("id"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn hidden_properties_are_not_required() {
        let content = json!({"name": "Rex"});
        assert!(validate_content(&pet(), &content, Direction::Request).is_ok());
    }

    #[test]
    fn error_paths_point_at_fields() {
        let err = validate_content(&pet(), &json!({"id": 1, "name": ""}), Direction::Response)
            .unwrap_err();
        let ValidateError::Invalid { errors } = err else {
            panic!("expected Invalid");
        };
        assert_eq!(errors[0].path, "/name");
        assert_eq!(ValidateError::Invalid { errors }.exit_code(), 1);
    }

    #[test]
    fn nullable_renders_as_union() {
        let schema = to_json_schema(&pet(), Direction::Response);
        assert_eq!(schema["properties"]["tag"]["type"], json!(["string", "null"]));
        assert_eq!(schema["required"], json!(["id", "name"]));
        assert_eq!(
            to_json_schema(&pet(), Direction::Request)["required"],
            json!(["name"])
        );
    }

    #[test]
    fn unconstrained_not_accepts_objects() {
        let schema = normalize(
            &json!({
                "type": "object",
                "properties": {"a": {"type": "string"}},
                "not": {"type": "string"}
            }),
            &json!({}),
            &ParseConfig::new(),
        )
        .unwrap();

        assert!(to_json_schema(&schema, Direction::Response).get("not").is_none());
        assert!(validate_content(&schema, &json!({"a": "x"}), Direction::Response).is_ok());
    }

    #[test]
    fn not_with_required_still_rejects() {
        let schema = normalize(
            &json!({
                "type": "object",
                "properties": {"a": {"type": "string"}},
                "not": {"required": ["a"]}
            }),
            &json!({}),
            &ParseConfig::new(),
        )
        .unwrap();

        assert!(validate_content(&schema, &json!({}), Direction::Response).is_ok());
        assert!(validate_content(&schema, &json!({"a": "x"}), Direction::Response).is_err());
    }

    #[test]
    fn invalid_schema_is_reported() {
        let err = validate_against_schema(&json!({"type": 12}), &json!({})).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
