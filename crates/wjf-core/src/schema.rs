use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::document::{self, type_name};
use crate::error::{JsonFileError, Result, SchemaViolation};

fn violation(v: SchemaViolation) -> JsonFileError {
    JsonFileError::Validation(v)
}

fn malformed(why: impl Into<String>) -> JsonFileError {
    violation(SchemaViolation::MalformedSchema(why.into()))
}

fn declared_type<'a>(schema: &'a Map<String, Value>, at: &str) -> Result<Option<&'a str>> {
    match schema.get("type") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(malformed(format!("'type' must be a string{at}"))),
    }
}

/// Check `doc` against `schema`. Checks run root type, then required
/// properties, then property types; the first failure is returned.
pub fn validate(doc: &Value, schema: &Value) -> Result<()> {
    let schema = schema
        .as_object()
        .ok_or_else(|| malformed("schema root must be an object"))?;

    if let Some(expected) = declared_type(schema, "")? {
        let actual = type_name(doc);
        if expected != actual {
            return Err(violation(SchemaViolation::RootType {
                expected: expected.to_string(),
                actual: actual.to_string(),
            }));
        }
    }

    let Some(obj) = doc.as_object() else {
        debug!("document root is not an object, skipping property checks");
        return Ok(());
    };

    if let Some(required) = schema.get("required") {
        let names = required
            .as_array()
            .ok_or_else(|| malformed("'required' must be an array"))?;
        for name in names {
            let name = name
                .as_str()
                .ok_or_else(|| malformed("'required' entries must be strings"))?;
            if !obj.contains_key(name) {
                return Err(violation(SchemaViolation::MissingRequired(name.to_string())));
            }
        }
    }

    if let Some(properties) = schema.get("properties") {
        let properties = properties
            .as_object()
            .ok_or_else(|| malformed("'properties' must be an object"))?;
        for (name, prop_schema) in properties {
            let Some(actual_value) = obj.get(name) else {
                continue;
            };
            let Some(prop_schema) = prop_schema.as_object() else {
                return Err(malformed(format!("schema for property '{name}' must be an object")));
            };
            let Some(expected) = declared_type(prop_schema, &format!(" for property '{name}'"))? else {
                continue;
            };
            let actual = type_name(actual_value);
            let matches = expected == actual || (expected == "integer" && actual == "number");
            if !matches {
                return Err(violation(SchemaViolation::PropertyType {
                    property: name.clone(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                }));
            }
        }
    }

    Ok(())
}

/// Load both files and validate.
pub fn validate_files(file: &Path, schema_file: &Path) -> Result<()> {
    if !schema_file.exists() {
        return Err(JsonFileError::FileNotFound(schema_file.to_path_buf()));
    }
    let doc = document::load(file)?;
    let schema = document::load(schema_file)?;
    validate(&doc, &schema)?;
    info!(file = %file.display(), schema = %schema_file.display(), "JSON schema validation successful");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violation_of(doc: Value, schema: Value) -> SchemaViolation {
        match validate(&doc, &schema) {
            Err(JsonFileError::Validation(v)) => v,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn accepts_matching_document() {
        let schema = json!({
            "type": "object",
            "required": ["name", "port"],
            "properties": {"name": {"type": "string"}, "port": {"type": "integer"}, "tls": {"type": "boolean"}}
        });
        validate(&json!({"name": "svc", "port": 8080}), &schema).unwrap();
    }

    #[test]
    fn root_type_mismatch() {
        let v = violation_of(json!([1]), json!({"type": "object"}));
        assert_eq!(
            v,
            SchemaViolation::RootType {
                expected: "object".into(),
                actual: "array".into()
            }
        );
    }

    #[test]
    fn first_missing_required_is_reported() {
        let v = violation_of(json!({"b": 1}), json!({"required": ["a", "c"]}));
        assert_eq!(v, SchemaViolation::MissingRequired("a".into()));
    }

    #[test]
    fn property_type_mismatch() {
        let v = violation_of(
            json!({"port": "80"}),
            json!({"properties": {"port": {"type": "number"}}}),
        );
        assert!(matches!(v, SchemaViolation::PropertyType { ref property, .. } if property == "port"));
    }

    #[test]
    fn integer_accepts_any_number() {
        let schema = json!({"properties": {"ratio": {"type": "integer"}}});
        validate(&json!({"ratio": 0.5}), &schema).unwrap();
    }

    #[test]
    fn root_type_checked_before_required() {
        let v = violation_of(json!("text"), json!({"type": "object", "required": ["a"]}));
        assert!(matches!(v, SchemaViolation::RootType { .. }));
    }

    #[test]
    fn required_checked_before_property_types() {
        let v = violation_of(
            json!({"a": 1}),
            json!({"required": ["b"], "properties": {"a": {"type": "string"}}}),
        );
        assert_eq!(v, SchemaViolation::MissingRequired("b".into()));
    }

    #[test]
    fn non_object_root_skips_property_rules() {
        validate(&json!([1, 2]), &json!({"required": ["a"], "properties": {"a": {"type": "string"}}})).unwrap();
    }

    #[test]
    fn nested_objects_are_not_descended() {
        let schema = json!({"properties": {"inner": {"type": "object", "required": ["x"]}}});
        validate(&json!({"inner": {}}), &schema).unwrap();
    }

    #[test]
    fn validate_files_loads_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("app.json");
        let schema = dir.path().join("schema.json");
        std::fs::write(&doc, r#"{"name": "svc", "port": 8080}"#).unwrap();
        std::fs::write(&schema, r#"{"type": "object", "required": ["name"]}"#).unwrap();
        validate_files(&doc, &schema).unwrap();

        std::fs::write(&schema, r#"{"required": ["tls"]}"#).unwrap();
        let err = validate_files(&doc, &schema).unwrap_err();
        assert!(matches!(err, JsonFileError::Validation(SchemaViolation::MissingRequired(ref p)) if p == "tls"));

        let missing = dir.path().join("none.json");
        let err = validate_files(&doc, &missing).unwrap_err();
        assert!(matches!(err, JsonFileError::FileNotFound(ref p) if p == &missing));
    }

    #[test]
    fn malformed_schema() {
        let v = violation_of(json!({}), json!({"type": 5}));
        assert!(matches!(v, SchemaViolation::MalformedSchema(_)));
        let v = violation_of(json!({}), json!({"required": "a"}));
        assert!(matches!(v, SchemaViolation::MalformedSchema(_)));
    }
}
