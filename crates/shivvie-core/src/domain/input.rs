//! Module input schemas.
//!
//! A module declares its input as a JSON Schema. [`InputSchema`] compiles it
//! once, fills in declared `default`s, validates, and renders a compact
//! structural description of the expected shape for `info`.

use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

/// A compiled input schema. `None` accepts any object.
#[derive(Clone, Default)]
pub struct InputSchema {
    compiled: Option<(Value, Arc<Validator>)>,
}

impl InputSchema {
    /// Schema that accepts any object.
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile a JSON Schema document.
    pub fn new(schema: Value) -> Result<Self, DomainError> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| DomainError::InvalidSchema { reason: e.to_string() })?;
        Ok(Self {
            compiled: Some((schema, Arc::new(validator))),
        })
    }

    pub fn schema(&self) -> Option<&Value> {
        self.compiled.as_ref().map(|(schema, _)| schema)
    }

    /// Apply defaults, then validate.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidInput`] if `raw` is not an object or violates
    /// the schema; `detail` lists every violation with its instance path.
    pub fn validate(&self, module: &str, raw: Value) -> Result<Map<String, Value>, DomainError> {
        let invalid = |detail: String| DomainError::InvalidInput {
            module: module.to_string(),
            detail,
        };

        let mut value = raw;
        if !value.is_object() {
            return Err(invalid(format!(
                "  • (root): expected an object, got {}",
                json_type(&value)
            )));
        }

        if let Some((schema, validator)) = &self.compiled {
            apply_defaults(schema, &mut value);

            let violations: Vec<String> = validator
                .iter_errors(&value)
                .map(|error| {
                    let path = error.instance_path.to_string();
                    let path = if path.is_empty() { "(root)".to_string() } else { path };
                    format!("  • {path}: {error}")
                })
                .collect();

            if !violations.is_empty() {
                return Err(invalid(violations.join("\n")));
            }
        }

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(invalid("  • (root): expected an object".into())),
        }
    }

    /// Structural type of the expected input, e.g.
    /// `{ name: string; license?: string }`.
    pub fn describe(&self) -> String {
        match self.schema() {
            Some(schema) => describe_schema(schema),
            None => ANY_OBJECT.to_string(),
        }
    }
}

impl fmt::Debug for InputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSchema")
            .field("schema", &self.schema())
            .finish()
    }
}

const ANY_OBJECT: &str = "Record<string, unknown>";

fn apply_defaults(schema: &Value, value: &mut Value) {
    match value {
        Value::Object(map) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (key, property) in properties {
                match map.get_mut(key) {
                    Some(existing) => apply_defaults(property, existing),
                    None => {
                        if let Some(default) = property.get("default") {
                            map.insert(key.clone(), default.clone());
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    apply_defaults(item_schema, item);
                }
            }
        }
        _ => {}
    }
}

fn describe_schema(schema: &Value) -> String {
    if let Some(constant) = schema.get("const") {
        return constant.to_string();
    }
    if let Some(variants) = schema.get("enum").and_then(Value::as_array) {
        return join_union(variants.iter().map(Value::to_string));
    }
    for combinator in ["anyOf", "oneOf"] {
        if let Some(options) = schema.get(combinator).and_then(Value::as_array) {
            return join_union(options.iter().map(describe_schema));
        }
    }

    match schema.get("type") {
        Some(Value::String(ty)) => describe_type(ty, schema),
        Some(Value::Array(types)) => join_union(
            types
                .iter()
                .filter_map(Value::as_str)
                .map(|ty| describe_type(ty, schema)),
        ),
        _ if schema.get("properties").is_some() => describe_type("object", schema),
        _ => "unknown".to_string(),
    }
}

fn describe_type(ty: &str, schema: &Value) -> String {
    match ty {
        "integer" | "number" => "number".to_string(),
        "array" => {
            let item = schema
                .get("items")
                .map(describe_schema)
                .unwrap_or_else(|| "unknown".to_string());
            if item.contains(" | ") {
                format!("({item})[]")
            } else {
                format!("{item}[]")
            }
        }
        "object" => describe_object(schema),
        other => other.to_string(),
    }
}

fn describe_object(schema: &Value) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return ANY_OBJECT.to_string();
    };
    if properties.is_empty() {
        return "{}".to_string();
    }

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let fields: Vec<String> = properties
        .iter()
        .map(|(name, property)| {
            let optional = if required.contains(&name.as_str()) { "" } else { "?" };
            format!("{name}{optional}: {}", describe_schema(property))
        })
        .collect();

    format!("{{ {} }}", fields.join("; "))
}

fn join_union(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(" | ")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lib_schema() -> InputSchema {
        InputSchema::new(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string"},
                "license": {"type": "string", "default": "MIT"},
                "crates": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"edition": {"type": "string", "default": "2024"}}
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn missing_required_field_is_invalid_input() {
        let err = lib_schema().validate("lib", json!({})).unwrap_err();
        match err {
            DomainError::InvalidInput { module, detail } => {
                assert_eq!(module, "lib");
                assert!(detail.contains("name"), "{detail}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn defaults_fill_missing_properties_recursively() {
        let input = lib_schema()
            .validate("lib", json!({"name": "demo", "crates": [{}]}))
            .unwrap();
        assert_eq!(input["license"], json!("MIT"));
        assert_eq!(input["crates"][0]["edition"], json!("2024"));
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let input = lib_schema()
            .validate("lib", json!({"name": "demo", "license": "Apache-2.0"}))
            .unwrap();
        assert_eq!(input["license"], json!("Apache-2.0"));
    }

    #[test]
    fn non_object_input_is_rejected_even_without_schema() {
        let err = InputSchema::any().validate("m", json!([1, 2])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { .. }));
        assert!(InputSchema::any().validate("m", json!({"x": 1})).is_ok());
    }

    #[test]
    fn malformed_schema_is_reported() {
        let err = InputSchema::new(json!({"type": "no-such-type"})).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSchema { .. }));
    }

    #[test]
    fn describes_structure() {
        assert_eq!(
            lib_schema().describe(),
            "{ name: string; license?: string; crates?: { edition?: string }[] }"
        );
        let schema = InputSchema::new(json!({
            "type": "object",
            "properties": {
                "style": {"enum": ["lib", "bin"]},
                "port": {"type": ["integer", "null"]}
            }
        }))
        .unwrap();
        assert_eq!(
            schema.describe(),
            r#"{ style?: "lib" | "bin"; port?: number | null }"#
        );
        assert_eq!(InputSchema::any().describe(), "Record<string, unknown>");
    }
}
