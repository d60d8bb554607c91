//! Strict JSON-schema generation for structured model output.
//!
//! OpenAI-compatible strict mode requires `additionalProperties: false` on
//! every object, every property listed in `required`, and no `$ref`s. The
//! schemars output is rewritten to satisfy all three.

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types a model can be asked to return verbatim.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Schema in the shape strict structured-output endpoints accept.
    fn strict_schema() -> Value {
        let mut value = schema_for!(Self).to_value();

        let definitions = match &mut value {
            Value::Object(map) => map.remove("$defs"),
            _ => None,
        };
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }

        fix_object_schemas(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("$schema");
        }

        value
    }

    /// Name reported alongside the schema.
    fn output_name() -> String {
        <Self as JsonSchema>::schema_name().into_owned()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn fix_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".into(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".into(), Value::Array(required));
                }
            }
            map.values_mut().for_each(fix_object_schemas);
        }
        Value::Array(items) => items.iter_mut().for_each(fix_object_schemas),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(def) = referenced_definition(map, definitions) {
                *value = def;
                inline_refs(value, definitions);
                return;
            }
            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

fn referenced_definition(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let name = map.get("$ref")?.as_str()?.strip_prefix("#/$defs/")?;
    definitions.get(name).cloned()
}
