use crate::errors::MessageResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nesting depth after which referenced objects are no longer expanded
const MAX_DEPTH: usize = 8;

/// Describes the structured output a model is asked to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestModel {
    name: String,
    schema: Value,
}

impl RequestModel {
    pub fn of<T: JsonSchema>() -> MessageResult<Self> {
        let root = schemars::schema_for!(T);
        Ok(RequestModel {
            name: T::schema_name(),
            schema: serde_json::to_value(root)?,
        })
    }

    /// Describe the type of an already-built value
    pub fn from_instance<T: JsonSchema>(_instance: &T) -> MessageResult<Self> {
        Self::of::<T>()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn json_schema(&self) -> &Value {
        &self.schema
    }

    /// Flatten the schema into field name -> spec.
    ///
    /// Scalars map to their JSON type name, referenced objects to a nested
    /// breakdown, and arrays to a one-element array holding the item spec.
    pub fn break_down(&self) -> Map<String, Value> {
        break_down_object(&self.schema, &self.schema, 0)
    }
}

fn break_down_object(schema: &Value, root: &Value, depth: usize) -> Map<String, Value> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| (name.clone(), describe(property, root, depth)))
                .collect()
        })
        .unwrap_or_default()
}

fn describe(property: &Value, root: &Value, depth: usize) -> Value {
    let property = resolve(property, root);

    if property.get("properties").is_some() {
        if depth >= MAX_DEPTH {
            return Value::String("object".to_string());
        }
        return Value::Object(break_down_object(property, root, depth + 1));
    }

    match type_name(property).as_deref() {
        Some("array") => {
            let item = property
                .get("items")
                .map(|items| describe(items, root, depth))
                .unwrap_or_else(|| Value::String("any".to_string()));
            Value::Array(vec![item])
        }
        Some(name) => Value::String(name.to_string()),
        None => Value::String("any".to_string()),
    }
}

// Follow `$ref`s and single-choice combinators down to a concrete schema.
fn resolve<'a>(schema: &'a Value, root: &'a Value) -> &'a Value {
    let mut current = schema;
    for _ in 0..MAX_DEPTH {
        if let Some(target) = current
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| reference.strip_prefix('#'))
            .and_then(|pointer| root.pointer(pointer))
        {
            current = target;
            continue;
        }

        let variant = ["allOf", "anyOf", "oneOf"]
            .iter()
            .filter_map(|key| current.get(*key).and_then(Value::as_array))
            .flatten()
            .find(|candidate| type_name(candidate).as_deref() != Some("null"));
        match variant {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

fn type_name(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(name) => Some(name.clone()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null")
            .map(str::to_string),
        _ => None,
    }
}
