//! Flatten a resolved schema/data pair into leaf-field rows.
//!
//! The row list is the downstream tabular contract: one row per leaf field,
//! with its JSON-pointer path, current value, declared type, and editability.
//! Array elements get indexed paths; one item schema serves every element.

use serde::Serialize;
use serde_json::Value;

use crate::types::{json_type_name, SchemaType, MAX_DEPTH};

/// One leaf field of a resolved document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatField {
    /// JSON-pointer path from the document root, e.g. `/lesions/0/site`.
    pub path: String,
    pub value: Value,
    /// Declared schema type when present, else the data value's own type.
    pub kind: String,
    pub editable: bool,
    pub required: bool,
}

/// Walk the schema's declared shape over the data record and collect leaf rows.
pub fn flatten(schema: &Value, data: &Value) -> Vec<FlatField> {
    let mut rows = Vec::new();
    flatten_node(schema, data, "", false, MAX_DEPTH, &mut rows);
    rows
}

fn flatten_node(
    schema: &Value,
    data: &Value,
    path: &str,
    is_required: bool,
    depth: usize,
    rows: &mut Vec<FlatField>,
) {
    if depth == 0 {
        return;
    }

    match SchemaType::of(schema) {
        Some(SchemaType::Object) => {
            let required = required_set(schema);
            if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
                for (name, child) in props {
                    let child_path = format!("{path}/{name}");
                    let slice = data.get(name).unwrap_or(&Value::Null);
                    flatten_node(
                        child,
                        slice,
                        &child_path,
                        required.iter().any(|r| r == name),
                        depth - 1,
                        rows,
                    );
                }
            }
        }
        Some(SchemaType::Array) => {
            let items = schema.get("items");
            let elements = data.as_array();
            match (items, elements) {
                (Some(items), Some(elements))
                    if SchemaType::of(items) == Some(SchemaType::Object) =>
                {
                    for (i, element) in elements.iter().enumerate() {
                        flatten_node(
                            items,
                            element,
                            &format!("{path}/{i}"),
                            false,
                            depth - 1,
                            rows,
                        );
                    }
                }
                _ => rows.push(leaf(schema, data, path, is_required)),
            }
        }
        _ => rows.push(leaf(schema, data, path, is_required)),
    }
}

fn leaf(schema: &Value, data: &Value, path: &str, is_required: bool) -> FlatField {
    let kind = schema
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_else(|| json_type_name(data));
    FlatField {
        path: path.to_string(),
        value: data.clone(),
        kind: kind.to_string(),
        editable: schema.get("readOnly").and_then(Value::as_bool) != Some(true),
        required: is_required,
    }
}

fn required_set(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
