//! Schema nodes inferred from data the declared schema didn't anticipate.
//!
//! Live records drift from their schemas between schema versions; rather
//! than dropping such values, the engine grows read-only nodes for them so
//! they stay visible and exportable. Declared nodes are only ever extended,
//! never removed.

use serde_json::{Map, Value};

use crate::types::{
    has_input, ANN_ERROR, ANN_SUBSCHEMA_STYLE, ANN_UNDECLARED, MAX_DEPTH,
};

/// Infer a schema node from a data value.
///
/// Primitives map by type; arrays of objects get one representative item
/// shape from a shallow key union (last writer wins); empty arrays get a
/// string item placeholder. Every synthesized node is read-only, and
/// non-array-item nodes carry the undeclared marker so the hint layer can
/// attach a removal affordance.
pub(crate) fn synthesize(value: &Value, is_array_item: bool, depth: usize) -> Value {
    let mut node = Map::new();

    if depth == 0 {
        node.insert("type".to_string(), Value::String("string".to_string()));
        node.insert("readOnly".to_string(), Value::Bool(true));
        return Value::Object(node);
    }

    match value {
        Value::Number(_) => {
            node.insert("type".to_string(), Value::String("number".to_string()));
        }
        Value::Bool(_) => {
            node.insert("type".to_string(), Value::String("boolean".to_string()));
        }
        Value::Array(elements) => {
            node.insert("type".to_string(), Value::String("array".to_string()));

            let objects: Vec<&Map<String, Value>> =
                elements.iter().filter_map(|e| e.as_object()).collect();
            let items = if !objects.is_empty() {
                // One union shape so every key across the elements renders.
                let mut union = Map::new();
                for obj in &objects {
                    for (k, v) in obj.iter() {
                        union.insert(k.clone(), v.clone());
                    }
                }
                let mut items = synthesize(&Value::Object(union), true, depth - 1);
                if let Some(m) = items.as_object_mut() {
                    m.insert(
                        ANN_SUBSCHEMA_STYLE.to_string(),
                        Value::String("inline".to_string()),
                    );
                }
                items
            } else if let Some(first) = elements.first() {
                synthesize(first, true, depth - 1)
            } else {
                let mut placeholder = Map::new();
                placeholder.insert("type".to_string(), Value::String("string".to_string()));
                Value::Object(placeholder)
            };
            node.insert("items".to_string(), items);
        }
        Value::Object(map) => {
            node.insert("type".to_string(), Value::String("object".to_string()));
            let mut props = Map::new();
            for (name, child) in map {
                if has_input(child) {
                    props.insert(name.clone(), synthesize(child, false, depth - 1));
                }
            }
            node.insert("properties".to_string(), Value::Object(props));
        }
        // Strings, nulls, anything else: free text.
        _ => {
            node.insert("type".to_string(), Value::String("string".to_string()));
        }
    }

    node.insert("readOnly".to_string(), Value::Bool(true));
    if !is_array_item {
        node.insert(ANN_UNDECLARED.to_string(), Value::Bool(true));
    }
    Value::Object(node)
}

/// Attach synthesized nodes for every data key the schema's `properties`
/// don't cover, recursing into declared objects and array item shapes to
/// extend them where the data nests deeper than the declaration.
pub(crate) fn append_undeclared(schema: &mut Value, data: &Value) {
    append_inner(schema, data, MAX_DEPTH);
}

fn append_inner(schema: &mut Value, data: &Value, depth: usize) {
    if depth == 0 {
        return;
    }
    let Some(data_map) = data.as_object() else {
        return;
    };
    if data_map.is_empty() || schema.get("properties").is_none() {
        return;
    }

    // Collected first: marking an array read-only needs a second borrow of
    // the properties map.
    let mut mark_undeclared: Vec<String> = Vec::new();

    {
        let Some(props) = schema
            .get_mut("properties")
            .and_then(|p| p.as_object_mut())
        else {
            return;
        };

        for (name, value) in data_map {
            if let Some(declared) = props.get_mut(name) {
                match value {
                    Value::Object(_) => {
                        append_inner(declared, value, depth - 1);
                    }
                    Value::Array(elements) => {
                        let objects: Vec<&Map<String, Value>> =
                            elements.iter().filter_map(|e| e.as_object()).collect();
                        if objects.is_empty() {
                            continue;
                        }
                        let Some(items) = declared.get_mut("items") else {
                            continue;
                        };
                        let item_props_empty = items
                            .get("properties")
                            .and_then(|p| p.as_object())
                            .map(|p| p.is_empty());

                        let mut union = Map::new();
                        for obj in &objects {
                            for (k, v) in obj.iter() {
                                union.insert(k.clone(), v.clone());
                            }
                        }
                        append_inner(items, &Value::Object(union), depth - 1);

                        // Item shape declared with no properties at all:
                        // everything in it is synthesized, so the array as a
                        // whole is not editable.
                        if item_props_empty == Some(true) {
                            mark_undeclared.push(name.clone());
                        }
                    }
                    _ => {}
                }
            } else {
                // Reserved error channel and inputless values never grow nodes.
                if name == ANN_ERROR {
                    continue;
                }
                if value.is_null() {
                    continue;
                }
                if value.is_object() && !has_input(value) {
                    continue;
                }
                props.insert(name.clone(), synthesize(value, false, depth - 1));
            }
        }
    }

    if let Some(props) = schema
        .get_mut("properties")
        .and_then(|p| p.as_object_mut())
    {
        for name in mark_undeclared {
            if let Some(node) = props.get_mut(&name).and_then(|n| n.as_object_mut()) {
                node.insert("readOnly".to_string(), Value::Bool(true));
                node.insert(ANN_UNDECLARED.to_string(), Value::Bool(true));
            }
        }
    }
}
