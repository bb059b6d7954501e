//! `$ref` inlining against the `$defs` table, plus the small
//! normalizations that ride along on the same walk.
//!
//! A dangling pointer degrades to an empty node and a warning; the field
//! becomes permissive and read-only downstream instead of failing the
//! whole resolution.

use serde_json::{Map, Value};

use crate::types::{ANN_LISTTYPE, MAX_DEPTH};

/// Inline every `$ref` in `root` against its own `$defs` table.
///
/// Refs-to-refs are supported: `$defs` entries are rewritten first, then the
/// rest of the document, so later substitutions land on already-dereferenced
/// targets. Along the way, a node carrying `oneOf` without an explicit `type`
/// is coerced to `type: "string"` with a combo list hint, and `$comment` /
/// `examples` keys are dropped. The `$defs` table itself is removed from the
/// output.
///
/// Returns the rewritten document plus any structural warnings (dangling
/// refs, a `$ref` with no `$defs` table at all).
pub fn resolve_refs(root: &Value) -> (Value, Vec<String>) {
    let mut warnings = Vec::new();

    let Some(obj) = root.as_object() else {
        return (root.clone(), warnings);
    };

    if !obj.contains_key("$defs") && contains_ref(root, MAX_DEPTH) {
        warnings.push("schema contains $ref but no $defs table".to_string());
    }

    // Rewrite the $defs table first so refs-to-refs resolve in one pass.
    let mut base = root.clone();
    if let Some(defs) = obj.get("$defs").and_then(|d| d.as_object()) {
        let mut rewritten = Map::new();
        for (name, def) in defs {
            rewritten.insert(
                name.clone(),
                resolve_node(root, def, MAX_DEPTH, &mut warnings),
            );
        }
        if let Some(base_obj) = base.as_object_mut() {
            base_obj.insert("$defs".to_string(), Value::Object(rewritten));
        }
    }

    let mut resolved = resolve_node(&base, &base, MAX_DEPTH, &mut warnings);
    if let Some(map) = resolved.as_object_mut() {
        map.remove("$defs");
    }

    (resolved, warnings)
}

fn resolve_node(root: &Value, node: &Value, depth: usize, warnings: &mut Vec<String>) -> Value {
    if depth == 0 {
        return node.clone();
    }

    let Some(map) = node.as_object() else {
        return node.clone();
    };

    // A $ref replaces the whole node; sibling keys carry no meaning here.
    if let Some(ref_val) = map.get("$ref").and_then(|r| r.as_str()) {
        let pointer = ref_val.strip_prefix('#').unwrap_or(ref_val);
        return match root.pointer(pointer) {
            Some(target) => resolve_node(root, target, depth - 1, warnings),
            None => {
                warnings.push(format!("dangling $ref: {}", ref_val));
                Value::Object(Map::new())
            }
        };
    }

    let mut result = Map::new();
    for (key, value) in map {
        match key.as_str() {
            // No resolution semantics; known to confuse consumers.
            "$comment" | "examples" => {}
            "properties" | "$defs" => {
                let resolved = match value.as_object() {
                    Some(props) => {
                        let mut out = Map::new();
                        for (name, child) in props {
                            out.insert(name.clone(), resolve_node(root, child, depth - 1, warnings));
                        }
                        Value::Object(out)
                    }
                    None => value.clone(),
                };
                result.insert(key.clone(), resolved);
            }
            "items" | "if" | "then" | "else" | "additionalProperties" => {
                result.insert(key.clone(), resolve_node(root, value, depth - 1, warnings));
            }
            "allOf" | "anyOf" | "oneOf" => {
                let resolved = match value.as_array() {
                    Some(arr) => Value::Array(
                        arr.iter()
                            .map(|item| resolve_node(root, item, depth - 1, warnings))
                            .collect(),
                    ),
                    None => value.clone(),
                };
                result.insert(key.clone(), resolved);
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }

    // A typeless oneOf renders as a free-text/choice combo, not a variant
    // selector; force string so downstream widget selection engages.
    if result.get("oneOf").map(Value::is_array).unwrap_or(false) && !result.contains_key("type") {
        result.insert("type".to_string(), Value::String("string".to_string()));
        result.insert(
            ANN_LISTTYPE.to_string(),
            Value::String("combo".to_string()),
        );
    }

    Value::Object(result)
}

fn contains_ref(node: &Value, depth: usize) -> bool {
    if depth == 0 {
        return false;
    }
    match node {
        Value::Object(map) => {
            map.contains_key("$ref") || map.values().any(|v| contains_ref(v, depth - 1))
        }
        Value::Array(arr) => arr.iter().any(|v| contains_ref(v, depth - 1)),
        _ => false,
    }
}
