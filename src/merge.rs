//! Deep merge of a matched `then`/`else` branch into the target schema.
//!
//! Arrays (`enum` included) are replaced wholesale, never unioned. A patched
//! property that carries its own nested `properties` re-enters the full
//! conditional resolution for the matching data slice, so `if`/`then`/`else`
//! composes through arbitrary depth. Defaults of read-only or hidden
//! properties are emitted as [`DataPatch`]es instead of mutating the record.

use serde_json::Value;

use crate::resolver::{apply_conditionals, DataPatch, ResolveCtx};
use crate::types::ANN_HIDDEN;

/// Merge `patch` into `target` for the given data slice.
pub(crate) fn merge_patch(
    target: &mut Value,
    patch: &Value,
    data: &Value,
    path: &str,
    depth: usize,
    ctx: &mut ResolveCtx,
) {
    if depth == 0 {
        return;
    }

    deep_merge(target, patch, depth);

    let Some(patch_props) = patch.get("properties").and_then(|p| p.as_object()) else {
        return;
    };
    let patched: Vec<(String, bool)> = patch_props
        .iter()
        .map(|(name, item)| (name.clone(), item.get("properties").is_some()))
        .collect();

    let Some(target_props) = target
        .get_mut("properties")
        .and_then(|p| p.as_object_mut())
    else {
        return;
    };

    for (name, has_nested) in patched {
        let Some(merged) = target_props.get_mut(&name) else {
            continue;
        };
        let child_path = format!("{}/{}", path, name);
        let slice = data.get(&name).cloned().unwrap_or(Value::Null);

        // Branches can introduce further conditionals on nested objects.
        if has_nested {
            apply_conditionals(merged, &slice, &child_path, depth - 1, ctx);
        }

        // The user can't type into a hidden or read-only field, so a default
        // there must land in the data record; emitted as a patch for the
        // caller to apply.
        let uneditable = truthy(merged.get(ANN_HIDDEN)) || truthy(merged.get("readOnly"));
        if uneditable {
            if let Some(default) = merged.get("default") {
                if injectable(default) {
                    ctx.data_patches.push(DataPatch {
                        path: child_path,
                        value: default.clone(),
                    });
                }
            }
        }
    }
}

/// Key-wise recursive merge; arrays and scalars from the patch replace the
/// target value outright.
fn deep_merge(target: &mut Value, patch: &Value, depth: usize) {
    if depth == 0 {
        return;
    }
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) if existing.is_object() && patch_value.is_object() => {
                        deep_merge(existing, patch_value, depth - 1);
                    }
                    _ => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

/// Booleans always inject; otherwise only values that carry input
/// (no empty strings, zeros, or nulls).
fn injectable(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
