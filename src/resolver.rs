//! Schema resolution - the data-dependent rewrite driver.
//!
//! One call inlines `$ref`s, applies every `if`/`then`/`else` clause
//! depth-first against the data record until none remain, and finally grows
//! synthesized nodes for undeclared data. The output schema is a pure
//! function of (schema, data): no global state, no mutation of the inputs.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::conditions::clause_matches;
use crate::merge::merge_patch;
use crate::refs::resolve_refs;
use crate::synth::append_undeclared;
use crate::types::{ResolveOptions, CRF_ANNOTATIONS, MAX_DEPTH};

/// A default value the caller should write into the data record.
///
/// Replaces the source system's in-place record mutation: merges of hidden
/// or read-only properties with defaults used to write straight into the
/// form data. The engine now reports them and stays referentially
/// transparent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPatch {
    /// JSON-Pointer-style path of the property (e.g. `/tumor/size`).
    pub path: String,
    /// The default to inject.
    pub value: Value,
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Fully dereferenced, conditionally resolved, data-extended schema.
    /// Contains no `$ref`, `if`, `then`, or `else` anywhere.
    pub schema: Value,
    /// Defaults to inject into the data record (see [`DataPatch`]).
    pub data_patches: Vec<DataPatch>,
    /// Structural authoring problems encountered along the way (dangling
    /// refs, missing `$defs`). Never fatal.
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ResolveCtx {
    pub data_patches: Vec<DataPatch>,
    pub warnings: Vec<String>,
}

/// Resolve a schema against a data record.
///
/// Shape mismatches between schema and data never fail: dangling refs become
/// permissive empty nodes, unmatched conditions fall to their `else` branch,
/// and data with no declared schema is synthesized read-only (unless
/// [`ResolveOptions::append_undeclared`] is off).
pub fn resolve(schema: &Value, data: &Value, options: &ResolveOptions) -> Resolution {
    let (mut schema, warnings) = resolve_refs(schema);
    let mut ctx = ResolveCtx {
        warnings,
        ..ResolveCtx::default()
    };

    // Renderers downstream expect an object schema to declare properties.
    if let Some(map) = schema.as_object_mut() {
        if !map.contains_key("properties") {
            map.insert("properties".to_string(), Value::Object(Map::new()));
        }
    }

    apply_conditionals(&mut schema, data, "", MAX_DEPTH, &mut ctx);

    if options.append_undeclared {
        append_undeclared(&mut schema, data);
    }

    Resolution {
        schema,
        data_patches: ctx.data_patches,
        warnings: ctx.warnings,
    }
}

/// One extracted conditional clause.
struct Clause {
    if_schema: Value,
    then: Option<Value>,
    els: Option<Value>,
}

/// Apply `if`/`then`/`else` clauses depth-first until the node carries none.
///
/// Clauses live either directly on the node or wrapped in `allOf`; merged
/// branches may introduce further clauses, so evaluation loops to a fixpoint
/// at each node (bounded by the depth guard) before descending into
/// `properties`.
pub(crate) fn apply_conditionals(
    node: &mut Value,
    data: &Value,
    path: &str,
    depth: usize,
    ctx: &mut ResolveCtx,
) {
    if depth == 0 || !node.is_object() {
        return;
    }

    let mut kept_all_of: Vec<Value> = Vec::new();

    for _ in 0..MAX_DEPTH {
        let clauses = extract_clauses(node, &mut kept_all_of);
        if clauses.is_empty() {
            break;
        }
        for clause in clauses {
            // An if with neither branch has nothing to apply.
            if clause.then.is_none() && clause.els.is_none() {
                continue;
            }
            let branch = if clause_matches(&clause.if_schema, node, data) {
                clause.then
            } else {
                clause.els
            };
            if let Some(patch) = branch {
                merge_patch(node, &patch, data, path, depth - 1, ctx);
            }
        }
    }

    // Non-conditional allOf members carry no data-dependent semantics here;
    // they are preserved untouched.
    if !kept_all_of.is_empty() {
        if let Some(map) = node.as_object_mut() {
            map.insert("allOf".to_string(), Value::Array(kept_all_of));
        }
    }

    let Some(props) = node.get_mut("properties").and_then(|p| p.as_object_mut()) else {
        return;
    };
    for (name, child) in props.iter_mut() {
        let slice = data.get(name).cloned().unwrap_or(Value::Null);
        let child_path = format!("{}/{}", path, name);
        apply_conditionals(child, &slice, &child_path, depth - 1, ctx);
    }
}

/// Pull every conditional clause off the node, leaving none behind.
fn extract_clauses(node: &mut Value, kept_all_of: &mut Vec<Value>) -> Vec<Clause> {
    let Some(map) = node.as_object_mut() else {
        return Vec::new();
    };
    let mut clauses = Vec::new();

    if let Some(if_schema) = map.remove("if") {
        clauses.push(Clause {
            if_schema,
            then: map.remove("then"),
            els: map.remove("else"),
        });
    } else {
        // then/else without if are inert leftovers; drop for the invariant.
        map.remove("then");
        map.remove("else");
    }

    if let Some(Value::Array(entries)) = map.remove("allOf") {
        for entry in entries {
            match entry.as_object() {
                Some(entry_map) if entry_map.contains_key("if") => {
                    clauses.push(Clause {
                        if_schema: entry_map.get("if").cloned().unwrap_or(Value::Null),
                        then: entry_map.get("then").cloned(),
                        els: entry_map.get("else").cloned(),
                    });
                }
                _ => kept_all_of.push(entry),
            }
        }
    }

    clauses
}

/// Strip all CRF annotations from a schema.
///
/// Used before handing a resolved schema to a standard JSON Schema
/// validator, which has no business seeing presentation vocabulary.
pub fn strip_annotations(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut result = Map::new();
            for (k, v) in map {
                if !CRF_ANNOTATIONS.contains(&k.as_str()) {
                    result.insert(k.clone(), strip_annotations(v));
                }
            }
            Value::Object(result)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(strip_annotations).collect()),
        other => other.clone(),
    }
}
