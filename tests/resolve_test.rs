//! Integration tests for schema resolution, hint derivation, and flattening.

use serde_json::{json, Value};
use crf_schema::{
    derive_hints, flatten, resolve, strip_annotations, validate, ResolveOptions, ValidateError,
};

fn resolved(schema: &Value, data: &Value) -> Value {
    resolve(schema, data, &ResolveOptions::new()).schema
}

// === Reference Resolution ===

mod refs {
    use super::*;

    fn assert_no_refs(value: &Value) {
        match value {
            Value::Object(map) => {
                assert!(map.get("$ref").is_none(), "found $ref in {:?}", map);
                for v in map.values() {
                    assert_no_refs(v);
                }
            }
            Value::Array(arr) => {
                for v in arr {
                    assert_no_refs(v);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn output_carries_no_refs_or_defs() {
        let schema = json!({
            "type": "object",
            "$defs": {
                "code": { "type": "string", "pattern": "^[A-Z]" },
                "pair": {
                    "type": "object",
                    "properties": {
                        "left": { "$ref": "#/$defs/code" },
                        "right": { "$ref": "#/$defs/code" }
                    }
                }
            },
            "properties": {
                "main": { "$ref": "#/$defs/pair" }
            }
        });
        let out = resolved(&schema, &json!({}));

        assert_no_refs(&out);
        assert!(out.get("$defs").is_none());
        assert_eq!(out["properties"]["main"]["properties"]["left"]["pattern"], "^[A-Z]");
    }

    #[test]
    fn dangling_ref_warns_and_degrades() {
        let schema = json!({
            "type": "object",
            "$defs": {},
            "properties": {
                "x": { "$ref": "#/$defs/missing" }
            }
        });
        let resolution = resolve(&schema, &json!({}), &ResolveOptions::new());
        assert!(!resolution.warnings.is_empty());
        // Degrades to a permissive empty node rather than failing.
        assert!(resolution.schema["properties"]["x"].is_object());
    }

    #[test]
    fn refs_inside_conditional_branches_resolve() {
        let schema = json!({
            "type": "object",
            "$defs": {
                "note": { "type": "string", "crf:ui:textarea": 3 }
            },
            "properties": {
                "flag": { "type": "boolean" },
                "comment": { "type": "string" }
            },
            "if": { "properties": { "flag": { "const": true } } },
            "then": { "properties": { "comment": { "$ref": "#/$defs/note" } } }
        });
        let out = resolved(&schema, &json!({"flag": true}));
        assert_eq!(out["properties"]["comment"]["crf:ui:textarea"], 3);
    }
}

// === Purity ===

mod purity {
    use super::*;

    fn sample() -> (Value, Value) {
        let schema = json!({
            "type": "object",
            "$defs": { "s": { "type": "string" } },
            "properties": {
                "stage": { "$ref": "#/$defs/s" },
                "hidden_code": {
                    "type": "string",
                    "crf:ui:hidden": true,
                    "default": "X1"
                }
            },
            "if": { "properties": { "stage": { "const": "II" } } },
            "then": { "properties": { "stage": { "enum": ["II"] } } }
        });
        let data = json!({"stage": "II", "ghost": true});
        (schema, data)
    }

    #[test]
    fn same_inputs_same_outputs() {
        let (schema, data) = sample();
        let a = resolve(&schema, &data, &ResolveOptions::new());
        let b = resolve(&schema, &data, &ResolveOptions::new());
        assert_eq!(a.schema, b.schema);
        assert_eq!(a.data_patches, b.data_patches);
        assert_eq!(a.warnings, b.warnings);
    }

    #[test]
    fn resolution_is_idempotent() {
        let (schema, data) = sample();
        let once = resolve(&schema, &data, &ResolveOptions::new());
        let twice = resolve(&once.schema, &data, &ResolveOptions::new());
        assert_eq!(once.schema, twice.schema);
    }

    #[test]
    fn inputs_survive_untouched() {
        let (schema, data) = sample();
        let schema_before = schema.clone();
        let data_before = data.clone();
        let _ = resolve(&schema, &data, &ResolveOptions::new());
        assert_eq!(schema, schema_before);
        assert_eq!(data, data_before);
    }

    #[test]
    fn defaults_surface_as_patches_not_mutation() {
        // Defaults become patches only when a matched branch carries them.
        let schema = json!({
            "type": "object",
            "properties": {
                "mode": { "type": "string" },
                "code": { "type": "string" }
            },
            "if": { "properties": { "mode": { "const": "auto" } } },
            "then": {
                "properties": {
                    "code": { "readOnly": true, "default": "A-1" }
                }
            }
        });
        let r = resolve(&schema, &json!({"mode": "auto"}), &ResolveOptions::new());
        let patches: Vec<_> = r
            .data_patches
            .iter()
            .map(|p| (p.path.as_str(), p.value.clone()))
            .collect();
        assert_eq!(patches, vec![("/code", json!("A-1"))]);
    }
}

// === Conditional Application ===

mod conditionals {
    use super::*;

    #[test]
    fn requirement_binds_only_when_matched() {
        let schema = json!({
            "type": "object",
            "properties": {
                "age": { "type": "number" },
                "consent": { "type": "boolean" }
            },
            "if": { "properties": { "age": { "minimum": 18 } } },
            "then": { "required": ["consent"] }
        });

        let adult = resolved(&schema, &json!({"age": 30}));
        assert_eq!(adult["required"], json!(["consent"]));

        let minor = resolved(&schema, &json!({"age": 12}));
        assert!(minor.get("required").is_none());
    }

    #[test]
    fn no_conditional_keywords_survive() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "nested": {
                    "type": "object",
                    "properties": { "b": { "type": "string" } },
                    "if": { "properties": { "b": { "const": "x" } } },
                    "then": { "required": ["b"] },
                    "else": { "properties": { "b": { "readOnly": true } } }
                }
            },
            "allOf": [{
                "if": { "properties": { "a": { "pattern": "^z" } } },
                "then": { "required": ["a"] }
            }]
        });
        let out = resolved(&schema, &json!({"a": "zebra", "nested": {"b": "y"}}));

        fn assert_no_conditionals(value: &Value) {
            if let Value::Object(map) = value {
                assert!(map.get("if").is_none());
                assert!(map.get("then").is_none());
                assert!(map.get("else").is_none());
                for v in map.values() {
                    assert_no_conditionals(v);
                }
            } else if let Value::Array(arr) = value {
                for v in arr {
                    assert_no_conditionals(v);
                }
            }
        }
        assert_no_conditionals(&out);
        assert_eq!(out["required"], json!(["a"]));
        assert_eq!(out["properties"]["nested"]["properties"]["b"]["readOnly"], true);
    }

    #[test]
    fn enum_from_matched_branch_replaces_wholesale() {
        let schema = json!({
            "type": "object",
            "properties": {
                "grade": { "type": "string", "enum": ["G1", "G2", "G3"] },
                "site": { "type": "string" }
            },
            "allOf": [{
                "if": { "properties": { "site": { "const": "ovary" } } },
                "then": { "properties": { "grade": { "enum": ["G1", "G2"] } } }
            }]
        });
        let out = resolved(&schema, &json!({"site": "ovary"}));
        // The branch enum wins outright; no union with the base enum.
        assert_eq!(out["properties"]["grade"]["enum"], json!(["G1", "G2"]));
    }

    #[test]
    fn condition_against_undeclared_property_is_vacuous() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "if": { "properties": { "phantom": { "const": "x" } } },
            "then": { "required": ["a"] }
        });
        // phantom is not declared on the enclosing schema, so the clause has
        // no overlapping properties to test and matches vacuously.
        let out = resolved(&schema, &json!({}));
        assert_eq!(out["required"], json!(["a"]));
    }

    #[test]
    fn contains_condition_over_array_data() {
        let schema = json!({
            "type": "object",
            "properties": {
                "treatments": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "chemo_detail": { "type": "string" }
            },
            "if": {
                "properties": {
                    "treatments": { "contains": { "const": "chemotherapy" } }
                }
            },
            "then": { "required": ["chemo_detail"] }
        });

        let hit = resolved(&schema, &json!({"treatments": ["surgery", "chemotherapy"]}));
        assert_eq!(hit["required"], json!(["chemo_detail"]));

        let miss = resolved(&schema, &json!({"treatments": ["surgery"]}));
        assert!(miss.get("required").is_none());
    }

    #[test]
    fn loose_equality_across_representations() {
        let schema = json!({
            "type": "object",
            "properties": { "count": { "type": "string" } },
            "if": { "properties": { "count": { "const": 1 } } },
            "then": { "properties": { "count": { "description": "single" } } }
        });
        // String "1" matches numeric const 1.
        let out = resolved(&schema, &json!({"count": "1"}));
        assert_eq!(out["properties"]["count"]["description"], "single");
    }
}

// === Undeclared Data Synthesis ===

mod synthesis {
    use super::*;

    #[test]
    fn scalar_gets_read_only_typed_node() {
        let schema = json!({
            "type": "object",
            "properties": { "known": { "type": "string" } }
        });
        let out = resolved(&schema, &json!({"known": "a", "extra": "legacy"}));
        assert_eq!(
            out["properties"]["extra"],
            json!({"type": "string", "readOnly": true, "crf:undeclared": true})
        );
    }

    #[test]
    fn number_and_boolean_types_inferred() {
        let schema = json!({"type": "object", "properties": {}});
        let out = resolved(&schema, &json!({"n": 4.5, "b": false}));
        assert_eq!(out["properties"]["n"]["type"], "number");
        assert_eq!(out["properties"]["b"]["type"], "boolean");
    }

    #[test]
    fn array_of_objects_unions_element_shapes() {
        let schema = json!({"type": "object", "properties": {}});
        let data = json!({
            "episodes": [
                { "start": "2020-01-01", "drug": "cisplatin" },
                { "start": "2020-02-01", "outcome": "stable" }
            ]
        });
        let out = resolved(&schema, &data);
        let items = &out["properties"]["episodes"]["items"];
        let keys: Vec<_> = items["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["start", "drug", "outcome"]);
    }

    #[test]
    fn inputless_values_not_synthesized() {
        let schema = json!({"type": "object", "properties": {}});
        let out = resolved(&schema, &json!({"empty": null, "blank": "", "deep": {"inner": ""}}));
        let props = out["properties"].as_object().unwrap();
        assert!(props.get("empty").is_none());
        assert!(props.get("blank").is_none());
        assert!(props.get("deep").is_none());
    }

    #[test]
    fn zero_and_false_count_as_input() {
        let schema = json!({"type": "object", "properties": {}});
        let out = resolved(&schema, &json!({"count": 0, "flag": false}));
        let props = out["properties"].as_object().unwrap();
        assert!(props.get("count").is_some());
        assert!(props.get("flag").is_some());
    }

    #[test]
    fn declared_array_items_extended_with_undeclared_keys() {
        let schema = json!({
            "type": "object",
            "properties": {
                "lesions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "site": { "type": "string" } }
                    }
                }
            }
        });
        let data = json!({"lesions": [{"site": "liver", "size_mm": 12}]});
        let out = resolved(&schema, &data);
        let items = &out["properties"]["lesions"]["items"];
        assert!(items["properties"].get("site").is_some());
        assert_eq!(items["properties"]["size_mm"]["crf:undeclared"], true);
    }
}

// === End-to-End ===

mod end_to_end {
    use super::*;

    fn registry_schema() -> Value {
        json!({
            "$id": "https://example.com/crf/case.json",
            "type": "object",
            "$defs": {
                "figo": { "type": "string", "enum": ["I", "II", "III", "IV"] }
            },
            "properties": {
                "stage": { "$ref": "#/$defs/figo", "crf:required": ["TumorRegistry"] },
                "surgery_detail": { "type": "string", "crf:ui:textarea": 4 }
            },
            "allOf": [{
                "if": { "properties": { "stage": { "enum": ["III", "IV"] } } },
                "then": { "required": ["surgery_detail"] }
            }]
        })
    }

    #[test]
    fn advanced_stage_requires_detail() {
        let out = resolved(&registry_schema(), &json!({"stage": "III"}));
        assert_eq!(out["required"], json!(["surgery_detail"]));
        assert_eq!(out["properties"]["stage"]["enum"], json!(["I", "II", "III", "IV"]));
    }

    #[test]
    fn early_stage_leaves_detail_optional() {
        let out = resolved(&registry_schema(), &json!({"stage": "I"}));
        assert!(out.get("required").is_none());
    }

    #[test]
    fn validation_uses_resolved_conditional_shape() {
        let schema = registry_schema();
        let incomplete = json!({"stage": "IV"});
        let result = validate(&schema, &incomplete, &ResolveOptions::new());
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));

        let complete = json!({"stage": "IV", "surgery_detail": "total hysterectomy"});
        assert!(validate(&schema, &complete, &ResolveOptions::new()).is_ok());
    }

    #[test]
    fn stripped_schema_has_no_annotations() {
        let out = resolved(&registry_schema(), &json!({"stage": "I", "note": "x"}));
        let stripped = strip_annotations(&out);
        let text = serde_json::to_string(&stripped).unwrap();
        assert!(!text.contains("crf:"));
    }

    #[test]
    fn flatten_covers_declared_and_synthesized() {
        let out = resolved(&registry_schema(), &json!({"stage": "I", "note": "legacy"}));
        let rows = flatten(&out, &json!({"stage": "I", "note": "legacy"}));
        let paths: Vec<_> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/stage", "/surgery_detail", "/note"]);
        assert!(!rows[2].editable);
    }
}

// === Hint Derivation ===

mod hints {
    use super::*;

    #[test]
    fn order_matches_declaration_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "x": { "type": "string" },
                "y": { "type": "string" },
                "z": { "type": "string" }
            }
        });
        let out = resolved(&schema, &json!({}));
        let tree = derive_hints(&out, &json!({}), &[]);
        assert_eq!(tree.order, vec!["x", "y", "z"]);
    }

    #[test]
    fn synthesized_nodes_get_removal_affordance() {
        let schema = json!({"type": "object", "properties": {}});
        let data = json!({"legacy": "v"});
        let out = resolved(&schema, &data);
        let tree = derive_hints(&out, &data, &[]);
        assert_eq!(
            tree.children["legacy"].hints.widget.as_deref(),
            Some("removable-text")
        );
    }

    #[test]
    fn conditional_requirement_flows_into_hints() {
        let schema = json!({
            "type": "object",
            "properties": {
                "mode": { "type": "string" },
                "detail": { "type": "string" }
            },
            "if": { "properties": { "mode": { "const": "manual" } } },
            "then": { "required": ["detail"] }
        });
        let data = json!({"mode": "manual"});
        let out = resolved(&schema, &data);
        let required: Vec<String> = out["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        let tree = derive_hints(&out, &data, &required);
        assert!(tree.children["detail"]
            .hints
            .class_names
            .contains("required-item"));
    }
}
