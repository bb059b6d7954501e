//! Presentation-hint derivation from a resolved schema/data pair.
//!
//! Hints are toolkit-agnostic rendering directives: widget choice, layout
//! classes, label templates, declaration ordering. They are computed by an
//! explicit rule table evaluated in fixed precedence, so the output never
//! depends on the order annotation keys happen to appear in the document.
//! The deriver is a pure function of (schema, data, required set); it holds
//! no schema or data values, only derived metadata.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::types::{
    has_input, SchemaType, ANN_HAS_ERROR, ANN_HIDDEN, ANN_LISTTYPE, ANN_REQUIRED,
    ANN_SUBSCHEMA_STYLE, ANN_TEXTAREA, ANN_UNDECLARED, ANN_VISIBLE_WHEN, MAX_DEPTH,
};

/// Label/description rendering template for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelTemplate {
    /// Custom label row for a leaf field.
    Field,
    /// Custom header block for an object group.
    Group,
    /// Checkbox without its own title row.
    UntitledCheckbox,
}

/// Directive bag for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HintBag {
    /// Widget to render with, when the default for the type won't do.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    /// Row count for textarea widgets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    /// Render choice members side by side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_template: Option<LabelTemplate>,
    /// Every accumulated class hint, space-joined, assembled last.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub class_names: String,
    /// Browser autofill is never wanted on case report fields.
    pub autocomplete_off: bool,
}

/// Hint node for one field; children mirror the schema's `properties` in
/// declaration order, `items` mirrors an array's item schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HintNode {
    #[serde(flatten)]
    pub hints: HintBag,
    /// The object level's property names in declaration order. Presentation
    /// ordering only; carries no semantic weight.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, HintNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<HintNode>>,
}

/// The hint tree for a whole document.
pub type HintTree = HintNode;

/// Derive the hint tree for a resolved schema and its data record.
///
/// `required` lists the root level's required property names (typically the
/// resolved schema's own `required` array).
pub fn derive_hints(schema: &Value, data: &Value, required: &[String]) -> HintTree {
    derive_node(schema, data, false, required, MAX_DEPTH)
}

fn derive_node(
    schema: &Value,
    data: &Value,
    is_required: bool,
    required: &[String],
    depth: usize,
) -> HintNode {
    let mut node = HintNode {
        hints: derive_bag(schema, data, is_required),
        ..HintNode::default()
    };
    if depth == 0 {
        return node;
    }

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        let child_required = required_names(schema, required);
        for (name, child) in props {
            node.order.push(name.clone());
            let slice = data.get(name).unwrap_or(&Value::Null);
            node.children.insert(
                name.clone(),
                derive_node(
                    child,
                    slice,
                    child_required.iter().any(|r| r == name),
                    &[],
                    depth - 1,
                ),
            );
        }
    }

    if SchemaType::of(schema) == Some(SchemaType::Array) {
        if let Some(items) = schema.get("items") {
            // All elements share one item schema; the array's own data value
            // is the closest slice there is.
            node.items = Some(Box::new(derive_node(items, data, false, &[], depth - 1)));
        }
    }

    node
}

/// Required names for an object's children: the explicit set for the root
/// call, the schema's own `required` array below it.
fn required_names(schema: &Value, explicit: &[String]) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
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

// --- Rule table ---

struct RuleCtx<'a> {
    schema: &'a Value,
    data: &'a Value,
    is_required: bool,
    schema_type: Option<SchemaType>,
}

struct Directives {
    widget: Option<String>,
    rows: Option<u64>,
    inline: Option<bool>,
    label_template: Option<LabelTemplate>,
    classes: Vec<String>,
}

type HintRule = fn(&RuleCtx, &mut Directives);

/// Fixed precedence; later rules may override or add to earlier ones, and
/// class assembly happens after the whole table has run.
const HINT_RULES: &[HintRule] = &[
    required_marker,
    validation_error,
    subschema_layout,
    visibility_condition,
    label_selection,
    field_specializations,
    choice_widgets,
    hidden_override,
    undeclared_affordance,
];

fn derive_bag(schema: &Value, data: &Value, is_required: bool) -> HintBag {
    let ctx = RuleCtx {
        schema,
        data,
        is_required,
        schema_type: SchemaType::of(schema),
    };
    let mut d = Directives {
        widget: None,
        rows: None,
        inline: None,
        label_template: None,
        classes: Vec::new(),
    };
    for rule in HINT_RULES {
        rule(&ctx, &mut d);
    }

    HintBag {
        widget: d.widget,
        rows: d.rows,
        inline: d.inline,
        label_template: d.label_template,
        class_names: d.classes.join(" "),
        autocomplete_off: true,
    }
}

fn required_marker(ctx: &RuleCtx, d: &mut Directives) {
    if ctx.is_required {
        d.classes.push("required-item".to_string());
    }
}

fn validation_error(ctx: &RuleCtx, d: &mut Directives) {
    if ctx.schema.get(ANN_HAS_ERROR).and_then(Value::as_bool) == Some(true) {
        d.classes.push("has-error".to_string());
    }
}

fn subschema_layout(ctx: &RuleCtx, d: &mut Directives) {
    match ctx.schema.get(ANN_SUBSCHEMA_STYLE).and_then(Value::as_str) {
        Some("inline") => {
            let has_array_child = ctx
                .schema
                .get("properties")
                .and_then(|p| p.as_object())
                .map(|props| {
                    props
                        .values()
                        .any(|c| SchemaType::of(c) == Some(SchemaType::Array))
                })
                .unwrap_or(false);
            if has_array_child {
                d.classes.push("array-subschemastyle-inline".to_string());
            } else {
                d.classes.push("subschemastyle-inline".to_string());
            }
        }
        Some("column") => d.classes.push("subschemastyle-column".to_string()),
        _ => {}
    }
}

fn visibility_condition(ctx: &RuleCtx, d: &mut Directives) {
    if ctx.schema.get(ANN_VISIBLE_WHEN).is_some() {
        d.classes.push("visiblewhen".to_string());
    }
}

fn label_selection(ctx: &RuleCtx, d: &mut Directives) {
    // Registry-requirement markers highlight fields not yet filled in.
    if let Some(markers) = ctx.schema.get(ANN_REQUIRED).and_then(|m| m.as_array()) {
        if !has_input(ctx.data) {
            for marker in markers.iter().filter_map(|m| m.as_str()) {
                d.classes.push(format!("require-{}", marker.to_lowercase()));
            }
        }
    }

    let labelled =
        ctx.schema.get(ANN_REQUIRED).is_some() || ctx.schema.get("description").is_some();
    if labelled && ctx.schema_type != Some(SchemaType::Array) {
        d.label_template = Some(if ctx.schema_type == Some(SchemaType::Object) {
            LabelTemplate::Group
        } else {
            LabelTemplate::Field
        });
    }
}

fn field_specializations(ctx: &RuleCtx, d: &mut Directives) {
    if let Some(textarea) = ctx.schema.get(ANN_TEXTAREA) {
        d.widget = Some("textarea".to_string());
        d.rows = Some(textarea.as_u64().unwrap_or(3));
    }

    if ctx.schema.get("units").is_some() {
        d.widget = Some("with-units".to_string());
    }

    if ctx.schema.get("format").and_then(Value::as_str) == Some("date") {
        d.classes.push("input-date".to_string());
    }

    if ctx.schema_type.map(|t| t.is_numeric()).unwrap_or(false) {
        d.classes.push("input-integer".to_string());
    }

    if matches!(
        ctx.schema_type,
        Some(SchemaType::String) | Some(SchemaType::Array)
    ) {
        d.classes.push("input-text".to_string());
    }

    // buttons listtype: checkbox group for arrays, radio group for enums.
    // oneOf choices get their own layered widgets in the next rule.
    if listtype(ctx.schema) == Some("buttons") && ctx.schema.get("oneOf").is_none() {
        if ctx.schema_type == Some(SchemaType::Array) && ctx.schema.get("items").is_some() {
            d.widget = Some("checkbox-group".to_string());
            d.inline = Some(true);
        } else if ctx.schema_type == Some(SchemaType::String)
            && ctx
                .schema
                .get("enum")
                .and_then(|e| e.as_array())
                .map(|a| !a.is_empty())
                .unwrap_or(false)
        {
            d.widget = Some("radio".to_string());
            d.inline = Some(true);
        }
    }
}

fn choice_widgets(ctx: &RuleCtx, d: &mut Directives) {
    let one_of = ctx.schema.get("oneOf").and_then(|o| o.as_array());

    if let Some(branches) = one_of {
        if ctx.schema_type == Some(SchemaType::String) {
            match listtype(ctx.schema) {
                Some("combo") => {
                    let has_enum_branch = branches.iter().any(|b| {
                        SchemaType::of(b) == Some(SchemaType::String) && b.get("enum").is_some()
                    });
                    if has_enum_branch {
                        d.classes.push("input-select".to_string());
                        d.widget = Some("layer-combo-box".to_string());
                    } else {
                        d.widget = Some("multi-type-text-box".to_string());
                    }
                    d.label_template = Some(LabelTemplate::Field);
                }
                Some("buttons") => {
                    d.widget = Some("layer-radio-button".to_string());
                }
                _ => {
                    d.widget = Some("layer-dropdown".to_string());
                    d.label_template = Some(LabelTemplate::Field);
                }
            }
        }
    }

    // Suggest/combo flavors over any choice source.
    if matches!(
        listtype(ctx.schema),
        Some("combo") | Some("suggestcombo") | Some("suggestlist")
    ) && (ctx.schema.get("oneOf").is_some()
        || ctx.schema.get("anyOf").is_some()
        || ctx.schema.get("enum").is_some())
    {
        d.widget = Some("layer-combo-box".to_string());
    }
}

fn hidden_override(ctx: &RuleCtx, d: &mut Directives) {
    if ctx.schema.get(ANN_HIDDEN).and_then(Value::as_bool) == Some(true) {
        d.widget = Some("hidden".to_string());
    }
}

fn undeclared_affordance(ctx: &RuleCtx, d: &mut Directives) {
    if ctx.schema.get(ANN_UNDECLARED).and_then(Value::as_bool) != Some(true) {
        return;
    }
    match ctx.schema_type {
        Some(SchemaType::String) | Some(SchemaType::Number) | Some(SchemaType::Integer) => {
            d.widget = Some("removable-text".to_string());
        }
        Some(SchemaType::Boolean) => {
            d.label_template = Some(LabelTemplate::UntitledCheckbox);
            d.widget = Some("removable-checkbox".to_string());
        }
        _ => {}
    }
}

fn listtype(schema: &Value) -> Option<&str> {
    schema.get(ANN_LISTTYPE).and_then(Value::as_str)
}
