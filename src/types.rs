//! Core types and the CRF annotation vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registry-requirement markers (`crf:required`, array of registry names).
pub const ANN_REQUIRED: &str = "crf:required";
/// Multiline text entry; `true` or a row count.
pub const ANN_TEXTAREA: &str = "crf:ui:textarea";
/// Choice-control flavor: list, combo, suggestlist, suggestcombo, buttons.
pub const ANN_LISTTYPE: &str = "crf:ui:listtype";
/// Child layout: inline or column.
pub const ANN_SUBSCHEMA_STYLE: &str = "crf:ui:subschemastyle";
/// Field is shown conditionally by the rendering layer.
pub const ANN_VISIBLE_WHEN: &str = "crf:ui:visibleWhen";
/// Field carries a value but is never shown.
pub const ANN_HIDDEN: &str = "crf:ui:hidden";
/// Engine-produced marker for nodes synthesized from data the schema
/// didn't declare.
pub const ANN_UNDECLARED: &str = "crf:undeclared";
/// Set by the validation round trip when the field holds a rejected value.
pub const ANN_HAS_ERROR: &str = "crf:validation:haserror";
/// Reserved error channel inside the data record; never synthesized into
/// the schema.
pub const ANN_ERROR: &str = "crf:error";

/// The closed CRF annotation vocabulary.
pub const CRF_ANNOTATIONS: &[&str] = &[
    ANN_REQUIRED,
    ANN_TEXTAREA,
    ANN_LISTTYPE,
    ANN_SUBSCHEMA_STYLE,
    ANN_VISIBLE_WHEN,
    ANN_HIDDEN,
    ANN_UNDECLARED,
    ANN_HAS_ERROR,
    ANN_ERROR,
];

/// Valid `crf:ui:listtype` values.
pub const VALID_LISTTYPES: &[&str] = &["list", "combo", "suggestlist", "suggestcombo", "buttons"];

/// Valid `crf:ui:subschemastyle` values.
pub const VALID_SUBSCHEMA_STYLES: &[&str] = &["inline", "column"];

/// Uniform recursion guard for every pass (refs, conditionals, merge,
/// synthesis, hints, flatten). Exceeding it degrades to a no-op or
/// non-match, never a panic.
pub const MAX_DEPTH: usize = 64;

/// Depth limit for `contains` condition recursion into array elements.
pub const CONDITION_DEPTH_LIMIT: usize = 10;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The `type` tag of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl SchemaType {
    /// Parse a JSON Schema type name. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            "string" => Some(SchemaType::String),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "boolean" => Some(SchemaType::Boolean),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    /// Read the `type` tag of a schema node, if it has a recognized one.
    pub fn of(node: &Value) -> Option<Self> {
        node.get("type")
            .and_then(|t| t.as_str())
            .and_then(Self::parse)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
        }
    }

    /// True for `integer` and `number`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SchemaType::Integer | SchemaType::Number)
    }
}

/// Deep non-emptiness test for data values.
///
/// `null` and `""` count as no input; `0` and `false` count as input;
/// containers have input when any member does.
pub fn has_input(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => arr.iter().any(has_input),
        Value::Object(map) => map.values().any(has_input),
        _ => true,
    }
}

/// Options for schema resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// When true (default), data properties absent from the declared schema
    /// are synthesized into it as read-only nodes. Turn off to obtain the
    /// declared shape only, e.g. for change detection between two records.
    pub append_undeclared: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self {
            append_undeclared: true,
        }
    }

    /// Set whether undeclared data properties are synthesized into the output.
    pub fn append_undeclared(mut self, append: bool) -> Self {
        self.append_undeclared = append;
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::new()
    }
}
