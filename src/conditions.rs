//! Evaluation of `if` predicates against a data record.
//!
//! The condition language is a closed set of kinds checked in fixed
//! priority; a node that fits none of them never matches. Every failure
//! mode (invalid regex, non-numeric value, exhausted depth) evaluates to
//! false rather than raising.

use serde_json::Value;

use crate::types::CONDITION_DEPTH_LIMIT;

/// One condition kind from an `if`-clause property node.
///
/// Parsing picks the first kind present, in this order: `contains`,
/// `const`, `enum`, `pattern`, numeric range, size range.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Array membership test; a contains-schema with nested `properties`
    /// recurses into the matching sub-property of the elements.
    Contains(Value),
    /// Loose equality ("1" matches 1, 10.0 matches 10).
    Const(Value),
    /// Membership in a fixed value list.
    Enum(Vec<Value>),
    /// Regex test against the value's string form.
    Pattern(String),
    /// Numeric bounds; every supplied bound must hold.
    NumericRange {
        minimum: Option<f64>,
        maximum: Option<f64>,
        exclusive_minimum: Option<f64>,
        exclusive_maximum: Option<f64>,
    },
    /// Array length bounds.
    SizeRange {
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
}

impl Condition {
    /// Parse a condition from a schema node. Returns `None` when the node
    /// carries no recognized condition kind.
    pub fn parse(node: &Value) -> Option<Self> {
        let map = node.as_object()?;

        if let Some(contains) = map.get("contains") {
            return Some(Condition::Contains(contains.clone()));
        }
        if let Some(c) = map.get("const") {
            return Some(Condition::Const(c.clone()));
        }
        if let Some(e) = map.get("enum") {
            return Some(Condition::Enum(e.as_array().cloned().unwrap_or_default()));
        }
        if let Some(p) = map.get("pattern").and_then(|p| p.as_str()) {
            return Some(Condition::Pattern(p.to_string()));
        }

        let bound = |key: &str| map.get(key).and_then(Value::as_f64);
        let minimum = bound("minimum");
        let maximum = bound("maximum");
        let exclusive_minimum = bound("exclusiveMinimum");
        let exclusive_maximum = bound("exclusiveMaximum");
        if minimum.is_some()
            || maximum.is_some()
            || exclusive_minimum.is_some()
            || exclusive_maximum.is_some()
        {
            return Some(Condition::NumericRange {
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            });
        }

        let count = |key: &str| map.get(key).and_then(Value::as_u64);
        let min_items = count("minItems");
        let max_items = count("maxItems");
        if min_items.is_some() || max_items.is_some() {
            return Some(Condition::SizeRange {
                min_items,
                max_items,
            });
        }

        None
    }

    /// Evaluate against a data value, recursion bounded by `depth`.
    pub fn evaluate(&self, value: &Value, depth: usize) -> bool {
        if depth == 0 {
            return false;
        }

        match self {
            Condition::Contains(contains) => match value.as_array() {
                Some(elements) => check_contains(contains, elements, depth - 1),
                None => false,
            },
            Condition::Const(expected) => loose_eq(expected, value),
            Condition::Enum(allowed) => allowed.iter().any(|v| same_value(v, value)),
            Condition::Pattern(pattern) => match regex::Regex::new(pattern) {
                Ok(re) => re.is_match(&value_as_text(value)),
                // Authoring error in the pattern: unmatched, never raised.
                Err(_) => false,
            },
            Condition::NumericRange {
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            } => match numeric_cast(value) {
                Some(n) if !n.is_nan() => {
                    minimum.map_or(true, |m| n >= m)
                        && maximum.map_or(true, |m| n <= m)
                        && exclusive_minimum.map_or(true, |m| n > m)
                        && exclusive_maximum.map_or(true, |m| n < m)
                }
                _ => false,
            },
            Condition::SizeRange {
                min_items,
                max_items,
            } => match value.as_array() {
                Some(arr) => {
                    let len = arr.len() as u64;
                    min_items.map_or(true, |m| len >= m) && max_items.map_or(true, |m| len <= m)
                }
                None => false,
            },
        }
    }
}

/// Does the clause's `if` schema match the data record?
///
/// Only property names declared on both the `if` schema and the enclosing
/// schema participate; the clause matches iff every participating condition
/// holds. An `if` with no participating names matches vacuously.
pub fn clause_matches(if_schema: &Value, enclosing: &Value, data: &Value) -> bool {
    let Some(if_props) = if_schema.get("properties").and_then(|p| p.as_object()) else {
        return true;
    };
    let declared = enclosing
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    if_props
        .iter()
        .filter(|(name, _)| declared.contains_key(*name))
        .all(|(name, cond_node)| {
            let value = data.get(name).unwrap_or(&Value::Null);
            evaluate_node(cond_node, value, CONDITION_DEPTH_LIMIT)
        })
}

/// Parse-and-evaluate in one step; unrecognized condition kinds are false.
pub(crate) fn evaluate_node(node: &Value, value: &Value, depth: usize) -> bool {
    Condition::parse(node).is_some_and(|c| c.evaluate(value, depth))
}

fn check_contains(contains: &Value, elements: &[Value], depth: usize) -> bool {
    match contains.get("properties").and_then(|p| p.as_object()) {
        Some(props) => {
            // The first element exposing a conditioned sub-property decides.
            for (name, cond_node) in props {
                for element in elements {
                    if let Some(sub) = element.as_object().and_then(|o| o.get(name)) {
                        return evaluate_node(cond_node, sub, depth.saturating_sub(1));
                    }
                }
            }
            false
        }
        None => elements
            .iter()
            .any(|element| evaluate_node(contains, element, depth.saturating_sub(1))),
    }
}

/// Loose equality in the source's sense: exact JSON equality, or both sides
/// castable to the same number ("1" == 1, true == 1, 10.0 == 10).
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    if json_eq(a, b) {
        return true;
    }
    matches!((numeric_cast(a), numeric_cast(b)), (Some(x), Some(y)) if x == y)
}

/// Strict membership equality, except numbers compare by value so that
/// 10.0 and 10 are the same member.
fn same_value(a: &Value, b: &Value) -> bool {
    json_eq(a, b)
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn numeric_cast(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
