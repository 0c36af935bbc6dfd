//! Filter tree evaluation and validation.
//!
//! Evaluation is a pure function over any [`FilterRecord`], so the same tree
//! can be checked against leads, users, or an ad-hoc JSON object.

use portal_core::FieldError;
use std::collections::HashMap;

use crate::predicates::{compare_values, ComparisonOperator, FilterNode, LogicalOperator};

/// Deepest nesting accepted for a filter tree; the root group is depth 1.
pub const MAX_FILTER_DEPTH: usize = 8;

/// Anything whose fields can be looked up by name.
pub trait FilterRecord {
    fn field(&self, name: &str) -> Option<serde_json::Value>;
}

impl FilterRecord for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        self.get(name).cloned()
    }
}

impl FilterRecord for HashMap<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        self.get(name).cloned()
    }
}

/// Evaluate a filter tree against a record.
///
/// An empty `and` group matches everything; an empty `or` group matches
/// nothing.
pub fn evaluate<R: FilterRecord + ?Sized>(node: &FilterNode, record: &R) -> bool {
    match node {
        FilterNode::Condition(condition) => {
            let actual = record.field(&condition.field);
            compare_values(actual.as_ref(), condition.operator, &condition.value)
        }
        FilterNode::Group(group) => match group.logic {
            LogicalOperator::And => group.conditions.iter().all(|c| evaluate(c, record)),
            LogicalOperator::Or => group.conditions.iter().any(|c| evaluate(c, record)),
        },
    }
}

/// `None` means "no filter": every record matches.
pub fn matches<R: FilterRecord + ?Sized>(node: Option<&FilterNode>, record: &R) -> bool {
    node.map_or(true, |n| evaluate(n, record))
}

/// Check a tree's shape before it is stored or evaluated. Field errors are
/// located relative to `path` (e.g. `filterTree.conditions[0].value`).
pub fn validate(node: &FilterNode, path: &str) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    validate_node(node, path, 1, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_node(node: &FilterNode, path: &str, depth: usize, errors: &mut Vec<FieldError>) {
    if depth > MAX_FILTER_DEPTH {
        errors.push(FieldError::new(
            path,
            format!("filter tree nesting exceeds {MAX_FILTER_DEPTH} levels"),
        ));
        return;
    }
    match node {
        FilterNode::Group(group) => {
            for (i, child) in group.conditions.iter().enumerate() {
                validate_node(child, &format!("{path}.conditions[{i}]"), depth + 1, errors);
            }
        }
        FilterNode::Condition(condition) => {
            if condition.field.trim().is_empty() {
                errors.push(FieldError::new(format!("{path}.field"), "must not be empty"));
            }
            let value_path = format!("{path}.value");
            match condition.operator {
                ComparisonOperator::In | ComparisonOperator::NotIn => {
                    if !condition.value.is_array() {
                        errors.push(FieldError::new(value_path, "must be an array"));
                    }
                }
                ComparisonOperator::Between => {
                    let ok = condition.value.as_array().is_some_and(|b| b.len() == 2);
                    if !ok {
                        errors.push(FieldError::new(
                            value_path,
                            "must be a [low, high] array",
                        ));
                    }
                }
                ComparisonOperator::IsNull => {}
                ComparisonOperator::Gt
                | ComparisonOperator::Gte
                | ComparisonOperator::Lt
                | ComparisonOperator::Lte => {
                    if !(condition.value.is_number() || condition.value.is_string()) {
                        errors.push(FieldError::new(value_path, "must be a number or string"));
                    }
                }
                ComparisonOperator::Eq | ComparisonOperator::Ne => {
                    if condition.value.is_array() || condition.value.is_object() {
                        errors.push(FieldError::new(value_path, "must be a scalar"));
                    }
                }
            }
        }
    }
}
