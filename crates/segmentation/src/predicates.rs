//! Filter tree types and value comparison for audience criteria.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A node of a filter tree: either a group combining child nodes, or a single
/// field-level condition.
///
/// On the wire a group is `{"logic": "and", "conditions": [...]}` and a
/// condition is `{"field": "locale", "operator": "eq", "value": "en"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(FilterGroup),
    Condition(Condition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub logic: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<FilterNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    In,
    NotIn,
    IsNull,
}

impl FilterNode {
    pub fn and(conditions: Vec<FilterNode>) -> Self {
        FilterNode::Group(FilterGroup {
            logic: LogicalOperator::And,
            conditions,
        })
    }

    pub fn or(conditions: Vec<FilterNode>) -> Self {
        FilterNode::Group(FilterGroup {
            logic: LogicalOperator::Or,
            conditions,
        })
    }

    pub fn condition(
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: serde_json::Value,
    ) -> Self {
        FilterNode::Condition(Condition {
            field: field.into(),
            operator,
            value,
        })
    }
}

/// Compare a record's field against a condition's expected value.
///
/// `actual` is `None` when the record has no such field; a missing field and
/// an explicit JSON null are treated alike.
pub fn compare_values(
    actual: Option<&serde_json::Value>,
    operator: ComparisonOperator,
    expected: &serde_json::Value,
) -> bool {
    let actual = actual.filter(|v| !v.is_null());
    match operator {
        ComparisonOperator::IsNull => actual.is_none(),
        ComparisonOperator::Eq => actual.is_some_and(|a| values_equal(a, expected)),
        ComparisonOperator::Ne => actual.map_or(true, |a| !values_equal(a, expected)),
        ComparisonOperator::Gt => ordered(actual, expected, |o| o == Ordering::Greater),
        ComparisonOperator::Gte => ordered(actual, expected, |o| o != Ordering::Less),
        ComparisonOperator::Lt => ordered(actual, expected, |o| o == Ordering::Less),
        ComparisonOperator::Lte => ordered(actual, expected, |o| o != Ordering::Greater),
        ComparisonOperator::Between => match (actual, expected.as_array()) {
            (Some(a), Some(bounds)) if bounds.len() == 2 => {
                matches!(
                    order_values(a, &bounds[0]),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    order_values(a, &bounds[1]),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            _ => false,
        },
        ComparisonOperator::In => match (actual, expected.as_array()) {
            (Some(a), Some(list)) => list.iter().any(|e| values_equal(a, e)),
            _ => false,
        },
        ComparisonOperator::NotIn => match (actual, expected.as_array()) {
            (Some(a), Some(list)) => !list.iter().any(|e| values_equal(a, e)),
            (None, Some(_)) => true,
            _ => false,
        },
    }
}

fn ordered(
    actual: Option<&serde_json::Value>,
    expected: &serde_json::Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    actual
        .and_then(|a| order_values(a, expected))
        .is_some_and(accept)
}

/// Numbers compare numerically, strings lexicographically (RFC 3339
/// timestamps therefore order chronologically). Mixed types are unordered.
fn order_values(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    match (a, b) {
        (serde_json::Value::Number(x), serde_json::Value::Number(y)) => {
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (serde_json::Value::String(x), serde_json::Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// 1 and 1.0 are the same value for filtering purposes.
fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a, b) {
        (serde_json::Value::Number(x), serde_json::Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
