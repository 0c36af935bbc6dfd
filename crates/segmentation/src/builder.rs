//! Filter builder — fluent API for constructing filter trees in code.

use crate::predicates::{ComparisonOperator, FilterGroup, FilterNode, LogicalOperator};

pub struct FilterBuilder {
    logic: LogicalOperator,
    conditions: Vec<FilterNode>,
}

impl FilterBuilder {
    /// Start an `and` group.
    pub fn all() -> Self {
        Self {
            logic: LogicalOperator::And,
            conditions: Vec::new(),
        }
    }

    /// Start an `or` group.
    pub fn any() -> Self {
        Self {
            logic: LogicalOperator::Or,
            conditions: Vec::new(),
        }
    }

    pub fn field_equals(self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.push(field, ComparisonOperator::Eq, value)
    }

    pub fn field_not_equals(self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.push(field, ComparisonOperator::Ne, value)
    }

    pub fn field_gte(self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.push(field, ComparisonOperator::Gte, value)
    }

    pub fn field_lt(self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.push(field, ComparisonOperator::Lt, value)
    }

    pub fn field_between(
        self,
        field: impl Into<String>,
        low: serde_json::Value,
        high: serde_json::Value,
    ) -> Self {
        self.push(
            field,
            ComparisonOperator::Between,
            serde_json::Value::Array(vec![low, high]),
        )
    }

    pub fn field_in(self, field: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.push(field, ComparisonOperator::In, serde_json::Value::Array(values))
    }

    pub fn field_not_in(self, field: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.push(field, ComparisonOperator::NotIn, serde_json::Value::Array(values))
    }

    pub fn field_is_null(self, field: impl Into<String>) -> Self {
        self.push(field, ComparisonOperator::IsNull, serde_json::Value::Null)
    }

    /// Nest another group built with its own builder.
    pub fn group(mut self, nested: FilterBuilder) -> Self {
        self.conditions.push(nested.build());
        self
    }

    pub fn build(self) -> FilterNode {
        FilterNode::Group(FilterGroup {
            logic: self.logic,
            conditions: self.conditions,
        })
    }

    fn push(
        mut self,
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: serde_json::Value,
    ) -> Self {
        self.conditions
            .push(FilterNode::condition(field, operator, value));
        self
    }
}
