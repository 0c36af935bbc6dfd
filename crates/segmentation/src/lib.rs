//! Audience filter trees — recursive and/or predicates over contact fields,
//! with a pure evaluator and shape validation.

pub mod builder;
pub mod engine;
pub mod predicates;

pub use builder::FilterBuilder;
pub use engine::{evaluate, matches, validate, FilterRecord, MAX_FILTER_DEPTH};
pub use predicates::{ComparisonOperator, Condition, FilterGroup, FilterNode, LogicalOperator};
