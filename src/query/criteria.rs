//! Criteria objects for persister lookups.
//!
//! Two forms reach the persisters: a flat field -> value map (every entry an
//! equality, list values become IN) and an expression tree with orderings
//! and paging.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::class_metadata::OrderDirection;

/// Flat field -> value criteria; entries are AND-ed
pub type FieldCriteria = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Is,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Comparison(Comparison),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
}

impl Expression {
    pub fn compare(field: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Expression::Comparison(Comparison {
            field: field.into(),
            op,
            value: value.into(),
        })
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Eq, value)
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Neq, value)
    }

    pub fn is_in(field: impl Into<String>, values: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::In, values)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(field, ComparisonOp::Contains, value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Criteria {
    pub where_expr: Option<Expression>,
    pub orderings: Vec<(String, OrderDirection)>,
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// ANDs `expr` with any condition already present
    pub fn and_where(mut self, expr: Expression) -> Self {
        self.where_expr = Some(match self.where_expr.take() {
            None => expr,
            Some(Expression::And(mut parts)) => {
                parts.push(expr);
                Expression::And(parts)
            }
            Some(existing) => Expression::And(vec![existing, expr]),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.orderings.push((field.into(), direction));
        self
    }

    pub fn first_result(mut self, offset: u64) -> Self {
        self.first_result = Some(offset);
        self
    }

    pub fn max_results(mut self, limit: u64) -> Self {
        self.max_results = Some(limit);
        self
    }

    /// Equality criteria expressed as a tree
    pub fn from_fields(fields: &FieldCriteria) -> Self {
        fields.iter().fold(Criteria::new(), |criteria, (field, value)| {
            let op = if value.is_list() {
                ComparisonOp::In
            } else {
                ComparisonOp::Eq
            };
            criteria.and_where(Expression::compare(field.clone(), op, value.clone()))
        })
    }
}
