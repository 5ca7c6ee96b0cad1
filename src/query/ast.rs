//! Object query AST.
//!
//! The tree arrives already parsed; the walker dispatches over these closed
//! enums. Every node serializes so a statement can be fingerprinted for the
//! translation cache.

use serde::{Deserialize, Serialize};

use crate::class_metadata::OrderDirection;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    pub select: Vec<SelectExpression>,
    pub from: Vec<IdentificationVariableDeclaration>,
    pub where_clause: Option<ConditionalExpression>,
    pub group_by: Vec<ScalarExpression>,
    pub having: Option<ConditionalExpression>,
    pub order_by: Vec<OrderByItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SelectExpression {
    /// `SELECT u`
    Entity { alias: String },
    /// `SELECT PARTIAL u.{id, name}`
    PartialEntity { alias: String, fields: Vec<String> },
    /// `SELECT u.name AS n`, `SELECT COUNT(u) AS HIDDEN c`
    Scalar {
        expression: ScalarExpression,
        result_variable: Option<String>,
        hidden: bool,
    },
}

/// `FROM Class alias [INDEX BY alias.field] [joins...]`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct IdentificationVariableDeclaration {
    pub class_name: String,
    pub alias: String,
    pub index_by: Option<PathExpression>,
    pub joins: Vec<Join>,
}

impl IdentificationVariableDeclaration {
    pub fn new(class_name: impl Into<String>, alias: impl Into<String>) -> Self {
        IdentificationVariableDeclaration {
            class_name: class_name.into(),
            alias: alias.into(),
            index_by: None,
            joins: Vec::new(),
        }
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn index_by(mut self, path: PathExpression) -> Self {
        self.index_by = Some(path);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    /// Plain `JOIN`: INNER unless a join column is nullable
    Default,
    Inner,
    Left,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum JoinTarget {
    /// `JOIN u.address a`
    Association(PathExpression),
    /// `JOIN Class a WITH ...`
    Entity { class_name: String },
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Join {
    pub join_type: JoinType,
    pub target: JoinTarget,
    pub alias: String,
    /// `WITH` condition
    pub condition: Option<ConditionalExpression>,
    pub index_by: Option<PathExpression>,
    /// Hydrate the joined entity along with its parent
    pub fetch: bool,
}

impl Join {
    pub fn association(
        join_type: JoinType,
        parent_alias: impl Into<String>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Join {
            join_type,
            target: JoinTarget::Association(PathExpression::new(parent_alias, field)),
            alias: alias.into(),
            condition: None,
            index_by: None,
            fetch: false,
        }
    }

    pub fn entity(
        join_type: JoinType,
        class_name: impl Into<String>,
        alias: impl Into<String>,
        condition: ConditionalExpression,
    ) -> Self {
        Join {
            join_type,
            target: JoinTarget::Entity {
                class_name: class_name.into(),
            },
            alias: alias.into(),
            condition: Some(condition),
            index_by: None,
            fetch: false,
        }
    }

    pub fn with_condition(mut self, condition: ConditionalExpression) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn fetch(mut self) -> Self {
        self.fetch = true;
        self
    }

    pub fn index_by(mut self, path: PathExpression) -> Self {
        self.index_by = Some(path);
        self
    }
}

/// `alias.field`; `field` may name a scalar field or a single-valued
/// association
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct PathExpression {
    pub alias: String,
    pub field: String,
}

impl PathExpression {
    pub fn new(alias: impl Into<String>, field: impl Into<String>) -> Self {
        PathExpression {
            alias: alias.into(),
            field: field.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Neq => "<>",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ConditionalExpression {
    And(Vec<ConditionalExpression>),
    Or(Vec<ConditionalExpression>),
    Not(Box<ConditionalExpression>),
    Comparison {
        left: ScalarExpression,
        op: ComparisonOperator,
        right: ScalarExpression,
    },
    Between {
        expr: ScalarExpression,
        low: ScalarExpression,
        high: ScalarExpression,
        negated: bool,
    },
    Like {
        expr: ScalarExpression,
        pattern: ScalarExpression,
        escape: Option<char>,
        negated: bool,
    },
    InList {
        expr: ScalarExpression,
        values: Vec<ScalarExpression>,
        negated: bool,
    },
    InSubselect {
        expr: ScalarExpression,
        subselect: Box<Subselect>,
        negated: bool,
    },
    IsNull {
        expr: ScalarExpression,
        negated: bool,
    },
    Exists {
        subselect: Box<Subselect>,
        negated: bool,
    },
    /// `alias INSTANCE OF Class1, Class2`
    InstanceOf {
        alias: String,
        classes: Vec<String>,
        negated: bool,
    },
    /// `alias.collection IS EMPTY`
    IsEmpty {
        path: PathExpression,
        negated: bool,
    },
    /// `:entity MEMBER OF alias.collection`
    MemberOf {
        entity: ScalarExpression,
        collection: PathExpression,
        negated: bool,
    },
}

impl ConditionalExpression {
    pub fn compare(left: ScalarExpression, op: ComparisonOperator, right: ScalarExpression) -> Self {
        ConditionalExpression::Comparison { left, op, right }
    }

    pub fn eq(left: ScalarExpression, right: ScalarExpression) -> Self {
        Self::compare(left, ComparisonOperator::Eq, right)
    }

    pub fn and(parts: Vec<ConditionalExpression>) -> Self {
        ConditionalExpression::And(parts)
    }

    pub fn or(parts: Vec<ConditionalExpression>) -> Self {
        ConditionalExpression::Or(parts)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub enum InputParameter {
    Named(String),
    Positional(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Sub => "-",
            ArithmeticOperator::Mul => "*",
            ArithmeticOperator::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrimMode {
    Both,
    Leading,
    Trailing,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum FunctionExpression {
    Lower(ScalarExpression),
    Upper(ScalarExpression),
    Length(ScalarExpression),
    Concat(Vec<ScalarExpression>),
    Substring {
        value: ScalarExpression,
        start: ScalarExpression,
        length: Option<ScalarExpression>,
    },
    Trim {
        mode: TrimMode,
        character: Option<char>,
        value: ScalarExpression,
    },
    Abs(ScalarExpression),
    Sqrt(ScalarExpression),
    Mod(ScalarExpression, ScalarExpression),
    Coalesce(Vec<ScalarExpression>),
    NullIf(ScalarExpression, ScalarExpression),
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
    /// Number of elements of a collection-valued association
    Size(PathExpression),
    /// Foreign key column behind a single-valued association
    Identity {
        path: PathExpression,
        referenced_field: Option<String>,
    },
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ScalarExpression {
    Path(PathExpression),
    /// A bare alias; stands for the entity identifier
    IdentificationVariable(String),
    Literal(Literal),
    InputParameter(InputParameter),
    Arithmetic {
        left: Box<ScalarExpression>,
        op: ArithmeticOperator,
        right: Box<ScalarExpression>,
    },
    Negate(Box<ScalarExpression>),
    Function(Box<FunctionExpression>),
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        /// `None` renders `*`
        expr: Option<Box<ScalarExpression>>,
    },
    Subselect(Box<Subselect>),
    /// Reference to a result variable declared in the select list
    ResultVariable(String),
}

impl ScalarExpression {
    pub fn path(alias: impl Into<String>, field: impl Into<String>) -> Self {
        ScalarExpression::Path(PathExpression::new(alias, field))
    }

    pub fn param(name: impl Into<String>) -> Self {
        ScalarExpression::InputParameter(InputParameter::Named(name.into()))
    }

    pub fn positional(index: usize) -> Self {
        ScalarExpression::InputParameter(InputParameter::Positional(index))
    }

    pub fn string(value: impl Into<String>) -> Self {
        ScalarExpression::Literal(Literal::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        ScalarExpression::Literal(Literal::Integer(value))
    }

    pub fn null() -> Self {
        ScalarExpression::Literal(Literal::Null)
    }

    pub fn function(function: FunctionExpression) -> Self {
        ScalarExpression::Function(Box::new(function))
    }

    pub fn aggregate(function: AggregateFunction, expr: ScalarExpression) -> Self {
        ScalarExpression::Aggregate {
            function,
            distinct: false,
            expr: Some(Box::new(expr)),
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, ScalarExpression::Literal(Literal::Null))
    }
}

/// Single-column sub-select used in IN, EXISTS and scalar positions
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Subselect {
    pub distinct: bool,
    pub select: ScalarExpression,
    pub from: Vec<IdentificationVariableDeclaration>,
    pub where_clause: Option<ConditionalExpression>,
    pub group_by: Vec<ScalarExpression>,
    pub having: Option<ConditionalExpression>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expr: ScalarExpression,
    pub direction: OrderDirection,
}

impl OrderByItem {
    pub fn asc(expr: ScalarExpression) -> Self {
        OrderByItem {
            expr,
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(expr: ScalarExpression) -> Self {
        OrderByItem {
            expr,
            direction: OrderDirection::Desc,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UpdateItem {
    pub field: String,
    pub value: ScalarExpression,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub class_name: String,
    pub alias: String,
    pub set: Vec<UpdateItem>,
    pub where_clause: Option<ConditionalExpression>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub class_name: String,
    pub alias: String,
    pub where_clause: Option<ConditionalExpression>,
}
