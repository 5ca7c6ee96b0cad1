pub mod ast;
pub mod criteria;
pub mod hints;
pub mod parameters;
pub mod value;

pub use ast::Statement;
pub use criteria::{ComparisonOp, Criteria, Expression, FieldCriteria};
pub use hints::QueryHints;
pub use parameters::{ParameterList, ParameterRef, QueryParameters};
pub use value::{ParameterType, Value};
