pub mod builder;
pub mod errors;
pub mod mapping;

pub use builder::{ColumnRenameMode, ResultSetMappingBuilder};
pub use errors::ResultMappingError;
pub use mapping::{
    ColumnTarget, FieldResult, JoinedEntityResult, MetaResult, ResultSetMapping, ScalarResult,
};
