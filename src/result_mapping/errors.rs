use thiserror::Error;

use crate::class_metadata::MappingError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResultMappingError {
    #[error("Duplicate column mapping: `{column_alias}` is already mapped")]
    DuplicateColumnMapping { column_alias: String },

    #[error("No entity result registered under alias `{alias}`")]
    UnknownAlias { alias: String },

    #[error(transparent)]
    Mapping(#[from] MappingError),
}
