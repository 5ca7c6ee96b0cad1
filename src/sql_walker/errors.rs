use thiserror::Error;

use crate::class_metadata::MappingError;
use crate::platform::PlatformError;
use crate::result_mapping::ResultMappingError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Unrecognized field: {class_name}.{field}")]
    UnrecognizedField { class_name: String, field: String },

    #[error("Identification variable `{alias}` is not defined in this query")]
    UnknownAlias { alias: String },

    #[error("Inverse side association {class_name}.{field} cannot be used here; filter on the owning side instead")]
    InvalidInverseAssociation { class_name: String, field: String },

    #[error("Composite key not supported for this operator: {class_name}.{field}")]
    CompositeKeyNotSupported { class_name: String, field: String },

    #[error("Cannot obtain an optimistic lock on unversioned class `{class_name}`")]
    OptimisticLockNotVersioned { class_name: String },

    #[error("Missing value for parameter {name}")]
    MissingParameter { name: String },

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Unknown filter `{name}`")]
    UnknownFilter { name: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    ResultMapping(#[from] ResultMappingError),
}

impl TranslationError {
    pub fn unrecognized_field(class_name: impl Into<String>, field: impl Into<String>) -> Self {
        TranslationError::UnrecognizedField {
            class_name: class_name.into(),
            field: field.into(),
        }
    }

    pub fn unknown_alias(alias: impl Into<String>) -> Self {
        TranslationError::UnknownAlias {
            alias: alias.into(),
        }
    }

    /// Create an Unsupported error with context information
    pub fn unsupported_with_context(what: impl Into<String>, context: impl Into<String>) -> Self {
        TranslationError::Unsupported(format!("{}\n  Context: {}", what.into(), context.into()))
    }
}
