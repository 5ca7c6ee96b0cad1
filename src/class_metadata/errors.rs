//! # Mapping Error Types
//!
//! Errors raised while registering class descriptors or looking them up.
//!
//! ## Error Categories
//!
//! - **Lookup Errors**: unknown classes, fields or associations
//! - **Mapping Errors**: invalid inheritance, broken bidirectional links,
//!   missing identifiers
//!
//! Use the context helpers when the failing lookup has an obvious origin:
//!
//! ```ignore
//! MappingError::unknown_class_with_context(
//!     "Address",
//!     "Resolving target of User.address"
//! )
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("No class descriptor registered for `{class_name}`")]
    UnknownClass { class_name: String },

    #[error("Class `{class_name}` has no field or association named `{field}`")]
    UnknownField { class_name: String, field: String },

    #[error("Class `{class_name}` has no association named `{field}`")]
    UnknownAssociation { class_name: String, field: String },

    #[error("Class `{class_name}` declares `{field}` both as a field and as an association")]
    DuplicateFieldName { class_name: String, field: String },

    #[error("Class `{class_name}` has no identifier")]
    MissingIdentifier { class_name: String },

    #[error("Class `{class_name}` has a composite identifier; a single identifier field is required here")]
    CompositeIdentifier { class_name: String },

    #[error("Association `{class_name}.{field}` is mapped by `{target}.{mapped_by}` which is not an owning-side association")]
    InvalidMappedBy {
        class_name: String,
        field: String,
        target: String,
        mapped_by: String,
    },

    #[error("Join column `{column}` of `{class_name}` must reference a mapped column of `{target}`")]
    JoinColumnMustPointToMappedField {
        class_name: String,
        column: String,
        target: String,
    },

    #[error("Invalid inheritance mapping for `{class_name}`: {message}")]
    InvalidInheritance { class_name: String, message: String },

    #[error("Invalid mapping: {message}")]
    InvalidMapping { message: String },
}

impl MappingError {
    pub fn unknown_class(class_name: impl Into<String>) -> Self {
        MappingError::UnknownClass {
            class_name: class_name.into(),
        }
    }

    /// Create an UnknownClass error with context information
    pub fn unknown_class_with_context(
        class_name: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        MappingError::UnknownClass {
            class_name: format!("{}\n  Context: {}", class_name.into(), context.into()),
        }
    }

    pub fn unknown_field(class_name: impl Into<String>, field: impl Into<String>) -> Self {
        MappingError::UnknownField {
            class_name: class_name.into(),
            field: field.into(),
        }
    }

    pub fn invalid_inheritance(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        MappingError::InvalidInheritance {
            class_name: class_name.into(),
            message: message.into(),
        }
    }
}
