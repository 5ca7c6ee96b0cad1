use thiserror::Error;

use crate::class_metadata::MappingError;
use crate::platform::PlatformError;
use crate::result_mapping::ResultMappingError;
use crate::sql_walker::errors::TranslationError;

use super::connection::ConnectionError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersisterError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Optimistic lock conflict on {class_name} {identifier}: the row was changed or removed since it was read")]
    OptimisticLockConflict {
        class_name: String,
        identifier: String,
    },

    #[error("Entity of class `{class_name}` has no identifier value")]
    MissingIdentifier { class_name: String },

    #[error("Entity of class `{actual}` passed to the persister of `{expected}`")]
    ClassMismatch { expected: String, actual: String },

    #[error("Row is missing column `{column}` needed to hydrate `{class_name}`")]
    MissingColumn { class_name: String, column: String },
}

impl From<MappingError> for PersisterError {
    fn from(error: MappingError) -> Self {
        PersisterError::Translation(TranslationError::Mapping(error))
    }
}

impl From<PlatformError> for PersisterError {
    fn from(error: PlatformError) -> Self {
        PersisterError::Translation(TranslationError::Platform(error))
    }
}

impl From<ResultMappingError> for PersisterError {
    fn from(error: ResultMappingError) -> Self {
        PersisterError::Translation(TranslationError::ResultMapping(error))
    }
}

impl PersisterError {
    pub fn missing_identifier(class_name: impl Into<String>) -> Self {
        PersisterError::MissingIdentifier {
            class_name: class_name.into(),
        }
    }

    pub fn unrecognized_field(class_name: impl Into<String>, field: impl Into<String>) -> Self {
        PersisterError::Translation(TranslationError::unrecognized_field(class_name, field))
    }
}
