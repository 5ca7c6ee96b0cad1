//! Result-set mapping.
//!
//! Records, per SQL column alias, what a row value means: a field of an
//! entity result, a meta column (foreign key, discriminator) or a scalar.
//! A column alias lives in exactly one of those three maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::errors::ResultMappingError;
use crate::class_metadata::ColumnType;
use crate::query::ParameterType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
    pub alias: String,
    pub field_name: String,
    pub declaring_class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaResult {
    pub alias: String,
    pub column_name: String,
    pub is_identifier: bool,
    pub column_type: Option<ColumnType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarResult {
    pub result_variable: String,
    pub value_type: Option<ParameterType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedEntityResult {
    pub class_name: String,
    pub parent_alias: String,
    pub relation: String,
}

/// What a column alias resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnTarget<'a> {
    Field(&'a FieldResult),
    Meta(&'a MetaResult),
    Scalar(&'a ScalarResult),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSetMapping {
    /// Root entity results: alias -> class
    pub entity_results: IndexMap<String, String>,
    /// Result aliases of root entities (`SELECT u AS user`)
    pub entity_result_aliases: IndexMap<String, String>,
    pub joined_entity_results: IndexMap<String, JoinedEntityResult>,
    pub field_results: IndexMap<String, FieldResult>,
    pub meta_results: IndexMap<String, MetaResult>,
    pub scalar_results: IndexMap<String, ScalarResult>,
    /// alias -> column alias carrying the discriminator
    pub discriminator_columns: IndexMap<String, String>,
    /// alias -> field used to key the collection
    pub index_by: IndexMap<String, String>,
    /// Entities and scalars selected together
    pub is_mixed: bool,
}

impl ResultSetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_unmapped(&self, column_alias: &str) -> Result<(), ResultMappingError> {
        if self.field_results.contains_key(column_alias)
            || self.meta_results.contains_key(column_alias)
            || self.scalar_results.contains_key(column_alias)
        {
            return Err(ResultMappingError::DuplicateColumnMapping {
                column_alias: column_alias.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_entity_result(
        &mut self,
        class_name: impl Into<String>,
        alias: impl Into<String>,
        result_alias: Option<String>,
    ) {
        let alias = alias.into();
        if let Some(result_alias) = result_alias {
            self.entity_result_aliases
                .insert(alias.clone(), result_alias);
        }
        self.entity_results.insert(alias, class_name.into());
        if !self.scalar_results.is_empty() {
            self.is_mixed = true;
        }
    }

    pub fn add_joined_entity_result(
        &mut self,
        class_name: impl Into<String>,
        alias: impl Into<String>,
        parent_alias: impl Into<String>,
        relation: impl Into<String>,
    ) {
        self.joined_entity_results.insert(
            alias.into(),
            JoinedEntityResult {
                class_name: class_name.into(),
                parent_alias: parent_alias.into(),
                relation: relation.into(),
            },
        );
    }

    pub fn add_field_result(
        &mut self,
        alias: &str,
        column_alias: &str,
        field_name: &str,
        declaring_class: &str,
    ) -> Result<(), ResultMappingError> {
        self.ensure_unmapped(column_alias)?;
        self.field_results.insert(
            column_alias.to_string(),
            FieldResult {
                alias: alias.to_string(),
                field_name: field_name.to_string(),
                declaring_class: declaring_class.to_string(),
            },
        );
        Ok(())
    }

    pub fn add_meta_result(
        &mut self,
        alias: &str,
        column_alias: &str,
        column_name: &str,
        is_identifier: bool,
        column_type: Option<ColumnType>,
    ) -> Result<(), ResultMappingError> {
        self.ensure_unmapped(column_alias)?;
        self.meta_results.insert(
            column_alias.to_string(),
            MetaResult {
                alias: alias.to_string(),
                column_name: column_name.to_string(),
                is_identifier,
                column_type,
            },
        );
        Ok(())
    }

    pub fn add_scalar_result(
        &mut self,
        column_alias: &str,
        result_variable: &str,
        value_type: Option<ParameterType>,
    ) -> Result<(), ResultMappingError> {
        self.ensure_unmapped(column_alias)?;
        self.scalar_results.insert(
            column_alias.to_string(),
            ScalarResult {
                result_variable: result_variable.to_string(),
                value_type,
            },
        );
        if !self.entity_results.is_empty() {
            self.is_mixed = true;
        }
        Ok(())
    }

    pub fn set_discriminator_column(&mut self, alias: &str, column_alias: &str) {
        self.discriminator_columns
            .insert(alias.to_string(), column_alias.to_string());
    }

    pub fn add_index_by(&mut self, alias: &str, field: &str) {
        self.index_by.insert(alias.to_string(), field.to_string());
    }

    /// Copy of this mapping keyed by `field` for `alias`
    pub fn with_index_by(&self, alias: &str, field: &str) -> ResultSetMapping {
        let mut indexed = self.clone();
        indexed.add_index_by(alias, field);
        indexed
    }

    pub fn is_entity_alias(&self, alias: &str) -> bool {
        self.entity_results.contains_key(alias) || self.joined_entity_results.contains_key(alias)
    }

    /// Class behind a root or joined entity alias
    pub fn class_of(&self, alias: &str) -> Option<&str> {
        self.entity_results
            .get(alias)
            .map(String::as_str)
            .or_else(|| {
                self.joined_entity_results
                    .get(alias)
                    .map(|j| j.class_name.as_str())
            })
    }

    pub fn resolve_column(&self, column_alias: &str) -> Option<ColumnTarget<'_>> {
        if let Some(field) = self.field_results.get(column_alias) {
            return Some(ColumnTarget::Field(field));
        }
        if let Some(meta) = self.meta_results.get(column_alias) {
            return Some(ColumnTarget::Meta(meta));
        }
        self.scalar_results
            .get(column_alias)
            .map(ColumnTarget::Scalar)
    }

    /// Column alias holding `field` of entity `alias`
    pub fn column_alias_for(&self, alias: &str, field: &str) -> Option<&str> {
        self.field_results
            .iter()
            .find(|(_, r)| r.alias == alias && r.field_name == field)
            .map(|(column, _)| column.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.field_results.len() + self.meta_results.len() + self.scalar_results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_column_mapping_across_categories() {
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("User", "u", None);
        rsm.add_field_result("u", "id_0", "id", "User").unwrap();

        assert_eq!(
            rsm.add_meta_result("u", "id_0", "id", true, None),
            Err(ResultMappingError::DuplicateColumnMapping {
                column_alias: "id_0".to_string()
            })
        );
        assert!(rsm.add_scalar_result("id_0", "n", None).is_err());
        assert!(rsm.add_field_result("u", "id_0", "name", "User").is_err());
    }

    #[test]
    fn test_mixed_and_resolution() {
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("User", "u", None);
        rsm.add_field_result("u", "name_1", "name", "User").unwrap();
        assert!(!rsm.is_mixed);
        rsm.add_scalar_result("sclr_2", "total", Some(ParameterType::Integer))
            .unwrap();
        assert!(rsm.is_mixed);

        assert!(matches!(
            rsm.resolve_column("name_1"),
            Some(ColumnTarget::Field(f)) if f.field_name == "name"
        ));
        assert!(matches!(rsm.resolve_column("sclr_2"), Some(ColumnTarget::Scalar(_))));
        assert_eq!(rsm.resolve_column("nope"), None);
    }

    #[test]
    fn test_with_index_by_leaves_original_untouched() {
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("User", "u", None);
        let indexed = rsm.with_index_by("u", "email");
        assert!(rsm.index_by.is_empty());
        assert_eq!(indexed.index_by.get("u").map(String::as_str), Some("email"));
    }
}
