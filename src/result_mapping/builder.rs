//! Result-set mappings for hand-written SQL.
//!
//! Maps every column of a class (fields, owning to-one foreign keys and the
//! discriminator) under a chosen alias, and can render the matching select
//! list so the SQL and the mapping cannot drift apart.

use std::collections::HashMap;

use super::errors::ResultMappingError;
use super::mapping::ResultSetMapping;
use crate::class_metadata::{ClassDescriptor, MetadataRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnRenameMode {
    /// Column aliases are the column names; clashes are errors
    #[default]
    None,
    /// Every column alias gets a running counter suffix
    Incremental,
}

#[derive(Debug, Clone)]
struct SelectColumn {
    alias: String,
    column_name: String,
    column_alias: String,
}

pub struct ResultSetMappingBuilder<'a> {
    registry: &'a MetadataRegistry,
    mode: ColumnRenameMode,
    rsm: ResultSetMapping,
    columns: Vec<SelectColumn>,
    counter: usize,
}

impl<'a> ResultSetMappingBuilder<'a> {
    pub fn new(registry: &'a MetadataRegistry, mode: ColumnRenameMode) -> Self {
        ResultSetMappingBuilder {
            registry,
            mode,
            rsm: ResultSetMapping::new(),
            columns: Vec::new(),
            counter: 0,
        }
    }

    pub fn add_root_entity_from_class(
        &mut self,
        class_name: &str,
        alias: &str,
    ) -> Result<&mut Self, ResultMappingError> {
        let class = self.registry.describe(class_name)?;
        self.rsm.add_entity_result(class_name, alias, None);
        self.add_all_class_columns(class, alias)?;
        Ok(self)
    }

    pub fn add_joined_entity_from_class(
        &mut self,
        class_name: &str,
        alias: &str,
        parent_alias: &str,
        relation: &str,
    ) -> Result<&mut Self, ResultMappingError> {
        if !self.rsm.is_entity_alias(parent_alias) {
            return Err(ResultMappingError::UnknownAlias {
                alias: parent_alias.to_string(),
            });
        }
        let class = self.registry.describe(class_name)?;
        self.rsm
            .add_joined_entity_result(class_name, alias, parent_alias, relation);
        self.add_all_class_columns(class, alias)?;
        Ok(self)
    }

    fn column_alias(&mut self, column_name: &str) -> String {
        match self.mode {
            ColumnRenameMode::None => column_name.to_string(),
            ColumnRenameMode::Incremental => {
                let alias = format!("{}{}", column_name, self.counter);
                self.counter += 1;
                alias
            }
        }
    }

    fn add_all_class_columns(
        &mut self,
        class: &ClassDescriptor,
        alias: &str,
    ) -> Result<(), ResultMappingError> {
        for field in class.fields.values() {
            let column_alias = self.column_alias(&field.column_name);
            self.rsm
                .add_field_result(alias, &column_alias, &field.field_name, &class.name)?;
            self.columns.push(SelectColumn {
                alias: alias.to_string(),
                column_name: field.column_name.clone(),
                column_alias,
            });
        }

        for assoc in class.associations.values().filter(|a| a.is_owning_to_one()) {
            for jc in assoc.join_columns() {
                let column_alias = self.column_alias(&jc.name);
                self.rsm.add_meta_result(
                    alias,
                    &column_alias,
                    &jc.name,
                    assoc.is_identifier(),
                    None,
                )?;
                self.columns.push(SelectColumn {
                    alias: alias.to_string(),
                    column_name: jc.name.clone(),
                    column_alias,
                });
            }
        }

        if let (Some(discriminator), true) = (&class.discriminator_column, class.has_discriminator()) {
            let column_alias = self.column_alias(&discriminator.name);
            self.rsm.add_meta_result(
                alias,
                &column_alias,
                &discriminator.name,
                false,
                Some(discriminator.column_type),
            )?;
            self.rsm.set_discriminator_column(alias, &column_alias);
            self.columns.push(SelectColumn {
                alias: alias.to_string(),
                column_name: discriminator.name.clone(),
                column_alias,
            });
        }
        Ok(())
    }

    /// `t.col AS col_alias, ...`; `table_aliases` maps result aliases to the
    /// SQL table aliases used in the hand-written FROM clause.
    pub fn generate_select_clause(&self, table_aliases: &HashMap<String, String>) -> String {
        self.columns
            .iter()
            .map(|c| {
                let table_alias = table_aliases
                    .get(&c.alias)
                    .map(String::as_str)
                    .unwrap_or(c.alias.as_str());
                format!("{}.{} AS {}", table_alias, c.column_name, c.column_alias)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn mapping(&self) -> &ResultSetMapping {
        &self.rsm
    }

    pub fn build(self) -> ResultSetMapping {
        self.rsm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_metadata::testing::user_registry;

    #[test]
    fn test_incremental_renaming_avoids_clashes() {
        let registry = user_registry();
        let mut builder = ResultSetMappingBuilder::new(&registry, ColumnRenameMode::Incremental);
        builder.add_root_entity_from_class("User", "u").unwrap();
        builder
            .add_joined_entity_from_class("Address", "a", "u", "address")
            .unwrap();

        let mut aliases = HashMap::new();
        aliases.insert("u".to_string(), "t0".to_string());
        aliases.insert("a".to_string(), "t1".to_string());
        let select = builder.generate_select_clause(&aliases);
        assert!(select.starts_with("t0.id AS id0, t0.name AS name1, t0.email AS email2"));
        assert!(select.contains("t0.address_id AS address_id3"));
        assert!(select.contains("t1.id AS id4"));

        let rsm = builder.build();
        assert_eq!(rsm.meta_results["address_id3"].column_name, "address_id");
    }

    #[test]
    fn test_no_renaming_reports_clash() {
        let registry = user_registry();
        let mut builder = ResultSetMappingBuilder::new(&registry, ColumnRenameMode::None);
        builder.add_root_entity_from_class("User", "u").unwrap();
        let err = builder
            .add_joined_entity_from_class("Address", "a", "u", "address")
            .err();
        assert_eq!(
            err,
            Some(ResultMappingError::DuplicateColumnMapping {
                column_alias: "id".to_string()
            })
        );
    }

    #[test]
    fn test_joined_entity_requires_known_parent() {
        let registry = user_registry();
        let mut builder = ResultSetMappingBuilder::new(&registry, ColumnRenameMode::Incremental);
        assert!(matches!(
            builder.add_joined_entity_from_class("Address", "a", "u", "address"),
            Err(ResultMappingError::UnknownAlias { .. })
        ));
    }
}
