//! Field-level state of one entity instance.
//!
//! The persisters do not know about user structs. An entity travels as an
//! [`EntityState`]: scalar field values plus, per single-valued association,
//! a reference to the target identified by its identifier values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::connection::Row;
use super::errors::PersisterError;
use crate::class_metadata::{ClassDescriptor, MetadataRegistry};
use crate::query::Value;
use crate::result_mapping::{ResultMappingError, ResultSetMapping};
use crate::sql_walker::errors::TranslationError;

/// Reference to an entity by identifier. An empty identifier stands for an
/// entity that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub class_name: String,
    pub identifier: IndexMap<String, Value>,
}

impl EntityRef {
    pub fn new(class_name: impl Into<String>) -> Self {
        EntityRef {
            class_name: class_name.into(),
            identifier: IndexMap::new(),
        }
    }

    pub fn with_id(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.identifier.insert(field.into(), value.into());
        self
    }

    pub fn is_persisted(&self) -> bool {
        !self.identifier.is_empty() && self.identifier.values().all(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub class_name: String,
    pub fields: IndexMap<String, Value>,
    pub references: IndexMap<String, Option<EntityRef>>,
}

impl EntityState {
    pub fn new(class_name: impl Into<String>) -> Self {
        EntityState {
            class_name: class_name.into(),
            fields: IndexMap::new(),
            references: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn with_reference(mut self, field: impl Into<String>, target: Option<EntityRef>) -> Self {
        self.references.insert(field.into(), target);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Identifier values in identifier order; `None` while any part is
    /// missing or null. Derived identities read the target's identifier.
    pub fn identifier_values(&self, class: &ClassDescriptor) -> Option<Vec<Value>> {
        let mut values = Vec::with_capacity(class.identifier.len());
        for id in &class.identifier {
            if class.has_field(id) {
                match self.fields.get(id) {
                    Some(value) if !value.is_null() => values.push(value.clone()),
                    _ => return None,
                }
            } else {
                let target = self.references.get(id)?.as_ref()?;
                if !target.is_persisted() {
                    return None;
                }
                values.extend(target.identifier.values().cloned());
            }
        }
        Some(values)
    }

    /// As a reference to itself, for wiring associations of other entities
    pub fn to_ref(&self, class: &ClassDescriptor) -> EntityRef {
        let mut reference = EntityRef::new(&self.class_name);
        for id in &class.identifier {
            if let Some(value) = self.fields.get(id) {
                reference.identifier.insert(id.clone(), value.clone());
            }
        }
        reference
    }

    /// Builds the state of entity result `alias` from one row.
    ///
    /// The discriminator column, when mapped, picks the concrete class;
    /// columns of sibling subclasses are ignored.
    pub fn from_row(
        rsm: &ResultSetMapping,
        alias: &str,
        row: &Row,
        registry: &MetadataRegistry,
    ) -> Result<EntityState, PersisterError> {
        let mapped_class = rsm.class_of(alias).ok_or_else(|| {
            TranslationError::ResultMapping(ResultMappingError::UnknownAlias {
                alias: alias.to_string(),
            })
        })?;
        let mut class = registry.describe(mapped_class)?;

        let discriminator_alias = rsm.discriminator_columns.get(alias);
        if let Some(column_alias) = discriminator_alias {
            if let Some(Value::String(value)) = row.get(column_alias) {
                if let Some(concrete) = class.discriminator_map.get(value) {
                    class = registry.describe(concrete)?;
                }
            }
        }

        let mut state = EntityState::new(&class.name);
        for (column_alias, result) in rsm.field_results.iter().filter(|(_, r)| r.alias == alias) {
            if !class.has_field(&result.field_name) {
                continue;
            }
            let value = row
                .get(column_alias)
                .ok_or_else(|| PersisterError::MissingColumn {
                    class_name: class.name.clone(),
                    column: column_alias.clone(),
                })?;
            state.fields.insert(result.field_name.clone(), value.clone());
        }

        for (column_alias, meta) in rsm.meta_results.iter().filter(|(_, m)| m.alias == alias) {
            if discriminator_alias == Some(column_alias) {
                continue;
            }
            let Some((assoc_name, referenced_field, target_class)) =
                foreign_key_target(class, &meta.column_name, registry)?
            else {
                continue;
            };
            let value = row.get(column_alias).cloned().unwrap_or(Value::Null);
            let slot = state
                .references
                .entry(assoc_name)
                .or_insert_with(|| Some(EntityRef::new(target_class)));
            if value.is_null() {
                *slot = None;
            } else if let Some(reference) = slot.as_mut() {
                reference.identifier.insert(referenced_field, value);
            }
        }
        Ok(state)
    }
}

/// (association, referenced target field, target class) for a foreign key
/// column of `class`
fn foreign_key_target(
    class: &ClassDescriptor,
    column_name: &str,
    registry: &MetadataRegistry,
) -> Result<Option<(String, String, String)>, PersisterError> {
    for assoc in class.associations.values() {
        let Some(join_column) = assoc.join_columns().iter().find(|jc| jc.name == column_name) else {
            continue;
        };
        let target = registry.describe(&assoc.target_entity)?;
        let referenced_field = target
            .field_for_column(&join_column.referenced_column_name)
            .unwrap_or(join_column.referenced_column_name.as_str())
            .to_string();
        return Ok(Some((
            assoc.field_name.clone(),
            referenced_field,
            target.name.clone(),
        )));
    }
    Ok(None)
}

/// Key under which an indexed collection stores an element
pub fn index_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_metadata::testing::{single_table_registry, user_registry};

    #[test]
    fn test_from_row_reads_fields_and_references() {
        let registry = user_registry();
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("User", "r", None);
        rsm.add_field_result("r", "id_0", "id", "User").unwrap();
        rsm.add_field_result("r", "name_1", "name", "User").unwrap();
        rsm.add_field_result("r", "email_2", "email", "User").unwrap();
        rsm.add_meta_result("r", "address_id_3", "address_id", false, None)
            .unwrap();

        let row: Row = [
            ("id_0", Value::Int(7)),
            ("name_1", Value::from("Ada")),
            ("email_2", Value::from("ada@example.com")),
            ("address_id_3", Value::Int(3)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let state = EntityState::from_row(&rsm, "r", &row, &registry).unwrap();
        assert_eq!(state.class_name, "User");
        assert_eq!(state.field("name"), Some(&Value::from("Ada")));
        assert_eq!(
            state.references["address"],
            Some(EntityRef::new("Address").with_id("id", 3))
        );
        let user = registry.describe("User").unwrap();
        assert_eq!(state.identifier_values(user), Some(vec![Value::Int(7)]));
    }

    #[test]
    fn test_null_foreign_key_is_no_reference() {
        let registry = user_registry();
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("User", "r", None);
        rsm.add_field_result("r", "id_0", "id", "User").unwrap();
        rsm.add_meta_result("r", "address_id_1", "address_id", false, None)
            .unwrap();
        let row: Row = [("id_0", Value::Int(1)), ("address_id_1", Value::Null)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let state = EntityState::from_row(&rsm, "r", &row, &registry).unwrap();
        assert_eq!(state.references["address"], None);
    }

    #[test]
    fn test_discriminator_selects_concrete_class() {
        let registry = single_table_registry();
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("Vehicle", "r", None);
        rsm.add_field_result("r", "id_0", "id", "Vehicle").unwrap();
        rsm.add_field_result("r", "doors_1", "doors", "Car").unwrap();
        rsm.add_field_result("r", "payload_2", "payload", "Truck").unwrap();
        rsm.add_meta_result("r", "type_3", "type", false, None).unwrap();
        rsm.set_discriminator_column("r", "type_3");

        let row: Row = [
            ("id_0", Value::Int(1)),
            ("doors_1", Value::Int(4)),
            ("payload_2", Value::Null),
            ("type_3", Value::from("car")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let state = EntityState::from_row(&rsm, "r", &row, &registry).unwrap();
        assert_eq!(state.class_name, "Car");
        assert!(state.fields.contains_key("doors"));
        assert!(!state.fields.contains_key("payload"));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let registry = user_registry();
        let mut rsm = ResultSetMapping::new();
        rsm.add_entity_result("User", "r", None);
        rsm.add_field_result("r", "id_0", "id", "User").unwrap();

        let err = EntityState::from_row(&rsm, "r", &Row::new(), &registry).unwrap_err();
        assert!(matches!(err, PersisterError::MissingColumn { .. }));
    }

    #[test]
    fn test_unsaved_reference() {
        assert!(!EntityRef::new("User").is_persisted());
        assert!(EntityRef::new("User").with_id("id", 1).is_persisted());
        assert_eq!(index_key(&Value::from("x")), "x");
        assert_eq!(index_key(&Value::Int(2)), "2");
    }
}
