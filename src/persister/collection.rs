//! Collection loaders for one-to-many and many-to-many associations.

use indexmap::IndexMap;

use super::connection::Connection;
use super::entity_state::{index_key, EntityState};
use super::errors::PersisterError;
use super::{EntityPersister, RESULT_ALIAS};
use crate::class_metadata::association::ManyToManySide;
use crate::class_metadata::{AssociationKind, AssociationMapping};
use crate::platform::LockMode;
use crate::query::{Criteria, Expression, ParameterType, Value};
use crate::sql_walker::errors::TranslationError;

/// Elements of a loaded collection; keyed when the association declares
/// an index-by field
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedCollection {
    List(Vec<EntityState>),
    Indexed(IndexMap<String, EntityState>),
}

impl LoadedCollection {
    pub fn len(&self) -> usize {
        match self {
            LoadedCollection::List(items) => items.len(),
            LoadedCollection::Indexed(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<EntityState> {
        match self {
            LoadedCollection::List(items) => items,
            LoadedCollection::Indexed(items) => items.into_values().collect(),
        }
    }
}

impl<'a> EntityPersister<'a> {
    /// Loads collection `field` of `owner`, applying the association's
    /// ordering and index-by field
    pub fn load_collection(
        &self,
        conn: &mut dyn Connection,
        owner: &EntityState,
        field: &str,
    ) -> Result<LoadedCollection, PersisterError> {
        let class = self.check_class(owner)?;
        let assoc = class
            .association(field)
            .ok_or_else(|| PersisterError::unrecognized_field(&class.name, field))?;
        let owner_id = owner
            .identifier_values(class)
            .ok_or_else(|| PersisterError::missing_identifier(&class.name))?;

        let target = self.describe(&assoc.target_entity)?;
        let elements = EntityPersister::new(self.env, target);
        let mut criteria = Criteria::new();
        for order in assoc.order_by_fields() {
            criteria = criteria.order_by(order.field.clone(), order.direction);
        }

        let select = match &assoc.kind {
            AssociationKind::OneToMany { mapped_by, .. } => {
                let value = match owner_id.as_slice() {
                    [single] => single.clone(),
                    _ => Value::List(owner_id.clone()),
                };
                criteria = criteria.and_where(Expression::eq(mapped_by.clone(), value));
                elements.build_select(&criteria, LockMode::None, super::Projection::Entity)?
            }
            AssociationKind::ManyToMany { side, .. } => {
                let (owning, owner_columns, element_columns) = self.join_table_sides(assoc, side)?;
                let env = self.env;
                let table = env
                    .quote
                    .join_table_name(owning, env.platform)
                    .ok_or_else(|| TranslationError::InvalidInverseAssociation {
                        class_name: class.name.clone(),
                        field: field.to_string(),
                    })?;
                let id_types: Vec<ParameterType> = owner_columns
                    .iter()
                    .map(|jc| {
                        class
                            .field_for_column(&jc.referenced_column_name)
                            .and_then(|f| class.binding_type_of(f))
                            .unwrap_or(ParameterType::Integer)
                    })
                    .collect();
                elements.build_select_with(&criteria, LockMode::None, super::Projection::Entity, |scope| {
                    let columns = scope.join_table_columns(&table, &element_columns, &owner_columns);
                    let mut conditions = Vec::with_capacity(columns.len());
                    for ((column, value), param_type) in columns.iter().zip(&owner_id).zip(&id_types) {
                        conditions.push(format!("{} = ?", column));
                        scope.params.push(value.clone(), *param_type);
                    }
                    Ok(conditions)
                })?
            }
            _ => {
                return Err(TranslationError::unsupported_with_context(
                    format!("`{}.{}` is not a collection", class.name, field),
                    "Loading a collection",
                )
                .into())
            }
        };

        let rows = conn.fetch_all(&select.sql, &select.params)?;
        let Some(index_field) = assoc.index_by_field() else {
            let items = rows
                .iter()
                .map(|row| EntityState::from_row(&select.rsm, RESULT_ALIAS, row, self.env.registry))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(LoadedCollection::List(items));
        };

        let rsm = select.rsm.with_index_by(RESULT_ALIAS, index_field);
        let mut items = IndexMap::with_capacity(rows.len());
        for row in &rows {
            let state = EntityState::from_row(&rsm, RESULT_ALIAS, row, self.env.registry)?;
            let key = state
                .field(index_field)
                .map(index_key)
                .ok_or_else(|| PersisterError::unrecognized_field(&target.name, index_field))?;
            items.insert(key, state);
        }
        Ok(LoadedCollection::Indexed(items))
    }

    /// (owning association, columns pointing at the owner, columns pointing
    /// at the elements)
    fn join_table_sides(
        &self,
        assoc: &'a AssociationMapping,
        side: &ManyToManySide,
    ) -> Result<
        (
            &'a AssociationMapping,
            Vec<crate::class_metadata::JoinColumn>,
            Vec<crate::class_metadata::JoinColumn>,
        ),
        PersisterError,
    > {
        let owning = match side {
            ManyToManySide::Owning(_) => assoc,
            ManyToManySide::Inverse(inverse) => {
                self.describe(&assoc.target_entity)?
                    .get_association(&inverse.mapped_by)?
            }
        };
        let join_table = owning
            .join_table_mapping()
            .ok_or_else(|| TranslationError::InvalidInverseAssociation {
                class_name: assoc.source_entity.clone(),
                field: assoc.field_name.clone(),
            })?;
        Ok(match side {
            ManyToManySide::Owning(_) => (
                owning,
                join_table.join_columns.clone(),
                join_table.inverse_join_columns.clone(),
            ),
            ManyToManySide::Inverse(_) => (
                owning,
                join_table.inverse_join_columns.clone(),
                join_table.join_columns.clone(),
            ),
        })
    }
}
