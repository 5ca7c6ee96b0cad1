//! INSERT path.
//!
//! The column list of every table is fixed from metadata before the first
//! row, so one prepared statement per table serves the whole batch. Under
//! joined inheritance the root table is written first; a generated
//! identifier is read back after it and flows into the child tables.

use super::connection::{first_value, Connection};
use super::entity_state::{EntityRef, EntityState};
use super::errors::PersisterError;
use super::EntityPersister;
use crate::class_metadata::{AssociationMapping, ClassDescriptor, ColumnType, IdGenerator};
use crate::query::{ParameterList, ParameterType, Value};

/// A to-one reference written as NULL because its target had no
/// identifier yet; the caller fixes it with
/// [`EntityPersister::update_reference`] once the target is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReference {
    /// Position of the entity in the inserted batch
    pub index: usize,
    pub field: String,
    pub target: EntityRef,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOutcome {
    pub pending: Vec<PendingReference>,
}

#[derive(Debug, Clone, PartialEq)]
enum InsertColumn {
    Field(String),
    JoinColumn {
        association: String,
        referenced_field: String,
        binding: Option<ParameterType>,
    },
    Discriminator(String),
}

/// INSERT statement of one table
#[derive(Debug, Clone, PartialEq)]
pub(super) struct TableInsert<'a> {
    class: &'a ClassDescriptor,
    pub sql: String,
    columns: Vec<InsertColumn>,
    /// Generated identifier is read back after this statement
    reads_identity: bool,
}

impl<'a> EntityPersister<'a> {
    /// INSERT statements in execution order
    pub(super) fn insert_plans(&self) -> Result<Vec<TableInsert<'a>>, PersisterError> {
        let mut tables = self.hierarchy_tables(self.class)?;
        tables.reverse();
        let root_name = &self.class.root_entity_name;
        tables
            .into_iter()
            .map(|table| {
                let is_root_table = !self.class.is_inheritance_type_joined() || &table.name == root_name;
                self.table_insert(table, is_root_table)
            })
            .collect()
    }

    fn table_insert(
        &self,
        table: &'a ClassDescriptor,
        is_root_table: bool,
    ) -> Result<TableInsert<'a>, PersisterError> {
        let env = self.env;
        let class = self.class;
        let skip_identity = is_root_table && class.is_id_generator_identity();
        let mut names = Vec::new();
        let mut columns = Vec::new();

        // child tables of a joined hierarchy repeat the identifier
        if !is_root_table {
            for id in &class.identifier {
                if class.has_field(id) {
                    names.push(env.quote.column_name(id, class, env.platform));
                    columns.push(InsertColumn::Field(id.clone()));
                } else {
                    let assoc = class.get_association(id)?;
                    self.push_join_columns(assoc, &mut names, &mut columns)?;
                }
            }
        }

        for name in class.fields.keys() {
            if class.owning_class_of(name) != table.name
                || (skip_identity && class.is_identifier(name))
                || (!is_root_table && class.is_identifier(name))
            {
                continue;
            }
            names.push(env.quote.column_name(name, class, env.platform));
            columns.push(InsertColumn::Field(name.clone()));
        }

        for (name, assoc) in &class.associations {
            if !assoc.is_owning_to_one()
                || class.owning_class_of(name) != table.name
                || (!is_root_table && class.is_identifier(name))
            {
                continue;
            }
            self.push_join_columns(assoc, &mut names, &mut columns)?;
        }

        if is_root_table && class.has_discriminator() {
            if let (Some(column), Some(value)) = (
                env.quote.discriminator_column_name(class, env.platform),
                class.discriminator_value.as_ref(),
            ) {
                names.push(column);
                columns.push(InsertColumn::Discriminator(value.clone()));
            }
        }

        let table_sql = self.table_sql(table);
        let sql = if names.is_empty() {
            let id_columns = env.quote.identifier_column_names(class, env.platform);
            env.platform
                .empty_identity_insert_sql(&table_sql, &id_columns.join(", "))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table_sql,
                names.join(", "),
                vec!["?"; names.len()].join(", ")
            )
        };
        Ok(TableInsert {
            class: table,
            sql,
            columns,
            reads_identity: skip_identity,
        })
    }

    fn push_join_columns(
        &self,
        assoc: &AssociationMapping,
        names: &mut Vec<String>,
        columns: &mut Vec<InsertColumn>,
    ) -> Result<(), PersisterError> {
        let env = self.env;
        let target = self.describe(&assoc.target_entity)?;
        for join_column in assoc.join_columns() {
            let referenced_field = target
                .field_for_column(&join_column.referenced_column_name)
                .unwrap_or(join_column.referenced_column_name.as_str())
                .to_string();
            names.push(env.quote.join_column_name(join_column, env.platform));
            columns.push(InsertColumn::JoinColumn {
                association: assoc.field_name.clone(),
                binding: target.binding_type_of(&referenced_field),
                referenced_field,
            });
        }
        Ok(())
    }

    /// Inserts `entities`, all of this persister's class, stopping at the
    /// first failure. Generated identifiers and initial versions are
    /// written back into the states.
    pub fn insert(
        &self,
        conn: &mut dyn Connection,
        entities: &mut [EntityState],
    ) -> Result<InsertOutcome, PersisterError> {
        let class = self.class;
        for entity in entities.iter() {
            if entity.class_name != class.name {
                return Err(PersisterError::ClassMismatch {
                    expected: class.name.clone(),
                    actual: entity.class_name.clone(),
                });
            }
        }

        let plans = self.insert_plans()?;
        let mut statements = Vec::with_capacity(plans.len());
        for plan in &plans {
            statements.push(conn.prepare(&plan.sql)?);
        }

        let mut outcome = InsertOutcome::default();
        for (index, entity) in entities.iter_mut().enumerate() {
            self.assign_sequence_identifier(conn, entity)?;
            if !class.is_id_generator_identity() && entity.identifier_values(class).is_none() {
                return Err(PersisterError::missing_identifier(&class.name));
            }
            self.assign_initial_version(entity);

            for (plan, statement) in plans.iter().zip(&statements) {
                let params = self.insert_params(plan, entity, index, &mut outcome.pending)?;
                conn.execute_prepared(statement, &params)?;
                if plan.reads_identity {
                    let id = conn
                        .last_insert_id()?
                        .ok_or_else(|| PersisterError::missing_identifier(&class.name))?;
                    let id_field = class.single_identifier_field()?;
                    entity.set_field(id_field, id);
                }
            }

            if class.is_versioned() {
                self.refresh_version(conn, entity)?;
            }
        }

        log::debug!(
            "Inserted {} {} row(s), {} pending reference(s)",
            entities.len(),
            class.name,
            outcome.pending.len()
        );
        Ok(outcome)
    }

    fn insert_params(
        &self,
        plan: &TableInsert<'_>,
        entity: &EntityState,
        index: usize,
        pending: &mut Vec<PendingReference>,
    ) -> Result<ParameterList, PersisterError> {
        let class = self.class;
        let mut params = ParameterList::new();
        for column in &plan.columns {
            match column {
                InsertColumn::Field(name) => {
                    let value = entity.field(name).cloned().unwrap_or(Value::Null);
                    let param_type = class
                        .binding_type_of(name)
                        .unwrap_or_else(|| value.inferred_type());
                    params.push(value, param_type);
                }
                InsertColumn::JoinColumn {
                    association,
                    referenced_field,
                    binding,
                } => {
                    let value = match entity.references.get(association) {
                        Some(Some(target)) if target.is_persisted() => target
                            .identifier
                            .get(referenced_field)
                            .cloned()
                            .unwrap_or(Value::Null),
                        Some(Some(target)) => {
                            if class.is_identifier(association) {
                                return Err(PersisterError::missing_identifier(&target.class_name));
                            }
                            let already = pending
                                .iter()
                                .any(|p| p.index == index && &p.field == association);
                            if !already {
                                pending.push(PendingReference {
                                    index,
                                    field: association.clone(),
                                    target: target.clone(),
                                });
                            }
                            Value::Null
                        }
                        _ => Value::Null,
                    };
                    let param_type = binding.unwrap_or_else(|| value.inferred_type());
                    params.push(value, param_type);
                }
                InsertColumn::Discriminator(value) => {
                    params.push(Value::String(value.clone()), ParameterType::String);
                }
            }
        }
        log::trace!("Binding {} value(s) for {}", params.len(), plan.class.name);
        Ok(params)
    }

    fn assign_sequence_identifier(
        &self,
        conn: &mut dyn Connection,
        entity: &mut EntityState,
    ) -> Result<(), PersisterError> {
        let IdGenerator::Sequence { name } = &self.class.id_generator else {
            return Ok(());
        };
        let id_field = self.class.single_identifier_field()?;
        if entity.field(id_field).is_some_and(|v| !v.is_null()) {
            return Ok(());
        }
        let sql = self.env.platform.sequence_next_val_sql(name)?;
        let rows = conn.fetch_all(&sql, &ParameterList::new())?;
        let id = rows
            .first()
            .and_then(first_value)
            .cloned()
            .ok_or_else(|| PersisterError::missing_identifier(&self.class.name))?;
        entity.set_field(id_field, id);
        Ok(())
    }

    /// Versions start at 1, or at the current time for temporal columns
    fn assign_initial_version(&self, entity: &mut EntityState) {
        let Some(mapping) = self.class.version_mapping() else {
            return;
        };
        if entity.field(&mapping.field_name).is_some_and(|v| !v.is_null()) {
            return;
        }
        let now = chrono::Utc::now();
        let initial = match mapping.column_type {
            ColumnType::Date => Value::Date(now.date_naive()),
            column_type if column_type.is_temporal() => Value::DateTime(now.naive_utc()),
            _ => Value::Int(1),
        };
        entity.set_field(mapping.field_name.clone(), initial);
    }

    /// `UPDATE t SET fk = ? WHERE id = ?` for a reference inserted as NULL
    pub fn update_reference(
        &self,
        conn: &mut dyn Connection,
        entity: &EntityState,
        field: &str,
        target: &EntityRef,
    ) -> Result<(), PersisterError> {
        let env = self.env;
        let class = self.check_class(entity)?;
        let assoc = class
            .association(field)
            .ok_or_else(|| PersisterError::unrecognized_field(&class.name, field))?;
        if !assoc.is_owning_to_one() {
            return Err(crate::sql_walker::TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: field.to_string(),
            }
            .into());
        }
        if !target.is_persisted() {
            return Err(PersisterError::missing_identifier(&target.class_name));
        }

        let target_class = self.describe(&assoc.target_entity)?;
        let mut params = ParameterList::new();
        let mut assignments = Vec::new();
        for join_column in assoc.join_columns() {
            let referenced_field = target_class
                .field_for_column(&join_column.referenced_column_name)
                .unwrap_or(join_column.referenced_column_name.as_str());
            let value = target
                .identifier
                .get(referenced_field)
                .cloned()
                .unwrap_or(Value::Null);
            let param_type = target_class
                .binding_type_of(referenced_field)
                .unwrap_or_else(|| value.inferred_type());
            assignments.push(format!("{} = ?", env.quote.join_column_name(join_column, env.platform)));
            params.push(value, param_type);
        }

        let owner = self.describe(class.owning_class_of(field))?;
        let mut sql = format!("UPDATE {} SET {}", self.table_sql(owner), assignments.join(", "));
        sql.push_str(&self.identifier_where(class, entity, &mut params)?);
        conn.execute(&sql, &params)?;
        Ok(())
    }
}
