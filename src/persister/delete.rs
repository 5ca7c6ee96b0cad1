//! DELETE path.
//!
//! Join-table rows of many-to-many associations go first unless the
//! database removes them through cascading foreign keys. The entity rows
//! follow, most derived table first.

use super::connection::Connection;
use super::entity_state::EntityState;
use super::errors::PersisterError;
use super::EntityPersister;
use crate::class_metadata::association::ManyToManySide;
use crate::class_metadata::{AssociationKind, ClassDescriptor, JoinColumn};
use crate::query::{ParameterList, Value};

impl<'a> EntityPersister<'a> {
    pub fn delete(&self, conn: &mut dyn Connection, entity: &EntityState) -> Result<(), PersisterError> {
        let class = self.check_class(entity)?;
        let identifier = entity
            .identifier_values(class)
            .ok_or_else(|| PersisterError::missing_identifier(&class.name))?;

        for sql in self.join_table_delete_sql(class)? {
            conn.execute(&sql, &identifier_params(&identifier))?;
        }

        for table in self.hierarchy_tables(class)? {
            let mut params = ParameterList::new();
            let mut sql = format!("DELETE FROM {}", self.table_sql(table));
            sql.push_str(&self.identifier_where(class, entity, &mut params)?);
            conn.execute(&sql, &params)?;
        }
        log::debug!("Deleted {} {:?}", class.name, identifier);
        Ok(())
    }

    /// `DELETE FROM join_table WHERE fk = ?` per many-to-many association,
    /// each bound to the entity identifier
    pub fn join_table_delete_sql(&self, class: &ClassDescriptor) -> Result<Vec<String>, PersisterError> {
        let env = self.env;
        let mut statements: Vec<String> = Vec::new();

        for assoc in class.associations.values() {
            let AssociationKind::ManyToMany { side, .. } = &assoc.kind else {
                continue;
            };
            let (owning, own_columns, other_columns) = match side {
                ManyToManySide::Owning(owning) => (
                    assoc,
                    &owning.join_table.join_columns,
                    &owning.join_table.inverse_join_columns,
                ),
                ManyToManySide::Inverse(inverse) => {
                    let target = self.describe(&assoc.target_entity)?;
                    let owning = target.get_association(&inverse.mapped_by)?;
                    let Some(join_table) = owning.join_table_mapping() else {
                        continue;
                    };
                    (owning, &join_table.inverse_join_columns, &join_table.join_columns)
                }
            };
            if owning.is_on_delete_cascade() && env.platform.supports_foreign_key_constraints() {
                continue;
            }
            let Some(table) = env.quote.join_table_name(owning, env.platform) else {
                continue;
            };

            let mut candidates = vec![self.join_table_delete(&table, own_columns)];
            if assoc.is_self_referential() {
                candidates.push(self.join_table_delete(&table, other_columns));
            }
            for sql in candidates {
                if !statements.contains(&sql) {
                    statements.push(sql);
                }
            }
        }
        Ok(statements)
    }

    fn join_table_delete(&self, table: &str, columns: &[JoinColumn]) -> String {
        let env = self.env;
        let conditions: Vec<String> = columns
            .iter()
            .map(|jc| format!("{} = ?", env.quote.join_column_name(jc, env.platform)))
            .collect();
        format!("DELETE FROM {} WHERE {}", table, conditions.join(" AND "))
    }
}

fn identifier_params(identifier: &[Value]) -> ParameterList {
    let mut params = ParameterList::new();
    for value in identifier {
        params.push(value.clone(), value.inferred_type());
    }
    params
}
