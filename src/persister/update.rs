//! UPDATE path.
//!
//! Only changed columns are written, one statement per owning table, root
//! table first. The table holding the version column is always updated on
//! a versioned class: its statement bumps the version and checks the old
//! one, and zero affected rows there is an optimistic lock conflict.

use indexmap::IndexMap;

use super::connection::{first_value, Connection};
use super::entity_state::EntityState;
use super::errors::PersisterError;
use super::EntityPersister;
use crate::class_metadata::ClassDescriptor;
use crate::query::{ParameterList, ParameterType, Value};

impl<'a> EntityPersister<'a> {
    /// Writes the `changed` fields of `entity`. Identifier and version
    /// fields in `changed` are ignored.
    pub fn update(
        &self,
        conn: &mut dyn Connection,
        entity: &mut EntityState,
        changed: &[String],
    ) -> Result<(), PersisterError> {
        let env = self.env;
        let class = self.check_class(entity)?;
        let version = class.version_mapping();
        let version_owner = version.map(|v| class.owning_class_of(&v.field_name).to_string());

        let mut by_table: IndexMap<String, (Vec<String>, ParameterList)> = IndexMap::new();
        if let Some(owner) = &version_owner {
            by_table.insert(owner.clone(), (Vec::new(), ParameterList::new()));
        }
        for field in changed {
            if class.is_identifier(field) || class.version_field.as_deref() == Some(field.as_str()) {
                continue;
            }
            let owner = class.owning_class_of(field).to_string();
            if class.has_field(field) {
                let value = entity.field(field).cloned().unwrap_or(Value::Null);
                let param_type = class
                    .binding_type_of(field)
                    .unwrap_or_else(|| value.inferred_type());
                let (sets, params) = by_table.entry(owner).or_default();
                sets.push(format!("{} = ?", env.quote.column_name(field, class, env.platform)));
                params.push(value, param_type);
                continue;
            }

            let assoc = class
                .association(field)
                .ok_or_else(|| PersisterError::unrecognized_field(&class.name, field))?;
            if !assoc.is_owning_to_one() {
                // collections and inverse sides are written by their owners
                continue;
            }
            let target_class = self.describe(&assoc.target_entity)?;
            let target = entity.references.get(field).and_then(Option::as_ref);
            if let Some(target) = target.filter(|t| !t.is_persisted()) {
                return Err(PersisterError::missing_identifier(&target.class_name));
            }
            let (sets, params) = by_table.entry(owner).or_default();
            for join_column in assoc.join_columns() {
                let referenced_field = target_class
                    .field_for_column(&join_column.referenced_column_name)
                    .unwrap_or(join_column.referenced_column_name.as_str());
                let value = target
                    .and_then(|t| t.identifier.get(referenced_field).cloned())
                    .unwrap_or(Value::Null);
                let param_type = target_class
                    .binding_type_of(referenced_field)
                    .unwrap_or_else(|| value.inferred_type());
                sets.push(format!("{} = ?", env.quote.join_column_name(join_column, env.platform)));
                params.push(value, param_type);
            }
        }

        let mut tables = self.hierarchy_tables(class)?;
        tables.reverse();
        for table in tables {
            let Some((mut sets, mut params)) = by_table.shift_remove(&table.name) else {
                continue;
            };
            let is_version_table = version_owner.as_deref() == Some(table.name.as_str());
            let mut version_check = None;
            if let (true, Some(mapping)) = (is_version_table, version) {
                let column = env.quote.column_name(&mapping.field_name, class, env.platform);
                if mapping.column_type.is_temporal() {
                    sets.push(format!("{} = {}", column, env.platform.current_timestamp_sql()));
                } else {
                    sets.push(format!("{} = {} + 1", column, column));
                }
                let current = entity.field(&mapping.field_name).cloned().unwrap_or(Value::Null);
                version_check = Some((column, current, mapping.column_type.binding_type()));
            }
            if sets.is_empty() {
                continue;
            }

            let mut sql = format!("UPDATE {} SET {}", self.table_sql(table), sets.join(", "));
            sql.push_str(&self.identifier_where(class, entity, &mut params)?);
            if let Some((column, current, param_type)) = version_check {
                sql.push_str(&format!(" AND {} = ?", column));
                params.push(current, param_type);
            }

            let affected = conn.execute(&sql, &params)?;
            if is_version_table && affected == 0 {
                let identifier = entity
                    .identifier_values(class)
                    .unwrap_or_default()
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                log::warn!("Stale {} {} rejected by version check", class.name, identifier);
                return Err(PersisterError::OptimisticLockConflict {
                    class_name: class.name.clone(),
                    identifier,
                });
            }
        }

        if version.is_some() {
            self.refresh_version(conn, entity)?;
        }
        Ok(())
    }

    /// Reads the stored version back into `entity`
    pub(super) fn refresh_version(
        &self,
        conn: &mut dyn Connection,
        entity: &mut EntityState,
    ) -> Result<(), PersisterError> {
        let env = self.env;
        let class = self.describe(&entity.class_name)?;
        let Some(mapping) = class.version_mapping() else {
            return Ok(());
        };
        let owner = self.describe(class.owning_class_of(&mapping.field_name))?;
        let column = env.quote.column_name(&mapping.field_name, class, env.platform);

        let mut params = ParameterList::new();
        let conditions = self.identifier_conditions(class, entity, Some("t0"), &mut params)?;
        let sql = format!(
            "SELECT t0.{} FROM {} t0 WHERE {}",
            column,
            self.table_sql(owner),
            conditions.join(" AND ")
        );
        let rows = conn.fetch_all(&sql, &params)?;
        if let Some(value) = rows.first().and_then(first_value) {
            entity.set_field(mapping.field_name.clone(), value.clone());
        }
        Ok(())
    }

    /// ` WHERE id = ?` over the identifier columns, binding the values
    pub(super) fn identifier_where(
        &self,
        class: &ClassDescriptor,
        entity: &EntityState,
        params: &mut ParameterList,
    ) -> Result<String, PersisterError> {
        let conditions = self.identifier_conditions(class, entity, None, params)?;
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }

    fn identifier_conditions(
        &self,
        class: &ClassDescriptor,
        entity: &EntityState,
        alias: Option<&str>,
        params: &mut ParameterList,
    ) -> Result<Vec<String>, PersisterError> {
        let env = self.env;
        let columns = env.quote.identifier_column_names(class, env.platform);
        let values = entity
            .identifier_values(class)
            .filter(|values| values.len() == columns.len())
            .ok_or_else(|| PersisterError::missing_identifier(&class.name))?;

        // association identifiers may span several columns and bind as inferred
        let mapped_types: Vec<Option<ParameterType>> = if class.identifier.len() == columns.len() {
            class.identifier.iter().map(|id| class.binding_type_of(id)).collect()
        } else {
            vec![None; columns.len()]
        };

        let mut conditions = Vec::with_capacity(columns.len());
        for ((column, mapped_type), value) in columns.iter().zip(mapped_types).zip(values) {
            conditions.push(match alias {
                Some(alias) => format!("{}.{} = ?", alias, column),
                None => format!("{} = ?", column),
            });
            let param_type = mapped_type.unwrap_or_else(|| value.inferred_type());
            params.push(value, param_type);
        }
        Ok(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_metadata::testing::{inheritance_registry, user_registry};
    use crate::class_metadata::MetadataRegistry;
    use crate::filters::FilterCollection;
    use crate::persister::testing::{row, MockDriver, RecordingConnection};
    use crate::persister::EntityRef;
    use crate::platform::{DefaultQuoteStrategy, PostgreSqlPlatform};
    use crate::sql_walker::TranslationEnv;
    use mockall::predicate;

    fn run_update(
        registry: &MetadataRegistry,
        class: &str,
        conn: &mut dyn Connection,
        entity: &mut EntityState,
        changed: &[&str],
    ) -> Result<(), PersisterError> {
        let filters = FilterCollection::new();
        let env = TranslationEnv {
            registry,
            platform: &PostgreSqlPlatform,
            quote: &DefaultQuoteStrategy,
            filters: &filters,
            max_identifier_length: 63,
        };
        let changed: Vec<String> = changed.iter().map(|s| s.to_string()).collect();
        EntityPersister::new(env, registry.describe(class).unwrap()).update(conn, entity, &changed)
    }

    #[test]
    fn test_update_writes_changed_columns_only() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new();
        let mut user = EntityState::new("User")
            .with_field("id", 3)
            .with_field("name", "Ada")
            .with_field("email", "ada@example.com")
            .with_reference("address", Some(EntityRef::new("Address").with_id("id", 9)));

        run_update(&registry, "User", &mut conn, &mut user, &["email", "address", "phones"]).unwrap();
        assert_eq!(
            conn.sql(),
            vec!["UPDATE user SET email = ?, address_id = ? WHERE id = ?"]
        );
        assert_eq!(
            conn.statements[0].1,
            vec![Value::from("ada@example.com"), Value::Int(9), Value::Int(3)]
        );
    }

    #[test]
    fn test_versioned_update_bumps_and_rereads() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new()
            .with_affected(1)
            .with_rows(vec![row(&[("version", Value::Int(5))])]);
        let mut article = EntityState::new("Article")
            .with_field("id", 1)
            .with_field("title", "New")
            .with_field("version", 4);

        run_update(&registry, "Article", &mut conn, &mut article, &["title"]).unwrap();
        assert_eq!(
            conn.sql(),
            vec![
                "UPDATE article SET title = ?, version = version + 1 WHERE id = ? AND version = ?",
                "SELECT t0.version FROM article t0 WHERE t0.id = ?",
            ]
        );
        assert_eq!(
            conn.statements[0].1,
            vec![Value::from("New"), Value::Int(1), Value::Int(4)]
        );
        assert_eq!(article.field("version"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_version_conflict_stops_further_writes() {
        let registry = user_registry();
        let mut driver = MockDriver::new();
        driver
            .expect_execute()
            .with(
                predicate::eq("UPDATE article SET title = ?, version = version + 1 WHERE id = ? AND version = ?"),
                predicate::always(),
            )
            .times(1)
            .returning(|_, _| Ok(0));
        driver.expect_fetch_all().never();

        let mut article = EntityState::new("Article")
            .with_field("id", 1)
            .with_field("title", "New")
            .with_field("version", 4);
        let err = run_update(&registry, "Article", &mut driver, &mut article, &["title"]).unwrap_err();
        assert_eq!(
            err,
            PersisterError::OptimisticLockConflict {
                class_name: "Article".to_string(),
                identifier: "1".to_string(),
            }
        );
        assert_eq!(article.field("version"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_joined_update_per_table_root_first() {
        let registry = inheritance_registry();
        let mut conn = RecordingConnection::new();
        let mut manager = EntityState::new("Manager")
            .with_field("id", 2)
            .with_field("name", "Grace")
            .with_field("title", "CTO");

        run_update(&registry, "Manager", &mut conn, &mut manager, &["title", "name"]).unwrap();
        assert_eq!(
            conn.sql(),
            vec![
                "UPDATE person SET name = ? WHERE id = ?",
                "UPDATE manager SET title = ? WHERE id = ?",
            ]
        );
    }

    #[test]
    fn test_identifier_binds_with_mapped_type() {
        let registry = user_registry();
        let filters = FilterCollection::new();
        let env = TranslationEnv {
            registry: &registry,
            platform: &PostgreSqlPlatform,
            quote: &DefaultQuoteStrategy,
            filters: &filters,
            max_identifier_length: 63,
        };
        let class = registry.describe("User").unwrap();
        let user = EntityState::new("User").with_field("id", "3");

        let mut params = ParameterList::new();
        let conditions = EntityPersister::new(env, class)
            .identifier_conditions(class, &user, None, &mut params)
            .unwrap();
        assert_eq!(conditions, vec!["id = ?"]);
        assert_eq!(params.values(), vec![Value::from("3")]);
        assert_eq!(params.types(), vec![ParameterType::Integer]);
    }

    #[test]
    fn test_update_without_identifier_fails() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new();
        let mut user = EntityState::new("User").with_field("name", "Ada");
        let err = run_update(&registry, "User", &mut conn, &mut user, &["name"]).unwrap_err();
        assert_eq!(err, PersisterError::missing_identifier("User"));
    }

    #[test]
    fn test_unchanged_unversioned_entity_is_a_no_op() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new();
        let mut user = EntityState::new("User").with_field("id", 1);
        run_update(&registry, "User", &mut conn, &mut user, &[]).unwrap();
        assert!(conn.statements.is_empty());
    }
}
