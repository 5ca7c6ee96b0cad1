//! Persister selects: entity loads, existence, counts and lock statements.
//!
//! Every select uses fixed `t{n}` table aliases with the class's own table
//! as `t0`. Joined inheritance parents are joined INNER, subclasses LEFT;
//! single table inheritance restricts by discriminator values instead.

use std::collections::HashSet;

use super::condition::SqlScope;
use super::connection::{first_value, Connection};
use super::entity_state::EntityState;
use super::errors::PersisterError;
use super::{EntityPersister, RESULT_ALIAS};
use crate::class_metadata::ClassDescriptor;
use crate::platform::LockMode;
use crate::query::{Criteria, FieldCriteria, ParameterList, Value};
use crate::result_mapping::ResultSetMapping;
use crate::sql_walker::errors::TranslationError;
use crate::sql_walker::where_sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Every mapped column, hydratable through the mapping
    Entity,
    /// `SELECT 1`
    Exists,
    /// `SELECT COUNT(*)`
    Count,
}

/// A rendered select with its mapping and bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSql {
    pub sql: String,
    pub rsm: ResultSetMapping,
    pub params: ParameterList,
}

impl<'a> EntityPersister<'a> {
    pub fn select_sql(&self, criteria: &Criteria, lock_mode: LockMode) -> Result<SelectSql, PersisterError> {
        self.build_select(criteria, lock_mode, Projection::Entity)
    }

    pub fn build_select(
        &self,
        criteria: &Criteria,
        lock_mode: LockMode,
        projection: Projection,
    ) -> Result<SelectSql, PersisterError> {
        self.build_select_with(criteria, lock_mode, projection, |_| Ok(Vec::new()))
    }

    /// `build_select` with conditions from `restrict` placed first
    pub(super) fn build_select_with<F>(
        &self,
        criteria: &Criteria,
        lock_mode: LockMode,
        projection: Projection,
        restrict: F,
    ) -> Result<SelectSql, PersisterError>
    where
        F: FnOnce(&mut SqlScope<'a>) -> Result<Vec<String>, PersisterError>,
    {
        let class = self.class;
        let lock_clause = self.lock_clause(lock_mode)?;
        let mut scope = self.scope();
        let root_alias = scope.root_alias();
        let mut rsm = ResultSetMapping::new();

        let select_list = match projection {
            Projection::Entity => {
                rsm.add_entity_result(&class.name, RESULT_ALIAS, None);
                self.select_columns(&mut scope, &mut rsm)?.join(", ")
            }
            Projection::Exists => "1".to_string(),
            Projection::Count => "COUNT(*)".to_string(),
        };

        let mut conditions = restrict(&mut scope)?;
        if let Some(expr) = &criteria.where_expr {
            conditions.push(scope.condition_sql(expr)?);
        }
        conditions.extend(self.restrictions(&mut scope)?);

        let mut order_by = Vec::new();
        if projection == Projection::Entity {
            for (field, direction) in &criteria.orderings {
                let (columns, _) = scope.field_columns(field)?;
                order_by.extend(
                    columns
                        .into_iter()
                        .map(|column| format!("{} {}", column, direction.as_sql())),
                );
            }
        }

        let from = self.from_clause(&mut scope, &root_alias, lock_mode, projection == Projection::Entity)?;
        let mut sql = format!("SELECT {} {}", select_list, from);
        sql.push_str(&where_sql(conditions));

        if projection == Projection::Entity {
            if !order_by.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_by.join(", "));
            }
            sql = self
                .env
                .platform
                .modify_limit_query(&sql, criteria.max_results, criteria.first_result)?;
            if !lock_clause.is_empty() {
                sql.push(' ');
                sql.push_str(&lock_clause);
            }
        }

        log::debug!("{:?} select for {}: {}", projection, class.name, sql);
        Ok(SelectSql {
            sql,
            rsm,
            params: scope.params,
        })
    }

    /// `SELECT 1 FROM ... <hint> WHERE ... <lock clause>`
    pub fn lock_sql(&self, criteria: &FieldCriteria, lock_mode: LockMode) -> Result<SelectSql, PersisterError> {
        let lock_clause = self.lock_clause(lock_mode)?;
        let mut scope = self.scope();
        let root_alias = scope.root_alias();

        let mut conditions = Vec::new();
        if let Some(expr) = &Criteria::from_fields(criteria).where_expr {
            conditions.push(scope.condition_sql(expr)?);
        }
        conditions.extend(self.restrictions(&mut scope)?);
        let from = self.from_clause(&mut scope, &root_alias, lock_mode, false)?;
        let mut sql = format!("SELECT 1 {}", from);
        sql.push_str(&where_sql(conditions));
        if !lock_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&lock_clause);
        }
        Ok(SelectSql {
            sql,
            rsm: ResultSetMapping::new(),
            params: scope.params,
        })
    }

    /// First entity matching `criteria`
    pub fn load(
        &self,
        conn: &mut dyn Connection,
        criteria: &FieldCriteria,
        lock_mode: LockMode,
    ) -> Result<Option<EntityState>, PersisterError> {
        let select = self.build_select(&Criteria::from_fields(criteria), lock_mode, Projection::Entity)?;
        let rows = conn.fetch_all(&select.sql, &select.params)?;
        rows.first()
            .map(|row| EntityState::from_row(&select.rsm, RESULT_ALIAS, row, self.env.registry))
            .transpose()
    }

    pub fn load_by_id(
        &self,
        conn: &mut dyn Connection,
        identifier: &[Value],
    ) -> Result<Option<EntityState>, PersisterError> {
        let criteria = self.identifier_criteria(identifier)?;
        self.load(conn, &criteria, LockMode::None)
    }

    pub fn load_all(
        &self,
        conn: &mut dyn Connection,
        criteria: &Criteria,
    ) -> Result<Vec<EntityState>, PersisterError> {
        let select = self.build_select(criteria, LockMode::None, Projection::Entity)?;
        conn.fetch_all(&select.sql, &select.params)?
            .iter()
            .map(|row| EntityState::from_row(&select.rsm, RESULT_ALIAS, row, self.env.registry))
            .collect()
    }

    pub fn exists(&self, conn: &mut dyn Connection, criteria: &Criteria) -> Result<bool, PersisterError> {
        let select = self.build_select(criteria, LockMode::None, Projection::Exists)?;
        Ok(!conn.fetch_all(&select.sql, &select.params)?.is_empty())
    }

    pub fn count(&self, conn: &mut dyn Connection, criteria: &Criteria) -> Result<u64, PersisterError> {
        let select = self.build_select(criteria, LockMode::None, Projection::Count)?;
        let rows = conn.fetch_all(&select.sql, &select.params)?;
        let count = rows
            .first()
            .and_then(first_value)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Acquires `lock_mode` on the row with `identifier`
    pub fn lock(
        &self,
        conn: &mut dyn Connection,
        identifier: &[Value],
        lock_mode: LockMode,
    ) -> Result<(), PersisterError> {
        let criteria = self.identifier_criteria(identifier)?;
        let select = self.lock_sql(&criteria, lock_mode)?;
        conn.fetch_all(&select.sql, &select.params)?;
        Ok(())
    }

    pub(super) fn identifier_criteria(&self, identifier: &[Value]) -> Result<FieldCriteria, PersisterError> {
        if identifier.len() != self.class.identifier.len() || identifier.iter().any(Value::is_null) {
            return Err(PersisterError::missing_identifier(&self.class.name));
        }
        Ok(self
            .class
            .identifier
            .iter()
            .cloned()
            .zip(identifier.iter().cloned())
            .collect())
    }

    fn lock_clause(&self, lock_mode: LockMode) -> Result<String, PersisterError> {
        match lock_mode {
            LockMode::Optimistic if !self.class.is_versioned() => {
                Err(TranslationError::OptimisticLockNotVersioned {
                    class_name: self.class.name.clone(),
                }
                .into())
            }
            LockMode::Optimistic => Ok(String::new()),
            other => Ok(self.env.platform.lock_clause(other)?),
        }
    }

    fn select_columns(
        &self,
        scope: &mut SqlScope<'a>,
        rsm: &mut ResultSetMapping,
    ) -> Result<Vec<String>, PersisterError> {
        let env = self.env;
        let class = self.class;
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        self.class_columns(class, scope, rsm, &mut columns, &mut seen)?;

        if class.has_discriminator() {
            let root = self.describe(&class.root_entity_name)?;
            let alias = scope.alias_for_class(root);
            if let (Some(column), Some(mapping)) = (
                env.quote.discriminator_column_name(class, env.platform),
                class.discriminator_column.as_ref(),
            ) {
                let column_alias = scope.aliases.column_alias(&mapping.name);
                columns.push(format!("{}.{} AS {}", alias, column, column_alias));
                rsm.add_meta_result(
                    RESULT_ALIAS,
                    &column_alias,
                    &mapping.name,
                    false,
                    Some(mapping.column_type),
                )?;
                rsm.set_discriminator_column(RESULT_ALIAS, &column_alias);
            }
        }

        if class.is_inheritance_type_single_table() || class.is_inheritance_type_joined() {
            for sub_name in &class.sub_classes {
                let sub = self.describe(sub_name)?;
                self.class_columns(sub, scope, rsm, &mut columns, &mut seen)?;
            }
        }
        Ok(columns)
    }

    /// Field columns then foreign key columns of `descriptor`, skipping
    /// fields already selected
    fn class_columns(
        &self,
        descriptor: &'a ClassDescriptor,
        scope: &mut SqlScope<'a>,
        rsm: &mut ResultSetMapping,
        columns: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) -> Result<(), PersisterError> {
        let env = self.env;
        for (name, mapping) in &descriptor.fields {
            if !seen.insert(name.clone()) {
                continue;
            }
            let owner = self.describe(descriptor.owning_class_of(name))?;
            let alias = scope.alias_for_class(owner);
            let column = env.quote.column_name(name, descriptor, env.platform);
            let column_alias = scope.aliases.column_alias(&mapping.column_name);
            columns.push(format!("{}.{} AS {}", alias, column, column_alias));
            rsm.add_field_result(RESULT_ALIAS, &column_alias, name, &owner.name)?;
        }

        for (name, assoc) in &descriptor.associations {
            if !assoc.is_owning_to_one() || !seen.insert(name.clone()) {
                continue;
            }
            let owner = self.describe(descriptor.owning_class_of(name))?;
            let alias = scope.alias_for_class(owner);
            for join_column in assoc.join_columns() {
                let column = env.quote.join_column_name(join_column, env.platform);
                let column_alias = scope.aliases.column_alias(&join_column.name);
                columns.push(format!("{}.{} AS {}", alias, column, column_alias));
                rsm.add_meta_result(
                    RESULT_ALIAS,
                    &column_alias,
                    &join_column.name,
                    assoc.is_identifier(),
                    None,
                )?;
            }
        }
        Ok(())
    }

    /// Discriminator and filter conditions every select carries
    fn restrictions(&self, scope: &mut SqlScope<'a>) -> Result<Vec<String>, PersisterError> {
        let env = self.env;
        let class = self.class;
        let root_alias = scope.root_alias();
        let mut conditions = Vec::new();

        if class.is_inheritance_type_single_table() && class.has_discriminator() {
            if let Some(column) = env.quote.discriminator_column_name(class, env.platform) {
                let values = self.discriminator_literals(class)?;
                conditions.push(format!("{}.{} IN ({})", root_alias, column, values.join(", ")));
            }
        }

        // joined subclasses are filtered through their root only
        if !(class.is_inheritance_type_joined() && !class.is_root()) {
            let root = self.describe(&class.root_entity_name)?;
            let sql = env.filters.constraint_sql(root, &root_alias);
            if !sql.is_empty() {
                conditions.push(sql);
            }
        }
        Ok(conditions)
    }

    /// Quoted discriminator values of `class` and its descendants
    pub(super) fn discriminator_literals(&self, class: &ClassDescriptor) -> Result<Vec<String>, PersisterError> {
        let mut values = Vec::new();
        for name in std::iter::once(&class.name).chain(class.sub_classes.iter()) {
            if let Some(value) = &self.describe(name)?.discriminator_value {
                let literal = self.env.platform.quote_string_literal(value);
                if !values.contains(&literal) {
                    values.push(literal);
                }
            }
        }
        Ok(values)
    }

    fn from_clause(
        &self,
        scope: &mut SqlScope<'a>,
        root_alias: &str,
        lock_mode: LockMode,
        include_subclasses: bool,
    ) -> Result<String, PersisterError> {
        let env = self.env;
        let class = self.class;
        let base = format!("FROM {} {}", self.table_sql(class), root_alias);
        let mut sql = env.platform.append_lock_hint(&base, lock_mode);

        if class.is_inheritance_type_joined() {
            let id_columns = env.quote.identifier_column_names(class, env.platform);
            for parent_name in &class.parent_classes {
                let parent = self.describe(parent_name)?;
                let alias = scope.alias_for_class(parent);
                sql.push_str(&format!(
                    " INNER JOIN {} {} ON {}",
                    self.table_sql(parent),
                    alias,
                    identifier_join(&id_columns, root_alias, &alias)
                ));
            }
            if include_subclasses {
                for sub_name in &class.sub_classes {
                    let sub = self.describe(sub_name)?;
                    let alias = scope.alias_for_class(sub);
                    sql.push_str(&format!(
                        " LEFT JOIN {} {} ON {}",
                        self.table_sql(sub),
                        alias,
                        identifier_join(&id_columns, root_alias, &alias)
                    ));
                }
            }
        }

        for join in &scope.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        Ok(sql)
    }
}

fn identifier_join(id_columns: &[String], left: &str, right: &str) -> String {
    id_columns
        .iter()
        .map(|column| format!("{}.{} = {}.{}", left, column, right, column))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_metadata::testing::{inheritance_registry, single_table_registry, user_registry};
    use crate::class_metadata::{MetadataRegistry, OrderDirection};
    use crate::filters::{FilterCollection, PredicateFilter};
    use crate::persister::testing::{row, RecordingConnection};
    use crate::platform::{DefaultQuoteStrategy, PostgreSqlPlatform, SqlPlatform, SqlServerPlatform};
    use crate::query::Expression;
    use crate::sql_walker::TranslationEnv;
    use std::sync::Arc;

    fn with_persister<T>(
        registry: &MetadataRegistry,
        platform: &dyn SqlPlatform,
        filters: &FilterCollection,
        class: &str,
        f: impl FnOnce(EntityPersister<'_>) -> T,
    ) -> T {
        let quote = DefaultQuoteStrategy;
        let env = TranslationEnv {
            registry,
            platform,
            quote: &quote,
            filters,
            max_identifier_length: platform.max_identifier_length(),
        };
        f(EntityPersister::new(env, registry.describe(class).unwrap()))
    }

    fn select(registry: &MetadataRegistry, class: &str, criteria: Criteria) -> SelectSql {
        with_persister(registry, &PostgreSqlPlatform, &FilterCollection::new(), class, |p| {
            p.select_sql(&criteria, LockMode::None).unwrap()
        })
    }

    #[test]
    fn test_criteria_with_value() {
        let registry = user_registry();
        let criteria = Criteria::new().and_where(Expression::eq("email", "a@example.com"));
        let select = select(&registry, "User", criteria);
        assert_eq!(
            select.sql,
            "SELECT t0.id AS id_0, t0.name AS name_1, t0.email AS email_2, t0.address_id AS address_id_3 \
             FROM user t0 WHERE t0.email = ?"
        );
        assert_eq!(select.params.values(), vec![Value::from("a@example.com")]);
        assert_eq!(select.rsm.column_alias_for(RESULT_ALIAS, "email"), Some("email_2"));
    }

    #[test]
    fn test_criteria_with_null() {
        let registry = user_registry();
        let criteria = Criteria::new().and_where(Expression::eq("email", Value::Null));
        let select = select(&registry, "User", criteria);
        assert!(select.sql.ends_with("FROM user t0 WHERE t0.email IS NULL"));
        assert!(select.params.is_empty());
    }

    #[test]
    fn test_joined_inheritance_select() {
        let registry = inheritance_registry();
        let select = select(&registry, "Employee", Criteria::new());
        assert_eq!(
            select.sql,
            "SELECT t1.id AS id_0, t1.name AS name_1, t0.salary AS salary_2, t1.discr AS discr_3, \
             t2.title AS title_4, t3.school AS school_5 \
             FROM employee t0 INNER JOIN person t1 ON t0.id = t1.id \
             LEFT JOIN manager t2 ON t0.id = t2.id LEFT JOIN intern t3 ON t0.id = t3.id"
        );
        assert_eq!(select.rsm.discriminator_columns[RESULT_ALIAS], "discr_3");
    }

    #[test]
    fn test_single_table_select_restricts_discriminator() {
        let registry = single_table_registry();
        let select = select(&registry, "Car", Criteria::new().and_where(Expression::eq("doors", 4)));
        assert_eq!(
            select.sql,
            "SELECT t0.id AS id_0, t0.wheels AS wheels_1, t0.doors AS doors_2, t0.type AS type_3 \
             FROM vehicle t0 WHERE t0.doors = ? AND t0.type IN ('car')"
        );

        let root = select_root(&registry);
        assert!(root.contains("t0.payload AS payload_"));
        assert!(root.ends_with("WHERE t0.type IN ('vehicle', 'car', 'truck')"));
    }

    fn select_root(registry: &MetadataRegistry) -> String {
        select(registry, "Vehicle", Criteria::new()).sql
    }

    #[test]
    fn test_orderings_and_paging() {
        let registry = user_registry();
        let criteria = Criteria::new()
            .order_by("name", OrderDirection::Desc)
            .max_results(10)
            .first_result(20);
        let select = select(&registry, "User", criteria);
        assert!(select.sql.ends_with("FROM user t0 ORDER BY t0.name DESC LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_count_and_exists_share_conditions() {
        let registry = user_registry();
        let mut filters = FilterCollection::new();
        filters.register(Arc::new(PredicateFilter::new("active", "{alias}.active = 1")));
        filters.enable("active").unwrap();
        let criteria = Criteria::new()
            .and_where(Expression::eq("name", "Ada"))
            .order_by("name", OrderDirection::Asc);

        let (count, exists) = with_persister(&registry, &PostgreSqlPlatform, &filters, "User", |p| {
            (
                p.build_select(&criteria, LockMode::None, Projection::Count).unwrap(),
                p.build_select(&criteria, LockMode::None, Projection::Exists).unwrap(),
            )
        });
        assert_eq!(
            count.sql,
            "SELECT COUNT(*) FROM user t0 WHERE t0.name = ? AND (t0.active = 1)"
        );
        assert_eq!(
            exists.sql,
            "SELECT 1 FROM user t0 WHERE t0.name = ? AND (t0.active = 1)"
        );
    }

    #[test]
    fn test_filters_skip_joined_subclass() {
        let registry = inheritance_registry();
        let mut filters = FilterCollection::new();
        filters.register(Arc::new(PredicateFilter::new("named", "{alias}.name IS NOT NULL")));
        filters.enable("named").unwrap();

        let (root, child) = with_persister(&registry, &PostgreSqlPlatform, &filters, "Person", |p| {
            let root = p.select_sql(&Criteria::new(), LockMode::None).unwrap().sql;
            let env = p.env;
            let child = EntityPersister::new(env, registry.describe("Employee").unwrap())
                .select_sql(&Criteria::new(), LockMode::None)
                .unwrap()
                .sql;
            (root, child)
        });
        assert!(root.ends_with("WHERE (t0.name IS NOT NULL)"));
        assert!(!child.contains("WHERE"));
    }

    #[test]
    fn test_lock_sql() {
        let registry = user_registry();
        let criteria: FieldCriteria = [("id".to_string(), Value::Int(1))].into_iter().collect();

        let pg = with_persister(&registry, &PostgreSqlPlatform, &FilterCollection::new(), "User", |p| {
            p.lock_sql(&criteria, LockMode::PessimisticWrite).unwrap().sql
        });
        assert_eq!(pg, "SELECT 1 FROM user t0 WHERE t0.id = ? FOR UPDATE");

        let mssql = with_persister(&registry, &SqlServerPlatform, &FilterCollection::new(), "User", |p| {
            p.lock_sql(&criteria, LockMode::PessimisticRead).unwrap().sql
        });
        assert_eq!(mssql, "SELECT 1 FROM user t0 WITH (HOLDLOCK, ROWLOCK) WHERE t0.id = ?");
    }

    #[test]
    fn test_lock_sql_applies_enabled_filters() {
        let registry = user_registry();
        let mut filters = FilterCollection::new();
        filters.register(Arc::new(PredicateFilter::new("active", "{alias}.active = 1")));
        filters.enable("active").unwrap();
        let criteria: FieldCriteria = [("id".to_string(), Value::Int(1))].into_iter().collect();

        let sql = with_persister(&registry, &PostgreSqlPlatform, &filters, "User", |p| {
            p.lock_sql(&criteria, LockMode::PessimisticWrite).unwrap().sql
        });
        assert_eq!(sql, "SELECT 1 FROM user t0 WHERE t0.id = ? AND (t0.active = 1) FOR UPDATE");
    }

    #[test]
    fn test_optimistic_lock_requires_version() {
        let registry = user_registry();
        let err = with_persister(&registry, &PostgreSqlPlatform, &FilterCollection::new(), "User", |p| {
            p.select_sql(&Criteria::new(), LockMode::Optimistic).unwrap_err()
        });
        assert!(matches!(
            err,
            PersisterError::Translation(TranslationError::OptimisticLockNotVersioned { .. })
        ));

        let sql = with_persister(&registry, &PostgreSqlPlatform, &FilterCollection::new(), "Article", |p| {
            p.select_sql(&Criteria::new(), LockMode::Optimistic).unwrap().sql
        });
        assert!(sql.ends_with("FROM article t0"));
    }

    #[test]
    fn test_load_by_id_hydrates_state() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new().with_rows(vec![row(&[
            ("id_0", Value::Int(5)),
            ("name_1", Value::from("Ada")),
            ("email_2", Value::from("ada@example.com")),
            ("address_id_3", Value::Null),
        ])]);

        let state = with_persister(&registry, &PostgreSqlPlatform, &FilterCollection::new(), "User", |p| {
            p.load_by_id(&mut conn, &[Value::Int(5)]).unwrap()
        })
        .unwrap();
        assert_eq!(state.field("name"), Some(&Value::from("Ada")));
        assert_eq!(conn.statements[0].1, vec![Value::Int(5)]);
        assert!(conn.sql()[0].ends_with("WHERE t0.id = ?"));
    }

    #[test]
    fn test_load_by_id_requires_full_identifier() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new();
        let err = with_persister(&registry, &PostgreSqlPlatform, &FilterCollection::new(), "User", |p| {
            p.load_by_id(&mut conn, &[Value::Null]).unwrap_err()
        });
        assert_eq!(err, PersisterError::missing_identifier("User"));
        assert!(conn.statements.is_empty());
    }

    #[test]
    fn test_count_reads_first_column() {
        let registry = user_registry();
        let mut conn = RecordingConnection::new().with_rows(vec![row(&[("COUNT(*)", Value::Int(3))])]);
        let count = with_persister(&registry, &PostgreSqlPlatform, &FilterCollection::new(), "User", |p| {
            p.count(&mut conn, &Criteria::new()).unwrap()
        });
        assert_eq!(count, 3);
    }
}
