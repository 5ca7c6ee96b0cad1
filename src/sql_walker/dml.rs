//! UPDATE and DELETE translation.
//!
//! Targets stored in one table translate to a single statement without
//! table aliases. A class table inheritance target spans several tables:
//! the translation then selects the affected identifiers first and emits one
//! statement per table, each bound to that identifier list.

use indexmap::IndexMap;

use super::context::QueryComponent;
use super::errors::TranslationError;
use super::{where_sql, ExecutionStrategy, MultiTableStatement, SqlWalker};
use crate::class_metadata::ClassDescriptor;
use crate::query::ast::{ConditionalExpression, DeleteStatement, UpdateItem, UpdateStatement};
use crate::query::ParameterType;

impl<'a> SqlWalker<'a> {
    pub(super) fn walk_update_statement(
        &mut self,
        stmt: &UpdateStatement,
    ) -> Result<(String, ExecutionStrategy), TranslationError> {
        let class = self.register_dml_target(&stmt.class_name, &stmt.alias)?;
        if class.is_inheritance_type_joined() {
            return self.multi_table_update(class, stmt);
        }

        let table = self.enter_dml(class, &stmt.alias);
        let assignments = self.walk_assignments(class, &stmt.set)?;
        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
        sql.push_str(&self.dml_where(class, &stmt.alias, stmt.where_clause.as_ref())?);
        Ok((sql, ExecutionStrategy::Single))
    }

    pub(super) fn walk_delete_statement(
        &mut self,
        stmt: &DeleteStatement,
    ) -> Result<(String, ExecutionStrategy), TranslationError> {
        let class = self.register_dml_target(&stmt.class_name, &stmt.alias)?;
        if class.is_inheritance_type_joined() {
            return self.multi_table_delete(class, stmt);
        }

        let table = self.enter_dml(class, &stmt.alias);
        let mut sql = format!("DELETE FROM {}", table);
        sql.push_str(&self.dml_where(class, &stmt.alias, stmt.where_clause.as_ref())?);
        Ok((sql, ExecutionStrategy::Single))
    }

    fn register_dml_target(
        &mut self,
        class_name: &str,
        alias: &str,
    ) -> Result<&'a ClassDescriptor, TranslationError> {
        let class = self.ctx.describe(class_name)?;
        self.ctx
            .register_component(alias, QueryComponent::root(&class.name, alias))?;
        self.ctx.root_aliases.push(alias.to_string());
        Ok(class)
    }

    /// Switches the pass to alias-free rendering against `class`'s table
    fn enter_dml(&mut self, class: &ClassDescriptor, alias: &str) -> String {
        let env = self.ctx.env;
        let table = env.quote.table_name(&class.table, env.platform);
        self.ctx
            .aliases
            .set_table_alias(&class.table.name, alias, &table);
        self.ctx.dml_table = Some(table.clone());
        table
    }

    fn dml_where(
        &mut self,
        class: &ClassDescriptor,
        alias: &str,
        where_clause: Option<&ConditionalExpression>,
    ) -> Result<String, TranslationError> {
        let mut conditions = Vec::new();
        if let Some(condition) = where_clause {
            conditions.push(self.walk_conditional(condition)?);
        }
        conditions.extend(self.restrictions_for(class, alias)?);
        Ok(where_sql(conditions))
    }

    fn walk_assignments(
        &mut self,
        class: &ClassDescriptor,
        items: &[UpdateItem],
    ) -> Result<Vec<String>, TranslationError> {
        let mut assignments = Vec::with_capacity(items.len());
        for item in items {
            let (column, hint) = self.assignment_target(class, &item.field)?;
            let value = self.walk_scalar(&item.value, hint)?;
            assignments.push(format!("{} = {}", column, value));
        }
        Ok(assignments)
    }

    /// Unqualified column an UPDATE assigns for `field`
    fn assignment_target(
        &self,
        class: &ClassDescriptor,
        field: &str,
    ) -> Result<(String, Option<ParameterType>), TranslationError> {
        let env = self.ctx.env;
        if class.has_field(field) {
            return Ok((
                env.quote.column_name(field, class, env.platform),
                class.binding_type_of(field),
            ));
        }
        let assoc = class
            .association(field)
            .ok_or_else(|| TranslationError::unrecognized_field(&class.name, field))?;
        if !assoc.is_owning_to_one() {
            return Err(TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: field.to_string(),
            });
        }
        match assoc.join_columns() {
            [join_column] => {
                let target = self.ctx.describe(&assoc.target_entity)?;
                let hint = target
                    .field_for_column(&join_column.referenced_column_name)
                    .and_then(|f| target.binding_type_of(f));
                Ok((env.quote.join_column_name(join_column, env.platform), hint))
            }
            _ => Err(TranslationError::CompositeKeyNotSupported {
                class_name: class.name.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// `SELECT alias.id FROM ...` selecting the identifiers a multi-table
    /// statement affects
    fn identifier_select(
        &mut self,
        class: &'a ClassDescriptor,
        alias: &str,
        where_clause: Option<&ConditionalExpression>,
    ) -> Result<(String, String), TranslationError> {
        let env = self.ctx.env;
        let id_columns = env.quote.identifier_column_names(class, env.platform);
        let [id_column] = id_columns.as_slice() else {
            return Err(TranslationError::CompositeKeyNotSupported {
                class_name: class.name.clone(),
                field: class.identifier.join(", "),
            });
        };
        let table_alias = self.ctx.table_alias_for(class, alias);
        let mut sql = format!(
            "SELECT {}.{} FROM {} {}",
            table_alias,
            id_column,
            env.quote.table_name(&class.table, env.platform),
            table_alias
        );
        sql.push_str(&self.class_table_inheritance_joins(class, alias, false)?);

        let mut conditions = Vec::new();
        if let Some(condition) = where_clause {
            conditions.push(self.walk_conditional(condition)?);
        }
        conditions.extend(self.restrictions_for(class, alias)?);
        sql.push_str(&where_sql(conditions));
        Ok((sql, id_column.clone()))
    }

    /// Deletes run from the most derived table up to the root
    fn multi_table_delete(
        &mut self,
        class: &'a ClassDescriptor,
        stmt: &DeleteStatement,
    ) -> Result<(String, ExecutionStrategy), TranslationError> {
        let (id_select, id_column) =
            self.identifier_select(class, &stmt.alias, stmt.where_clause.as_ref())?;

        let env = self.ctx.env;
        let tables = class
            .sub_classes
            .iter()
            .rev()
            .chain(std::iter::once(&class.name))
            .chain(class.parent_classes.iter());

        let mut statements = Vec::new();
        for name in tables {
            let descriptor = self.ctx.describe(name)?;
            let table = env.quote.table_name(&descriptor.table, env.platform);
            statements.push(MultiTableStatement {
                sql: format!("DELETE FROM {} WHERE {} IN (?)", table, id_column),
                table,
                parameter_refs: Vec::new(),
            });
        }
        log::debug!(
            "Delete on {} spans {} tables",
            class.name,
            statements.len()
        );
        Ok((id_select, ExecutionStrategy::MultiTable { statements }))
    }

    /// One UPDATE per table owning an assigned field, root table first
    fn multi_table_update(
        &mut self,
        class: &'a ClassDescriptor,
        stmt: &UpdateStatement,
    ) -> Result<(String, ExecutionStrategy), TranslationError> {
        let (id_select, id_column) =
            self.identifier_select(class, &stmt.alias, stmt.where_clause.as_ref())?;
        let id_refs = std::mem::take(&mut self.ctx.parameter_refs);

        let mut by_owner: IndexMap<String, Vec<UpdateItem>> = IndexMap::new();
        for item in &stmt.set {
            by_owner
                .entry(class.owning_class_of(&item.field).to_string())
                .or_default()
                .push(item.clone());
        }

        let env = self.ctx.env;
        let hierarchy = class
            .parent_classes
            .iter()
            .rev()
            .chain(std::iter::once(&class.name));

        let mut statements = Vec::new();
        for name in hierarchy {
            let Some(items) = by_owner.get(name) else {
                continue;
            };
            let owner = self.ctx.describe(name)?;
            let table = env.quote.table_name(&owner.table, env.platform);
            self.ctx.dml_table = Some(table.clone());
            let assignments = self.walk_assignments(class, items)?;
            statements.push(MultiTableStatement {
                sql: format!(
                    "UPDATE {} SET {} WHERE {} IN (?)",
                    table,
                    assignments.join(", "),
                    id_column
                ),
                table,
                parameter_refs: std::mem::take(&mut self.ctx.parameter_refs),
            });
        }
        self.ctx.dml_table = None;
        self.ctx.parameter_refs = id_refs;
        Ok((id_select, ExecutionStrategy::MultiTable { statements }))
    }
}
