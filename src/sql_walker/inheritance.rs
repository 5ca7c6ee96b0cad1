//! Inheritance joins and per-class row restrictions.
//!
//! Class table inheritance joins every ancestor table (INNER, or LEFT when
//! the class was reached through a relation) and every descendant table
//! (LEFT) on the identifier columns. Single table inheritance restricts the
//! shared table by discriminator value instead. Enabled filters see the
//! root of the hierarchy; under class table inheritance only a query on the
//! root class itself is filtered.

use super::errors::TranslationError;
use super::SqlWalker;
use crate::class_metadata::ClassDescriptor;

impl<'a> SqlWalker<'a> {
    pub(super) fn class_table_inheritance_joins(
        &mut self,
        class: &ClassDescriptor,
        dql_alias: &str,
        include_subclasses: bool,
    ) -> Result<String, TranslationError> {
        let env = self.ctx.env;
        let base_alias = self.ctx.table_alias_for(class, dql_alias);
        let id_columns = env.quote.identifier_column_names(class, env.platform);
        let parent_keyword = match self.ctx.component(dql_alias) {
            Ok(component) if component.is_relation() => "LEFT JOIN",
            _ => "INNER JOIN",
        };

        let mut sql = String::new();
        for parent_name in &class.parent_classes {
            let parent = self.ctx.describe(parent_name)?;
            let parent_alias = self.ctx.table_alias_for(parent, dql_alias);
            sql.push_str(&format!(
                " {} {} {} ON {}",
                parent_keyword,
                env.quote.table_name(&parent.table, env.platform),
                parent_alias,
                identifier_join_condition(&id_columns, &base_alias, &parent_alias)
            ));
        }

        if include_subclasses && !self.ctx.hints.partial_load {
            for sub_name in &class.sub_classes {
                let sub = self.ctx.describe(sub_name)?;
                let sub_alias = self.ctx.table_alias_for(sub, dql_alias);
                sql.push_str(&format!(
                    " LEFT JOIN {} {} ON {}",
                    env.quote.table_name(&sub.table, env.platform),
                    sub_alias,
                    identifier_join_condition(&id_columns, &base_alias, &sub_alias)
                ));
            }
        }
        Ok(sql)
    }

    /// Discriminator and filter restrictions for every root alias
    pub(super) fn root_restrictions(
        &mut self,
        root_aliases: &[String],
    ) -> Result<Vec<String>, TranslationError> {
        let mut conditions = Vec::new();
        for alias in root_aliases {
            let class = self.ctx.class_of_alias(alias)?;
            conditions.extend(self.restrictions_for(class, alias)?);
        }
        Ok(conditions)
    }

    pub(super) fn restrictions_for(
        &mut self,
        class: &ClassDescriptor,
        dql_alias: &str,
    ) -> Result<Vec<String>, TranslationError> {
        let mut conditions = Vec::new();
        if let Some(discriminator) = self.discriminator_restriction(class, dql_alias)? {
            conditions.push(discriminator);
        }
        if let Some(filters) = self.filter_restriction(class, dql_alias)? {
            conditions.push(filters);
        }
        Ok(conditions)
    }

    /// `alias.discr IN ('a', 'b')` under single table inheritance
    fn discriminator_restriction(
        &mut self,
        class: &ClassDescriptor,
        dql_alias: &str,
    ) -> Result<Option<String>, TranslationError> {
        if !class.is_inheritance_type_single_table() || !class.has_discriminator() {
            return Ok(None);
        }
        let table_alias = self.ctx.table_alias_for(class, dql_alias);
        let column = self.discriminator_column_sql(class, &table_alias)?;
        let values = self.discriminator_values(std::slice::from_ref(&class.name))?;
        Ok(Some(format!("{} IN ({})", column, values.join(", "))))
    }

    /// Qualified discriminator column of `class`, read from the root table
    pub(super) fn discriminator_column_sql(
        &self,
        class: &ClassDescriptor,
        root_table_alias: &str,
    ) -> Result<String, TranslationError> {
        let env = self.ctx.env;
        let column = env
            .quote
            .discriminator_column_name(class, env.platform)
            .ok_or_else(|| {
                TranslationError::unsupported_with_context(
                    format!("class `{}` has no discriminator column", class.name),
                    "Restricting by discriminator",
                )
            })?;
        Ok(self.ctx.qualify(root_table_alias, &column))
    }

    /// Quoted discriminator literals of `class_names` and all their
    /// descendants, without duplicates
    pub(super) fn discriminator_values(
        &self,
        class_names: &[String],
    ) -> Result<Vec<String>, TranslationError> {
        let platform = self.ctx.env.platform;
        let mut values: Vec<String> = Vec::new();
        for class_name in class_names {
            let class = self.ctx.describe(class_name)?;
            let names = std::iter::once(&class.name).chain(class.sub_classes.iter());
            for name in names {
                let descriptor = self.ctx.describe(name)?;
                if let Some(value) = &descriptor.discriminator_value {
                    let literal = platform.quote_string_literal(value);
                    if !values.contains(&literal) {
                        values.push(literal);
                    }
                }
            }
        }
        Ok(values)
    }

    /// Enabled filter predicates for `class`
    fn filter_restriction(
        &mut self,
        class: &ClassDescriptor,
        dql_alias: &str,
    ) -> Result<Option<String>, TranslationError> {
        let filters = self.ctx.env.filters;
        if filters.enabled_names().is_empty() {
            return Ok(None);
        }
        if class.is_inheritance_type_joined() && !class.is_root() {
            return Ok(None);
        }
        let root = self.ctx.describe(&class.root_entity_name)?;
        let table_alias = match &self.ctx.dml_table {
            Some(table) => table.clone(),
            None => self.ctx.table_alias_for(class, dql_alias),
        };
        let sql = filters.constraint_sql(root, &table_alias);
        Ok(if sql.is_empty() { None } else { Some(sql) })
    }
}

fn identifier_join_condition(id_columns: &[String], left: &str, right: &str) -> String {
    id_columns
        .iter()
        .map(|column| format!("{}.{} = {}.{}", left, column, right, column))
        .collect::<Vec<_>>()
        .join(" AND ")
}
