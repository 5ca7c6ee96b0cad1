use std::collections::HashSet;

use super::context::QueryComponent;
use super::errors::TranslationError;
use super::SqlWalker;
use crate::class_metadata::association::ToOneSide;
use crate::class_metadata::{AssociationKind, ClassDescriptor, FieldMapping};
use crate::query::ast::{
    AggregateFunction, JoinType, ScalarExpression, SelectExpression, SelectStatement,
};
use crate::query::ParameterType;

impl<'a> SqlWalker<'a> {
    pub(super) fn walk_select_clause(
        &mut self,
        stmt: &SelectStatement,
    ) -> Result<String, TranslationError> {
        let mut columns = Vec::new();
        let mut selected_aliases = HashSet::new();

        for expression in &stmt.select {
            match expression {
                SelectExpression::Entity { alias } => {
                    selected_aliases.insert(alias.clone());
                    columns.extend(self.walk_entity_selection(alias, None)?);
                }
                SelectExpression::PartialEntity { alias, fields } => {
                    selected_aliases.insert(alias.clone());
                    columns.extend(self.walk_entity_selection(alias, Some(fields))?);
                }
                SelectExpression::Scalar {
                    expression,
                    result_variable,
                    hidden,
                } => {
                    columns.push(self.walk_scalar_selection(
                        expression,
                        result_variable.as_deref(),
                        *hidden,
                    )?);
                }
            }
        }

        // Fetch joins hydrate their entity even when not named in SELECT
        for declaration in &stmt.from {
            for join in &declaration.joins {
                if join.fetch && !selected_aliases.contains(&join.alias) {
                    selected_aliases.insert(join.alias.clone());
                    columns.extend(self.walk_entity_selection(&join.alias, None)?);
                }
            }
        }

        let distinct = if stmt.distinct { "DISTINCT " } else { "" };
        Ok(format!("SELECT {}{}", distinct, columns.join(", ")))
    }

    /// Registers `alias` as an entity result and returns its column list
    fn walk_entity_selection(
        &mut self,
        alias: &str,
        partial_fields: Option<&Vec<String>>,
    ) -> Result<Vec<String>, TranslationError> {
        let component = self.ctx.component(alias)?.clone();
        let class = self.ctx.describe(&component.class_name)?;

        match (&component.parent_alias, &component.relation) {
            (Some(parent), Some(relation)) => {
                self.ctx
                    .rsm
                    .add_joined_entity_result(&class.name, alias, parent, relation)
            }
            _ => self.ctx.rsm.add_entity_result(&class.name, alias, None),
        }

        let mut chain = vec![class.name.clone()];
        self.entity_columns(alias, class, partial_fields, &mut chain)
    }

    /// Every column an entity result needs: fields, owning foreign keys,
    /// the discriminator and subclass-only fields, followed by eager
    /// associations.
    fn entity_columns(
        &mut self,
        alias: &str,
        class: &'a ClassDescriptor,
        partial_fields: Option<&Vec<String>>,
        chain: &mut Vec<String>,
    ) -> Result<Vec<String>, TranslationError> {
        let mut columns = Vec::new();

        if let Some(fields) = partial_fields {
            for field in fields {
                if !class.has_field(field) {
                    return Err(TranslationError::unrecognized_field(&class.name, field));
                }
            }
        }

        for field in class.fields.values() {
            let selected = match partial_fields {
                Some(fields) => class.is_identifier(&field.field_name) || fields.contains(&field.field_name),
                None => true,
            };
            if selected {
                columns.push(self.field_column(alias, class, field)?);
            }
        }

        if partial_fields.is_none() {
            columns.extend(self.foreign_key_columns(alias, class, false)?);
        }

        if let Some(column) = self.discriminator_select_column(alias, class)? {
            columns.push(column);
        }

        let include_subclasses = partial_fields.is_none()
            && (class.is_inheritance_type_single_table()
                || (class.is_inheritance_type_joined() && !self.ctx.hints.partial_load));
        if include_subclasses {
            columns.extend(self.subclass_columns(alias, class)?);
        }

        if partial_fields.is_none() && !self.ctx.hints.partial_load {
            columns.extend(self.expand_eager_associations(alias, class, chain)?);
        }

        Ok(columns)
    }

    fn field_column(
        &mut self,
        alias: &str,
        class: &ClassDescriptor,
        field: &FieldMapping,
    ) -> Result<String, TranslationError> {
        let table_alias = self
            .ctx
            .table_alias_for_field(class, &field.field_name, alias)?;
        let column = self
            .ctx
            .env
            .quote
            .column_name(&field.field_name, class, self.ctx.env.platform);
        let column_alias = self.ctx.aliases.column_alias(&field.column_name);
        let declaring = field
            .declared
            .as_deref()
            .unwrap_or(class.name.as_str());
        self.ctx
            .rsm
            .add_field_result(alias, &column_alias, &field.field_name, declaring)?;
        Ok(format!("{}.{} AS {}", table_alias, column, column_alias))
    }

    /// Meta columns for owning to-one foreign keys. With `own_only` set,
    /// inherited associations are skipped.
    fn foreign_key_columns(
        &mut self,
        alias: &str,
        class: &ClassDescriptor,
        own_only: bool,
    ) -> Result<Vec<String>, TranslationError> {
        let mut columns = Vec::new();
        for assoc in class.associations.values() {
            if !assoc.is_owning_to_one() || (own_only && assoc.inherited.is_some()) {
                continue;
            }
            let target = self.ctx.describe(&assoc.target_entity)?;
            let table_alias = self
                .ctx
                .table_alias_for_field(class, &assoc.field_name, alias)?;
            for join_column in assoc.join_columns() {
                let column = self
                    .ctx
                    .env
                    .quote
                    .join_column_name(join_column, self.ctx.env.platform);
                let column_alias = self.ctx.aliases.column_alias(&join_column.name);
                let column_type = target
                    .field_for_column(&join_column.referenced_column_name)
                    .and_then(|f| target.field(f))
                    .map(|f| f.column_type);
                self.ctx.rsm.add_meta_result(
                    alias,
                    &column_alias,
                    &join_column.name,
                    assoc.is_identifier(),
                    column_type,
                )?;
                columns.push(format!("{}.{} AS {}", table_alias, column, column_alias));
            }
        }
        Ok(columns)
    }

    fn discriminator_select_column(
        &mut self,
        alias: &str,
        class: &ClassDescriptor,
    ) -> Result<Option<String>, TranslationError> {
        let Some(discriminator) = class.discriminator_column.as_ref() else {
            return Ok(None);
        };
        if !class.has_discriminator() {
            return Ok(None);
        }
        let root = self.ctx.describe(&class.root_entity_name)?;
        let table_alias = self.ctx.table_alias_for(root, alias);
        let column = self
            .ctx
            .env
            .quote
            .discriminator_column_name(class, self.ctx.env.platform)
            .unwrap_or_else(|| discriminator.name.clone());
        let column_alias = self.ctx.aliases.column_alias(&discriminator.name);
        self.ctx.rsm.add_meta_result(
            alias,
            &column_alias,
            &discriminator.name,
            false,
            Some(discriminator.column_type),
        )?;
        self.ctx.rsm.set_discriminator_column(alias, &column_alias);
        Ok(Some(format!("{}.{} AS {}", table_alias, column, column_alias)))
    }

    /// Fields and foreign keys declared below `class` in its hierarchy
    fn subclass_columns(
        &mut self,
        alias: &str,
        class: &ClassDescriptor,
    ) -> Result<Vec<String>, TranslationError> {
        let mut columns = Vec::new();
        for sub_name in &class.sub_classes {
            let sub = self.ctx.describe(sub_name)?;
            for field in sub.fields.values() {
                if field.inherited.is_some() || class.has_field(&field.field_name) {
                    continue;
                }
                columns.push(self.field_column(alias, sub, field)?);
            }
            columns.extend(self.foreign_key_columns(alias, sub, true)?);
        }
        Ok(columns)
    }

    /// Joins eager and inverse one-to-one associations of an entity result
    /// as joined entity results, recursively. `chain` holds the classes
    /// already on the current expansion path.
    fn expand_eager_associations(
        &mut self,
        alias: &str,
        class: &'a ClassDescriptor,
        chain: &mut Vec<String>,
    ) -> Result<Vec<String>, TranslationError> {
        let mut columns = Vec::new();
        let declaration_root = self.ctx.component(alias)?.declaration_root.clone();

        for assoc in class.associations.values() {
            let inverse_one_to_one = matches!(
                &assoc.kind,
                AssociationKind::OneToOne {
                    side: ToOneSide::Inverse(_),
                    ..
                }
            );
            if !assoc.is_eager() && !inverse_one_to_one {
                continue;
            }
            if assoc.is_to_many() && self.ctx.hints.has_row_limit() {
                log::warn!(
                    "Not expanding eager collection {}.{}: the query has a row limit",
                    class.name,
                    assoc.field_name
                );
                continue;
            }
            let already_joined = self.ctx.components.values().any(|c| {
                c.parent_alias.as_deref() == Some(alias)
                    && c.relation.as_deref() == Some(assoc.field_name.as_str())
            });
            if already_joined || chain.contains(&assoc.target_entity) {
                continue;
            }

            let target = self.ctx.describe(&assoc.target_entity)?;
            let join_alias = format!("{}.{}", alias, assoc.field_name);
            self.ctx.register_component(
                &join_alias,
                QueryComponent {
                    class_name: target.name.clone(),
                    parent_alias: Some(alias.to_string()),
                    relation: Some(assoc.field_name.clone()),
                    join_type: Some(JoinType::Left),
                    declaration_root: declaration_root.clone(),
                    is_expansion: true,
                },
            )?;
            self.ctx
                .rsm
                .add_joined_entity_result(&target.name, &join_alias, alias, &assoc.field_name);

            let join_sql =
                self.association_join_sql(alias, class, assoc, &join_alias, JoinType::Left, None)?;
            self.ctx
                .expansion_joins
                .entry(declaration_root.clone())
                .or_default()
                .push(join_sql);

            chain.push(target.name.clone());
            let nested = self.entity_columns(&join_alias, target, None, chain);
            chain.pop();
            columns.extend(nested?);
        }
        Ok(columns)
    }

    fn walk_scalar_selection(
        &mut self,
        expression: &ScalarExpression,
        result_variable: Option<&str>,
        hidden: bool,
    ) -> Result<String, TranslationError> {
        let (sql, column_alias, default_variable, value_type) = match expression {
            ScalarExpression::Path(path) => {
                let class = self.ctx.class_of_alias(&path.alias)?;
                let (sql, value_type) = self.resolve_path(path)?;
                let column_alias = match class.field(&path.field) {
                    Some(field) => self.ctx.aliases.column_alias(&field.column_name),
                    None => self.ctx.aliases.scalar_alias(),
                };
                (sql, column_alias, Some(path.field.clone()), value_type)
            }
            other => {
                let sql = self.walk_scalar(other, None)?;
                let column_alias = self.ctx.aliases.scalar_alias();
                (sql, column_alias, None, scalar_value_type(other))
            }
        };

        let variable = result_variable
            .map(str::to_string)
            .or(default_variable)
            .unwrap_or_else(|| column_alias.clone());
        if !hidden {
            self.ctx
                .rsm
                .add_scalar_result(&column_alias, &variable, value_type)?;
        }
        self.ctx
            .scalar_result_aliases
            .insert(variable, column_alias.clone());
        Ok(format!("{} AS {}", sql, column_alias))
    }
}

fn scalar_value_type(expression: &ScalarExpression) -> Option<ParameterType> {
    match expression {
        ScalarExpression::Aggregate {
            function: AggregateFunction::Count,
            ..
        } => Some(ParameterType::Integer),
        ScalarExpression::Aggregate {
            function: AggregateFunction::Avg,
            ..
        } => Some(ParameterType::Float),
        _ => None,
    }
}
