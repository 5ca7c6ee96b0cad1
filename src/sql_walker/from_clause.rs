use super::context::QueryComponent;
use super::errors::TranslationError;
use super::{and_all, SqlWalker};
use crate::class_metadata::association::{JoinColumn, ManyToManySide};
use crate::class_metadata::{AssociationKind, AssociationMapping, ClassDescriptor};
use crate::query::ast::{
    ConditionalExpression, IdentificationVariableDeclaration, Join, JoinTarget, JoinType,
};

impl<'a> SqlWalker<'a> {
    /// Registers the root alias of a declaration and every joined alias
    pub(super) fn register_declaration(
        &mut self,
        declaration: &IdentificationVariableDeclaration,
    ) -> Result<(), TranslationError> {
        let class = self.ctx.describe(&declaration.class_name)?;
        self.ctx.register_component(
            &declaration.alias,
            QueryComponent::root(&class.name, &declaration.alias),
        )?;
        self.ctx.root_aliases.push(declaration.alias.clone());

        if let Some(index_by) = &declaration.index_by {
            self.check_index_by(&declaration.alias, &index_by.field)?;
        }

        for join in &declaration.joins {
            let component = match &join.target {
                JoinTarget::Association(path) => {
                    let parent = self.ctx.class_of_alias(&path.alias)?;
                    let assoc = parent
                        .association(&path.field)
                        .ok_or_else(|| TranslationError::unrecognized_field(&parent.name, &path.field))?;
                    QueryComponent {
                        class_name: assoc.target_entity.clone(),
                        parent_alias: Some(path.alias.clone()),
                        relation: Some(path.field.clone()),
                        join_type: Some(join.join_type),
                        declaration_root: declaration.alias.clone(),
                        is_expansion: false,
                    }
                }
                JoinTarget::Entity { class_name } => {
                    let class = self.ctx.describe(class_name)?;
                    QueryComponent {
                        class_name: class.name.clone(),
                        parent_alias: None,
                        relation: None,
                        join_type: Some(join.join_type),
                        declaration_root: declaration.alias.clone(),
                        is_expansion: false,
                    }
                }
            };
            self.ctx.register_component(&join.alias, component)?;
            if let Some(index_by) = &join.index_by {
                self.check_index_by(&join.alias, &index_by.field)?;
            }
        }
        Ok(())
    }

    fn check_index_by(&mut self, alias: &str, field: &str) -> Result<(), TranslationError> {
        let class = self.ctx.class_of_alias(alias)?;
        if !class.has_field(field) {
            return Err(TranslationError::unrecognized_field(&class.name, field));
        }
        self.ctx.rsm.add_index_by(alias, field);
        Ok(())
    }

    pub(super) fn walk_from_clause(
        &mut self,
        declarations: &[IdentificationVariableDeclaration],
    ) -> Result<String, TranslationError> {
        let mut parts = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            parts.push(self.walk_declaration(declaration, true)?);
        }
        Ok(format!(" FROM {}", parts.join(", ")))
    }

    /// `table alias [inheritance joins] [joins] [eager joins]`
    pub(super) fn walk_declaration(
        &mut self,
        declaration: &IdentificationVariableDeclaration,
        include_subclasses: bool,
    ) -> Result<String, TranslationError> {
        let class = self.ctx.describe(&declaration.class_name)?;
        let table_alias = self.ctx.table_alias_for(class, &declaration.alias);
        let table = self
            .ctx
            .env
            .quote
            .table_name(&class.table, self.ctx.env.platform);

        let mut sql = self.ctx.env.platform.append_lock_hint(
            &format!("{} {}", table, table_alias),
            self.ctx.hints.lock_mode,
        );

        if class.is_inheritance_type_joined() {
            sql.push_str(&self.class_table_inheritance_joins(
                class,
                &declaration.alias,
                include_subclasses,
            )?);
        }

        for join in &declaration.joins {
            sql.push(' ');
            sql.push_str(&self.walk_join(join)?);
        }

        if let Some(expansions) = self.ctx.expansion_joins.get(&declaration.alias) {
            for join_sql in expansions {
                sql.push(' ');
                sql.push_str(join_sql);
            }
        }
        Ok(sql)
    }

    fn walk_join(&mut self, join: &Join) -> Result<String, TranslationError> {
        match &join.target {
            JoinTarget::Association(path) => {
                let parent = self.ctx.class_of_alias(&path.alias)?;
                let assoc = parent
                    .association(&path.field)
                    .ok_or_else(|| TranslationError::unrecognized_field(&parent.name, &path.field))?;
                let join_type = self.resolve_join_type(join.join_type, assoc)?;
                self.association_join_sql(
                    &path.alias,
                    parent,
                    assoc,
                    &join.alias,
                    join_type,
                    join.condition.as_ref(),
                )
            }
            JoinTarget::Entity { class_name } => {
                let class = self.ctx.describe(class_name)?;
                let condition = join.condition.as_ref().ok_or_else(|| {
                    TranslationError::unsupported_with_context(
                        format!("entity join on `{}` without a WITH condition", class_name),
                        format!("Joining `{}`", join.alias),
                    )
                })?;
                let table_alias = self.ctx.table_alias_for(class, &join.alias);
                let table = self
                    .ctx
                    .env
                    .quote
                    .table_name(&class.table, self.ctx.env.platform);

                let mut conditions = vec![self.walk_conditional(condition)?];
                conditions.extend(self.restrictions_for(class, &join.alias)?);

                let mut sql = format!(
                    "{} {} {} ON {}",
                    join_keyword(join.join_type),
                    table,
                    table_alias,
                    and_all(conditions)
                );
                if class.is_inheritance_type_joined() {
                    sql.push_str(&self.class_table_inheritance_joins(class, &join.alias, true)?);
                }
                Ok(sql)
            }
        }
    }

    /// A plain join is INNER unless one of the join columns it follows is
    /// nullable
    fn resolve_join_type(
        &self,
        requested: JoinType,
        assoc: &AssociationMapping,
    ) -> Result<JoinType, TranslationError> {
        if requested != JoinType::Default {
            return Ok(requested);
        }
        let nullable = if assoc.is_owning_to_one() {
            assoc.join_columns().iter().any(|jc| jc.nullable)
        } else if let Some(mapped_by) = assoc.mapped_by() {
            let target = self.ctx.describe(&assoc.target_entity)?;
            target
                .association(mapped_by)
                .map_or(false, |owning| owning.join_columns().iter().any(|jc| jc.nullable))
        } else {
            assoc
                .join_table_mapping()
                .map_or(false, |jt| jt.join_columns.iter().any(|jc| jc.nullable))
        };
        Ok(if nullable { JoinType::Left } else { JoinType::Inner })
    }

    /// SQL joining `assoc` of `parent_alias` under `join_alias`, including
    /// the WITH condition, target restrictions and target inheritance joins
    pub(super) fn association_join_sql(
        &mut self,
        parent_alias: &str,
        parent: &'a ClassDescriptor,
        assoc: &AssociationMapping,
        join_alias: &str,
        join_type: JoinType,
        condition: Option<&ConditionalExpression>,
    ) -> Result<String, TranslationError> {
        let target = self.ctx.describe(&assoc.target_entity)?;
        let keyword = join_keyword(join_type);
        let target_table = self
            .ctx
            .env
            .quote
            .table_name(&target.table, self.ctx.env.platform);
        let target_alias = self.ctx.table_alias_for(target, join_alias);

        let mut extra = Vec::new();
        if let Some(condition) = condition {
            extra.push(self.walk_conditional(condition)?);
        }
        extra.extend(self.restrictions_for(target, join_alias)?);

        let mut sql = match &assoc.kind {
            AssociationKind::ManyToOne { .. } | AssociationKind::OneToOne { .. }
                if assoc.is_owning_side() =>
            {
                let source_alias = self
                    .ctx
                    .table_alias_for_field(parent, &assoc.field_name, parent_alias)?;
                let mut on = self.join_column_conditions(
                    assoc.join_columns(),
                    &source_alias,
                    &target_alias,
                    target,
                    false,
                );
                on.extend(extra);
                format!("{} {} {} ON {}", keyword, target_table, target_alias, and_all(on))
            }
            AssociationKind::ManyToOne { .. }
            | AssociationKind::OneToOne { .. }
            | AssociationKind::OneToMany { .. } => {
                let mapped_by = assoc.mapped_by().unwrap_or_default();
                let owning = target
                    .association(mapped_by)
                    .filter(|owning| owning.is_owning_to_one())
                    .ok_or_else(|| TranslationError::InvalidInverseAssociation {
                        class_name: parent.name.clone(),
                        field: assoc.field_name.clone(),
                    })?;
                if target.owning_class_of(mapped_by) != target.name {
                    return Err(TranslationError::unsupported_with_context(
                        format!(
                            "foreign key of {}.{} is stored in an ancestor table",
                            target.name, mapped_by
                        ),
                        format!("Joining {}.{}", parent.name, assoc.field_name),
                    ));
                }
                let source_alias = self.ctx.table_alias_for(parent, parent_alias);
                let mut on = self.join_column_conditions(
                    owning.join_columns(),
                    &target_alias,
                    &source_alias,
                    parent,
                    true,
                );
                on.extend(extra);
                format!("{} {} {} ON {}", keyword, target_table, target_alias, and_all(on))
            }
            AssociationKind::ManyToMany { side, .. } => {
                let owning_assoc = match side {
                    ManyToManySide::Owning(_) => assoc,
                    ManyToManySide::Inverse(inverse) => target
                        .association(&inverse.mapped_by)
                        .ok_or_else(|| TranslationError::InvalidInverseAssociation {
                            class_name: parent.name.clone(),
                            field: assoc.field_name.clone(),
                        })?,
                };
                let join_table = owning_assoc.join_table_mapping().ok_or_else(|| {
                    TranslationError::InvalidInverseAssociation {
                        class_name: parent.name.clone(),
                        field: assoc.field_name.clone(),
                    }
                })?;
                let (source_columns, target_columns) = match side {
                    ManyToManySide::Owning(_) => {
                        (&join_table.join_columns, &join_table.inverse_join_columns)
                    }
                    ManyToManySide::Inverse(_) => {
                        (&join_table.inverse_join_columns, &join_table.join_columns)
                    }
                };
                let join_table_name = self
                    .ctx
                    .env
                    .quote
                    .join_table_name(owning_assoc, self.ctx.env.platform)
                    .unwrap_or_else(|| join_table.name.clone());
                let join_table_alias = self.ctx.aliases.table_alias(&join_table.name, join_alias);
                let source_alias = self.ctx.table_alias_for(parent, parent_alias);

                let source_on = self.join_column_conditions(
                    source_columns,
                    &join_table_alias,
                    &source_alias,
                    parent,
                    true,
                );
                let mut target_on = self.join_column_conditions(
                    target_columns,
                    &join_table_alias,
                    &target_alias,
                    target,
                    false,
                );
                target_on.extend(extra);
                format!(
                    "{} {} {} ON {} {} {} {} ON {}",
                    keyword,
                    join_table_name,
                    join_table_alias,
                    and_all(source_on),
                    keyword,
                    target_table,
                    target_alias,
                    and_all(target_on)
                )
            }
        };

        if target.is_inheritance_type_joined() {
            sql.push_str(&self.class_table_inheritance_joins(target, join_alias, true)?);
        }
        Ok(sql)
    }

    /// `fk_alias.column = ref_alias.referenced` per join column. With
    /// `referenced_first` the referenced side is written on the left.
    fn join_column_conditions(
        &self,
        columns: &[JoinColumn],
        fk_alias: &str,
        referenced_alias: &str,
        referenced_class: &ClassDescriptor,
        referenced_first: bool,
    ) -> Vec<String> {
        let env = self.ctx.env;
        columns
            .iter()
            .map(|jc| {
                let fk = format!("{}.{}", fk_alias, env.quote.join_column_name(jc, env.platform));
                let referenced = format!(
                    "{}.{}",
                    referenced_alias,
                    env.quote
                        .referenced_column_name(jc, referenced_class, env.platform)
                );
                if referenced_first {
                    format!("{} = {}", referenced, fk)
                } else {
                    format!("{} = {}", fk, referenced)
                }
            })
            .collect()
    }
}

fn join_keyword(join_type: JoinType) -> &'static str {
    match join_type {
        JoinType::Left => "LEFT JOIN",
        JoinType::Default | JoinType::Inner => "INNER JOIN",
    }
}
