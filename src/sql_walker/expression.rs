use super::errors::TranslationError;
use super::{and_all, where_sql, SqlWalker};
use crate::class_metadata::association::ManyToManySide;
use crate::class_metadata::{AssociationKind, AssociationMapping, ClassDescriptor};
use crate::query::ast::{
    ComparisonOperator, ConditionalExpression, FunctionExpression, InputParameter, Literal,
    PathExpression, ScalarExpression, Subselect, TrimMode,
};
use crate::query::{ParameterRef, ParameterType};

/// Correlated access to the rows of a collection-valued association
struct CollectionLink {
    /// `table alias` the subquery selects from
    from: String,
    /// Conditions tying those rows to the owning entity
    conditions: Vec<String>,
    /// Column holding the identifier of each collection element
    element_column: String,
    element_type: Option<ParameterType>,
}

impl<'a> SqlWalker<'a> {
    pub(super) fn walk_conditional(
        &mut self,
        condition: &ConditionalExpression,
    ) -> Result<String, TranslationError> {
        match condition {
            ConditionalExpression::And(parts) => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(self.walk_conditional(part)?);
                }
                Ok(and_all(rendered))
            }
            ConditionalExpression::Or(parts) => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(self.walk_conditional(part)?);
                }
                Ok(if rendered.len() > 1 {
                    format!("({})", rendered.join(" OR "))
                } else {
                    rendered.join(" OR ")
                })
            }
            ConditionalExpression::Not(inner) => {
                Ok(format!("NOT ({})", self.walk_conditional(inner)?))
            }
            ConditionalExpression::Comparison { left, op, right } => {
                self.walk_comparison(left, *op, right)
            }
            ConditionalExpression::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let hint = self.type_hint(expr);
                Ok(format!(
                    "{} {}BETWEEN {} AND {}",
                    self.walk_scalar(expr, None)?,
                    not(*negated),
                    self.walk_scalar(low, hint)?,
                    self.walk_scalar(high, hint)?
                ))
            }
            ConditionalExpression::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                let mut sql = format!(
                    "{} {}LIKE {}",
                    self.walk_scalar(expr, None)?,
                    not(*negated),
                    self.walk_scalar(pattern, Some(ParameterType::String))?
                );
                if let Some(escape) = escape {
                    sql.push_str(&format!(
                        " ESCAPE {}",
                        self.ctx
                            .env
                            .platform
                            .quote_string_literal(&escape.to_string())
                    ));
                }
                Ok(sql)
            }
            ConditionalExpression::InList {
                expr,
                values,
                negated,
            } => {
                let hint = self.type_hint(expr);
                let left = self.walk_scalar(expr, None)?;
                if values.is_empty() {
                    return Ok(format!("{} {}IN (NULL)", left, not(*negated)));
                }
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    items.push(self.walk_scalar(value, hint)?);
                }
                Ok(format!("{} {}IN ({})", left, not(*negated), items.join(", ")))
            }
            ConditionalExpression::InSubselect {
                expr,
                subselect,
                negated,
            } => Ok(format!(
                "{} {}IN ({})",
                self.walk_scalar(expr, None)?,
                not(*negated),
                self.walk_subselect(subselect)?
            )),
            ConditionalExpression::IsNull { expr, negated } => Ok(format!(
                "{} IS {}NULL",
                self.walk_scalar(expr, None)?,
                not(*negated)
            )),
            ConditionalExpression::Exists { subselect, negated } => Ok(format!(
                "{}EXISTS ({})",
                not(*negated),
                self.walk_subselect(subselect)?
            )),
            ConditionalExpression::InstanceOf {
                alias,
                classes,
                negated,
            } => self.walk_instance_of(alias, classes, *negated),
            ConditionalExpression::IsEmpty { path, negated } => {
                let size = self.walk_collection_size(path)?;
                Ok(if *negated {
                    format!("{} > 0", size)
                } else {
                    format!("{} = 0", size)
                })
            }
            ConditionalExpression::MemberOf {
                entity,
                collection,
                negated,
            } => self.walk_member_of(entity, collection, *negated),
        }
    }

    /// Comparisons against a NULL literal become IS [NOT] NULL
    fn walk_comparison(
        &mut self,
        left: &ScalarExpression,
        op: ComparisonOperator,
        right: &ScalarExpression,
    ) -> Result<String, TranslationError> {
        let null_side = match (left.is_null_literal(), right.is_null_literal()) {
            (false, true) => Some(left),
            (true, false) => Some(right),
            _ => None,
        };
        if let Some(operand) = null_side {
            match op {
                ComparisonOperator::Eq => {
                    return Ok(format!("{} IS NULL", self.walk_scalar(operand, None)?))
                }
                ComparisonOperator::Neq => {
                    return Ok(format!("{} IS NOT NULL", self.walk_scalar(operand, None)?))
                }
                _ => {}
            }
        }

        let left_hint = self.type_hint(right);
        let right_hint = self.type_hint(left);
        Ok(format!(
            "{} {} {}",
            self.walk_scalar(left, left_hint)?,
            op.as_sql(),
            self.walk_scalar(right, right_hint)?
        ))
    }

    /// Type a parameter compared against `expr` should bind as
    pub(super) fn type_hint(&self, expr: &ScalarExpression) -> Option<ParameterType> {
        match expr {
            ScalarExpression::Path(path) => self.path_type(path),
            ScalarExpression::IdentificationVariable(alias) => {
                let class = self.ctx.class_of_alias(alias).ok()?;
                let id = class.single_identifier_field().ok()?;
                class.binding_type_of(id)
            }
            ScalarExpression::Function(function) => match function.as_ref() {
                FunctionExpression::Lower(_)
                | FunctionExpression::Upper(_)
                | FunctionExpression::Concat(_)
                | FunctionExpression::Substring { .. }
                | FunctionExpression::Trim { .. } => Some(ParameterType::String),
                FunctionExpression::Length(_) | FunctionExpression::Size(_) => {
                    Some(ParameterType::Integer)
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn path_type(&self, path: &PathExpression) -> Option<ParameterType> {
        let class = self.ctx.class_of_alias(&path.alias).ok()?;
        if let Some(field_type) = class.binding_type_of(&path.field) {
            return Some(field_type);
        }
        let assoc = class.association(&path.field)?;
        let join_column = assoc.join_columns().first()?;
        let target = self.ctx.describe(&assoc.target_entity).ok()?;
        target
            .field_for_column(&join_column.referenced_column_name)
            .and_then(|f| target.binding_type_of(f))
    }

    /// Column behind `alias.field`. Single-valued owning associations
    /// resolve to their foreign key column.
    pub(super) fn resolve_path(
        &mut self,
        path: &PathExpression,
    ) -> Result<(String, Option<ParameterType>), TranslationError> {
        let class = self.ctx.class_of_alias(&path.alias)?;
        let env = self.ctx.env;

        if let Some(field) = class.field(&path.field) {
            let table_alias = self.ctx.table_alias_for_field(class, &path.field, &path.alias)?;
            let column = env.quote.column_name(&path.field, class, env.platform);
            return Ok((
                self.ctx.qualify(&table_alias, &column),
                Some(field.column_type.binding_type()),
            ));
        }

        let assoc = class
            .association(&path.field)
            .ok_or_else(|| TranslationError::unrecognized_field(&class.name, &path.field))?;
        if let AssociationKind::OneToMany { .. } = assoc.kind {
            return Err(TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: path.field.clone(),
            });
        }
        if assoc.is_to_many() {
            return Err(TranslationError::unsupported_with_context(
                format!("collection-valued path {}.{}", path.alias, path.field),
                "Only single-valued paths can be used as scalar values",
            ));
        }
        if !assoc.is_owning_side() {
            return Err(TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: path.field.clone(),
            });
        }
        let join_column = match assoc.join_columns() {
            [single] => single,
            _ => {
                return Err(TranslationError::CompositeKeyNotSupported {
                    class_name: class.name.clone(),
                    field: path.field.clone(),
                })
            }
        };
        let table_alias = self.ctx.table_alias_for_field(class, &path.field, &path.alias)?;
        let column = env.quote.join_column_name(join_column, env.platform);
        Ok((self.ctx.qualify(&table_alias, &column), self.path_type(path)))
    }

    /// Single identifier column of the entity behind `alias`
    fn identifier_column(&mut self, alias: &str) -> Result<String, TranslationError> {
        let class = self.ctx.class_of_alias(alias)?;
        let columns = self
            .ctx
            .env
            .quote
            .identifier_column_names(class, self.ctx.env.platform);
        let [column] = columns.as_slice() else {
            return Err(TranslationError::CompositeKeyNotSupported {
                class_name: class.name.clone(),
                field: alias.to_string(),
            });
        };
        let table_alias = self.ctx.table_alias_for(class, alias);
        Ok(self.ctx.qualify(&table_alias, column))
    }

    pub(super) fn walk_scalar(
        &mut self,
        expr: &ScalarExpression,
        hint: Option<ParameterType>,
    ) -> Result<String, TranslationError> {
        match expr {
            ScalarExpression::Path(path) => Ok(self.resolve_path(path)?.0),
            ScalarExpression::IdentificationVariable(alias) => self.identifier_column(alias),
            ScalarExpression::Literal(literal) => Ok(self.walk_literal(literal)),
            ScalarExpression::InputParameter(parameter) => Ok(self.record_parameter(parameter, hint)),
            ScalarExpression::Arithmetic { left, op, right } => Ok(format!(
                "{} {} {}",
                self.arithmetic_operand(left, hint)?,
                op.as_sql(),
                self.arithmetic_operand(right, hint)?
            )),
            ScalarExpression::Negate(inner) => {
                Ok(format!("-{}", self.arithmetic_operand(inner, hint)?))
            }
            ScalarExpression::Function(function) => self.walk_function(function),
            ScalarExpression::Aggregate {
                function,
                distinct,
                expr,
            } => {
                let argument = match expr {
                    Some(expr) => self.walk_scalar(expr, None)?,
                    None => "*".to_string(),
                };
                let distinct = if *distinct { "DISTINCT " } else { "" };
                Ok(format!("{}({}{})", function.as_sql(), distinct, argument))
            }
            ScalarExpression::Subselect(subselect) => {
                Ok(format!("({})", self.walk_subselect(subselect)?))
            }
            ScalarExpression::ResultVariable(name) => self
                .ctx
                .scalar_result_aliases
                .get(name)
                .cloned()
                .ok_or_else(|| TranslationError::unknown_alias(name)),
        }
    }

    fn arithmetic_operand(
        &mut self,
        expr: &ScalarExpression,
        hint: Option<ParameterType>,
    ) -> Result<String, TranslationError> {
        let sql = self.walk_scalar(expr, hint)?;
        Ok(match expr {
            ScalarExpression::Arithmetic { .. } => format!("({})", sql),
            _ => sql,
        })
    }

    fn walk_literal(&self, literal: &Literal) -> String {
        let platform = self.ctx.env.platform;
        match literal {
            Literal::Null => "NULL".to_string(),
            Literal::Bool(value) => platform.convert_boolean(*value),
            Literal::Integer(value) => value.to_string(),
            Literal::Float(value) => value.to_string(),
            Literal::String(value) => platform.quote_string_literal(value),
        }
    }

    /// Records the parameter for binding and emits its placeholder
    fn record_parameter(
        &mut self,
        parameter: &InputParameter,
        field_type: Option<ParameterType>,
    ) -> String {
        self.ctx.parameter_refs.push(ParameterRef {
            key: parameter.clone(),
            field_type,
        });
        "?".to_string()
    }

    fn walk_function(&mut self, function: &FunctionExpression) -> Result<String, TranslationError> {
        let platform = self.ctx.env.platform;
        let string = Some(ParameterType::String);
        let integer = Some(ParameterType::Integer);
        Ok(match function {
            FunctionExpression::Lower(value) => format!("LOWER({})", self.walk_scalar(value, string)?),
            FunctionExpression::Upper(value) => format!("UPPER({})", self.walk_scalar(value, string)?),
            FunctionExpression::Length(value) => {
                platform.length_expression(&self.walk_scalar(value, string)?)
            }
            FunctionExpression::Concat(parts) => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(self.walk_scalar(part, string)?);
                }
                platform.concat_expression(&rendered)
            }
            FunctionExpression::Substring {
                value,
                start,
                length,
            } => {
                let value = self.walk_scalar(value, string)?;
                let start = self.walk_scalar(start, integer)?;
                let length = match length {
                    Some(length) => Some(self.walk_scalar(length, integer)?),
                    None => None,
                };
                platform.substring_expression(&value, &start, length.as_deref())
            }
            FunctionExpression::Trim {
                mode,
                character,
                value,
            } => {
                let value = self.walk_scalar(value, string)?;
                let mode = match mode {
                    TrimMode::Both => "BOTH",
                    TrimMode::Leading => "LEADING",
                    TrimMode::Trailing => "TRAILING",
                };
                match character {
                    Some(c) => format!(
                        "TRIM({} {} FROM {})",
                        mode,
                        platform.quote_string_literal(&c.to_string()),
                        value
                    ),
                    None if mode == "BOTH" => format!("TRIM({})", value),
                    None => format!("TRIM({} FROM {})", mode, value),
                }
            }
            FunctionExpression::Abs(value) => format!("ABS({})", self.walk_scalar(value, None)?),
            FunctionExpression::Sqrt(value) => format!("SQRT({})", self.walk_scalar(value, None)?),
            FunctionExpression::Mod(left, right) => {
                let left = self.walk_scalar(left, integer)?;
                let right = self.walk_scalar(right, integer)?;
                platform.mod_expression(&left, &right)
            }
            FunctionExpression::Coalesce(values) => {
                let mut rendered = Vec::with_capacity(values.len());
                for value in values {
                    rendered.push(self.walk_scalar(value, None)?);
                }
                format!("COALESCE({})", rendered.join(", "))
            }
            FunctionExpression::NullIf(left, right) => format!(
                "NULLIF({}, {})",
                self.walk_scalar(left, None)?,
                self.walk_scalar(right, None)?
            ),
            FunctionExpression::CurrentDate => platform.current_date_sql().to_string(),
            FunctionExpression::CurrentTime => platform.current_time_sql().to_string(),
            FunctionExpression::CurrentTimestamp => platform.current_timestamp_sql().to_string(),
            FunctionExpression::Size(path) => self.walk_collection_size(path)?,
            FunctionExpression::Identity {
                path,
                referenced_field,
            } => self.walk_identity(path, referenced_field.as_deref())?,
        })
    }

    /// Foreign key column of a single-valued association, optionally the
    /// one referencing `referenced_field` of the target
    fn walk_identity(
        &mut self,
        path: &PathExpression,
        referenced_field: Option<&str>,
    ) -> Result<String, TranslationError> {
        let class = self.ctx.class_of_alias(&path.alias)?;
        let assoc = class
            .association(&path.field)
            .ok_or_else(|| TranslationError::unrecognized_field(&class.name, &path.field))?;
        if !assoc.is_owning_to_one() {
            return Err(TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: path.field.clone(),
            });
        }
        let join_columns = assoc.join_columns();
        let join_column = match referenced_field {
            Some(field) => {
                let target = self.ctx.describe(&assoc.target_entity)?;
                let referenced = target
                    .column_name(field)
                    .ok_or_else(|| TranslationError::unrecognized_field(&target.name, field))?;
                join_columns
                    .iter()
                    .find(|jc| jc.referenced_column_name == referenced)
                    .ok_or_else(|| TranslationError::unrecognized_field(&target.name, field))?
            }
            None => match join_columns {
                [single] => single,
                _ => {
                    return Err(TranslationError::CompositeKeyNotSupported {
                        class_name: class.name.clone(),
                        field: path.field.clone(),
                    })
                }
            },
        };
        let table_alias = self.ctx.table_alias_for_field(class, &path.field, &path.alias)?;
        let column = self
            .ctx
            .env
            .quote
            .join_column_name(join_column, self.ctx.env.platform);
        Ok(self.ctx.qualify(&table_alias, &column))
    }

    fn walk_instance_of(
        &mut self,
        alias: &str,
        classes: &[String],
        negated: bool,
    ) -> Result<String, TranslationError> {
        let class = self.ctx.class_of_alias(alias)?;
        if !class.has_discriminator() {
            return Err(TranslationError::unsupported_with_context(
                format!("INSTANCE OF on `{}`, which has no discriminator", class.name),
                format!("Restricting `{}`", alias),
            ));
        }
        for name in classes {
            let candidate = self.ctx.describe(name)?;
            if candidate.root_entity_name != class.root_entity_name {
                return Err(TranslationError::unsupported_with_context(
                    format!("`{}` is not part of the `{}` hierarchy", name, class.root_entity_name),
                    format!("INSTANCE OF on `{}`", alias),
                ));
            }
        }
        let root = self.ctx.describe(&class.root_entity_name)?;
        let root_alias = self.ctx.table_alias_for(root, alias);
        let column = self.discriminator_column_sql(class, &root_alias)?;
        let values = self.discriminator_values(classes)?;
        if values.is_empty() {
            return Ok(format!("{} {}IN (NULL)", column, not(negated)));
        }
        Ok(format!("{} {}IN ({})", column, not(negated), values.join(", ")))
    }

    fn walk_collection_size(&mut self, path: &PathExpression) -> Result<String, TranslationError> {
        let link = self.collection_link(path)?;
        Ok(format!(
            "(SELECT COUNT(*) FROM {} WHERE {})",
            link.from,
            and_all(link.conditions)
        ))
    }

    fn walk_member_of(
        &mut self,
        entity: &ScalarExpression,
        collection: &PathExpression,
        negated: bool,
    ) -> Result<String, TranslationError> {
        let link = self.collection_link(collection)?;
        let mut conditions = link.conditions;
        let entity_sql = self.walk_scalar(entity, link.element_type)?;
        conditions.push(format!("{} = {}", link.element_column, entity_sql));
        Ok(format!(
            "{}EXISTS (SELECT 1 FROM {} WHERE {})",
            not(negated),
            link.from,
            and_all(conditions)
        ))
    }

    fn collection_link(&mut self, path: &PathExpression) -> Result<CollectionLink, TranslationError> {
        let class = self.ctx.class_of_alias(&path.alias)?;
        let assoc = class
            .association(&path.field)
            .ok_or_else(|| TranslationError::unrecognized_field(&class.name, &path.field))?;
        let target = self.ctx.describe(&assoc.target_entity)?;
        let env = self.ctx.env;
        let scope = format!("{}.{}#collection", path.alias, path.field);
        let source_alias = self.ctx.table_alias_for(class, &path.alias);
        let dml = self.ctx.dml_table.is_some();
        let source_ref = move |column: String| {
            if dml {
                column
            } else {
                format!("{}.{}", source_alias, column)
            }
        };

        let target_id_columns = env.quote.identifier_column_names(target, env.platform);
        let element_type = target
            .single_identifier_field()
            .ok()
            .and_then(|id| target.binding_type_of(id));

        match &assoc.kind {
            AssociationKind::OneToMany { mapped_by, .. } => {
                let owning = owning_association(class, assoc, target, mapped_by)?;
                let owner = self.ctx.describe(target.owning_class_of(mapped_by))?;
                let table_alias = self.ctx.aliases.table_alias(&owner.table.name, &scope);
                let conditions = owning
                    .join_columns()
                    .iter()
                    .map(|jc| {
                        format!(
                            "{}.{} = {}",
                            table_alias,
                            env.quote.join_column_name(jc, env.platform),
                            source_ref(env.quote.referenced_column_name(jc, class, env.platform))
                        )
                    })
                    .collect();
                let [id_column] = target_id_columns.as_slice() else {
                    return Err(TranslationError::CompositeKeyNotSupported {
                        class_name: target.name.clone(),
                        field: path.field.clone(),
                    });
                };
                Ok(CollectionLink {
                    from: format!(
                        "{} {}",
                        env.quote.table_name(&owner.table, env.platform),
                        table_alias
                    ),
                    conditions,
                    element_column: format!("{}.{}", table_alias, id_column),
                    element_type,
                })
            }
            AssociationKind::ManyToMany { side, .. } => {
                let owning_assoc = match side {
                    ManyToManySide::Owning(_) => assoc,
                    ManyToManySide::Inverse(inverse) => {
                        owning_association(class, assoc, target, &inverse.mapped_by)?
                    }
                };
                let join_table = owning_assoc.join_table_mapping().ok_or_else(|| {
                    TranslationError::InvalidInverseAssociation {
                        class_name: class.name.clone(),
                        field: assoc.field_name.clone(),
                    }
                })?;
                let (source_columns, element_columns) = match side {
                    ManyToManySide::Owning(_) => {
                        (&join_table.join_columns, &join_table.inverse_join_columns)
                    }
                    ManyToManySide::Inverse(_) => {
                        (&join_table.inverse_join_columns, &join_table.join_columns)
                    }
                };
                let table_alias = self.ctx.aliases.table_alias(&join_table.name, &scope);
                let conditions = source_columns
                    .iter()
                    .map(|jc| {
                        format!(
                            "{}.{} = {}",
                            table_alias,
                            env.quote.join_column_name(jc, env.platform),
                            source_ref(env.quote.referenced_column_name(jc, class, env.platform))
                        )
                    })
                    .collect();
                let [element_column] = element_columns.as_slice() else {
                    return Err(TranslationError::CompositeKeyNotSupported {
                        class_name: target.name.clone(),
                        field: path.field.clone(),
                    });
                };
                let join_table_name = env
                    .quote
                    .join_table_name(owning_assoc, env.platform)
                    .unwrap_or_else(|| join_table.name.clone());
                Ok(CollectionLink {
                    from: format!("{} {}", join_table_name, table_alias),
                    conditions,
                    element_column: format!(
                        "{}.{}",
                        table_alias,
                        env.quote.join_column_name(element_column, env.platform)
                    ),
                    element_type,
                })
            }
            _ => Err(TranslationError::unsupported_with_context(
                format!("{}.{} is not a collection", path.alias, path.field),
                "SIZE, IS EMPTY and MEMBER OF need a collection-valued association",
            )),
        }
    }

    /// Correlated subselect sharing this pass's aliases and parameters
    pub(super) fn walk_subselect(&mut self, subselect: &Subselect) -> Result<String, TranslationError> {
        // inside a subselect the DML target is referenced by its table name
        let outer_roots = std::mem::take(&mut self.ctx.root_aliases);
        let outer_dml_table = self.ctx.dml_table.take();
        let result = self.walk_subselect_inner(subselect);
        self.ctx.dml_table = outer_dml_table;
        self.ctx.root_aliases = outer_roots;
        result
    }

    fn walk_subselect_inner(&mut self, subselect: &Subselect) -> Result<String, TranslationError> {
        for declaration in &subselect.from {
            self.register_declaration(declaration)?;
        }
        let select = self.walk_scalar(&subselect.select, None)?;

        let mut from = Vec::with_capacity(subselect.from.len());
        for declaration in &subselect.from {
            from.push(self.walk_declaration(declaration, false)?);
        }

        let mut conditions = Vec::new();
        if let Some(where_clause) = &subselect.where_clause {
            conditions.push(self.walk_conditional(where_clause)?);
        }
        let roots = self.ctx.root_aliases.clone();
        conditions.extend(self.root_restrictions(&roots)?);

        let mut sql = format!(
            "SELECT {}{} FROM {}{}",
            if subselect.distinct { "DISTINCT " } else { "" },
            select,
            from.join(", "),
            where_sql(conditions)
        );
        if !subselect.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.walk_group_by(&subselect.group_by)?);
        }
        if let Some(having) = &subselect.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.walk_conditional(having)?);
        }
        Ok(sql)
    }
}

fn owning_association<'c>(
    class: &ClassDescriptor,
    assoc: &AssociationMapping,
    target: &'c ClassDescriptor,
    mapped_by: &str,
) -> Result<&'c AssociationMapping, TranslationError> {
    target
        .association(mapped_by)
        .ok_or_else(|| TranslationError::InvalidInverseAssociation {
            class_name: class.name.clone(),
            field: assoc.field_name.clone(),
        })
}

fn not(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}
