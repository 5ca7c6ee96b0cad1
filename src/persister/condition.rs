//! Criteria -> SQL condition rendering for persister selects.
//!
//! Operators map as follows:
//! - `Eq` / `Is`: `col = ?`, or `col IS NULL` for a null value
//! - `Neq`: `col != ?`, or `col IS NOT NULL`
//! - `Gt`, `Gte`, `Lt`, `Lte`: the SQL comparison
//! - `In` / `Nin`: one placeholder per element; a null element adds
//!   `OR col IS NULL` (`AND col IS NOT NULL` when negated)
//! - `Contains`, `StartsWith`, `EndsWith`: `col LIKE ?` with the value
//!   wrapped in `%`
//!
//! A list value under `Eq` / `Neq` behaves like `In` / `Nin`.

use std::collections::HashSet;

use super::errors::PersisterError;
use crate::class_metadata::association::ManyToManySide;
use crate::class_metadata::{AssociationKind, ClassDescriptor, JoinColumn};
use crate::query::criteria::Comparison;
use crate::query::{ComparisonOp, Expression, ParameterList, ParameterType, Value};
use crate::sql_walker::errors::TranslationError;
use crate::sql_walker::{and_all, AliasAllocator, TranslationEnv};

/// Per-statement state shared by the select, lock, exists and count paths
pub(crate) struct SqlScope<'a> {
    pub env: TranslationEnv<'a>,
    pub class: &'a ClassDescriptor,
    pub aliases: AliasAllocator,
    pub params: ParameterList,
    /// Join-table joins a many-to-many condition needs
    pub joins: Vec<String>,
    joined_tables: HashSet<String>,
}

impl<'a> SqlScope<'a> {
    pub fn new(env: TranslationEnv<'a>, class: &'a ClassDescriptor, aliases: AliasAllocator) -> Self {
        SqlScope {
            env,
            class,
            aliases,
            params: ParameterList::new(),
            joins: Vec::new(),
            joined_tables: HashSet::new(),
        }
    }

    /// Alias of the class's own table
    pub fn root_alias(&mut self) -> String {
        self.aliases.table_alias(&self.class.table.name, "")
    }

    /// Alias of the table storing `field`
    pub fn alias_for_field(&mut self, field: &str) -> Result<String, PersisterError> {
        let owner = self.env.registry.describe(self.class.owning_class_of(field))?;
        Ok(self.aliases.table_alias(&owner.table.name, ""))
    }

    pub fn alias_for_class(&mut self, class: &ClassDescriptor) -> String {
        self.aliases.table_alias(&class.table.name, "")
    }

    pub fn condition_sql(&mut self, expr: &Expression) -> Result<String, PersisterError> {
        match expr {
            Expression::Comparison(comparison) => self.comparison_sql(comparison),
            Expression::And(parts) => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(self.condition_sql(part)?);
                }
                Ok(and_all(rendered))
            }
            Expression::Or(parts) => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(self.condition_sql(part)?);
                }
                Ok(if rendered.len() > 1 {
                    format!("({})", rendered.join(" OR "))
                } else {
                    rendered.join(" OR ")
                })
            }
            Expression::Not(inner) => Ok(format!("NOT ({})", self.condition_sql(inner)?)),
        }
    }

    fn comparison_sql(&mut self, comparison: &Comparison) -> Result<String, PersisterError> {
        let (columns, field_type) = self.field_columns(&comparison.field)?;
        let op = match (comparison.op, &comparison.value) {
            (ComparisonOp::Eq | ComparisonOp::Is, Value::List(_)) => ComparisonOp::In,
            (ComparisonOp::Neq, Value::List(_)) => ComparisonOp::Nin,
            (op, _) => op,
        };

        if let [column] = columns.as_slice() {
            return self.single_column_sql(column, op, &comparison.value, field_type);
        }

        // composite columns: only equality against a value per column
        match (comparison.op, &comparison.value) {
            (ComparisonOp::Eq | ComparisonOp::Is, Value::List(items))
                if items.len() == columns.len() && items.iter().all(|v| !v.is_null()) =>
            {
                let mut parts = Vec::with_capacity(columns.len());
                for (column, item) in columns.iter().zip(items) {
                    self.params.push(item.clone(), item.inferred_type());
                    parts.push(format!("{} = ?", column));
                }
                Ok(parts.join(" AND "))
            }
            _ => Err(TranslationError::CompositeKeyNotSupported {
                class_name: self.class.name.clone(),
                field: comparison.field.clone(),
            }
            .into()),
        }
    }

    fn single_column_sql(
        &mut self,
        column: &str,
        op: ComparisonOp,
        value: &Value,
        field_type: Option<ParameterType>,
    ) -> Result<String, PersisterError> {
        let sql_op = match op {
            ComparisonOp::Eq | ComparisonOp::Is if value.is_null() => {
                return Ok(format!("{} IS NULL", column));
            }
            ComparisonOp::Neq if value.is_null() => {
                return Ok(format!("{} IS NOT NULL", column));
            }
            ComparisonOp::In => return Ok(self.in_list_sql(column, value, false, field_type)),
            ComparisonOp::Nin => return Ok(self.in_list_sql(column, value, true, field_type)),
            ComparisonOp::Contains | ComparisonOp::StartsWith | ComparisonOp::EndsWith => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let pattern = match op {
                    ComparisonOp::Contains => format!("%{}%", text),
                    ComparisonOp::StartsWith => format!("{}%", text),
                    _ => format!("%{}", text),
                };
                self.params.push(Value::String(pattern), ParameterType::String);
                return Ok(format!("{} LIKE ?", column));
            }
            ComparisonOp::Eq | ComparisonOp::Is => "=",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        };
        self.bind(value.clone(), field_type);
        Ok(format!("{} {} ?", column, sql_op))
    }

    fn in_list_sql(
        &mut self,
        column: &str,
        value: &Value,
        negated: bool,
        field_type: Option<ParameterType>,
    ) -> String {
        let items: Vec<Value> = match value {
            Value::List(items) => items.clone(),
            other => vec![other.clone()],
        };
        let has_null = items.iter().any(Value::is_null);
        let values: Vec<Value> = items.into_iter().filter(|v| !v.is_null()).collect();
        let keyword = if negated { "NOT IN" } else { "IN" };

        if values.is_empty() {
            return match (has_null, negated) {
                (true, false) => format!("{} IS NULL", column),
                (true, true) => format!("{} IS NOT NULL", column),
                (false, _) => format!("{} {} (NULL)", column, keyword),
            };
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        for item in values {
            self.bind(item, field_type);
        }
        let sql = format!("{} {} ({})", column, keyword, placeholders);
        match (has_null, negated) {
            (false, _) => sql,
            (true, false) => format!("({} OR {} IS NULL)", sql, column),
            (true, true) => format!("({} AND {} IS NOT NULL)", sql, column),
        }
    }

    fn bind(&mut self, value: Value, field_type: Option<ParameterType>) {
        let param_type = field_type.unwrap_or_else(|| value.inferred_type());
        self.params.push(value, param_type);
    }

    /// Qualified columns a criteria field compares against, with their
    /// binding type
    pub fn field_columns(
        &mut self,
        field: &str,
    ) -> Result<(Vec<String>, Option<ParameterType>), PersisterError> {
        let env = self.env;
        let class = self.class;

        if let Some(mapping) = class.field(field) {
            let alias = self.alias_for_field(field)?;
            let column = env.quote.column_name(field, class, env.platform);
            return Ok((
                vec![format!("{}.{}", alias, column)],
                Some(mapping.column_type.binding_type()),
            ));
        }

        let assoc = class
            .association(field)
            .ok_or_else(|| PersisterError::unrecognized_field(&class.name, field))?;
        let target = env.registry.describe(&assoc.target_entity)?;

        if assoc.is_owning_to_one() {
            let alias = self.alias_for_field(field)?;
            let columns = assoc
                .join_columns()
                .iter()
                .map(|jc| format!("{}.{}", alias, env.quote.join_column_name(jc, env.platform)))
                .collect();
            let field_type = match assoc.join_columns() {
                [single] => target
                    .field_for_column(&single.referenced_column_name)
                    .and_then(|f| target.binding_type_of(f)),
                _ => None,
            };
            return Ok((columns, field_type));
        }

        let AssociationKind::ManyToMany { side, .. } = &assoc.kind else {
            return Err(TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: field.to_string(),
            }
            .into());
        };

        let owning = match side {
            ManyToManySide::Owning(_) => assoc,
            ManyToManySide::Inverse(inverse) => target.get_association(&inverse.mapped_by)?,
        };
        let join_table = owning.join_table_mapping().ok_or_else(|| {
            TranslationError::InvalidInverseAssociation {
                class_name: class.name.clone(),
                field: field.to_string(),
            }
        })?;
        // (columns pointing at this class, columns compared against the value)
        let (source_columns, value_columns) = match side {
            ManyToManySide::Owning(_) => (&join_table.join_columns, &join_table.inverse_join_columns),
            ManyToManySide::Inverse(_) => (&join_table.inverse_join_columns, &join_table.join_columns),
        };
        let table = env
            .quote
            .join_table_name(owning, env.platform)
            .unwrap_or_else(|| join_table.name.clone());

        let columns = self.join_table_columns(&table, source_columns, value_columns);
        let field_type = match value_columns.as_slice() {
            [single] => target
                .field_for_column(&single.referenced_column_name)
                .and_then(|f| target.binding_type_of(f)),
            _ => None,
        };
        Ok((columns, field_type))
    }

    /// Joins `table` to the class table on `source_columns` (once per
    /// table) and returns the qualified `value_columns`
    pub fn join_table_columns(
        &mut self,
        table: &str,
        source_columns: &[JoinColumn],
        value_columns: &[JoinColumn],
    ) -> Vec<String> {
        let env = self.env;
        if self.joined_tables.insert(table.to_string()) {
            let root_alias = self.root_alias();
            let on: Vec<String> = source_columns
                .iter()
                .map(|jc| {
                    format!(
                        "{}.{} = {}.{}",
                        table,
                        env.quote.join_column_name(jc, env.platform),
                        root_alias,
                        env.quote.referenced_column_name(jc, self.class, env.platform)
                    )
                })
                .collect();
            self.joins
                .push(format!("INNER JOIN {} ON {}", table, on.join(" AND ")));
        }
        value_columns
            .iter()
            .map(|jc| format!("{}.{}", table, env.quote.join_column_name(jc, env.platform)))
            .collect()
    }
}
