use super::errors::TranslationError;
use super::SqlWalker;
use crate::query::ast::{OrderByItem, ScalarExpression};

impl<'a> SqlWalker<'a> {
    /// GROUP BY items; an identification variable groups by every column
    /// of its entity
    pub(super) fn walk_group_by(
        &mut self,
        items: &[ScalarExpression],
    ) -> Result<String, TranslationError> {
        let mut columns = Vec::new();
        for item in items {
            match item {
                ScalarExpression::IdentificationVariable(alias) => {
                    columns.extend(self.entity_group_columns(alias)?);
                }
                other => columns.push(self.walk_scalar(other, None)?),
            }
        }
        Ok(columns.join(", "))
    }

    fn entity_group_columns(&mut self, alias: &str) -> Result<Vec<String>, TranslationError> {
        let class = self.ctx.class_of_alias(alias)?;
        let env = self.ctx.env;
        let mut columns = Vec::new();
        for field in class.fields.keys() {
            let table_alias = self.ctx.table_alias_for_field(class, field, alias)?;
            let column = env.quote.column_name(field, class, env.platform);
            columns.push(self.ctx.qualify(&table_alias, &column));
        }
        for assoc in class.associations.values().filter(|a| a.is_owning_to_one()) {
            let table_alias = self
                .ctx
                .table_alias_for_field(class, &assoc.field_name, alias)?;
            for join_column in assoc.join_columns() {
                let column = env.quote.join_column_name(join_column, env.platform);
                columns.push(self.ctx.qualify(&table_alias, &column));
            }
        }
        Ok(columns)
    }

    /// Explicit ORDER BY items, then the default ordering of every fetched
    /// collection. A collection default on a column already ordered
    /// explicitly is skipped.
    pub(super) fn walk_order_by_clause(
        &mut self,
        items: &[OrderByItem],
    ) -> Result<String, TranslationError> {
        let mut parts = Vec::new();
        for item in items {
            let sql = self.walk_scalar(&item.expr, None)?;
            self.ctx.ordered_columns.insert(sql.clone());
            parts.push(format!("{} {}", sql, item.direction.as_sql()));
        }
        parts.extend(self.collection_order_by()?);

        if parts.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    fn collection_order_by(&mut self) -> Result<Vec<String>, TranslationError> {
        let env = self.ctx.env;
        let fetched: Vec<(String, String, String)> = self
            .ctx
            .rsm
            .joined_entity_results
            .iter()
            .map(|(alias, joined)| {
                (
                    alias.clone(),
                    joined.parent_alias.clone(),
                    joined.relation.clone(),
                )
            })
            .collect();

        let mut parts = Vec::new();
        for (alias, parent_alias, relation) in fetched {
            let parent = self.ctx.class_of_alias(&parent_alias)?;
            let Some(assoc) = parent.association(&relation) else {
                continue;
            };
            if !assoc.is_to_many() {
                continue;
            }
            let target = self.ctx.class_of_alias(&alias)?;
            for order in assoc.order_by_fields() {
                if !target.has_field(&order.field) {
                    return Err(TranslationError::unrecognized_field(&target.name, &order.field));
                }
                let table_alias = self.ctx.table_alias_for_field(target, &order.field, &alias)?;
                let column = env.quote.column_name(&order.field, target, env.platform);
                let sql = self.ctx.qualify(&table_alias, &column);
                if !self.ctx.ordered_columns.insert(sql.clone()) {
                    continue;
                }
                parts.push(format!("{} {}", sql, order.direction.as_sql()));
            }
        }
        Ok(parts)
    }
}
