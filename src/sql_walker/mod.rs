//! Object query to SQL translation.
//!
//! [`SqlWalker`] walks a [`Statement`] once and produces the SQL text, the
//! [`ResultSetMapping`] describing every selected column and the parameter
//! references in placeholder order. All mutable state for the pass lives in
//! a [`TranslationContext`] owned by the walker, so concurrent translations
//! never share counters or mappings.
//!
//! The walk is split by clause:
//! - `select_clause`: select list, entity expansion, eager associations
//! - `from_clause`: range declarations, association and entity joins
//! - `inheritance`: class table inheritance joins, discriminator and filter
//!   restrictions
//! - `expression`: conditional and scalar expressions, subselects
//! - `order_by`: explicit and collection default ordering
//! - `dml`: UPDATE and DELETE, including the multi-table strategy

use serde::Serialize;

pub mod alias_allocator;
pub mod context;
mod dml;
pub mod errors;
mod expression;
mod from_clause;
mod inheritance;
mod order_by;
mod select_clause;


pub use alias_allocator::{AliasAllocator, TableAliasStyle};
pub use context::{QueryComponent, TranslationContext, TranslationEnv};
pub use errors::TranslationError;

use crate::platform::LockMode;
use crate::query::ast::{SelectStatement, Statement};
use crate::query::{ParameterRef, QueryHints};
use crate::result_mapping::ResultSetMapping;

/// How a translated statement must be executed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecutionStrategy {
    /// Run `sql` as is
    Single,
    /// `sql` selects the identifiers of the affected rows; each statement
    /// then runs once with those identifiers bound to its trailing
    /// placeholder, in order.
    MultiTable { statements: Vec<MultiTableStatement> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTableStatement {
    pub table: String,
    pub sql: String,
    /// References for every placeholder except the trailing identifier list
    pub parameter_refs: Vec<ParameterRef>,
}

/// Result of one translation pass, before parameters are bound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub sql: String,
    pub rsm: ResultSetMapping,
    /// One entry per `?` in `sql`, in order
    pub parameter_refs: Vec<ParameterRef>,
    pub strategy: ExecutionStrategy,
}

impl Translation {
    pub fn is_multi_table(&self) -> bool {
        matches!(self.strategy, ExecutionStrategy::MultiTable { .. })
    }
}

pub struct SqlWalker<'a> {
    pub(crate) ctx: TranslationContext<'a>,
}

impl<'a> SqlWalker<'a> {
    pub fn new(env: TranslationEnv<'a>, hints: QueryHints) -> Self {
        SqlWalker {
            ctx: TranslationContext::new(env, hints, TableAliasStyle::TableInitial),
        }
    }

    /// Consumes the walker; a walker translates exactly one statement
    pub fn translate(mut self, statement: &Statement) -> Result<Translation, TranslationError> {
        let (sql, strategy) = match statement {
            Statement::Select(select) => (self.walk_select_statement(select)?, ExecutionStrategy::Single),
            Statement::Update(update) => self.walk_update_statement(update)?,
            Statement::Delete(delete) => self.walk_delete_statement(delete)?,
        };

        log::debug!("Translated statement to SQL: {}", sql);
        crate::debug_print!("Result set mapping: {:?}", self.ctx.rsm);

        Ok(Translation {
            sql,
            rsm: self.ctx.rsm,
            parameter_refs: self.ctx.parameter_refs,
            strategy,
        })
    }

    fn walk_select_statement(&mut self, stmt: &SelectStatement) -> Result<String, TranslationError> {
        for declaration in &stmt.from {
            self.register_declaration(declaration)?;
        }
        self.check_optimistic_lock()?;

        let mut sql = self.walk_select_clause(stmt)?;
        sql.push_str(&self.walk_from_clause(&stmt.from)?);

        let mut conditions = Vec::new();
        if let Some(where_clause) = &stmt.where_clause {
            conditions.push(self.walk_conditional(where_clause)?);
        }
        let roots = self.ctx.root_aliases.clone();
        conditions.extend(self.root_restrictions(&roots)?);
        sql.push_str(&where_sql(conditions));

        if !stmt.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.walk_group_by(&stmt.group_by)?);
        }
        if let Some(having) = &stmt.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.walk_conditional(having)?);
        }
        sql.push_str(&self.walk_order_by_clause(&stmt.order_by)?);

        let platform = self.ctx.env.platform;
        let mut sql = platform.modify_limit_query(&sql, self.ctx.hints.limit, self.ctx.hints.offset)?;

        match self.ctx.hints.lock_mode {
            LockMode::PessimisticRead | LockMode::PessimisticWrite => {
                let clause = platform.lock_clause(self.ctx.hints.lock_mode)?;
                if !clause.is_empty() {
                    sql.push(' ');
                    sql.push_str(&clause);
                }
            }
            LockMode::None | LockMode::Optimistic => {}
        }
        Ok(sql)
    }

    /// Optimistic locking needs a version field on every selected root type
    fn check_optimistic_lock(&self) -> Result<(), TranslationError> {
        if self.ctx.hints.lock_mode != LockMode::Optimistic {
            return Ok(());
        }
        for alias in &self.ctx.root_aliases {
            let class = self.ctx.class_of_alias(alias)?;
            if !class.is_versioned() {
                return Err(TranslationError::OptimisticLockNotVersioned {
                    class_name: class.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Translates `statement` in a fresh pass
pub fn translate(
    env: TranslationEnv<'_>,
    statement: &Statement,
    hints: &QueryHints,
) -> Result<Translation, TranslationError> {
    SqlWalker::new(env, hints.clone()).translate(statement)
}

/// ` WHERE a AND b`; a lone condition is emitted as is, otherwise each part
/// containing OR is parenthesized
pub(crate) fn where_sql(conditions: Vec<String>) -> String {
    match conditions.len() {
        0 => String::new(),
        1 => format!(" WHERE {}", conditions[0]),
        _ => format!(" WHERE {}", and_all(conditions)),
    }
}

pub(crate) fn and_all(conditions: Vec<String>) -> String {
    if conditions.len() == 1 {
        return conditions.into_iter().collect();
    }
    conditions
        .into_iter()
        .map(|c| if needs_parens(&c) { format!("({})", c) } else { c })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// True when `sql` has an OR outside parentheses
fn needs_parens(sql: &str) -> bool {
    let mut depth = 0i32;
    let mut in_quote = false;
    let bytes = sql.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b' ' if !in_quote && depth == 0 => {
                if sql[i..].starts_with(" OR ") {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
