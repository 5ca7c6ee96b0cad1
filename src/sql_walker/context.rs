//! Per-pass translation state.
//!
//! A [`TranslationContext`] is created fresh for every translation and
//! owns everything that mutates while the walker runs: the alias
//! allocator, the result-set mapping under construction, registered query
//! components and recorded parameters. The collaborators it borrows
//! (registry, platform, quote strategy, filters) are read-only.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::alias_allocator::{AliasAllocator, TableAliasStyle};
use super::errors::TranslationError;
use crate::class_metadata::{ClassDescriptor, MetadataRegistry};
use crate::filters::FilterCollection;
use crate::platform::{QuoteStrategy, SqlPlatform};
use crate::query::ast::JoinType;
use crate::query::{ParameterRef, QueryHints};
use crate::result_mapping::ResultSetMapping;

/// Read-only collaborators shared by every pass
#[derive(Clone, Copy)]
pub struct TranslationEnv<'a> {
    pub registry: &'a MetadataRegistry,
    pub platform: &'a dyn SqlPlatform,
    pub quote: &'a dyn QuoteStrategy,
    pub filters: &'a FilterCollection,
    pub max_identifier_length: usize,
}

/// An identification variable and what it stands for
#[derive(Debug, Clone, PartialEq)]
pub struct QueryComponent {
    pub class_name: String,
    pub parent_alias: Option<String>,
    /// Association on the parent this alias was joined through
    pub relation: Option<String>,
    pub join_type: Option<JoinType>,
    /// Root alias of the FROM declaration this alias belongs to
    pub declaration_root: String,
    /// Added by eager expansion rather than written in the query
    pub is_expansion: bool,
}

impl QueryComponent {
    pub fn root(class_name: &str, alias: &str) -> Self {
        QueryComponent {
            class_name: class_name.to_string(),
            parent_alias: None,
            relation: None,
            join_type: None,
            declaration_root: alias.to_string(),
            is_expansion: false,
        }
    }

    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }
}

pub struct TranslationContext<'a> {
    pub env: TranslationEnv<'a>,
    pub hints: QueryHints,
    pub aliases: AliasAllocator,
    pub rsm: ResultSetMapping,
    pub components: IndexMap<String, QueryComponent>,
    /// result variable -> SQL column alias
    pub scalar_result_aliases: HashMap<String, String>,
    pub root_aliases: Vec<String>,
    pub parameter_refs: Vec<ParameterRef>,
    /// `sql_alias.column` already present in ORDER BY
    pub ordered_columns: HashSet<String>,
    /// Joins produced by eager expansion, keyed by declaration root
    pub expansion_joins: IndexMap<String, Vec<String>>,
    /// DML renders bare column names against the target table
    pub dml_table: Option<String>,
}

impl<'a> TranslationContext<'a> {
    pub fn new(env: TranslationEnv<'a>, hints: QueryHints, style: TableAliasStyle) -> Self {
        TranslationContext {
            aliases: AliasAllocator::new(style, env.max_identifier_length),
            env,
            hints,
            rsm: ResultSetMapping::new(),
            components: IndexMap::new(),
            scalar_result_aliases: HashMap::new(),
            root_aliases: Vec::new(),
            parameter_refs: Vec::new(),
            ordered_columns: HashSet::new(),
            expansion_joins: IndexMap::new(),
            dml_table: None,
        }
    }

    pub fn component(&self, alias: &str) -> Result<&QueryComponent, TranslationError> {
        self.components
            .get(alias)
            .ok_or_else(|| TranslationError::unknown_alias(alias))
    }

    pub fn describe(&self, class_name: &str) -> Result<&'a ClassDescriptor, TranslationError> {
        Ok(self.env.registry.describe(class_name)?)
    }

    /// Descriptor of the class behind an identification variable
    pub fn class_of_alias(&self, alias: &str) -> Result<&'a ClassDescriptor, TranslationError> {
        let class_name = self.component(alias)?.class_name.clone();
        self.describe(&class_name)
    }

    pub fn register_component(
        &mut self,
        alias: &str,
        component: QueryComponent,
    ) -> Result<(), TranslationError> {
        if self.components.contains_key(alias) {
            return Err(TranslationError::unsupported_with_context(
                format!("identification variable `{}` declared twice", alias),
                "Registering query components",
            ));
        }
        self.components.insert(alias.to_string(), component);
        Ok(())
    }

    /// SQL alias of `class`'s own table under identification variable
    /// `dql_alias`
    pub fn table_alias_for(&mut self, class: &ClassDescriptor, dql_alias: &str) -> String {
        self.aliases.table_alias(&class.table.name, dql_alias)
    }

    /// SQL alias of the table that stores `field` of `class`
    pub fn table_alias_for_field(
        &mut self,
        class: &ClassDescriptor,
        field: &str,
        dql_alias: &str,
    ) -> Result<String, TranslationError> {
        let owner_name = class.owning_class_of(field);
        if owner_name == class.name {
            return Ok(self.table_alias_for(class, dql_alias));
        }
        let owner = self.describe(owner_name)?;
        Ok(self.table_alias_for(owner, dql_alias))
    }

    /// `alias.column`, or the bare column while rendering DML
    pub fn qualify(&self, table_alias: &str, column: &str) -> String {
        match &self.dml_table {
            Some(_) => column.to_string(),
            None => format!("{}.{}", table_alias, column),
        }
    }
}
