//! Row-level SQL filters.
//!
//! An enabled filter contributes an extra predicate for every root entity
//! table the translator or a persister reads. Predicates are written against
//! a table alias placeholder and rendered with the alias chosen for the
//! current pass.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::class_metadata::ClassDescriptor;
use crate::sql_walker::errors::TranslationError;

pub trait SqlFilter: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Predicate for `class` under `table_alias`; empty when the filter
    /// does not apply.
    fn add_filter_constraint(&self, class: &ClassDescriptor, table_alias: &str) -> String;
}

/// Filter built from a predicate template such as `{alias}.deleted = 0`
#[derive(Debug, Clone)]
pub struct PredicateFilter {
    name: String,
    template: String,
    root_classes: Option<HashSet<String>>,
}

impl PredicateFilter {
    pub const ALIAS_PLACEHOLDER: &'static str = "{alias}";

    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        PredicateFilter {
            name: name.into(),
            template: template.into(),
            root_classes: None,
        }
    }

    /// Restricts the filter to hierarchies rooted at `class_name`
    pub fn for_class(mut self, class_name: impl Into<String>) -> Self {
        self.root_classes
            .get_or_insert_with(HashSet::new)
            .insert(class_name.into());
        self
    }
}

impl SqlFilter for PredicateFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_filter_constraint(&self, class: &ClassDescriptor, table_alias: &str) -> String {
        if let Some(classes) = &self.root_classes {
            if !classes.contains(&class.root_entity_name) && !classes.contains(&class.name) {
                return String::new();
            }
        }
        self.template
            .replace(Self::ALIAS_PLACEHOLDER, table_alias)
    }
}

/// Registered filters and which of them are enabled
#[derive(Debug, Clone, Default)]
pub struct FilterCollection {
    filters: IndexMap<String, (Arc<dyn SqlFilter>, bool)>,
}

impl FilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `filter` disabled
    pub fn register(&mut self, filter: Arc<dyn SqlFilter>) {
        self.filters
            .insert(filter.name().to_string(), (filter, false));
    }

    pub fn enable(&mut self, name: &str) -> Result<(), TranslationError> {
        self.set_enabled(name, true)
    }

    pub fn disable(&mut self, name: &str) -> Result<(), TranslationError> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), TranslationError> {
        let entry = self
            .filters
            .get_mut(name)
            .ok_or_else(|| TranslationError::UnknownFilter {
                name: name.to_string(),
            })?;
        entry.1 = enabled;
        log::debug!(
            "Filter `{}` {}",
            name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.filters.get(name).map_or(false, |(_, enabled)| *enabled)
    }

    pub fn enabled_names(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|(_, (_, enabled))| *enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Predicates of every enabled filter, each wrapped in parentheses and
    /// AND-ed; empty when nothing applies.
    pub fn constraint_sql(&self, class: &ClassDescriptor, table_alias: &str) -> String {
        self.filters
            .values()
            .filter(|(_, enabled)| *enabled)
            .map(|(filter, _)| filter.add_filter_constraint(class, table_alias))
            .filter(|sql| !sql.is_empty())
            .map(|sql| format!("({})", sql))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}
