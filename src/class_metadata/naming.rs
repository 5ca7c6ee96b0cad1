//! Naming strategies.
//!
//! A naming strategy supplies table, column, join column and join table
//! names for mappings that leave them unspecified. The registry consults it
//! once, when descriptors are completed.

use convert_case::{Case, Casing};
use std::fmt;

/// Role of a join table column in a self-referencing many-to-many that
/// declares no join columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKeyRole {
    Source,
    Target,
}

impl JoinKeyRole {
    pub fn as_suffix(&self) -> &'static str {
        match self {
            JoinKeyRole::Source => "source",
            JoinKeyRole::Target => "target",
        }
    }
}

pub trait NamingStrategy: fmt::Debug + Send + Sync {
    fn class_to_table_name(&self, class_name: &str) -> String;

    fn property_to_column_name(&self, property: &str, class_name: &str) -> String;

    fn reference_column_name(&self) -> String {
        "id".to_string()
    }

    /// Join column of an owning to-one association
    fn join_column_name(&self, property: &str, class_name: &str) -> String {
        format!(
            "{}_{}",
            self.property_to_column_name(property, class_name),
            self.reference_column_name()
        )
    }

    fn join_table_name(&self, source_entity: &str, target_entity: &str, property: &str) -> String;

    /// Join table column referencing `entity_name`. `role` replaces the
    /// referenced column suffix when both sides reference the same class.
    fn join_key_column_name(
        &self,
        entity_name: &str,
        referenced_column_name: Option<&str>,
        role: Option<JoinKeyRole>,
    ) -> String;
}

/// Strips namespaces: `App\Entity\User`, `app::User` and `app.User` all
/// become `User`.
pub fn short_class_name(class_name: &str) -> &str {
    let after_backslash = class_name.rsplit('\\').next().unwrap_or(class_name);
    let after_path = after_backslash
        .rsplit("::")
        .next()
        .unwrap_or(after_backslash);
    after_path.rsplit('.').next().unwrap_or(after_path)
}

/// Short class names and property names verbatim.
#[derive(Debug, Default, Clone)]
pub struct DefaultNamingStrategy;

impl NamingStrategy for DefaultNamingStrategy {
    fn class_to_table_name(&self, class_name: &str) -> String {
        short_class_name(class_name).to_string()
    }

    fn property_to_column_name(&self, property: &str, _class_name: &str) -> String {
        property.to_string()
    }

    fn join_table_name(
        &self,
        source_entity: &str,
        target_entity: &str,
        _property: &str,
    ) -> String {
        format!(
            "{}_{}",
            self.class_to_table_name(source_entity),
            self.class_to_table_name(target_entity)
        )
        .to_lowercase()
    }

    fn join_key_column_name(
        &self,
        entity_name: &str,
        referenced_column_name: Option<&str>,
        role: Option<JoinKeyRole>,
    ) -> String {
        let suffix = match (role, referenced_column_name) {
            (Some(role), _) => role.as_suffix().to_string(),
            (None, Some(referenced)) => referenced.to_string(),
            (None, None) => self.reference_column_name(),
        };
        format!("{}_{}", self.class_to_table_name(entity_name), suffix).to_lowercase()
    }
}

/// snake_case for every generated name.
#[derive(Debug, Default, Clone)]
pub struct UnderscoreNamingStrategy;

impl NamingStrategy for UnderscoreNamingStrategy {
    fn class_to_table_name(&self, class_name: &str) -> String {
        short_class_name(class_name).to_case(Case::Snake)
    }

    fn property_to_column_name(&self, property: &str, _class_name: &str) -> String {
        property.to_case(Case::Snake)
    }

    fn join_table_name(
        &self,
        source_entity: &str,
        target_entity: &str,
        _property: &str,
    ) -> String {
        format!(
            "{}_{}",
            self.class_to_table_name(source_entity),
            self.class_to_table_name(target_entity)
        )
    }

    fn join_key_column_name(
        &self,
        entity_name: &str,
        referenced_column_name: Option<&str>,
        role: Option<JoinKeyRole>,
    ) -> String {
        let suffix = match (role, referenced_column_name) {
            (Some(role), _) => role.as_suffix().to_string(),
            (None, Some(referenced)) => referenced.to_case(Case::Snake),
            (None, None) => self.reference_column_name(),
        };
        format!("{}_{}", self.class_to_table_name(entity_name), suffix)
    }
}
