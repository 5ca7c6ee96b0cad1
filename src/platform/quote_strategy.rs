//! Quote strategies decide which mapped names are emitted quoted.

use std::fmt;

use super::SqlPlatform;
use crate::class_metadata::{AssociationMapping, ClassDescriptor, JoinColumn, TableRef};

pub trait QuoteStrategy: fmt::Debug + Send + Sync {
    /// Column of `field`; falls back to the raw field name for unmapped fields
    fn column_name(&self, field: &str, class: &ClassDescriptor, platform: &dyn SqlPlatform) -> String;

    /// Schema-qualified table name
    fn table_name(&self, table: &TableRef, platform: &dyn SqlPlatform) -> String;

    fn join_table_name(
        &self,
        association: &AssociationMapping,
        platform: &dyn SqlPlatform,
    ) -> Option<String>;

    fn join_column_name(&self, column: &JoinColumn, platform: &dyn SqlPlatform) -> String;

    fn referenced_column_name(
        &self,
        column: &JoinColumn,
        target: &ClassDescriptor,
        platform: &dyn SqlPlatform,
    ) -> String;

    fn identifier_column_names(
        &self,
        class: &ClassDescriptor,
        platform: &dyn SqlPlatform,
    ) -> Vec<String>;

    fn discriminator_column_name(
        &self,
        class: &ClassDescriptor,
        platform: &dyn SqlPlatform,
    ) -> Option<String>;
}

/// Quotes only names the mapping flags as quoted.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultQuoteStrategy;

fn maybe_quote(name: &str, quoted: bool, platform: &dyn SqlPlatform) -> String {
    if quoted {
        platform.quote_identifier(name)
    } else {
        name.to_string()
    }
}

impl QuoteStrategy for DefaultQuoteStrategy {
    fn column_name(&self, field: &str, class: &ClassDescriptor, platform: &dyn SqlPlatform) -> String {
        match class.field(field) {
            Some(mapping) => maybe_quote(&mapping.column_name, mapping.quoted, platform),
            None => field.to_string(),
        }
    }

    fn table_name(&self, table: &TableRef, platform: &dyn SqlPlatform) -> String {
        let name = platform.qualified_table_name(table.schema.as_deref(), &table.name);
        maybe_quote(&name, table.quoted, platform)
    }

    fn join_table_name(
        &self,
        association: &AssociationMapping,
        platform: &dyn SqlPlatform,
    ) -> Option<String> {
        association.join_table_mapping().map(|jt| {
            let name = platform.qualified_table_name(jt.schema.as_deref(), &jt.name);
            maybe_quote(&name, jt.quoted, platform)
        })
    }

    fn join_column_name(&self, column: &JoinColumn, platform: &dyn SqlPlatform) -> String {
        maybe_quote(&column.name, column.quoted, platform)
    }

    fn referenced_column_name(
        &self,
        column: &JoinColumn,
        target: &ClassDescriptor,
        platform: &dyn SqlPlatform,
    ) -> String {
        let quoted = column.quoted
            || target
                .field_for_column(&column.referenced_column_name)
                .and_then(|f| target.field(f))
                .map_or(false, |f| f.quoted);
        maybe_quote(&column.referenced_column_name, quoted, platform)
    }

    fn identifier_column_names(
        &self,
        class: &ClassDescriptor,
        platform: &dyn SqlPlatform,
    ) -> Vec<String> {
        let mut columns = Vec::new();
        for id in &class.identifier {
            if let Some(field) = class.field(id) {
                columns.push(maybe_quote(&field.column_name, field.quoted, platform));
            } else if let Some(assoc) = class.association(id) {
                columns.extend(
                    assoc
                        .join_columns()
                        .iter()
                        .map(|jc| self.join_column_name(jc, platform)),
                );
            }
        }
        columns
    }

    fn discriminator_column_name(
        &self,
        class: &ClassDescriptor,
        _platform: &dyn SqlPlatform,
    ) -> Option<String> {
        class.discriminator_column.as_ref().map(|d| d.name.clone())
    }
}

/// Never quotes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiQuoteStrategy;

impl QuoteStrategy for AnsiQuoteStrategy {
    fn column_name(&self, field: &str, class: &ClassDescriptor, _platform: &dyn SqlPlatform) -> String {
        class
            .column_name(field)
            .map(str::to_string)
            .unwrap_or_else(|| field.to_string())
    }

    fn table_name(&self, table: &TableRef, platform: &dyn SqlPlatform) -> String {
        platform.qualified_table_name(table.schema.as_deref(), &table.name)
    }

    fn join_table_name(
        &self,
        association: &AssociationMapping,
        platform: &dyn SqlPlatform,
    ) -> Option<String> {
        association
            .join_table_mapping()
            .map(|jt| platform.qualified_table_name(jt.schema.as_deref(), &jt.name))
    }

    fn join_column_name(&self, column: &JoinColumn, _platform: &dyn SqlPlatform) -> String {
        column.name.clone()
    }

    fn referenced_column_name(
        &self,
        column: &JoinColumn,
        _target: &ClassDescriptor,
        _platform: &dyn SqlPlatform,
    ) -> String {
        column.referenced_column_name.clone()
    }

    fn identifier_column_names(
        &self,
        class: &ClassDescriptor,
        _platform: &dyn SqlPlatform,
    ) -> Vec<String> {
        class.identifier_columns()
    }

    fn discriminator_column_name(
        &self,
        class: &ClassDescriptor,
        _platform: &dyn SqlPlatform,
    ) -> Option<String> {
        class.discriminator_column.as_ref().map(|d| d.name.clone())
    }
}
