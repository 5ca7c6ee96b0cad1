//! Per-class persistence.
//!
//! An [`EntityPersister`] builds and runs the SQL that loads, inserts,
//! updates, deletes and locks instances of one mapped class. Entities travel
//! as [`EntityState`] values and every statement goes through a
//! [`Connection`].
//!
//! - `condition`: criteria -> WHERE rendering shared by all selects
//! - `select`: loads, criteria loads, exists, count and lock statements
//! - `insert` / `update` / `delete`: write paths, joined inheritance aware
//! - `collection`: one-to-many and many-to-many collection loaders

pub mod collection;
mod condition;
pub mod connection;
mod delete;
pub mod entity_state;
pub mod errors;
mod insert;
mod select;
mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use collection::LoadedCollection;
pub use connection::{Connection, ConnectionError, PreparedStatement, Row};
pub use entity_state::{EntityRef, EntityState};
pub use errors::PersisterError;
pub use insert::{InsertOutcome, PendingReference};
pub use select::{Projection, SelectSql};

use crate::class_metadata::ClassDescriptor;
use crate::sql_walker::{AliasAllocator, TableAliasStyle, TranslationEnv};

use condition::SqlScope;

/// Alias of the entity result in every persister select
pub const RESULT_ALIAS: &str = "r";

#[derive(Clone, Copy)]
pub struct EntityPersister<'a> {
    env: TranslationEnv<'a>,
    class: &'a ClassDescriptor,
}

impl<'a> EntityPersister<'a> {
    pub fn new(env: TranslationEnv<'a>, class: &'a ClassDescriptor) -> Self {
        EntityPersister { env, class }
    }

    pub fn class(&self) -> &'a ClassDescriptor {
        self.class
    }

    fn scope(&self) -> SqlScope<'a> {
        SqlScope::new(
            self.env,
            self.class,
            AliasAllocator::new(TableAliasStyle::Fixed("t"), self.env.max_identifier_length),
        )
    }

    fn describe(&self, class_name: &str) -> Result<&'a ClassDescriptor, PersisterError> {
        Ok(self.env.registry.describe(class_name)?)
    }

    /// Rejects states of another hierarchy; subclasses of this class pass
    fn check_class(&self, state: &EntityState) -> Result<&'a ClassDescriptor, PersisterError> {
        let concrete = self.describe(&state.class_name)?;
        if concrete.name != self.class.name && !concrete.parent_classes.contains(&self.class.name) {
            return Err(PersisterError::ClassMismatch {
                expected: self.class.name.clone(),
                actual: state.class_name.clone(),
            });
        }
        Ok(concrete)
    }

    /// Quoted table name of `class`
    fn table_sql(&self, class: &ClassDescriptor) -> String {
        self.env.quote.table_name(&class.table, self.env.platform)
    }

    /// `[class, parents...]` under joined inheritance, `[class]` otherwise
    fn hierarchy_tables(&self, class: &'a ClassDescriptor) -> Result<Vec<&'a ClassDescriptor>, PersisterError> {
        let mut tables = vec![class];
        if class.is_inheritance_type_joined() {
            for parent in &class.parent_classes {
                tables.push(self.describe(parent)?);
            }
        }
        Ok(tables)
    }
}
