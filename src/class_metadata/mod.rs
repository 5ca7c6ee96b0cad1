pub mod association;
pub mod class_descriptor;
pub mod errors;
pub mod naming;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use association::{
    AssociationKind, AssociationMapping, Cardinality, Cascade, CollectionOptions, FetchMode,
    JoinColumn, JoinTable, OnDelete, OrderByField, OrderDirection,
};
pub use class_descriptor::{
    ClassDescriptor, ClassDescriptorBuilder, ColumnType, DiscriminatorColumn, FieldMapping,
    IdGenerator, InheritanceType, TableRef,
};
pub use errors::MappingError;
pub use naming::{DefaultNamingStrategy, JoinKeyRole, NamingStrategy, UnderscoreNamingStrategy};
pub use registry::{MetadataRegistry, MetadataRegistryBuilder};
