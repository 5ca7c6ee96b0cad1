//! Shared descriptor fixtures for unit tests.

use super::association::{AssociationMapping, FetchMode, JoinColumn, JoinTable, OrderDirection};
use super::class_descriptor::{
    ClassDescriptor, ColumnType, DiscriminatorColumn, FieldMapping, IdGenerator, InheritanceType,
};
use super::registry::MetadataRegistry;

pub fn user_descriptor() -> ClassDescriptor {
    ClassDescriptor::builder("User")
        .table("user")
        .id(FieldMapping::new("id", ColumnType::Integer))
        .id_generator(IdGenerator::Identity)
        .field(FieldMapping::new("name", ColumnType::String).length(255))
        .field(FieldMapping::new("email", ColumnType::String).unique())
        .association(AssociationMapping::many_to_one("address", "Address"))
        .association(
            AssociationMapping::one_to_many("phones", "Phone", "user")
                .order_by("number", OrderDirection::Asc),
        )
        .association(
            AssociationMapping::many_to_many_owning("groups", "Group").join_table(
                JoinTable::new("user_groups")
                    .join_column(JoinColumn::new("user_id", "id").nullable(false))
                    .inverse_join_column(JoinColumn::new("group_id", "id").nullable(false)),
            ),
        )
        .build()
}

/// User, Address, Phone, Group and a versioned Article
pub fn user_registry() -> MetadataRegistry {
    MetadataRegistry::builder()
        .register(user_descriptor())
        .register(
            ClassDescriptor::builder("Address")
                .table("address")
                .id(FieldMapping::new("id", ColumnType::Integer))
                .field(FieldMapping::new("street", ColumnType::String))
                .field(FieldMapping::new("city", ColumnType::String))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Phone")
                .table("phone")
                .id(FieldMapping::new("id", ColumnType::Integer))
                .field(FieldMapping::new("number", ColumnType::String))
                .association(
                    AssociationMapping::many_to_one("user", "User")
                        .join_column(JoinColumn::new("user_id", "id").nullable(false)),
                )
                .build(),
        )
        .register(
            ClassDescriptor::builder("Group")
                .table("groups")
                .id(FieldMapping::new("id", ColumnType::Integer))
                .field(FieldMapping::new("name", ColumnType::String))
                .association(AssociationMapping::many_to_many_inverse("users", "User", "groups"))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Article")
                .table("article")
                .id(FieldMapping::new("id", ColumnType::Integer))
                .id_generator(IdGenerator::Identity)
                .field(FieldMapping::new("title", ColumnType::String))
                .version(FieldMapping::new("version", ColumnType::Integer))
                .association(
                    AssociationMapping::many_to_one("author", "User").fetch(FetchMode::Eager),
                )
                .build(),
        )
        .build()
        .expect("user fixtures are valid")
}

/// Person <- Employee <- {Manager, Intern}, Person <- Customer, joined tables
pub fn inheritance_registry() -> MetadataRegistry {
    MetadataRegistry::builder()
        .register(
            ClassDescriptor::builder("Person")
                .table("person")
                .inheritance(InheritanceType::Joined)
                .discriminator_column(DiscriminatorColumn {
                    name: "discr".to_string(),
                    column_type: ColumnType::String,
                    length: Some(32),
                })
                .discriminator_value("person")
                .id(FieldMapping::new("id", ColumnType::Integer))
                .id_generator(IdGenerator::Identity)
                .field(FieldMapping::new("name", ColumnType::String))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Employee")
                .table("employee")
                .extends("Person")
                .discriminator_value("employee")
                .field(FieldMapping::new("salary", ColumnType::Integer))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Manager")
                .table("manager")
                .extends("Employee")
                .discriminator_value("manager")
                .field(FieldMapping::new("title", ColumnType::String))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Customer")
                .table("customer")
                .extends("Person")
                .discriminator_value("customer")
                .field(FieldMapping::new("points", ColumnType::Integer))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Intern")
                .table("intern")
                .extends("Employee")
                .discriminator_value("intern")
                .field(FieldMapping::new("school", ColumnType::String))
                .build(),
        )
        .build()
        .expect("inheritance fixtures are valid")
}

/// Vehicle <- Car, Vehicle <- Truck sharing one table
pub fn single_table_registry() -> MetadataRegistry {
    MetadataRegistry::builder()
        .register(
            ClassDescriptor::builder("Vehicle")
                .table("vehicle")
                .inheritance(InheritanceType::SingleTable)
                .discriminator_column(DiscriminatorColumn {
                    name: "type".to_string(),
                    column_type: ColumnType::String,
                    length: Some(16),
                })
                .discriminator_value("vehicle")
                .id(FieldMapping::new("id", ColumnType::Integer))
                .field(FieldMapping::new("wheels", ColumnType::Integer))
                .build(),
        )
        .register(
            ClassDescriptor::builder("Car")
                .extends("Vehicle")
                .discriminator_value("car")
                .field(FieldMapping::new("doors", ColumnType::Integer).nullable())
                .build(),
        )
        .register(
            ClassDescriptor::builder("Truck")
                .extends("Vehicle")
                .discriminator_value("truck")
                .field(FieldMapping::new("payload", ColumnType::Integer).nullable())
                .build(),
        )
        .build()
        .expect("single table fixtures are valid")
}
