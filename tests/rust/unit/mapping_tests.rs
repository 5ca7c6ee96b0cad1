//! Registry defaults under both naming strategies

use std::sync::Arc;

use ormbridge::class_metadata::{
    AssociationMapping, ClassDescriptor, ColumnType, DefaultNamingStrategy, FieldMapping,
    MappingError, MetadataRegistry, NamingStrategy, UnderscoreNamingStrategy,
};

fn catalog() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::builder("shop::BlogPost")
            .id(FieldMapping::new("id", ColumnType::Integer))
            .field(FieldMapping::new("publishedAt", ColumnType::DateTime).nullable())
            .field(FieldMapping::new("headline", ColumnType::String).column("title"))
            .association(AssociationMapping::many_to_one("mainCategory", "Category"))
            .association(AssociationMapping::many_to_many_owning("categories", "Category"))
            .build(),
        ClassDescriptor::builder("Category")
            .id(FieldMapping::new("id", ColumnType::Integer))
            .build(),
    ]
}

fn registry_with(naming: Arc<dyn NamingStrategy>) -> MetadataRegistry {
    catalog()
        .into_iter()
        .fold(MetadataRegistry::builder().naming_strategy(naming), |b, d| b.register(d))
        .build()
        .unwrap()
}

#[test]
fn test_default_strategy_keeps_names_verbatim() {
    let registry = registry_with(Arc::new(DefaultNamingStrategy));
    let post = registry.describe("shop::BlogPost").unwrap();

    assert_eq!(post.table.name, "BlogPost");
    assert_eq!(post.column_name("publishedAt"), Some("publishedAt"));
    assert_eq!(post.column_name("headline"), Some("title"));
    assert_eq!(post.associations["mainCategory"].join_columns()[0].name, "mainCategory_id");

    let join_table = post.associations["categories"].join_table_mapping().unwrap();
    assert_eq!(join_table.name, "blogpost_category");
    assert_eq!(join_table.join_columns[0].name, "blogpost_id");
    assert_eq!(join_table.inverse_join_columns[0].name, "category_id");
}

#[test]
fn test_underscore_strategy_snake_cases_everything() {
    let registry = registry_with(Arc::new(UnderscoreNamingStrategy));
    let post = registry.describe("shop::BlogPost").unwrap();

    assert_eq!(post.table.name, "blog_post");
    assert_eq!(post.column_name("publishedAt"), Some("published_at"));
    assert_eq!(post.column_name("headline"), Some("title"));
    assert_eq!(post.associations["mainCategory"].join_columns()[0].name, "main_category_id");

    let join_table = post.associations["categories"].join_table_mapping().unwrap();
    assert_eq!(join_table.name, "blog_post_category");
    assert_eq!(join_table.join_columns[0].name, "blog_post_id");
    assert!(post.associations["categories"].is_on_delete_cascade());
}

#[test]
fn test_default_schema_reaches_join_tables() {
    let registry = catalog()
        .into_iter()
        .fold(
            MetadataRegistry::builder().default_schema(Some("shop".to_string())),
            |b, d| b.register(d),
        )
        .build()
        .unwrap();
    let post = registry.describe("shop::BlogPost").unwrap();
    assert_eq!(post.table.schema.as_deref(), Some("shop"));
    assert_eq!(
        post.associations["categories"]
            .join_table_mapping()
            .and_then(|jt| jt.schema.as_deref()),
        Some("shop")
    );
}

#[test]
fn test_unregistered_target_is_rejected() {
    let err = MetadataRegistry::builder()
        .register(catalog().remove(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, MappingError::UnknownClass { class_name } if class_name.starts_with("Category")));
}

#[test]
fn test_class_without_identifier_is_rejected() {
    let err = MetadataRegistry::builder()
        .register(
            ClassDescriptor::builder("Log")
                .field(FieldMapping::new("line", ColumnType::Text))
                .build(),
        )
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        MappingError::MissingIdentifier {
            class_name: "Log".to_string()
        }
    );
}
