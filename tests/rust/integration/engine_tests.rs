use std::collections::HashMap;
use std::sync::Arc;

use ormbridge::config::EngineConfig;
use ormbridge::filters::PredicateFilter;
use ormbridge::platform::LockMode;
use ormbridge::query::ast::{
    ConditionalExpression, IdentificationVariableDeclaration, Join, JoinType, OrderByItem,
    ScalarExpression, SelectExpression, SelectStatement, Statement, UpdateItem, UpdateStatement,
};
use ormbridge::query::{QueryHints, QueryParameters, Value};
use ormbridge::result_mapping::ColumnRenameMode;
use ormbridge::sql_walker::errors::TranslationError;
use ormbridge::{EngineError, ExecutionResult, QueryEngine};

use super::fixtures::{blog_descriptors, init_logging, row, ScriptedConnection};

fn engine_on(platform: &str) -> QueryEngine {
    init_logging();
    let config = EngineConfig {
        platform: platform.to_string(),
        ..Default::default()
    };
    QueryEngine::from_descriptors(blog_descriptors(), config).unwrap()
}

fn all_posts() -> SelectStatement {
    SelectStatement {
        select: vec![SelectExpression::Entity {
            alias: "p".to_string(),
        }],
        from: vec![IdentificationVariableDeclaration::new("Post", "p")],
        ..Default::default()
    }
}

fn titles_by_author_email() -> Statement {
    Statement::Select(SelectStatement {
        select: vec![SelectExpression::Scalar {
            expression: ScalarExpression::path("p", "title"),
            result_variable: None,
            hidden: false,
        }],
        from: vec![IdentificationVariableDeclaration::new("Post", "p")
            .join(Join::association(JoinType::Inner, "p", "author", "a"))],
        where_clause: Some(ConditionalExpression::eq(
            ScalarExpression::path("a", "email"),
            ScalarExpression::param("email"),
        )),
        order_by: vec![OrderByItem::desc(ScalarExpression::path("p", "id"))],
        ..Default::default()
    })
}

#[test]
fn test_entity_select_over_defaulted_join_columns() {
    let engine = engine_on("postgresql");
    let translation = engine
        .translate(&Statement::Select(all_posts()), &QueryHints::new())
        .unwrap();
    assert_eq!(
        translation.sql,
        "SELECT p0_.id AS id_0, p0_.title AS title_1, p0_.version AS version_2, \
         p0_.author_id AS author_id_3 FROM post p0_"
    );
    assert_eq!(translation.rsm.entity_results["p"], "Post");
}

#[test]
fn test_scalar_query_executes_with_bound_parameters() {
    let engine = engine_on("postgresql");
    let mut conn =
        ScriptedConnection::new().rows(vec![row(&[("title_0", Value::from("Second"))])]);

    let result = engine
        .execute(
            &mut conn,
            &titles_by_author_email(),
            &QueryHints::new(),
            &QueryParameters::new().set("email", "ada@example.com"),
        )
        .unwrap();
    assert_eq!(
        conn.sql(),
        vec![
            "SELECT p0_.title AS title_0 FROM post p0_ \
             INNER JOIN author a1_ ON p0_.author_id = a1_.id \
             WHERE a1_.email = ? ORDER BY p0_.id DESC"
        ]
    );
    assert_eq!(conn.log[0].1, vec![Value::from("ada@example.com")]);
    match result {
        ExecutionResult::Rows(rows) => assert_eq!(rows[0]["title_0"], Value::from("Second")),
        other => panic!("expected rows, got {:?}", other),
    }
}

#[test]
fn test_row_limits_follow_the_configured_platform() {
    let hints = QueryHints::new().offset(20);
    let stmt = Statement::Select(all_posts());

    let mysql = engine_on("mysql").translate(&stmt, &hints).unwrap();
    assert!(mysql.sql.ends_with(" LIMIT 18446744073709551615 OFFSET 20"));

    let sqlite = engine_on("sqlite").translate(&stmt, &hints).unwrap();
    assert!(sqlite.sql.ends_with(" LIMIT -1 OFFSET 20"));

    let sqlserver = engine_on("sqlserver")
        .translate(&stmt, &QueryHints::new().offset(20).limit(10))
        .unwrap();
    assert!(sqlserver
        .sql
        .ends_with(" ORDER BY (SELECT 0) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));
}

#[test]
fn test_optimistic_lock_needs_a_versioned_class() {
    let engine = engine_on("postgresql");
    let hints = QueryHints::new().lock_mode(LockMode::Optimistic);

    assert!(engine
        .translate(&Statement::Select(all_posts()), &hints)
        .is_ok());

    let comments = Statement::Select(SelectStatement {
        select: vec![SelectExpression::Entity {
            alias: "c".to_string(),
        }],
        from: vec![IdentificationVariableDeclaration::new("Comment", "c")],
        ..Default::default()
    });
    let err = engine.translate(&comments, &hints).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Translation(TranslationError::OptimisticLockNotVersioned { .. })
    ));
}

#[test]
fn test_cache_is_keyed_by_filter_state() {
    let mut engine = engine_on("postgresql");
    engine.register_filter(Arc::new(PredicateFilter::new(
        "published",
        "{alias}.title IS NOT NULL",
    )));
    let stmt = Statement::Select(all_posts());

    let plain = engine.translate(&stmt, &QueryHints::new()).unwrap();
    engine.enable_filter("published").unwrap();
    let filtered = engine.translate(&stmt, &QueryHints::new()).unwrap();
    engine.disable_filter("published").unwrap();
    let plain_again = engine.translate(&stmt, &QueryHints::new()).unwrap();

    assert_ne!(plain.sql, filtered.sql);
    assert_eq!(plain, plain_again);
    let metrics = engine.cache_metrics();
    assert_eq!((metrics.hits, metrics.misses, metrics.size), (1, 2, 2));
}

#[test]
fn test_disabled_cache_translates_every_time() {
    let config = EngineConfig {
        translation_cache_enabled: false,
        ..Default::default()
    };
    let engine = QueryEngine::from_descriptors(blog_descriptors(), config).unwrap();
    let stmt = Statement::Select(all_posts());
    engine.translate(&stmt, &QueryHints::new()).unwrap();
    engine.translate(&stmt, &QueryHints::new()).unwrap();
    assert_eq!(engine.cache_metrics().size, 0);
}

#[test]
fn test_bulk_update_reports_affected_rows() {
    let engine = engine_on("postgresql");
    let stmt = Statement::Update(UpdateStatement {
        class_name: "Comment".to_string(),
        alias: "c".to_string(),
        set: vec![UpdateItem {
            field: "body".to_string(),
            value: ScalarExpression::string("[removed]"),
        }],
        where_clause: Some(ConditionalExpression::eq(
            ScalarExpression::path("c", "post"),
            ScalarExpression::param("post"),
        )),
    });
    let mut conn = ScriptedConnection::new().affected(7);
    let result = engine
        .execute(
            &mut conn,
            &stmt,
            &QueryHints::new(),
            &QueryParameters::new().set("post", 3),
        )
        .unwrap();
    assert_eq!(result, ExecutionResult::Affected(7));
    assert_eq!(conn.log[0].1, vec![Value::Int(3)]);
}

#[test]
fn test_hand_written_sql_mapping() {
    let engine = engine_on("postgresql");
    let mut builder = engine.result_set_mapping_builder(ColumnRenameMode::Incremental);
    builder
        .add_root_entity_from_class("Post", "p")
        .unwrap()
        .add_joined_entity_from_class("Author", "a", "p", "author")
        .unwrap();

    let aliases = HashMap::from([
        ("p".to_string(), "t0".to_string()),
        ("a".to_string(), "t1".to_string()),
    ]);
    assert_eq!(
        builder.generate_select_clause(&aliases),
        "t0.id AS id0, t0.title AS title1, t0.version AS version2, t0.author_id AS author_id3, \
         t1.id AS id4, t1.name AS name5, t1.email AS email6"
    );

    let rsm = builder.build();
    assert_eq!(rsm.field_results["title1"].field_name, "title");
    assert_eq!(rsm.meta_results["author_id3"].column_name, "author_id");
    assert!(rsm.joined_entity_results.contains_key("a"));
}

#[test]
fn test_unknown_class_is_a_mapping_error() {
    let engine = engine_on("postgresql");
    assert!(matches!(engine.persister("Draft"), Err(EngineError::Mapping(_))));
}
