use ormbridge::config::{EngineConfig, NamingStrategyKind};
use ormbridge::persister::{EntityRef, EntityState, LoadedCollection, PersisterError};
use ormbridge::platform::LockMode;
use ormbridge::query::{Criteria, Expression, Value};
use ormbridge::QueryEngine;

use super::fixtures::{blog_descriptors, init_logging, node_descriptor, row, ScriptedConnection};

fn blog_engine(platform: &str) -> QueryEngine {
    init_logging();
    let config = EngineConfig {
        platform: platform.to_string(),
        ..Default::default()
    };
    QueryEngine::from_descriptors(blog_descriptors(), config).unwrap()
}

#[test]
fn test_post_lifecycle_with_version_checks() {
    let engine = blog_engine("postgresql");
    let posts = engine.persister("Post").unwrap();

    let mut conn = ScriptedConnection::new()
        .insert_id(10)
        .rows(vec![row(&[("version", Value::Int(1))])]);
    let mut batch = vec![EntityState::new("Post")
        .with_field("title", "Hello")
        .with_reference("author", Some(EntityRef::new("Author").with_id("id", 2)))];
    let outcome = posts.insert(&mut conn, &mut batch).unwrap();
    assert!(outcome.pending.is_empty());
    assert_eq!(
        conn.sql(),
        vec![
            "INSERT INTO post (title, version, author_id) VALUES (?, ?, ?)",
            "SELECT t0.version FROM post t0 WHERE t0.id = ?",
        ]
    );
    assert_eq!(
        conn.log[0].1,
        vec![Value::from("Hello"), Value::Int(1), Value::Int(2)]
    );

    let mut post = batch.remove(0);
    assert_eq!(post.field("id"), Some(&Value::Int(10)));
    assert_eq!(post.field("version"), Some(&Value::Int(1)));

    post.set_field("title", Value::from("Hello again"));
    let mut conn = ScriptedConnection::new()
        .affected(1)
        .rows(vec![row(&[("version", Value::Int(2))])]);
    posts.update(&mut conn, &mut post, &["title".to_string()]).unwrap();
    assert_eq!(
        conn.sql()[0],
        "UPDATE post SET title = ?, version = version + 1 WHERE id = ? AND version = ?"
    );
    assert_eq!(
        conn.log[0].1,
        vec![Value::from("Hello again"), Value::Int(10), Value::Int(1)]
    );
    assert_eq!(post.field("version"), Some(&Value::Int(2)));

    // a concurrent writer bumped the row in between
    let mut stale = post.clone();
    stale.set_field("version", Value::Int(1));
    let mut conn = ScriptedConnection::new().affected(0);
    let err = posts
        .update(&mut conn, &mut stale, &["title".to_string()])
        .unwrap_err();
    assert_eq!(
        err,
        PersisterError::OptimisticLockConflict {
            class_name: "Post".to_string(),
            identifier: "10".to_string(),
        }
    );
    assert_eq!(conn.log.len(), 1);
}

#[test]
fn test_load_by_id_hydrates_references() {
    let engine = blog_engine("postgresql");
    let posts = engine.persister("Post").unwrap();
    let mut conn = ScriptedConnection::new().rows(vec![row(&[
        ("id_0", Value::Int(3)),
        ("title_1", Value::from("Draft")),
        ("version_2", Value::Int(4)),
        ("author_id_3", Value::Int(8)),
    ])]);

    let post = posts.load_by_id(&mut conn, &[Value::Int(3)]).unwrap().unwrap();
    assert_eq!(
        conn.sql(),
        vec![
            "SELECT t0.id AS id_0, t0.title AS title_1, t0.version AS version_2, \
             t0.author_id AS author_id_3 FROM post t0 WHERE t0.id = ?"
        ]
    );
    assert_eq!(post.field("title"), Some(&Value::from("Draft")));
    assert_eq!(
        post.references["author"],
        Some(EntityRef::new("Author").with_id("id", 8))
    );

    let mut empty = ScriptedConnection::new();
    assert_eq!(posts.load_by_id(&mut empty, &[Value::Int(99)]).unwrap(), None);
}

#[test]
fn test_collections_of_a_post() {
    let engine = blog_engine("postgresql");
    let posts = engine.persister("Post").unwrap();
    let post = EntityState::new("Post").with_field("id", 5);

    let mut conn = ScriptedConnection::new().rows(vec![
        row(&[
            ("id_0", Value::Int(2)),
            ("body_1", Value::from("second")),
            ("post_id_2", Value::Int(5)),
        ]),
        row(&[
            ("id_0", Value::Int(1)),
            ("body_1", Value::from("first")),
            ("post_id_2", Value::Int(5)),
        ]),
    ]);
    let comments = posts.load_collection(&mut conn, &post, "comments").unwrap();
    assert_eq!(
        conn.sql(),
        vec![
            "SELECT t0.id AS id_0, t0.body AS body_1, t0.post_id AS post_id_2 \
             FROM comment t0 WHERE t0.post_id = ? ORDER BY t0.id DESC"
        ]
    );
    let bodies: Vec<_> = comments
        .into_vec()
        .into_iter()
        .filter_map(|c| c.field("body").cloned())
        .collect();
    assert_eq!(bodies, vec![Value::from("second"), Value::from("first")]);

    let mut conn = ScriptedConnection::new();
    let tags = posts.load_collection(&mut conn, &post, "tags").unwrap();
    assert_eq!(tags, LoadedCollection::List(Vec::new()));
    assert_eq!(
        conn.sql(),
        vec![
            "SELECT t0.id AS id_0, t0.label AS label_1 FROM tag t0 \
             INNER JOIN post_tag ON post_tag.tag_id = t0.id WHERE post_tag.post_id = ?"
        ]
    );
    assert_eq!(conn.log[0].1, vec![Value::Int(5)]);
}

#[test]
fn test_unsaved_owner_has_no_collections() {
    let engine = blog_engine("postgresql");
    let posts = engine.persister("Post").unwrap();
    let mut conn = ScriptedConnection::new();
    let err = posts
        .load_collection(&mut conn, &EntityState::new("Post"), "comments")
        .unwrap_err();
    assert_eq!(err, PersisterError::missing_identifier("Post"));
    assert!(conn.log.is_empty());
}

#[test]
fn test_join_table_cleanup_depends_on_foreign_keys() {
    let post = EntityState::new("Post").with_field("id", 5);

    let engine = blog_engine("postgresql");
    let mut conn = ScriptedConnection::new();
    engine.persister("Post").unwrap().delete(&mut conn, &post).unwrap();
    assert_eq!(conn.sql(), vec!["DELETE FROM post WHERE id = ?"]);

    let engine = blog_engine("sqlite");
    let mut conn = ScriptedConnection::new();
    engine.persister("Post").unwrap().delete(&mut conn, &post).unwrap();
    assert_eq!(
        conn.sql(),
        vec!["DELETE FROM post_tag WHERE post_id = ?", "DELETE FROM post WHERE id = ?"]
    );
}

#[test]
fn test_self_referencing_node_names_and_cleanup() {
    let config = EngineConfig {
        platform: "sqlite".to_string(),
        naming_strategy: NamingStrategyKind::Underscore,
        ..Default::default()
    };
    let engine = QueryEngine::from_descriptors(vec![node_descriptor()], config).unwrap();
    let node = engine.registry().describe("Node").unwrap();
    let join_table = node.associations["friends"].join_table_mapping().unwrap();
    assert_eq!(node.table.name, "node");
    assert_eq!(join_table.name, "node_node");
    assert_eq!(join_table.join_columns[0].name, "node_source");
    assert_eq!(join_table.inverse_join_columns[0].name, "node_target");

    let mut conn = ScriptedConnection::new();
    engine
        .persister("Node")
        .unwrap()
        .delete(&mut conn, &EntityState::new("Node").with_field("id", 1))
        .unwrap();
    assert_eq!(
        conn.sql(),
        vec![
            "DELETE FROM node_node WHERE node_source = ?",
            "DELETE FROM node_node WHERE node_target = ?",
            "DELETE FROM node WHERE id = ?",
        ]
    );
}

#[test]
fn test_count_exists_and_lock() {
    let engine = blog_engine("postgresql");
    let comments = engine.persister("Comment").unwrap();
    let criteria = Criteria::new().and_where(Expression::contains("body", "rust"));

    let mut conn = ScriptedConnection::new().rows(vec![row(&[("count", Value::Int(4))])]);
    assert_eq!(comments.count(&mut conn, &criteria).unwrap(), 4);
    assert_eq!(
        conn.sql(),
        vec!["SELECT COUNT(*) FROM comment t0 WHERE t0.body LIKE ?"]
    );
    assert_eq!(conn.log[0].1, vec![Value::from("%rust%")]);

    let mut conn = ScriptedConnection::new();
    assert!(!comments.exists(&mut conn, &criteria).unwrap());

    let mut conn = ScriptedConnection::new();
    comments
        .lock(&mut conn, &[Value::Int(1)], LockMode::PessimisticWrite)
        .unwrap();
    assert_eq!(conn.sql(), vec!["SELECT 1 FROM comment t0 WHERE t0.id = ? FOR UPDATE"]);

    let err = comments
        .lock(&mut conn, &[Value::Int(1)], LockMode::Optimistic)
        .unwrap_err();
    assert!(matches!(err, PersisterError::Translation(_)));
}
