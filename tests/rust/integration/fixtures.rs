//! Blog mappings and a scripted connection shared by the integration tests.

use std::collections::VecDeque;

use indexmap::IndexMap;
use ormbridge::class_metadata::{
    AssociationMapping, ClassDescriptor, ColumnType, FieldMapping, IdGenerator, OrderDirection,
};
use ormbridge::persister::{Connection, ConnectionError, PreparedStatement, Row};
use ormbridge::query::{ParameterList, Value};

/// Author, Post (versioned), Comment and Tag; tables named explicitly,
/// join columns and the post/tag join table left to the naming strategy
pub fn blog_descriptors() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::builder("Author")
            .table("author")
            .id(FieldMapping::new("id", ColumnType::Integer))
            .id_generator(IdGenerator::Identity)
            .field(FieldMapping::new("name", ColumnType::String))
            .field(FieldMapping::new("email", ColumnType::String).unique())
            .build(),
        ClassDescriptor::builder("Post")
            .table("post")
            .id(FieldMapping::new("id", ColumnType::Integer))
            .id_generator(IdGenerator::Identity)
            .field(FieldMapping::new("title", ColumnType::String))
            .version(FieldMapping::new("version", ColumnType::Integer))
            .association(AssociationMapping::many_to_one("author", "Author"))
            .association(
                AssociationMapping::one_to_many("comments", "Comment", "post")
                    .order_by("id", OrderDirection::Desc),
            )
            .association(AssociationMapping::many_to_many_owning("tags", "Tag"))
            .build(),
        ClassDescriptor::builder("Comment")
            .table("comment")
            .id(FieldMapping::new("id", ColumnType::Integer))
            .id_generator(IdGenerator::Identity)
            .field(FieldMapping::new("body", ColumnType::Text))
            .association(AssociationMapping::many_to_one("post", "Post"))
            .build(),
        ClassDescriptor::builder("Tag")
            .table("tag")
            .id(FieldMapping::new("id", ColumnType::Integer))
            .field(FieldMapping::new("label", ColumnType::String))
            .association(AssociationMapping::many_to_many_inverse("posts", "Post", "tags"))
            .build(),
    ]
}

/// Self-referencing many-to-many with every name defaulted
pub fn node_descriptor() -> ClassDescriptor {
    ClassDescriptor::builder("Node")
        .id(FieldMapping::new("id", ColumnType::Integer))
        .association(AssociationMapping::many_to_many_owning("friends", "Node"))
        .build()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect::<IndexMap<_, _>>()
}

/// Logs every statement; answers fetches, affected counts and generated
/// ids from queues
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    pub log: Vec<(String, Vec<Value>)>,
    rows: VecDeque<Vec<Row>>,
    affected: VecDeque<u64>,
    ids: VecDeque<Value>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(mut self, rows: Vec<Row>) -> Self {
        self.rows.push_back(rows);
        self
    }

    pub fn affected(mut self, count: u64) -> Self {
        self.affected.push_back(count);
        self
    }

    pub fn insert_id(mut self, id: i64) -> Self {
        self.ids.push_back(Value::Int(id));
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.log.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

impl Connection for ScriptedConnection {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, ConnectionError> {
        Ok(PreparedStatement {
            id: 0,
            sql: sql.to_string(),
        })
    }

    fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &ParameterList,
    ) -> Result<u64, ConnectionError> {
        self.execute(&statement.sql, params)
    }

    fn execute(&mut self, sql: &str, params: &ParameterList) -> Result<u64, ConnectionError> {
        self.log.push((sql.to_string(), params.values()));
        Ok(self.affected.pop_front().unwrap_or(1))
    }

    fn fetch_all(&mut self, sql: &str, params: &ParameterList) -> Result<Vec<Row>, ConnectionError> {
        self.log.push((sql.to_string(), params.values()));
        Ok(self.rows.pop_front().unwrap_or_default())
    }

    fn last_insert_id(&mut self) -> Result<Option<Value>, ConnectionError> {
        Ok(self.ids.pop_front())
    }
}
