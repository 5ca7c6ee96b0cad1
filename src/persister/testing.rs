//! Connection doubles for persister tests.

use std::collections::VecDeque;

use mockall::mock;

use super::connection::{Connection, ConnectionError, PreparedStatement, Row};
use crate::query::{ParameterList, Value};

mock! {
    pub Driver {}

    impl Connection for Driver {
        fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, ConnectionError>;
        fn execute_prepared(
            &mut self,
            statement: &PreparedStatement,
            params: &ParameterList,
        ) -> Result<u64, ConnectionError>;
        fn execute(&mut self, sql: &str, params: &ParameterList) -> Result<u64, ConnectionError>;
        fn fetch_all(&mut self, sql: &str, params: &ParameterList) -> Result<Vec<Row>, ConnectionError>;
        fn fetch_one(&mut self, sql: &str, params: &ParameterList) -> Result<Option<Row>, ConnectionError>;
        fn last_insert_id(&mut self) -> Result<Option<Value>, ConnectionError>;
    }
}

/// Records every statement and answers from scripted queues
#[derive(Debug, Default)]
pub struct RecordingConnection {
    /// (sql, bound values) in execution order
    pub statements: Vec<(String, Vec<Value>)>,
    pub prepared: Vec<String>,
    fetch_results: VecDeque<Vec<Row>>,
    affected: VecDeque<u64>,
    insert_ids: VecDeque<Value>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.fetch_results.push_back(rows);
        self
    }

    /// Affected row count of the next execute; 1 once the queue is empty
    pub fn with_affected(mut self, count: u64) -> Self {
        self.affected.push_back(count);
        self
    }

    pub fn with_insert_id(mut self, id: impl Into<Value>) -> Self {
        self.insert_ids.push_back(id.into());
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

impl Connection for RecordingConnection {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, ConnectionError> {
        self.prepared.push(sql.to_string());
        Ok(PreparedStatement {
            id: self.prepared.len() - 1,
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
        self.statements.push((sql.to_string(), params.values()));
        Ok(self.affected.pop_front().unwrap_or(1))
    }

    fn fetch_all(&mut self, sql: &str, params: &ParameterList) -> Result<Vec<Row>, ConnectionError> {
        self.statements.push((sql.to_string(), params.values()));
        Ok(self.fetch_results.pop_front().unwrap_or_default())
    }

    fn last_insert_id(&mut self) -> Result<Option<Value>, ConnectionError> {
        Ok(self.insert_ids.pop_front())
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
