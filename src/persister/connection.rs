//! Database access seam for the persisters.
//!
//! Translation never touches a database. Everything the persisters execute
//! goes through [`Connection`], which a driver adapter implements. Rows come
//! back keyed by the column aliases of the select list.

use indexmap::IndexMap;
use thiserror::Error;

use crate::query::{ParameterList, Value};

/// One result row: column alias -> value
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectionError {
    #[error("Failed to prepare statement `{sql}`: {message}")]
    Prepare { sql: String, message: String },

    #[error("Statement failed: {message}")]
    Execute { message: String },

    #[error("Connection lost: {0}")]
    Disconnected(String),
}

/// Handle for a statement prepared once and executed many times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub id: usize,
    pub sql: String,
}

pub trait Connection {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, ConnectionError>;

    /// Runs a prepared statement; returns the affected row count
    fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &ParameterList,
    ) -> Result<u64, ConnectionError>;

    /// Runs a one-off statement; returns the affected row count
    fn execute(&mut self, sql: &str, params: &ParameterList) -> Result<u64, ConnectionError>;

    fn fetch_all(&mut self, sql: &str, params: &ParameterList) -> Result<Vec<Row>, ConnectionError>;

    fn fetch_one(
        &mut self,
        sql: &str,
        params: &ParameterList,
    ) -> Result<Option<Row>, ConnectionError> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }

    /// Identifier generated by the last INSERT on this connection
    fn last_insert_id(&mut self) -> Result<Option<Value>, ConnectionError>;
}

/// First value of `row`, for single-column selects
pub(crate) fn first_value(row: &Row) -> Option<&Value> {
    row.values().next()
}
