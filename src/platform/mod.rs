//! SQL dialect collaborators.
//!
//! Everything dialect specific the translator and the persisters emit goes
//! through [`SqlPlatform`]: identifier quoting, limit/offset rewriting, lock
//! hints and clauses, literal rendering and a handful of string functions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod errors;
pub mod keywords;
pub mod mysql;
pub mod postgresql;
pub mod quote_strategy;
pub mod sqlite;
pub mod sqlserver;

pub use errors::PlatformError;
pub use mysql::MySqlPlatform;
pub use postgresql::PostgreSqlPlatform;
pub use quote_strategy::{AnsiQuoteStrategy, DefaultQuoteStrategy, QuoteStrategy};
pub use sqlite::SqlitePlatform;
pub use sqlserver::SqlServerPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    Optimistic,
    PessimisticRead,
    PessimisticWrite,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockMode::None => "NONE",
            LockMode::Optimistic => "OPTIMISTIC",
            LockMode::PessimisticRead => "PESSIMISTIC_READ",
            LockMode::PessimisticWrite => "PESSIMISTIC_WRITE",
        };
        write!(f, "{}", name)
    }
}

pub trait SqlPlatform: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Opening and closing identifier quote characters
    fn identifier_quote_characters(&self) -> (char, char) {
        ('"', '"')
    }

    fn quote_single_identifier(&self, identifier: &str) -> String {
        let (open, close) = self.identifier_quote_characters();
        let escaped = identifier.replace(close, &format!("{}{}", close, close));
        format!("{}{}{}", open, escaped, close)
    }

    /// Quotes every dot-separated part of `identifier`
    fn quote_identifier(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|part| self.quote_single_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn supports_schemas(&self) -> bool {
        false
    }

    /// Whether `schema.table` is rewritten to `schema__table`
    fn emulates_schemas(&self) -> bool {
        false
    }

    fn qualified_table_name(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) if self.emulates_schemas() => format!("{}__{}", schema, table),
            Some(schema) => format!("{}.{}", schema, table),
            None => table.to_string(),
        }
    }

    fn modify_limit_query(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<String, PlatformError> {
        if limit.is_none() && offset.unwrap_or(0) == 0 {
            return Ok(sql.to_string());
        }
        self.do_modify_limit_query(sql, limit, offset.unwrap_or(0))
    }

    fn do_modify_limit_query(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<String, PlatformError> {
        let mut sql = sql.to_string();
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    /// Table hint appended after `table alias` in FROM; only hint-based
    /// platforms change the clause.
    fn append_lock_hint(&self, from_clause: &str, _lock_mode: LockMode) -> String {
        from_clause.to_string()
    }

    fn read_lock_sql(&self) -> &'static str {
        "FOR UPDATE"
    }

    fn write_lock_sql(&self) -> &'static str {
        "FOR UPDATE"
    }

    /// Trailing lock clause for `lock_mode`, empty when none applies
    fn lock_clause(&self, lock_mode: LockMode) -> Result<String, PlatformError> {
        match lock_mode {
            LockMode::None => Ok(String::new()),
            LockMode::PessimisticRead => Ok(self.read_lock_sql().to_string()),
            LockMode::PessimisticWrite => Ok(self.write_lock_sql().to_string()),
            LockMode::Optimistic => Err(PlatformError::UnsupportedLockMode {
                platform: self.name(),
                mode: lock_mode,
            }),
        }
    }

    fn current_timestamp_sql(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn current_date_sql(&self) -> &'static str {
        "CURRENT_DATE"
    }

    fn current_time_sql(&self) -> &'static str {
        "CURRENT_TIME"
    }

    fn quote_string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn convert_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn concat_expression(&self, parts: &[String]) -> String {
        parts.join(" || ")
    }

    fn substring_expression(&self, value: &str, start: &str, length: Option<&str>) -> String {
        match length {
            Some(length) => format!("SUBSTRING({} FROM {} FOR {})", value, start, length),
            None => format!("SUBSTRING({} FROM {})", value, start),
        }
    }

    fn length_expression(&self, value: &str) -> String {
        format!("LENGTH({})", value)
    }

    fn mod_expression(&self, left: &str, right: &str) -> String {
        format!("MOD({}, {})", left, right)
    }

    fn is_reserved_keyword(&self, word: &str) -> bool;

    fn supports_foreign_key_constraints(&self) -> bool {
        true
    }

    /// Statement returning the next value of `sequence`
    fn sequence_next_val_sql(&self, _sequence: &str) -> Result<String, PlatformError> {
        Err(PlatformError::SequencesNotSupported {
            platform: self.name(),
        })
    }

    fn empty_identity_insert_sql(&self, quoted_table: &str, quoted_identifier: &str) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES (DEFAULT)",
            quoted_table, quoted_identifier
        )
    }
}

/// Platform registered under `name` (case-insensitive)
pub fn platform_for(name: &str) -> Result<Arc<dyn SqlPlatform>, PlatformError> {
    match name.to_lowercase().as_str() {
        "postgresql" | "postgres" | "pgsql" => Ok(Arc::new(PostgreSqlPlatform)),
        "mysql" | "mariadb" => Ok(Arc::new(MySqlPlatform)),
        "sqlite" => Ok(Arc::new(SqlitePlatform)),
        "sqlserver" | "mssql" => Ok(Arc::new(SqlServerPlatform)),
        other => Err(PlatformError::UnknownPlatform(other.to_string())),
    }
}
