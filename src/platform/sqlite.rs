use super::errors::PlatformError;
use super::keywords::{is_reserved, KeywordList};
use super::SqlPlatform;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlitePlatform;

impl SqlPlatform for SqlitePlatform {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn max_identifier_length(&self) -> usize {
        128
    }

    fn emulates_schemas(&self) -> bool {
        true
    }

    fn do_modify_limit_query(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<String, PlatformError> {
        let limit = limit.map_or_else(|| "-1".to_string(), |l| l.to_string());
        let mut sql = format!("{} LIMIT {}", sql, limit);
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    // SQLite locks the whole database file; row lock clauses do not exist
    fn read_lock_sql(&self) -> &'static str {
        ""
    }

    fn write_lock_sql(&self) -> &'static str {
        ""
    }

    fn substring_expression(&self, value: &str, start: &str, length: Option<&str>) -> String {
        match length {
            Some(length) => format!("SUBSTR({}, {}, {})", value, start, length),
            None => format!("SUBSTR({}, {})", value, start),
        }
    }

    fn mod_expression(&self, left: &str, right: &str) -> String {
        format!("({} % {})", left, right)
    }

    fn is_reserved_keyword(&self, word: &str) -> bool {
        is_reserved(KeywordList::Sqlite, word)
    }

    fn supports_foreign_key_constraints(&self) -> bool {
        false
    }

    fn empty_identity_insert_sql(&self, quoted_table: &str, quoted_identifier: &str) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES (null)",
            quoted_table, quoted_identifier
        )
    }
}
