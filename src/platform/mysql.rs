use super::errors::PlatformError;
use super::keywords::{is_reserved, KeywordList};
use super::SqlPlatform;

/// Largest LIMIT accepted by MySQL; used when only an offset is requested
const MAX_LIMIT: u64 = 18_446_744_073_709_551_615;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlPlatform;

impl SqlPlatform for MySqlPlatform {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote_characters(&self) -> (char, char) {
        ('`', '`')
    }

    fn max_identifier_length(&self) -> usize {
        64
    }

    fn do_modify_limit_query(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<String, PlatformError> {
        let mut sql = format!("{} LIMIT {}", sql, limit.unwrap_or(MAX_LIMIT));
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    fn read_lock_sql(&self) -> &'static str {
        "LOCK IN SHARE MODE"
    }

    fn concat_expression(&self, parts: &[String]) -> String {
        format!("CONCAT({})", parts.join(", "))
    }

    fn length_expression(&self, value: &str) -> String {
        format!("CHAR_LENGTH({})", value)
    }

    fn is_reserved_keyword(&self, word: &str) -> bool {
        is_reserved(KeywordList::MySql, word)
    }

    fn empty_identity_insert_sql(&self, quoted_table: &str, _quoted_identifier: &str) -> String {
        format!("INSERT INTO {} () VALUES ()", quoted_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LockMode;

    #[test]
    fn test_offset_without_limit_uses_max_limit() {
        assert_eq!(
            MySqlPlatform
                .modify_limit_query("SELECT 1", None, Some(10))
                .unwrap(),
            "SELECT 1 LIMIT 18446744073709551615 OFFSET 10"
        );
    }

    #[test]
    fn test_backtick_quoting_and_share_lock() {
        assert_eq!(MySqlPlatform.quote_single_identifier("order"), "`order`");
        assert_eq!(
            MySqlPlatform.lock_clause(LockMode::PessimisticRead).unwrap(),
            "LOCK IN SHARE MODE"
        );
        assert_eq!(
            MySqlPlatform.concat_expression(&["a".to_string(), "b".to_string()]),
            "CONCAT(a, b)"
        );
    }
}
