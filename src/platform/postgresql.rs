use super::errors::PlatformError;
use super::keywords::{is_reserved, KeywordList};
use super::SqlPlatform;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgreSqlPlatform;

impl SqlPlatform for PostgreSqlPlatform {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn supports_schemas(&self) -> bool {
        true
    }

    fn read_lock_sql(&self) -> &'static str {
        "FOR SHARE"
    }

    fn convert_boolean(&self, value: bool) -> String {
        if value { "true" } else { "false" }.to_string()
    }

    fn sequence_next_val_sql(&self, sequence: &str) -> Result<String, PlatformError> {
        Ok(format!("SELECT NEXTVAL('{}')", sequence))
    }

    fn is_reserved_keyword(&self, word: &str) -> bool {
        is_reserved(KeywordList::PostgreSql, word)
    }
}
