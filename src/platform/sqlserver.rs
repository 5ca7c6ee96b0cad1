use super::errors::PlatformError;
use super::keywords::{is_reserved, KeywordList};
use super::{LockMode, SqlPlatform};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerPlatform;

/// True when `sql` ends in an ORDER BY that is not nested in parentheses
fn has_top_level_order_by(sql: &str) -> bool {
    let upper = sql.to_uppercase();
    let Some(pos) = upper.rfind("ORDER BY") else {
        return false;
    };
    let mut depth: i32 = 0;
    for c in upper[pos..].chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

impl SqlPlatform for SqlServerPlatform {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn identifier_quote_characters(&self) -> (char, char) {
        ('[', ']')
    }

    fn max_identifier_length(&self) -> usize {
        128
    }

    fn supports_schemas(&self) -> bool {
        true
    }

    fn do_modify_limit_query(
        &self,
        sql: &str,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<String, PlatformError> {
        let trimmed = sql.trim_start();
        if !trimmed.to_uppercase().starts_with("SELECT") {
            return Err(PlatformError::InvalidLimitQuery {
                platform: self.name(),
                message: "OFFSET/FETCH requires a SELECT statement".to_string(),
            });
        }

        let mut sql = sql.to_string();
        if !has_top_level_order_by(&sql) {
            sql.push_str(" ORDER BY (SELECT 0)");
        }
        sql.push_str(&format!(" OFFSET {} ROWS", offset));
        if let Some(limit) = limit {
            sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
        }
        Ok(sql)
    }

    fn append_lock_hint(&self, from_clause: &str, lock_mode: LockMode) -> String {
        match lock_mode {
            LockMode::PessimisticRead => format!("{} WITH (HOLDLOCK, ROWLOCK)", from_clause),
            LockMode::PessimisticWrite => format!("{} WITH (UPDLOCK, ROWLOCK)", from_clause),
            LockMode::None | LockMode::Optimistic => from_clause.to_string(),
        }
    }

    // Locking is expressed with table hints
    fn read_lock_sql(&self) -> &'static str {
        ""
    }

    fn write_lock_sql(&self) -> &'static str {
        ""
    }

    fn current_date_sql(&self) -> &'static str {
        "CONVERT(date, GETDATE())"
    }

    fn current_time_sql(&self) -> &'static str {
        "CONVERT(time, GETDATE())"
    }

    fn concat_expression(&self, parts: &[String]) -> String {
        format!("CONCAT({})", parts.join(", "))
    }

    fn substring_expression(&self, value: &str, start: &str, length: Option<&str>) -> String {
        match length {
            Some(length) => format!("SUBSTRING({}, {}, {})", value, start, length),
            None => format!("SUBSTRING({}, {}, LEN({}))", value, start, value),
        }
    }

    fn length_expression(&self, value: &str) -> String {
        format!("LEN({})", value)
    }

    fn mod_expression(&self, left: &str, right: &str) -> String {
        format!("({} % {})", left, right)
    }

    fn is_reserved_keyword(&self, word: &str) -> bool {
        is_reserved(KeywordList::SqlServer, word)
    }

    fn empty_identity_insert_sql(&self, quoted_table: &str, _quoted_identifier: &str) -> String {
        format!("INSERT INTO {} DEFAULT VALUES", quoted_table)
    }

    fn sequence_next_val_sql(&self, sequence: &str) -> Result<String, PlatformError> {
        Ok(format!("SELECT NEXT VALUE FOR {}", sequence))
    }
}
