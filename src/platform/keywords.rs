//! Reserved keyword tables.
//!
//! Used to decide whether an identifier must be quoted even when the
//! mapping does not ask for it. Lookups are case-insensitive.

use std::collections::HashSet;

lazy_static::lazy_static! {
    static ref SQL_STANDARD: HashSet<&'static str> = [
        "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
        "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
        "CURRENT_TIMESTAMP", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE",
        "END", "EXCEPT", "EXISTS", "FALSE", "FOR", "FOREIGN", "FROM", "FULL", "GRANT",
        "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN",
        "LEFT", "LIKE", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY",
        "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO", "TRUE", "UNION",
        "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "WHEN", "WHERE", "WITH",
    ]
    .into_iter()
    .collect();

    static ref POSTGRESQL: HashSet<&'static str> = [
        "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC", "BOTH", "CAST", "COLLATE",
        "CONCURRENTLY", "CURRENT_ROLE", "CURRENT_USER", "DEFERRABLE", "DO", "FETCH",
        "FREEZE", "ILIKE", "INITIALLY", "LATERAL", "LEADING", "LIMIT", "LOCALTIME",
        "LOCALTIMESTAMP", "NATURAL", "NOTNULL", "OFFSET", "ONLY", "OVERLAPS", "PLACING",
        "RETURNING", "SESSION_USER", "SIMILAR", "SOME", "SYMMETRIC", "TABLESAMPLE",
        "TRAILING", "VARIADIC", "VERBOSE", "WINDOW",
    ]
    .into_iter()
    .collect();

    static ref MYSQL: HashSet<&'static str> = [
        "ACCESSIBLE", "ADD", "ALTER", "ANALYZE", "BEFORE", "BIGINT", "BINARY", "BLOB",
        "BOTH", "CALL", "CASCADE", "CHANGE", "CHAR", "CHARACTER", "CONDITION",
        "CONTINUE", "CONVERT", "DATABASE", "DATABASES", "DAY_HOUR", "DECIMAL", "DECLARE",
        "DELAYED", "DESCRIBE", "DIV", "DOUBLE", "DUAL", "EACH", "ELSEIF", "ENCLOSED",
        "ESCAPED", "EXIT", "EXPLAIN", "FLOAT", "FORCE", "FULLTEXT", "GENERATED",
        "HIGH_PRIORITY", "IF", "IGNORE", "INDEX", "INFILE", "INT", "INTEGER", "INTERVAL",
        "KEY", "KEYS", "KILL", "LEADING", "LIMIT", "LINES", "LOAD", "LOCK", "LONG",
        "LOOP", "MATCH", "MOD", "NATURAL", "OPTIMIZE", "OPTION", "OUTFILE", "RANGE",
        "READ", "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE", "REQUIRE", "RETURN",
        "RLIKE", "SCHEMA", "SEPARATOR", "SHOW", "SPATIAL", "SQL", "STARTING",
        "STRAIGHT_JOIN", "TERMINATED", "TRAILING", "TRIGGER", "UNLOCK", "UNSIGNED",
        "USAGE", "USE", "VARCHAR", "WHILE", "WRITE", "XOR", "ZEROFILL",
    ]
    .into_iter()
    .collect();

    static ref SQLITE: HashSet<&'static str> = [
        "ABORT", "ACTION", "ADD", "AFTER", "ALTER", "ANALYZE", "ATTACH", "AUTOINCREMENT",
        "BEFORE", "BEGIN", "CASCADE", "CAST", "COLLATE", "COMMIT", "CONFLICT", "DATABASE",
        "DEFERRABLE", "DEFERRED", "DETACH", "EACH", "ESCAPE", "EXCLUSIVE", "EXPLAIN",
        "FAIL", "GLOB", "IF", "IGNORE", "IMMEDIATE", "INDEX", "INDEXED", "INITIALLY",
        "INSTEAD", "ISNULL", "KEY", "LIMIT", "MATCH", "NATURAL", "NO", "NOTNULL", "OF",
        "OFFSET", "PLAN", "PRAGMA", "QUERY", "RAISE", "RECURSIVE", "REGEXP", "REINDEX",
        "RELEASE", "RENAME", "REPLACE", "RESTRICT", "ROLLBACK", "ROW", "SAVEPOINT",
        "TEMP", "TEMPORARY", "TRANSACTION", "TRIGGER", "VACUUM", "VIEW", "VIRTUAL",
    ]
    .into_iter()
    .collect();

    static ref SQLSERVER: HashSet<&'static str> = [
        "ADD", "ALTER", "AUTHORIZATION", "BACKUP", "BEGIN", "BREAK", "BROWSE", "BULK",
        "CASCADE", "CHECKPOINT", "CLOSE", "CLUSTERED", "COALESCE", "COLLATE", "COMMIT",
        "COMPUTE", "CONTAINS", "CONTAINSTABLE", "CONTINUE", "CONVERT", "CURRENT",
        "CURRENT_USER", "CURSOR", "DATABASE", "DBCC", "DEALLOCATE", "DECLARE", "DENY",
        "DISK", "DISTRIBUTED", "DOUBLE", "DUMP", "ERRLVL", "ESCAPE", "EXEC", "EXECUTE",
        "EXIT", "FETCH", "FILE", "FILLFACTOR", "FREETEXT", "FUNCTION", "GOTO", "HOLDLOCK",
        "IDENTITY", "IDENTITYCOL", "IF", "INDEX", "KEY", "KILL", "LINENO", "LOAD", "MERGE",
        "NATIONAL", "NOCHECK", "NONCLUSTERED", "OF", "OFF", "OFFSETS", "OPEN", "OPTION",
        "OVER", "PERCENT", "PIVOT", "PLAN", "PRINT", "PROC", "PROCEDURE", "PUBLIC",
        "RAISERROR", "READ", "RECONFIGURE", "RESTORE", "RESTRICT", "RETURN", "REVERT",
        "REVOKE", "ROLLBACK", "ROWCOUNT", "ROWGUIDCOL", "RULE", "SAVE", "SCHEMA",
        "SHUTDOWN", "SOME", "STATISTICS", "TEXTSIZE", "TOP", "TRAN", "TRANSACTION",
        "TRIGGER", "TRUNCATE", "TSEQUAL", "UNPIVOT", "UPDATETEXT", "USE", "VARYING",
        "VIEW", "WAITFOR", "WHILE", "WRITETEXT",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordList {
    PostgreSql,
    MySql,
    Sqlite,
    SqlServer,
}

pub fn is_reserved(list: KeywordList, word: &str) -> bool {
    let upper = word.to_uppercase();
    if SQL_STANDARD.contains(upper.as_str()) {
        return true;
    }
    let dialect: &HashSet<&'static str> = match list {
        KeywordList::PostgreSql => &POSTGRESQL,
        KeywordList::MySql => &MYSQL,
        KeywordList::Sqlite => &SQLITE,
        KeywordList::SqlServer => &SQLSERVER,
    };
    dialect.contains(upper.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert!(is_reserved(KeywordList::PostgreSql, "user"));
        assert!(is_reserved(KeywordList::MySql, "Key"));
        assert!(is_reserved(KeywordList::SqlServer, "identity"));
        assert!(!is_reserved(KeywordList::Sqlite, "email"));
    }
}
