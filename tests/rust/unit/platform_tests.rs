//! Dialect differences seen through `platform_for`

use ormbridge::platform::{platform_for, LockMode, PlatformError};
use test_case::test_case;

const SELECT: &str = "SELECT t0.id FROM user t0";

#[test_case("postgresql", "\"order\""; "postgresql double quotes")]
#[test_case("mysql", "`order`"; "mysql backticks")]
#[test_case("sqlite", "\"order\""; "sqlite double quotes")]
#[test_case("sqlserver", "[order]"; "sqlserver brackets")]
fn test_identifier_quoting(name: &str, expected: &str) {
    let platform = platform_for(name).unwrap();
    assert_eq!(platform.quote_identifier("order"), expected);
}

#[test_case("postgresql", " LIMIT 10 OFFSET 30"; "postgresql")]
#[test_case("mysql", " LIMIT 10 OFFSET 30"; "mysql")]
#[test_case("sqlite", " LIMIT 10 OFFSET 30"; "sqlite")]
#[test_case("sqlserver", " ORDER BY (SELECT 0) OFFSET 30 ROWS FETCH NEXT 10 ROWS ONLY"; "sqlserver")]
fn test_limit_with_offset(name: &str, suffix: &str) {
    let platform = platform_for(name).unwrap();
    let sql = platform.modify_limit_query(SELECT, Some(10), Some(30)).unwrap();
    assert_eq!(sql, format!("{}{}", SELECT, suffix));
}

#[test]
fn test_zero_offset_without_limit_is_untouched() {
    for name in ["postgresql", "mysql", "sqlite", "sqlserver"] {
        let platform = platform_for(name).unwrap();
        assert_eq!(platform.modify_limit_query(SELECT, None, Some(0)).unwrap(), SELECT);
    }
}

#[test]
fn test_lock_clauses() {
    let postgres = platform_for("postgres").unwrap();
    assert_eq!(postgres.lock_clause(LockMode::PessimisticWrite).unwrap(), "FOR UPDATE");
    assert_eq!(postgres.lock_clause(LockMode::None).unwrap(), "");
    assert!(matches!(
        postgres.lock_clause(LockMode::Optimistic),
        Err(PlatformError::UnsupportedLockMode { .. })
    ));

    let sqlserver = platform_for("mssql").unwrap();
    assert_eq!(
        sqlserver.append_lock_hint("user t0", LockMode::PessimisticWrite),
        "user t0 WITH (UPDLOCK, ROWLOCK)"
    );
    assert_eq!(sqlserver.append_lock_hint("user t0", LockMode::None), "user t0");
}

#[test]
fn test_sequences_and_foreign_keys() {
    assert_eq!(
        platform_for("postgresql").unwrap().sequence_next_val_sql("post_seq").unwrap(),
        "SELECT NEXTVAL('post_seq')"
    );
    assert_eq!(
        platform_for("sqlserver").unwrap().sequence_next_val_sql("post_seq").unwrap(),
        "SELECT NEXT VALUE FOR post_seq"
    );
    assert!(platform_for("mysql").unwrap().sequence_next_val_sql("post_seq").is_err());

    assert!(!platform_for("sqlite").unwrap().supports_foreign_key_constraints());
    assert!(platform_for("mysql").unwrap().supports_foreign_key_constraints());
}

#[test]
fn test_unknown_platform_name() {
    assert_eq!(
        platform_for("Oracle").unwrap_err(),
        PlatformError::UnknownPlatform("oracle".to_string())
    );
}
