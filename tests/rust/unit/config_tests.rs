//! Engine configuration loaded from YAML files

use std::io::Write;

use ormbridge::config::{ConfigError, EngineConfig, NamingStrategyKind, QuoteStrategyKind};
use tempfile::NamedTempFile;

fn yaml_file(content: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}

#[test]
fn test_partial_yaml_keeps_defaults() -> anyhow::Result<()> {
    let file = yaml_file(
        "platform: mysql\n\
         naming_strategy: underscore\n\
         translation_cache_max_entries: 50\n",
    )?;
    let config = EngineConfig::from_yaml_file(file.path())?;

    assert_eq!(config.platform, "mysql");
    assert_eq!(config.naming_strategy, NamingStrategyKind::Underscore);
    assert_eq!(config.quote_strategy, QuoteStrategyKind::Default);
    assert_eq!(config.translation_cache_max_entries, 50);
    assert!(config.translation_cache_enabled);
    assert_eq!(config.platform()?.name(), "mysql");
    Ok(())
}

#[test]
fn test_identifier_length_override() -> anyhow::Result<()> {
    let file = yaml_file("platform: sqlserver\nmax_identifier_length: 30\n")?;
    let config = EngineConfig::from_yaml_file(file.path())?;
    let platform = config.platform()?;
    assert_eq!(config.identifier_length_for(platform.as_ref()), 30);

    let defaults = EngineConfig {
        platform: "sqlserver".to_string(),
        ..Default::default()
    };
    assert_eq!(defaults.identifier_length_for(platform.as_ref()), 128);
    Ok(())
}

#[test]
fn test_unknown_platform_is_rejected() -> anyhow::Result<()> {
    let file = yaml_file("platform: oracle\n")?;
    let err = EngineConfig::from_yaml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Platform(_)));
    Ok(())
}

#[test]
fn test_out_of_range_values_fail_validation() -> anyhow::Result<()> {
    let file = yaml_file("translation_cache_max_entries: 0\n")?;
    let err = EngineConfig::from_yaml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));

    let file = yaml_file("max_identifier_length: 4\n")?;
    assert!(EngineConfig::from_yaml_file(file.path()).is_err());
    Ok(())
}

#[test]
fn test_malformed_yaml_reports_parse_error() -> anyhow::Result<()> {
    let file = yaml_file("quote_strategy: [ansi\n")?;
    let err = EngineConfig::from_yaml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    assert!(matches!(
        EngineConfig::from_yaml_file("/nonexistent/ormbridge.yaml"),
        Err(ConfigError::Parse { .. })
    ));
    Ok(())
}
