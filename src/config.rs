use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::class_metadata::{DefaultNamingStrategy, NamingStrategy, UnderscoreNamingStrategy};
use crate::platform::{
    platform_for, AnsiQuoteStrategy, DefaultQuoteStrategy, PlatformError, QuoteStrategy, SqlPlatform,
};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStrategyKind {
    /// Quote only names flagged as quoted in the mapping
    #[default]
    Default,
    /// Never quote
    Ansi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategyKind {
    #[default]
    Default,
    Underscore,
}

#[derive(Debug, Error)]
#[error("expected one of {expected}, got `{got}`")]
pub struct UnknownVariant {
    expected: &'static str,
    got: String,
}

impl FromStr for QuoteStrategyKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(QuoteStrategyKind::Default),
            "ansi" => Ok(QuoteStrategyKind::Ansi),
            other => Err(UnknownVariant {
                expected: "default, ansi",
                got: other.to_string(),
            }),
        }
    }
}

impl FromStr for NamingStrategyKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(NamingStrategyKind::Default),
            "underscore" => Ok(NamingStrategyKind::Underscore),
            other => Err(UnknownVariant {
                expected: "default, underscore",
                got: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for QuoteStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteStrategyKind::Default => write!(f, "default"),
            QuoteStrategyKind::Ansi => write!(f, "ansi"),
        }
    }
}

/// Engine configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target dialect: postgresql, mysql, sqlite or sqlserver
    #[validate(length(min = 1, message = "Platform cannot be empty"))]
    pub platform: String,

    pub quote_strategy: QuoteStrategyKind,

    pub naming_strategy: NamingStrategyKind,

    /// Overrides the platform's identifier length limit for generated aliases
    #[validate(range(
        min = 8,
        max = 255,
        message = "Max identifier length must be between 8 and 255"
    ))]
    pub max_identifier_length: Option<usize>,

    pub translation_cache_enabled: bool,

    #[validate(range(
        min = 1,
        max = 100000,
        message = "Translation cache size must be between 1 and 100000"
    ))]
    pub translation_cache_max_entries: usize,

    /// Schema applied to tables that declare none
    pub default_schema: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: "postgresql".to_string(),
            quote_strategy: QuoteStrategyKind::Default,
            naming_strategy: NamingStrategyKind::Default,
            max_identifier_length: None,
            translation_cache_enabled: true,
            translation_cache_max_entries: 1000,
            default_schema: None,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            platform: env::var("ORMBRIDGE_PLATFORM").unwrap_or_else(|_| "postgresql".to_string()),
            quote_strategy: parse_env_var("ORMBRIDGE_QUOTE_STRATEGY", "default")?,
            naming_strategy: parse_env_var("ORMBRIDGE_NAMING_STRATEGY", "default")?,
            max_identifier_length: parse_optional_env_var("ORMBRIDGE_MAX_IDENTIFIER_LENGTH")?,
            translation_cache_enabled: parse_env_var("ORMBRIDGE_CACHE_ENABLED", "true")?,
            translation_cache_max_entries: parse_env_var("ORMBRIDGE_CACHE_MAX_ENTRIES", "1000")?,
            default_schema: env::var("ORMBRIDGE_DEFAULT_SCHEMA").ok().filter(|s| !s.is_empty()),
        };

        config.check()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.check()?;
        Ok(config)
    }

    /// Range validation plus a known platform name
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        platform_for(&self.platform)?;
        Ok(())
    }

    pub fn platform(&self) -> Result<Arc<dyn SqlPlatform>, ConfigError> {
        Ok(platform_for(&self.platform)?)
    }

    pub fn quote_strategy(&self) -> Arc<dyn QuoteStrategy> {
        match self.quote_strategy {
            QuoteStrategyKind::Default => Arc::new(DefaultQuoteStrategy),
            QuoteStrategyKind::Ansi => Arc::new(AnsiQuoteStrategy),
        }
    }

    pub fn naming_strategy(&self) -> Arc<dyn NamingStrategy> {
        match self.naming_strategy {
            NamingStrategyKind::Default => Arc::new(DefaultNamingStrategy),
            NamingStrategyKind::Underscore => Arc::new(UnderscoreNamingStrategy),
        }
    }

    /// Configured override, else the platform's own limit
    pub fn identifier_length_for(&self, platform: &dyn SqlPlatform) -> usize {
        self.max_identifier_length
            .unwrap_or_else(|| platform.max_identifier_length())
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

fn parse_optional_env_var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.is_empty() => value.parse().map(Some).map_err(|e| ConfigError::Parse {
            field: key.to_string(),
            value,
            source: Box::new(e),
        }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_KEYS: [&str; 7] = [
        "ORMBRIDGE_PLATFORM",
        "ORMBRIDGE_QUOTE_STRATEGY",
        "ORMBRIDGE_NAMING_STRATEGY",
        "ORMBRIDGE_MAX_IDENTIFIER_LENGTH",
        "ORMBRIDGE_CACHE_ENABLED",
        "ORMBRIDGE_CACHE_MAX_ENTRIES",
        "ORMBRIDGE_DEFAULT_SCHEMA",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.platform, "postgresql");
        assert_eq!(config.translation_cache_max_entries, 1000);
        assert!(config.translation_cache_enabled);
    }

    #[test]
    fn test_identifier_length_range() {
        let config = EngineConfig {
            max_identifier_length: Some(4),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            max_identifier_length: Some(30),
            ..Default::default()
        };
        assert_eq!(
            config.identifier_length_for(config.platform().unwrap().as_ref()),
            30
        );
    }

    #[test]
    fn test_zero_cache_entries() {
        let config = EngineConfig {
            translation_cache_max_entries: 0,
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_platform() {
        let config = EngineConfig {
            platform: "oracle".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(ConfigError::Platform(_))));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("ORMBRIDGE_PLATFORM", "sqlite");
        env::set_var("ORMBRIDGE_QUOTE_STRATEGY", "ANSI");
        env::set_var("ORMBRIDGE_CACHE_MAX_ENTRIES", "50");
        env::set_var("ORMBRIDGE_DEFAULT_SCHEMA", "app");

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.platform, "sqlite");
        assert_eq!(config.quote_strategy, QuoteStrategyKind::Ansi);
        assert_eq!(config.translation_cache_max_entries, 50);
        assert_eq!(config.default_schema.as_deref(), Some("app"));
        assert_eq!(config.max_identifier_length, None);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        env::set_var("ORMBRIDGE_NAMING_STRATEGY", "camel");
        assert!(matches!(EngineConfig::from_env(), Err(ConfigError::Parse { .. })));

        clear_env();
        env::set_var("ORMBRIDGE_MAX_IDENTIFIER_LENGTH", "1000");
        assert!(matches!(EngineConfig::from_env(), Err(ConfigError::Validation(_))));
        clear_env();
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "platform: mssql\nnaming_strategy: underscore\ntranslation_cache_enabled: false"
        )
        .unwrap();

        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.platform().unwrap().name(), "sqlserver");
        assert_eq!(config.naming_strategy, NamingStrategyKind::Underscore);
        assert!(!config.translation_cache_enabled);
        assert_eq!(config.translation_cache_max_entries, 1000);
    }
}
