//! Engine facade.
//!
//! [`QueryEngine`] owns the metadata registry, the dialect, the quote
//! strategy, the filter collection and the translation cache, and hands out
//! translation environments and persisters borrowing them.

use std::sync::Arc;
use thiserror::Error;

use crate::class_metadata::{ClassDescriptor, MappingError, MetadataRegistry};
use crate::config::{ConfigError, EngineConfig};
use crate::filters::{FilterCollection, SqlFilter};
use crate::persister::connection::first_value;
use crate::persister::{Connection, ConnectionError, EntityPersister, PersisterError, Row};
use crate::platform::{QuoteStrategy, SqlPlatform};
use crate::query::parameters::{bind_parameters, expand_list_parameters};
use crate::query::{ParameterList, QueryHints, QueryParameters, Statement, Value};
use crate::result_mapping::{ColumnRenameMode, ResultSetMappingBuilder};
use crate::sql_walker::{self, ExecutionStrategy, Translation, TranslationEnv, TranslationError};
use crate::translation_cache::{CacheMetrics, TranslationCache, TranslationCacheKey};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Persister(#[from] PersisterError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// SQL text with its positional parameters, list values already expanded
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: ParameterList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Rows(Vec<Row>),
    /// Rows changed by an UPDATE or DELETE; for statements spanning several
    /// tables, the number of matched entities
    Affected(u64),
}

pub struct QueryEngine {
    registry: MetadataRegistry,
    platform: Arc<dyn SqlPlatform>,
    quote: Arc<dyn QuoteStrategy>,
    filters: FilterCollection,
    cache: TranslationCache,
    config: EngineConfig,
    max_identifier_length: usize,
}

impl QueryEngine {
    pub fn new(registry: MetadataRegistry, config: EngineConfig) -> Result<Self, EngineError> {
        config.check()?;
        let platform = config.platform()?;
        let max_identifier_length = config.identifier_length_for(platform.as_ref());
        log::info!(
            "Query engine for {} ({} classes, quote strategy {})",
            platform.name(),
            registry.len(),
            config.quote_strategy
        );
        Ok(QueryEngine {
            registry,
            quote: config.quote_strategy(),
            filters: FilterCollection::new(),
            cache: TranslationCache::new(
                config.translation_cache_enabled,
                config.translation_cache_max_entries,
            ),
            platform,
            config,
            max_identifier_length,
        })
    }

    /// Builds the registry with the configured naming strategy and default
    /// schema
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ClassDescriptor>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let builder = descriptors.into_iter().fold(
            MetadataRegistry::builder()
                .naming_strategy(config.naming_strategy())
                .default_schema(config.default_schema.clone()),
            |builder, descriptor| builder.register(descriptor),
        );
        Self::new(builder.build()?, config)
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn platform(&self) -> &dyn SqlPlatform {
        self.platform.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn filters(&self) -> &FilterCollection {
        &self.filters
    }

    pub fn env(&self) -> TranslationEnv<'_> {
        TranslationEnv {
            registry: &self.registry,
            platform: self.platform.as_ref(),
            quote: self.quote.as_ref(),
            filters: &self.filters,
            max_identifier_length: self.max_identifier_length,
        }
    }

    /// Registers a disabled filter; cached translations are dropped
    pub fn register_filter(&mut self, filter: Arc<dyn SqlFilter>) {
        self.filters.register(filter);
        self.cache.clear();
    }

    pub fn enable_filter(&mut self, name: &str) -> Result<(), EngineError> {
        Ok(self.filters.enable(name)?)
    }

    pub fn disable_filter(&mut self, name: &str) -> Result<(), EngineError> {
        Ok(self.filters.disable(name)?)
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Unbound translation of `statement`, from the cache when possible
    pub fn translate(&self, statement: &Statement, hints: &QueryHints) -> Result<Translation, EngineError> {
        if !self.cache.is_enabled() {
            return Ok(sql_walker::translate(self.env(), statement, hints)?);
        }

        let key = match TranslationCacheKey::new(
            statement,
            hints,
            self.platform.name(),
            &self.filters.enabled_names(),
        ) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Statement not cacheable, translating directly: {}", e);
                return Ok(sql_walker::translate(self.env(), statement, hints)?);
            }
        };
        if let Some(translation) = self.cache.get(&key) {
            return Ok(translation);
        }
        let translation = sql_walker::translate(self.env(), statement, hints)?;
        self.cache.insert(key, translation.clone());
        Ok(translation)
    }

    /// Binds `params` to the main statement of `translation`
    pub fn prepare(
        &self,
        translation: &Translation,
        params: &QueryParameters,
    ) -> Result<BoundStatement, EngineError> {
        let bound = bind_parameters(&translation.parameter_refs, params)?;
        let (sql, params) = expand_list_parameters(&translation.sql, &bound)?;
        Ok(BoundStatement { sql, params })
    }

    /// Translates, binds and runs `statement`
    pub fn execute(
        &self,
        conn: &mut dyn Connection,
        statement: &Statement,
        hints: &QueryHints,
        params: &QueryParameters,
    ) -> Result<ExecutionResult, EngineError> {
        let translation = self.translate(statement, hints)?;
        let main = self.prepare(&translation, params)?;

        let statements = match &translation.strategy {
            ExecutionStrategy::Single => {
                return Ok(match statement {
                    Statement::Select(_) => ExecutionResult::Rows(conn.fetch_all(&main.sql, &main.params)?),
                    Statement::Update(_) | Statement::Delete(_) => {
                        ExecutionResult::Affected(conn.execute(&main.sql, &main.params)?)
                    }
                })
            }
            ExecutionStrategy::MultiTable { statements } => statements,
        };

        let identifiers: Vec<Value> = conn
            .fetch_all(&main.sql, &main.params)?
            .iter()
            .filter_map(|row| first_value(row).cloned())
            .collect();
        if identifiers.is_empty() {
            log::debug!("Multi-table statement matched no rows");
            return Ok(ExecutionResult::Affected(0));
        }

        for step in statements {
            let mut bound = bind_parameters(&step.parameter_refs, params)?;
            let id_type = identifiers[0].inferred_type();
            bound.push(Value::List(identifiers.clone()), id_type);
            let (sql, step_params) = expand_list_parameters(&step.sql, &bound)?;
            conn.execute(&sql, &step_params)?;
        }
        Ok(ExecutionResult::Affected(identifiers.len() as u64))
    }

    pub fn persister(&self, class_name: &str) -> Result<EntityPersister<'_>, EngineError> {
        let class = self.registry.describe(class_name)?;
        Ok(EntityPersister::new(self.env(), class))
    }

    /// Mapping builder for hand-written SQL against this registry
    pub fn result_set_mapping_builder(&self, mode: ColumnRenameMode) -> ResultSetMappingBuilder<'_> {
        ResultSetMappingBuilder::new(&self.registry, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_metadata::testing::{inheritance_registry, user_registry};
    use crate::filters::PredicateFilter;
    use crate::persister::testing::{row, RecordingConnection};
    use crate::query::ast::{
        ComparisonOperator, ConditionalExpression, DeleteStatement, IdentificationVariableDeclaration,
        ScalarExpression, SelectExpression, SelectStatement, UpdateItem, UpdateStatement,
    };

    fn engine(registry: MetadataRegistry) -> QueryEngine {
        QueryEngine::new(registry, EngineConfig::default()).unwrap()
    }

    fn users_named() -> Statement {
        Statement::Select(SelectStatement {
            select: vec![SelectExpression::Entity {
                alias: "u".to_string(),
            }],
            from: vec![IdentificationVariableDeclaration::new("User", "u")],
            where_clause: Some(ConditionalExpression::eq(
                ScalarExpression::path("u", "name"),
                ScalarExpression::param("name"),
            )),
            ..Default::default()
        })
    }

    #[test]
    fn test_translate_is_cached() {
        let engine = engine(user_registry());
        let first = engine.translate(&users_named(), &QueryHints::new()).unwrap();
        let second = engine.translate(&users_named(), &QueryHints::new()).unwrap();
        assert_eq!(first, second);

        let metrics = engine.cache_metrics();
        assert_eq!((metrics.hits, metrics.misses, metrics.size), (1, 1, 1));
    }

    #[test]
    fn test_enabled_filter_changes_translation() {
        let mut engine = engine(user_registry());
        engine.register_filter(Arc::new(PredicateFilter::new("with_email", "{alias}.email IS NOT NULL")));
        let plain = engine.translate(&users_named(), &QueryHints::new()).unwrap();

        engine.enable_filter("with_email").unwrap();
        let filtered = engine.translate(&users_named(), &QueryHints::new()).unwrap();
        assert!(!plain.sql.contains("email IS NOT NULL"));
        assert!(filtered.sql.ends_with("AND (u0_.email IS NOT NULL)"));
        assert!(engine.enable_filter("missing").is_err());
    }

    #[test]
    fn test_prepare_expands_list_parameters() {
        let engine = engine(user_registry());
        let stmt = Statement::Select(SelectStatement {
            select: vec![SelectExpression::Entity {
                alias: "u".to_string(),
            }],
            from: vec![IdentificationVariableDeclaration::new("User", "u")],
            where_clause: Some(ConditionalExpression::InList {
                expr: ScalarExpression::path("u", "id"),
                values: vec![ScalarExpression::param("ids")],
                negated: false,
            }),
            ..Default::default()
        });
        let translation = engine.translate(&stmt, &QueryHints::new()).unwrap();
        let bound = engine
            .prepare(
                &translation,
                &QueryParameters::new().set("ids", Value::List(vec![Value::Int(1), Value::Int(2)])),
            )
            .unwrap();
        assert!(bound.sql.ends_with("WHERE u0_.id IN (?, ?)"));
        assert_eq!(bound.params.values(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_missing_parameter_fails_prepare() {
        let engine = engine(user_registry());
        let translation = engine.translate(&users_named(), &QueryHints::new()).unwrap();
        let err = engine.prepare(&translation, &QueryParameters::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Translation(TranslationError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_execute_single_update() {
        let engine = engine(user_registry());
        let stmt = Statement::Update(UpdateStatement {
            class_name: "User".to_string(),
            alias: "u".to_string(),
            set: vec![UpdateItem {
                field: "name".to_string(),
                value: ScalarExpression::param("name"),
            }],
            where_clause: None,
        });
        let mut conn = RecordingConnection::new().with_affected(3);
        let result = engine
            .execute(&mut conn, &stmt, &QueryHints::new(), &QueryParameters::new().set("name", "x"))
            .unwrap();
        assert_eq!(result, ExecutionResult::Affected(3));
        assert_eq!(conn.sql(), vec!["UPDATE user SET name = ?"]);
    }

    #[test]
    fn test_execute_multi_table_delete_binds_identifiers() {
        let engine = engine(inheritance_registry());
        let stmt = Statement::Delete(DeleteStatement {
            class_name: "Employee".to_string(),
            alias: "e".to_string(),
            where_clause: Some(ConditionalExpression::compare(
                ScalarExpression::path("e", "salary"),
                ComparisonOperator::Gt,
                ScalarExpression::param("min"),
            )),
        });
        let mut conn = RecordingConnection::new()
            .with_rows(vec![row(&[("id", Value::Int(4))]), row(&[("id", Value::Int(9))])]);

        let result = engine
            .execute(&mut conn, &stmt, &QueryHints::new(), &QueryParameters::new().set("min", 100))
            .unwrap();
        assert_eq!(result, ExecutionResult::Affected(2));
        assert_eq!(
            conn.sql(),
            vec![
                "SELECT e0_.id FROM employee e0_ INNER JOIN person p1_ ON e0_.id = p1_.id WHERE e0_.salary > ?",
                "DELETE FROM intern WHERE id IN (?, ?)",
                "DELETE FROM manager WHERE id IN (?, ?)",
                "DELETE FROM employee WHERE id IN (?, ?)",
                "DELETE FROM person WHERE id IN (?, ?)",
            ]
        );
        assert_eq!(conn.statements[1].1, vec![Value::Int(4), Value::Int(9)]);
    }

    #[test]
    fn test_multi_table_with_no_match_stops_early() {
        let engine = engine(inheritance_registry());
        let stmt = Statement::Delete(DeleteStatement {
            class_name: "Employee".to_string(),
            alias: "e".to_string(),
            where_clause: None,
        });
        let mut conn = RecordingConnection::new();
        let result = engine
            .execute(&mut conn, &stmt, &QueryHints::new(), &QueryParameters::new())
            .unwrap();
        assert_eq!(result, ExecutionResult::Affected(0));
        assert_eq!(conn.sql().len(), 1);
    }

    #[test]
    fn test_persister_for_unknown_class() {
        let engine = engine(user_registry());
        assert!(engine.persister("User").is_ok());
        assert!(matches!(engine.persister("Nope"), Err(EngineError::Mapping(_))));
    }
}
