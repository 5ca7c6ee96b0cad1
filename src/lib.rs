//! ormbridge - object query translation and entity persistence
//!
//! This crate turns object-level queries over mapped classes into SQL:
//! - Class metadata with inheritance, associations and naming strategies
//! - Object query AST translation for four SQL dialects
//! - Result-set mappings for hydrating rows back into entities
//! - Per-class persisters for load, insert, update, delete and locking

/// Debug print macro that only compiles in debug builds.
/// In release builds, this expands to nothing, so there's zero runtime cost.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        eprintln!($($arg)*);
    };
}

pub mod class_metadata;
pub mod config;
pub mod engine;
pub mod filters;
pub mod persister;
pub mod platform;
pub mod query;
pub mod result_mapping;
pub mod sql_walker;
pub mod translation_cache;

pub use config::EngineConfig;
pub use engine::{EngineError, ExecutionResult, QueryEngine};
