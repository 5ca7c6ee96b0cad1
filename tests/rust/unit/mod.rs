//! Unit tests - configuration, mapping defaults and dialect behavior
//!
//! These run against the public API without a database connection.

mod config_tests;
mod mapping_tests;
mod platform_tests;
