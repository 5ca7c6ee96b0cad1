//! Integration tests - the engine and persisters driven end to end
//!
//! Statements are executed against a scripted connection that records the
//! SQL and parameters it receives. Set RUST_LOG=debug to see the engine log.

mod engine_tests;
mod fixtures;
mod persistence_tests;
