use serde::{Deserialize, Serialize};

use crate::platform::LockMode;

/// Per-translation options that shape the SQL but are not part of the AST
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryHints {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub lock_mode: LockMode,
    /// Select only the fields named in the query; no subclass joins or
    /// eager association expansion
    pub partial_load: bool,
}

impl QueryHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    pub fn partial(mut self) -> Self {
        self.partial_load = true;
        self
    }

    pub fn has_row_limit(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}
