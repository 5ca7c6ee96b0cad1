use thiserror::Error;

use super::LockMode;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    #[error("Lock mode {mode:?} cannot be expressed as SQL on {platform}")]
    UnsupportedLockMode {
        platform: &'static str,
        mode: LockMode,
    },
    #[error("Cannot apply limit/offset on {platform}: {message}")]
    InvalidLimitQuery {
        platform: &'static str,
        message: String,
    },
    #[error("{platform} has no sequences")]
    SequencesNotSupported { platform: &'static str },
    #[error("Unknown platform `{0}` (expected postgresql, mysql, sqlite or sqlserver)")]
    UnknownPlatform(String),
}
