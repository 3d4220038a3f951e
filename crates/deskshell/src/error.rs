//! Error types for desk and task lifecycle operations

use thiserror::Error;

/// Errors that can surface from deskshell operations
///
/// Absorbed conditions (missing tasks/desks at operation time, stale
/// intents at transition-ready) never appear here; they are logged and
/// collapse into empty or partial change-sets. Invariant violations
/// inside the repository are hard assertion failures, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeskError {
    /// A configuration value was rejected at construction
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A best-effort persistence operation failed
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Result type alias for deskshell operations
pub type DeskResult<T> = Result<T, DeskError>;
