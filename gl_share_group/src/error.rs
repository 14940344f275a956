//! Error types for gl_share_group
//!
//! Reclamation paths (free, flush, teardown) never report errors. These
//! variants cover the caller-facing operations around them: joining a
//! group, registering resources, making contexts current and uploading
//! cached textures.

use thiserror::Error;

/// Result type for share group operations
pub type Result<T> = std::result::Result<T, Error>;

/// Share group errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The context group was torn down (its last context was removed)
    #[error("Context group destroyed: {0}")]
    GroupDestroyed(String),

    /// A context was used with a group it does not belong to
    #[error("Context not in group: {0}")]
    ContextNotInGroup(String),

    /// The platform could not make a context current
    #[error("Make current failed: {0}")]
    MakeCurrentFailed(String),

    /// Pixel data does not match the declared texture size
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    BackendError(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
