//! Error types for the admission engine.
//!
//! These cover failures of the engine's own plumbing (collaborator reads,
//! patch application, configuration). Rejections of user objects are not
//! errors in this sense; they are reported as [`FieldError`] records inside a
//! [`ValidationResult`].
//!
//! [`FieldError`]: crate::webhooks::FieldError
//! [`ValidationResult`]: crate::webhooks::ValidationResult

use thiserror::Error;

/// Error type for admission engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// A queue, namespace or plugin collaborator could not be read
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// A patch operation could not be applied to a resource
    #[error("Patch error: {0}")]
    Patch(String),

    /// Admission configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error came from an external collaborator
    pub fn is_lookup(&self) -> bool {
        matches!(self, Error::Lookup(_))
    }
}

/// Result type alias for admission engine operations
pub type Result<T> = std::result::Result<T, Error>;
