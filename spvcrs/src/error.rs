//! Error types for spvcrs operations

use thiserror::Error;

/// Error type for spvcrs operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The SPIR-V binary is malformed
    #[error("Invalid SPIR-V: {0}")]
    Parse(String),

    /// An id does not name the kind of object the request needs
    #[error("Invalid id {id}: {reason}")]
    InvalidId {
        /// The offending id
        id: u32,
        /// What was expected of it
        reason: String,
    },

    /// A reflection or mutation request cannot be answered for this module
    #[error("{0}")]
    Reflection(String),

    /// The module uses something the backend cannot express
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The naga front end rejected the module
    #[error("SPIR-V front end failed: {0}")]
    Frontend(String),

    /// The lowered module failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A backend failed while writing target source
    #[error("{dialect} emission failed: {message}")]
    Emit {
        /// Target dialect name
        dialect: &'static str,
        /// Error message from the backend
        message: String,
    },
}

impl Error {
    /// Returns true if the error was caused by the shader or the request
    /// made about it, as opposed to a failure inside a backend.
    pub fn is_compilation(&self) -> bool {
        !matches!(self, Error::Emit { .. })
    }

    pub(crate) fn invalid_id(id: u32, reason: impl Into<String>) -> Self {
        Error::InvalidId {
            id,
            reason: reason.into(),
        }
    }
}

/// Result type for spvcrs operations
pub type Result<T> = std::result::Result<T, Error>;
