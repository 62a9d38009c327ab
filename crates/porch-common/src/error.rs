//! Centralized error types for porch.
//!
//! Uses `thiserror` for ergonomic error definitions. Every public operation in the
//! core returns either a value or one of these variants, never a panic and never both.

/// Failures of the scoped key/value storage capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Storage is unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value under '{key}' is corrupt")]
    Corrupt { key: String },

    #[error("Storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

/// Coarse error classes, matching what the caller can do about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad password or bad identifier. Fully recoverable, nothing changed.
    Validation,
    /// No identity, content, or profile (or an identity already exists).
    NotFound,
    /// Wrong password or unreadable encrypted record.
    Authentication,
    /// Durable or session storage refused the operation.
    Storage,
    /// The network collaborator failed to fetch or publish.
    Network,
    Internal,
}

/// Core error type used across all porch crates.
#[derive(Debug, thiserror::Error)]
pub enum PorchError {
    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid content identifier: {0}")]
    InvalidIdentifier(String),

    // === Resource errors ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    // === Auth errors ===
    /// Wrong password and corrupted record are deliberately indistinguishable.
    #[error("Invalid password")]
    InvalidPassword,

    // === Infrastructure errors ===
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PorchError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Map the error to its class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidIdentifier(_) => ErrorKind::Validation,
            Self::NotFound { .. } | Self::AlreadyExists { .. } => ErrorKind::NotFound,
            Self::InvalidPassword => ErrorKind::Authentication,
            Self::StorageUnavailable(_) => ErrorKind::Storage,
            Self::Network(_) => ErrorKind::Network,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Error code string for programmatic handling by callers.
    pub fn error_code(&self) -> &str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the person at the keyboard.
    ///
    /// Storage and internal details are logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            PorchError::StorageUnavailable(e) => {
                tracing::warn!("Storage error: {e}");
                "Local storage is unavailable".to_string()
            }
            PorchError::Internal(e) => {
                tracing::warn!("Internal error: {e}");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience type alias for Results using PorchError.
pub type PorchResult<T> = Result<T, PorchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_surface_as_generic_message() {
        let err = PorchError::from(StorageError::QuotaExceeded);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert_eq!(err.user_message(), "Local storage is unavailable");
    }

    #[test]
    fn wrong_password_is_an_authentication_error() {
        assert_eq!(PorchError::InvalidPassword.kind(), ErrorKind::Authentication);
        assert_eq!(PorchError::not_found("Identity").to_string(), "Identity not found");
    }
}
