//! Unified error handling for Shivvie Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use std::path::Path;
use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for Shivvie Core operations.
#[derive(Debug, Error, Clone)]
pub enum ShivvieError {
    /// Errors from the domain layer (module model violations).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Errors from the application layer (I/O and orchestration failures).
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl ShivvieError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Run `shivvie config path` to locate the config file".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in Shivvie".into(),
                "Please report this issue at: https://github.com/cosecruz/shivvie/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Shorthand for a filesystem failure at `path`.
    pub fn filesystem(path: &Path, err: impl std::fmt::Display) -> Self {
        ApplicationError::FilesystemError {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
        .into()
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    External,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type ShivvieResult<T> = Result<T, ShivvieError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> ShivvieResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> ShivvieResult<T> {
        self.map_err(|e| ShivvieError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
