//! Application layer errors.
//!
//! These errors represent failures while orchestrating I/O: resolving,
//! loading and applying modules. Pure failures of the module model are
//! `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A local path or a subpath inside a fetched module does not exist.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Dependency installation failed.
    #[error("failed to install {target}: {reason}")]
    InstallFailed { target: String, reason: String },

    /// Remote repository fetch failed.
    #[error("failed to fetch {source}: {reason}")]
    FetchFailed { r#source: String, reason: String },

    /// Filesystem operation failed.
    #[error("filesystem error at {}: {reason}", path.display())]
    FilesystemError { path: PathBuf, reason: String },

    /// A script command could not be spawned or exited unsuccessfully.
    #[error("script `{command}` failed: {reason}")]
    ScriptFailed { command: String, reason: String },

    /// The patch engine could not apply a recipe to a file.
    #[error("failed to patch {}: {reason}", path.display())]
    PatchFailed { path: PathBuf, reason: String },

    /// The module entry point could not be loaded.
    #[error("failed to load module at {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },

    /// An external action producer failed.
    #[error("action producer failed: {reason}")]
    ProducerFailed { reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { path } => vec![
                format!("Nothing exists at {}", path.display()),
                "Check the module reference and any subpath".into(),
            ],
            Self::InstallFailed { .. } => vec![
                "Check that the package exists and your network is reachable".into(),
                "Set registry.package_manager if auto-detection picked the wrong tool".into(),
            ],
            Self::FetchFailed { .. } => vec![
                "Check the repository name and ref".into(),
                "Set git.base_url to use a different host".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::ScriptFailed { .. } => vec![
                "Re-run with -v to see which action failed".into(),
                "Actions that already ran are not rolled back; re-running is safe".into(),
            ],
            Self::LoadFailed { .. } => vec![
                "A module directory must contain a shivvie.toml".into(),
            ],
            Self::ProducerFailed { .. } => vec![
                "The module's [producer] command exited unsuccessfully".into(),
                "Report this to the module author".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InstallFailed { .. } | Self::FetchFailed { .. } | Self::ScriptFailed { .. } => {
                ErrorCategory::External
            }
            Self::LoadFailed { .. } | Self::ProducerFailed { .. } => ErrorCategory::Validation,
            Self::FilesystemError { .. } | Self::PatchFailed { .. } => ErrorCategory::Internal,
        }
    }
}
