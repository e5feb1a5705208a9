// ============================================================================
// domain/error.rs - PURE FAILURES OF THE MODULE MODEL
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (they cross the delegate recursion boundary by value)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors (400-level equivalent)
    // ========================================================================
    #[error("invalid module uri \"{uri}\": {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid input for module '{module}':\n{detail}")]
    InvalidInput { module: String, detail: String },

    #[error("invalid module manifest '{path}': {reason}")]
    InvalidManifest { path: String, reason: String },

    #[error("invalid input schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("template rendering failed: {reason}")]
    Rendering { reason: String },

    // ========================================================================
    // Module Defects
    // ========================================================================
    #[error("module produced a malformed action: {reason}")]
    ActionProduction { reason: String },

    #[error("delegation depth {depth} exceeds the limit of {limit}")]
    DelegationTooDeep { depth: usize, limit: usize },

    // ========================================================================
    // Invariant Violations
    // ========================================================================
    #[error("unknown action '{tag}'")]
    UnknownAction { tag: String },

    #[error("patch preset '{preset}' cannot apply a {manipulator} manipulator")]
    InvalidPatch {
        preset: String,
        manipulator: &'static str,
    },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidUri { .. } => vec![
                "Module references look like [backend:]locator".into(),
                "  • ./path/to/module      (local directory)".into(),
                "  • gh:scope/name#ref/sub (git-hosted repository)".into(),
                "  • npm:@scope/name       (package registry)".into(),
            ],
            Self::InvalidInput { .. } => vec![
                "Pass input as a JSON5 object with --data".into(),
                "Run `shivvie info <module>` to see the expected input".into(),
            ],
            Self::InvalidManifest { path, .. } => vec![
                format!("Check the module manifest at {}", path),
                "The manifest must be valid TOML with [[actions]] tables".into(),
            ],
            Self::DelegationTooDeep { limit, .. } => vec![
                "A module probably delegates to itself, directly or indirectly".into(),
                format!(
                    "Raise engine.max_delegate_depth above {} if the nesting is intended",
                    limit
                ),
            ],
            Self::ActionProduction { .. } | Self::UnknownAction { .. } => vec![
                "The module emitted something that is not an action".into(),
                "Report this to the module author".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUri { .. }
            | Self::InvalidInput { .. }
            | Self::InvalidManifest { .. }
            | Self::InvalidSchema { .. }
            | Self::Rendering { .. }
            | Self::ActionProduction { .. }
            | Self::DelegationTooDeep { .. } => ErrorCategory::Validation,
            Self::UnknownAction { .. } | Self::InvalidPatch { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Internal,
}
