// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Shivvie.
//!
//! Pure values of the module model: the reference grammar, the closed action
//! set, action requests, patch recipes and input schemas.
//!
//! ## Boundaries
//!
//! - **No I/O**: nothing here reads files, spawns processes or opens sockets
//! - **Data first**: actions are values; effects belong to the executor
//! - **Errors**: every failure is a [`DomainError`]
pub mod action;
pub mod error;
pub mod input;
pub mod patch;
pub mod paths;
pub mod request;
pub mod uri;

pub use action::{
    Action, ActionTag, CascadeAction, DelegateAction, PackageAction, PatchAction, RenderAction,
    RenderingData, ScriptAction, ScriptContext, ScriptProcedure,
};
pub use error::{DomainError, ErrorCategory};
pub use input::InputSchema;
pub use patch::{Manipulator, PatchPreset, TextReplacement, edit_text, merge_patch};
pub use request::ActionRequest;
pub use uri::{Backend, GitLocator, ModuleUri, RegistryLocator};

/// Conventional entry-point filename inside a module directory.
pub const MODULE_ENTRY_POINT: &str = "shivvie.toml";

/// Package manifest filename used by registry anchors and package ops.
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Keyword that marks a package manifest's directory as a module registry.
pub const REGISTRY_KEYWORD: &str = "shivvie-registry";

/// Delegate `from` prefix resolved against the registry anchor.
pub const ANCHOR_PREFIX: &str = "@:";
