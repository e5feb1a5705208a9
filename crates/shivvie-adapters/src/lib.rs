//! Infrastructure adapters for Shivvie.
//!
//! This crate implements the ports defined in `shivvie-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod filesystem;
pub mod git;
pub mod module_loader;
pub mod package_manager;
pub mod patcher;
pub mod renderer;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use git::GitFetcher;
pub use module_loader::{InMemoryModuleLoader, ManifestModuleLoader};
pub use package_manager::{NodePackageManager, PackageManagerKind};
pub use patcher::PresetPatcher;
pub use renderer::HandlebarsRenderer;
