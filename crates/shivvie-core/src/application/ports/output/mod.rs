//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `shivvie-adapters` crate provides implementations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::services::{ActionStream, ModuleService};
use crate::domain::{GitLocator, InputSchema, Manipulator, PatchPreset};
use crate::error::ShivvieResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `shivvie_adapters::filesystem::LocalFilesystem` (production)
/// - `shivvie_adapters::filesystem::MemoryFilesystem` (testing)
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    async fn create_dir_all(&self, path: &Path) -> ShivvieResult<()>;

    /// Read a whole file.
    async fn read_file(&self, path: &Path) -> ShivvieResult<Vec<u8>>;

    /// Write content to a file, replacing it.
    async fn write_file(&self, path: &Path, content: &[u8]) -> ShivvieResult<()>;

    /// Check if path exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Absolute, symlink-free form of an existing path.
    async fn canonicalize(&self, path: &Path) -> ShivvieResult<PathBuf>;

    /// Every file below `root`, recursively, as sorted paths relative to
    /// `root`. Dotfiles are included.
    async fn list_files(&self, root: &Path) -> ShivvieResult<Vec<PathBuf>>;
}

/// Port for template rendering: a pure `render(template, data) -> string`.
///
/// Implemented by:
/// - `shivvie_adapters::renderer::HandlebarsRenderer`
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> ShivvieResult<String>;
}

/// Port for the patch engine: `patch(text, recipe) -> text`.
///
/// `path` names the file being patched in error reports; it is not read.
///
/// Implemented by:
/// - `shivvie_adapters::patcher::PresetPatcher`
pub trait Patcher: Send + Sync {
    fn patch(
        &self,
        path: &Path,
        preset: PatchPreset,
        text: &str,
        manipulator: &Manipulator,
    ) -> ShivvieResult<String>;
}

/// Port for package-manager operations against a directory's manifest.
///
/// Implemented by:
/// - `shivvie_adapters::package_manager::NodePackageManager`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn add_dependency(&self, cwd: &Path, name: &str, dev: bool) -> ShivvieResult<()>;

    async fn remove_dependency(&self, cwd: &Path, name: &str) -> ShivvieResult<()>;

    async fn install_dependencies(&self, cwd: &Path) -> ShivvieResult<()>;
}

/// Progress reported while fetching a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// Informational message from the remote or the fetcher.
    Notice(String),
    /// Object transfer progress.
    Progress { received: usize, total: usize },
}

impl fmt::Display for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice(message) => f.write_str(message),
            Self::Progress { received, total } => {
                write!(f, "received {received}/{total} objects")
            }
        }
    }
}

/// Callback receiving fetch progress.
pub type FetchObserver = Arc<dyn Fn(FetchEvent) + Send + Sync>;

/// Port for cloning a remote repository.
///
/// Implemented by:
/// - `shivvie_adapters::git::GitFetcher`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// Clone `source` into `dest` (which must not exist yet), checking out
    /// its ref when one is pinned.
    async fn fetch(
        &self,
        source: &GitLocator,
        dest: &Path,
        observer: FetchObserver,
    ) -> ShivvieResult<()>;
}

/// Produces a module's action stream from its bound service facade.
pub trait ActionsProducer: Send + Sync {
    fn produce(&self, service: Arc<ModuleService>) -> ActionStream;
}

impl<F> ActionsProducer for F
where
    F: Fn(Arc<ModuleService>) -> ActionStream + Send + Sync,
{
    fn produce(&self, service: Arc<ModuleService>) -> ActionStream {
        self(service)
    }
}

/// A loaded module entry point: `{ input, actions }`.
#[derive(Clone)]
pub struct LoadedModule {
    pub name: String,
    pub description: Option<String>,
    pub entry_point: PathBuf,
    pub input: InputSchema,
    pub producer: Arc<dyn ActionsProducer>,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("entry_point", &self.entry_point)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

/// Port for loading a module directory's entry point.
///
/// Implemented by:
/// - `shivvie_adapters::module_loader::ManifestModuleLoader` (`shivvie.toml`)
/// - `shivvie_adapters::module_loader::InMemoryModuleLoader` (embedding, tests)
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, module_dir: &Path) -> ShivvieResult<LoadedModule>;
}
