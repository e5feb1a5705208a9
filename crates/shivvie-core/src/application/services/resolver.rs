//! URI Resolver - materialises a module reference to a local directory.
//!
//! 1. Parse the reference (pure; grammar errors leave no trace on disk)
//! 2. Dispatch on the backend:
//!    - `file`: canonicalise the path
//!    - `gh`: clone into a fresh `<temp root>/<uuid>`, select the subpath,
//!      install dependencies when a package manifest is present
//!    - `npm`: add the package to the shared cache and return its
//!      installation directory
//! 3. Point at the entry point inside the resolved directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::ApplicationError;
use crate::application::ports::{FetchObserver, Filesystem, PackageManager, RepoFetcher};
use crate::domain::{
    Backend, GitLocator, MODULE_ENTRY_POINT, ModuleUri, PACKAGE_MANIFEST, RegistryLocator,
};
use crate::error::{ShivvieError, ShivvieResult};

/// Name of the throwaway manifest in the registry cache.
const CACHE_PACKAGE_NAME: &str = "shivvie-npm-cache";

/// Pinned in the cache manifest so manager detection stops there instead of
/// picking up a lockfile in an ancestor such as `$HOME`.
const CACHE_PACKAGE_MANAGER: &str = "pnpm";

/// Default scratch root: `<system temp>/shivvie`.
pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join("shivvie")
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Shared registry cache directory.
    pub cache_dir: PathBuf,
    /// Parent of fresh clone directories.
    pub temp_root: PathBuf,
}

/// A module materialised on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub uri: ModuleUri,
    pub source_dir: PathBuf,
    pub config_path: PathBuf,
}

pub struct UriResolver {
    filesystem: Arc<dyn Filesystem>,
    fetcher: Arc<dyn RepoFetcher>,
    packages: Arc<dyn PackageManager>,
    options: ResolverOptions,
}

impl UriResolver {
    pub fn new(
        filesystem: Arc<dyn Filesystem>,
        fetcher: Arc<dyn RepoFetcher>,
        packages: Arc<dyn PackageManager>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            filesystem,
            fetcher,
            packages,
            options,
        }
    }

    /// Resolve `uri` to a module directory.
    ///
    /// # Errors
    ///
    /// - `InvalidUri` for a malformed reference (before any I/O)
    /// - `NotFound` when the path, subpath or installed package is missing
    /// - `FetchFailed` / `InstallFailed` from the remote backends
    #[instrument(skip(self))]
    pub async fn resolve(&self, uri: &str) -> ShivvieResult<ResolvedModule> {
        let uri = ModuleUri::parse(uri)?;

        let source_dir = match uri.backend() {
            Backend::File(path) => self.resolve_file(path).await?,
            Backend::Git(locator) => self.resolve_git(locator).await?,
            Backend::Registry(locator) => self.resolve_registry(locator).await?,
        };
        info!(source = %source_dir.display(), "module resolved");

        let config_path = source_dir.join(MODULE_ENTRY_POINT);
        Ok(ResolvedModule {
            uri,
            source_dir,
            config_path,
        })
    }

    async fn resolve_file(&self, path: &Path) -> ShivvieResult<PathBuf> {
        if !self.filesystem.exists(path).await {
            return Err(not_found(path));
        }
        self.filesystem.canonicalize(path).await
    }

    async fn resolve_git(&self, locator: &GitLocator) -> ShivvieResult<PathBuf> {
        let clone_dir = self.options.temp_root.join(Uuid::new_v4().to_string());
        self.filesystem.create_dir_all(&self.options.temp_root).await?;

        let repository = locator.repository();
        let observer: FetchObserver = Arc::new(move |event| {
            info!(target: "shivvie::fetch", repository = %repository, "{event}");
        });
        self.fetcher.fetch(locator, &clone_dir, observer).await?;

        let module_dir = match locator.relative_subpath() {
            "" => clone_dir.clone(),
            subpath => clone_dir.join(subpath),
        };
        if !self.filesystem.exists(&module_dir).await {
            return Err(not_found(&module_dir));
        }

        let install_at = if self.has_manifest(&module_dir).await {
            Some(&module_dir)
        } else if self.has_manifest(&clone_dir).await {
            Some(&clone_dir)
        } else {
            None
        };
        if let Some(dir) = install_at {
            debug!(cwd = %dir.display(), "installing module dependencies");
            self.packages.install_dependencies(dir).await?;
        }

        self.filesystem.canonicalize(&module_dir).await
    }

    async fn resolve_registry(&self, locator: &RegistryLocator) -> ShivvieResult<PathBuf> {
        let cache = &self.options.cache_dir;
        self.filesystem.create_dir_all(cache).await?;

        let manifest = cache.join(PACKAGE_MANIFEST);
        if !self.filesystem.exists(&manifest).await {
            let body = json!({
                "name": CACHE_PACKAGE_NAME,
                "private": true,
                "license": "MIT",
                "packageManager": CACHE_PACKAGE_MANAGER,
            });
            let bytes = serde_json::to_vec_pretty(&body)
                .map_err(|e| ShivvieError::filesystem(&manifest, e))?;
            self.filesystem.write_file(&manifest, &bytes).await?;
        }

        self.packages
            .add_dependency(cache, &locator.name, false)
            .await
            .map_err(|e| match e {
                ShivvieError::Application(ApplicationError::InstallFailed { .. }) => e,
                other => ApplicationError::InstallFailed {
                    target: locator.name.clone(),
                    reason: other.to_string(),
                }
                .into(),
            })?;

        let module_dir = cache.join("node_modules").join(&locator.name);
        if !self.has_manifest(&module_dir).await {
            return Err(not_found(&module_dir.join(PACKAGE_MANIFEST)));
        }
        self.filesystem.canonicalize(&module_dir).await
    }

    async fn has_manifest(&self, dir: &Path) -> bool {
        self.filesystem.exists(&dir.join(PACKAGE_MANIFEST)).await
    }
}

fn not_found(path: &Path) -> ShivvieError {
    ApplicationError::NotFound {
        path: path.to_path_buf(),
    }
    .into()
}
