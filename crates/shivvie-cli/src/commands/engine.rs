//! Wiring of the core services to the production adapters.

use std::sync::Arc;

use tracing::debug;

use shivvie_adapters::{
    GitFetcher, HandlebarsRenderer, LocalFilesystem, ManifestModuleLoader, NodePackageManager,
    PackageManagerKind, PresetPatcher,
};
use shivvie_core::application::{
    ModuleRunner, PackageManager, ResolverOptions, RunnerOptions, UriResolver,
    services::default_temp_root,
};

use crate::{
    config::AppConfig,
    error::{CliError, CliResult},
};

/// A resolver and a runner sharing one set of adapters.
pub struct Engine {
    pub resolver: UriResolver,
    pub runner: ModuleRunner,
}

impl Engine {
    pub fn from_config(config: &AppConfig) -> CliResult<Self> {
        let cwd = std::env::current_dir()?;
        let temp_root = default_temp_root();

        let filesystem = Arc::new(LocalFilesystem::new());
        let packages: Arc<dyn PackageManager> =
            Arc::new(package_manager(&config.registry.package_manager)?);
        let fetcher = Arc::new(GitFetcher::with_base_url(config.git.base_url.as_str()));

        debug!(
            shell = %config.engine.shell.display(),
            cache = %config.registry.cache_dir.display(),
            git = %config.git.base_url,
            "engine configured"
        );

        let resolver = UriResolver::new(
            filesystem.clone(),
            fetcher,
            packages.clone(),
            ResolverOptions {
                cache_dir: config.registry.cache_dir.clone(),
                temp_root: temp_root.clone(),
            },
        );
        let runner = ModuleRunner::new(
            Arc::new(ManifestModuleLoader::new()),
            filesystem,
            Arc::new(HandlebarsRenderer::new()),
            Arc::new(PresetPatcher::new()),
            packages,
            RunnerOptions {
                shell: config.engine.shell.clone(),
                max_delegate_depth: config.engine.max_delegate_depth,
                temp_root,
                cwd,
            },
        );

        Ok(Self { resolver, runner })
    }
}

/// `auto` detects per directory; anything else pins the manager.
fn package_manager(name: &str) -> CliResult<NodePackageManager> {
    if name.eq_ignore_ascii_case("auto") {
        return Ok(NodePackageManager::new());
    }
    name.parse::<PackageManagerKind>()
        .map(NodePackageManager::with_kind)
        .map_err(|e| CliError::ConfigError {
            message: format!(
                "registry.package_manager = '{name}' is not one of auto, npm, pnpm, yarn, bun"
            ),
            source: Some(Box::new(e)),
        })
}
