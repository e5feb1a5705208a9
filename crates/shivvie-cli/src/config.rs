//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only sees the option structs built
//! from it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. Environment variables: `SHIVVIE_<SECTION>__<KEY>`, e.g.
//!    `SHIVVIE_ENGINE__MAX_DELEGATE_DEPTH=8`
//! 2. Config file: `--config FILE`, else `config.toml` in the platform
//!    config directory (optional)
//! 3. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CliError, CliResult};

/// Environment variable prefix.
const ENV_PREFIX: &str = "SHIVVIE";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Execution engine settings.
    pub engine: EngineConfig,
    /// npm registry backend settings.
    pub registry: RegistryConfig,
    /// git backend settings.
    pub git: GitConfig,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nesting limit for `delegate` actions.
    pub max_delegate_depth: usize,
    /// Shell that runs script lines (`<shell> -c <line>`).
    pub shell: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Shared install cache for `npm:` modules.
    pub cache_dir: PathBuf,
    /// `auto`, `npm`, `pnpm`, `yarn` or `bun`.
    pub package_manager: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Host that `gh:` references are cloned from.
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_delegate_depth: shivvie_core::application::services::DEFAULT_MAX_DELEGATE_DEPTH,
            shell: default_shell(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            package_manager: "auto".into(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            base_url: shivvie_adapters::git::DEFAULT_BASE_URL.into(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "human".into(),
        }
    }
}

/// `bash` when it is on `PATH`, otherwise `sh`.
fn default_shell() -> PathBuf {
    which::which("bash")
        .or_else(|_| which::which("sh"))
        .unwrap_or_else(|_| PathBuf::from("/bin/sh"))
}

/// `<home>/.cache/shivvie/npm`.
fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".cache")
        .join("shivvie")
        .join("npm")
}

impl AppConfig {
    /// Load configuration from defaults, file and environment.
    ///
    /// An explicit `--config` file must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> CliResult<Self> {
        let defaults = Config::try_from(&Self::default()).map_err(config_error)?;

        let file = match config_file {
            Some(path) => File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(true),
            None => File::from(Self::config_path())
                .format(FileFormat::Toml)
                .required(false),
        };

        Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<Self>())
            .map_err(config_error)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.shivvie.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "shivvie", "shivvie")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".shivvie.toml"))
    }

    /// The file `load` reads for these arguments.
    pub fn effective_path(config_file: Option<&Path>) -> PathBuf {
        config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path)
    }

    /// Look up a dotted key such as `engine.shell`.
    pub fn get(&self, key: &str) -> CliResult<Value> {
        let root = serde_json::to_value(self).map_err(|e| CliError::ConfigError {
            message: format!("Failed to serialise config: {e}"),
            source: Some(Box::new(e)),
        })?;

        key.split('.')
            .try_fold(&root, |node, part| node.get(part))
            .cloned()
            .ok_or_else(|| CliError::ConfigError {
                message: format!("Unknown config key: '{key}'"),
                source: None,
            })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::ConfigError {
            message: format!("Failed to serialise config: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn config_error(err: config::ConfigError) -> CliError {
    CliError::ConfigError {
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}
