//! Node package-manager adapter.
//!
//! Picks npm, pnpm, yarn or bun for a directory (explicit choice, then the
//! `packageManager` field, then lockfiles in the directory and its
//! ancestors, then npm) and runs it with output suppressed. stderr is
//! captured for the error report.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use shivvie_core::{
    application::{ApplicationError, ports::PackageManager},
    error::{ShivvieError, ShivvieResult},
};

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerKind {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl PackageManagerKind {
    const LOCKFILES: [(&'static str, Self); 5] = [
        ("pnpm-lock.yaml", Self::Pnpm),
        ("yarn.lock", Self::Yarn),
        ("bun.lock", Self::Bun),
        ("bun.lockb", Self::Bun),
        ("package-lock.json", Self::Npm),
    ];

    pub fn program(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
        }
    }

    fn add_args(&self, name: &str, dev: bool) -> Vec<String> {
        let mut args = match self {
            Self::Npm => vec!["install".to_string()],
            _ => vec!["add".to_string()],
        };
        if dev {
            args.push(
                match self {
                    Self::Npm => "--save-dev",
                    Self::Bun => "--dev",
                    Self::Pnpm | Self::Yarn => "-D",
                }
                .to_string(),
            );
        }
        args.push(name.to_string());
        args
    }

    fn remove_args(&self, name: &str) -> Vec<String> {
        let verb = match self {
            Self::Npm => "uninstall",
            _ => "remove",
        };
        vec![verb.to_string(), name.to_string()]
    }

    fn install_args(&self) -> Vec<String> {
        vec!["install".to_string()]
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for PackageManagerKind {
    type Err = ShivvieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "pnpm" => Ok(Self::Pnpm),
            "yarn" => Ok(Self::Yarn),
            "bun" => Ok(Self::Bun),
            other => Err(ShivvieError::Configuration {
                message: format!(
                    "unknown package manager '{other}' (expected npm, pnpm, yarn or bun)"
                ),
            }),
        }
    }
}

/// [`PackageManager`] that shells out to a Node package manager.
#[derive(Debug, Clone, Default)]
pub struct NodePackageManager {
    preferred: Option<PackageManagerKind>,
}

impl NodePackageManager {
    /// Auto-detect per directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always use `kind`.
    pub fn with_kind(kind: PackageManagerKind) -> Self {
        Self {
            preferred: Some(kind),
        }
    }

    /// The manager used for `cwd`.
    pub async fn detect(&self, cwd: &Path) -> PackageManagerKind {
        if let Some(kind) = self.preferred {
            return kind;
        }
        if let Some(kind) = declared_manager(cwd).await {
            return kind;
        }
        for dir in cwd.ancestors() {
            for (lockfile, kind) in PackageManagerKind::LOCKFILES {
                if tokio::fs::try_exists(dir.join(lockfile)).await.unwrap_or(false) {
                    return kind;
                }
            }
        }
        PackageManagerKind::Npm
    }

    async fn run(
        &self,
        kind: PackageManagerKind,
        cwd: &Path,
        target: &str,
        args: Vec<String>,
    ) -> ShivvieResult<()> {
        let failed = |reason: String| ApplicationError::InstallFailed {
            target: target.to_string(),
            reason,
        };

        let program: PathBuf = which::which(kind.program())
            .map_err(|e| failed(format!("{kind} is not available: {e}")))?;

        debug!(manager = %kind, cwd = %cwd.display(), ?args, "running package manager");
        let output = Command::new(program)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("{kind} exited with {}", output.status),
                detail => format!("{kind} exited with {}: {detail}", output.status),
            };
            Err(failed(reason).into())
        }
    }
}

#[async_trait]
impl PackageManager for NodePackageManager {
    #[instrument(skip(self), fields(cwd = %cwd.display()))]
    async fn add_dependency(&self, cwd: &Path, name: &str, dev: bool) -> ShivvieResult<()> {
        let kind = self.detect(cwd).await;
        self.run(kind, cwd, name, kind.add_args(name, dev)).await
    }

    #[instrument(skip(self), fields(cwd = %cwd.display()))]
    async fn remove_dependency(&self, cwd: &Path, name: &str) -> ShivvieResult<()> {
        let kind = self.detect(cwd).await;
        self.run(kind, cwd, name, kind.remove_args(name)).await
    }

    #[instrument(skip(self), fields(cwd = %cwd.display()))]
    async fn install_dependencies(&self, cwd: &Path) -> ShivvieResult<()> {
        let kind = self.detect(cwd).await;
        self.run(kind, cwd, &cwd.display().to_string(), kind.install_args())
            .await
    }
}

/// `"packageManager": "pnpm@9.1.0"` in `cwd/package.json`.
async fn declared_manager(cwd: &Path) -> Option<PackageManagerKind> {
    let text = tokio::fs::read_to_string(cwd.join("package.json")).await.ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&text).ok()?;
    let field = manifest.get("packageManager")?.as_str()?;
    field.split('@').next()?.parse().ok()
}
