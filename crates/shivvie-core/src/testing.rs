//! Lightweight port doubles for unit tests in this crate.
//!
//! The full adapters live in `shivvie-adapters`; these exist so core tests
//! can run the pipeline without depending on them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::application::ports::{Filesystem, LoadedModule, ModuleLoader, Patcher, TemplateRenderer};
use crate::application::ApplicationError;
use crate::domain::{Manipulator, PatchPreset};
use crate::error::{ShivvieError, ShivvieResult};

/// Filesystem over the real disk.
pub struct DiskFs;

#[async_trait]
impl Filesystem for DiskFs {
    async fn create_dir_all(&self, path: &Path) -> ShivvieResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| ShivvieError::filesystem(path, e))
    }

    async fn read_file(&self, path: &Path) -> ShivvieResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| ShivvieError::filesystem(path, e))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> ShivvieResult<()> {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ShivvieError::filesystem(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn canonicalize(&self, path: &Path) -> ShivvieResult<PathBuf> {
        tokio::fs::canonicalize(path)
            .await
            .map_err(|e| ShivvieError::filesystem(path, e))
    }

    async fn list_files(&self, root: &Path) -> ShivvieResult<Vec<PathBuf>> {
        fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    walk(root, &path, out)?;
                } else if let Ok(rel) = path.strip_prefix(root) {
                    out.push(rel.to_path_buf());
                }
            }
            Ok(())
        }
        let mut out = Vec::new();
        walk(root, root, &mut out).map_err(|e| ShivvieError::filesystem(root, e))?;
        out.sort();
        Ok(out)
    }
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").unwrap());

/// Replaces `{{key}}` with the top-level value of `key`.
pub struct BraceRenderer;

impl TemplateRenderer for BraceRenderer {
    fn render(&self, template: &str, data: &Value) -> ShivvieResult<String> {
        Ok(PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures<'_>| {
                match data.get(&caps[1]) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                }
            })
            .into_owned())
    }
}

/// Compact JSON / plain-text patcher.
pub struct PlainPatcher;

impl Patcher for PlainPatcher {
    fn patch(
        &self,
        path: &Path,
        preset: PatchPreset,
        text: &str,
        manipulator: &Manipulator,
    ) -> ShivvieResult<String> {
        match (preset, manipulator) {
            (PatchPreset::Json, Manipulator::Json(edit)) => {
                let mut doc = if text.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(text).map_err(|e| ApplicationError::PatchFailed {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?
                };
                edit(&mut doc)?;
                Ok(doc.to_string())
            }
            (PatchPreset::Text, Manipulator::Text(edit)) => Ok(edit(text.to_string())?),
            (preset, manipulator) => Err(crate::domain::DomainError::InvalidPatch {
                preset: preset.to_string(),
                manipulator: manipulator.kind(),
            }
            .into()),
        }
    }
}

/// Loader over a fixed map of module directories.
#[derive(Default)]
pub struct MapLoader {
    modules: HashMap<PathBuf, LoadedModule>,
}

impl MapLoader {
    pub fn with(mut self, dir: impl Into<PathBuf>, module: LoadedModule) -> Self {
        self.modules.insert(dir.into(), module);
        self
    }
}

#[async_trait]
impl ModuleLoader for MapLoader {
    async fn load(&self, module_dir: &Path) -> ShivvieResult<LoadedModule> {
        self.modules.get(module_dir).cloned().ok_or_else(|| {
            ApplicationError::LoadFailed {
                path: module_dir.to_path_buf(),
                reason: "no such module".into(),
            }
            .into()
        })
    }
}
