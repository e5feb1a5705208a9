//! In-memory module loader.
//!
//! Registers Rust-coded modules under a directory key so a binary can embed
//! modules (or a test can build them) without a `shivvie.toml` on disk.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use shivvie_core::{
    application::{
        ApplicationError,
        ports::{LoadedModule, ModuleLoader},
    },
    error::{ShivvieError, ShivvieResult},
};

/// Thread-safe registry of loaded modules keyed by module directory.
#[derive(Clone, Default)]
pub struct InMemoryModuleLoader {
    inner: Arc<RwLock<HashMap<PathBuf, LoadedModule>>>,
}

impl InMemoryModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` as the module living at `dir`, replacing any
    /// previous registration.
    pub fn insert(&self, dir: impl Into<PathBuf>, module: LoadedModule) -> ShivvieResult<()> {
        self.inner
            .write()
            .map_err(|_| lock_poisoned())?
            .insert(dir.into(), module);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, dir: impl Into<PathBuf>, module: LoadedModule) -> ShivvieResult<Self> {
        self.insert(dir, module)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ModuleLoader for InMemoryModuleLoader {
    async fn load(&self, module_dir: &Path) -> ShivvieResult<LoadedModule> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        inner.get(module_dir).cloned().ok_or_else(|| {
            ApplicationError::LoadFailed {
                path: module_dir.to_path_buf(),
                reason: "no module registered for this directory".into(),
            }
            .into()
        })
    }
}

fn lock_poisoned() -> ShivvieError {
    ShivvieError::Internal {
        message: "module registry lock poisoned".into(),
    }
}
