//! Local filesystem adapter using `tokio::fs`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use shivvie_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{ShivvieError, ShivvieResult},
};

/// Production filesystem implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn create_dir_all(&self, path: &Path) -> ShivvieResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| map_io_error(path, e, "create directory"))
    }

    async fn read_file(&self, path: &Path) -> ShivvieResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| map_io_error(path, e, "read file"))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> ShivvieResult<()> {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| map_io_error(path, e, "write file"))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn canonicalize(&self, path: &Path) -> ShivvieResult<PathBuf> {
        tokio::fs::canonicalize(path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ApplicationError::NotFound {
                path: path.to_path_buf(),
            }
            .into(),
            _ => map_io_error(path, e, "canonicalize"),
        })
    }

    async fn list_files(&self, root: &Path) -> ShivvieResult<Vec<PathBuf>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || walk_files(&root))
            .await
            .map_err(|e| ShivvieError::Internal {
                message: format!("directory walk task failed: {e}"),
            })?
    }
}

fn walk_files(root: &Path) -> ShivvieResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| ShivvieError::filesystem(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> ShivvieError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: format!("Failed to {}: {}", operation, e),
    }
    .into()
}
