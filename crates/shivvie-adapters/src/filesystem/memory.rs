//! In-memory filesystem adapter for testing and dry embedding.

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;

use shivvie_core::{
    application::{ApplicationError, ports::Filesystem},
    domain::paths::normalize,
    error::{ShivvieError, ShivvieResult},
};

/// In-memory filesystem. Paths are normalised lexically; there are no
/// symlinks, so `canonicalize` only folds `.` and `..`.
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: HashSet<PathBuf>,
}

impl MemoryFilesystemInner {
    fn add_dirs(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryFilesystemInner::default())),
        }
    }

    /// Seed a file (and its parent directories).
    pub fn with_file(self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            let path = normalize(path.as_ref());
            if let Some(parent) = path.parent() {
                inner.add_dirs(parent);
            }
            inner.files.insert(path, content.as_ref().to_vec());
        }
        self
    }

    /// Read a file's content as text (testing helper).
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        let bytes = inner.files.get(&normalize(path.as_ref()))?;
        String::from_utf8(bytes.clone()).ok()
    }

    /// All files, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> ShivvieResult<RwLockReadGuard<'_, MemoryFilesystemInner>> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> ShivvieResult<RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        self.inner.write().map_err(|_| poisoned())
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> ShivvieError {
    ShivvieError::Internal {
        message: "memory filesystem lock poisoned".into(),
    }
}

#[async_trait]
impl Filesystem for MemoryFilesystem {
    async fn create_dir_all(&self, path: &Path) -> ShivvieResult<()> {
        self.write()?.add_dirs(&normalize(path));
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> ShivvieResult<Vec<u8>> {
        self.read()?
            .files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| ShivvieError::filesystem(path, "No such file"))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> ShivvieResult<()> {
        let path = normalize(path);
        let mut inner = self.write()?;

        // Ensure parent exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(ApplicationError::FilesystemError {
                    path,
                    reason: "Parent directory does not exist".into(),
                }
                .into());
            }
        }

        inner.files.insert(path, content.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(&path) || inner.directories.contains(&path))
            .unwrap_or(false)
    }

    async fn canonicalize(&self, path: &Path) -> ShivvieResult<PathBuf> {
        let normalized = normalize(path);
        if self.exists(&normalized).await {
            Ok(normalized)
        } else {
            Err(ApplicationError::NotFound {
                path: path.to_path_buf(),
            }
            .into())
        }
    }

    async fn list_files(&self, root: &Path) -> ShivvieResult<Vec<PathBuf>> {
        let root = normalize(root);
        let inner = self.read()?;
        Ok(inner
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(&root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_requires_parent_directory() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file(Path::new("/out/a.txt"), b"a").await.is_err());

        fs.create_dir_all(Path::new("/out")).await.unwrap();
        fs.write_file(Path::new("/out/./a.txt"), b"a").await.unwrap();
        assert_eq!(fs.read_to_string("/out/a.txt").as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn lists_only_below_root() {
        let fs = MemoryFilesystem::new()
            .with_file("/tpl/b/c.txt", "c")
            .with_file("/tpl/.hidden", "h")
            .with_file("/tplx/other", "o");

        let files = fs.list_files(Path::new("/tpl")).await.unwrap();
        assert_eq!(files, [PathBuf::from(".hidden"), PathBuf::from("b/c.txt")]);
    }

    #[tokio::test]
    async fn canonicalize_folds_dots_and_requires_existence() {
        let fs = MemoryFilesystem::new().with_file("/m/shivvie.toml", "");
        assert_eq!(
            fs.canonicalize(Path::new("/m/../m/.")).await.unwrap(),
            PathBuf::from("/m")
        );
        assert!(fs.canonicalize(Path::new("/nope")).await.is_err());
    }
}
