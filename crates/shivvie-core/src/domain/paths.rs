//! Lexical path helpers.

use std::path::{Component, Path, PathBuf};

/// Join `segments` onto `base` and normalise `.`/`..` lexically.
///
/// An absolute segment restarts the path, like [`Path::join`].
pub fn resolve<I, S>(base: &Path, segments: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<Path>,
{
    let mut joined = base.to_path_buf();
    for segment in segments {
        joined.push(segment);
    }
    normalize(&joined)
}

/// Remove `.` components and fold `..` into its parent without touching the
/// filesystem. `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
