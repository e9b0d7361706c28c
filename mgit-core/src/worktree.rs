//! Working tree access
//!
//! The engine only reads the working tree: file contents for staging, file
//! metadata for change detection, and directory walks for untracked files.
//! Paths handed to the rest of the engine are `/`-separated and relative to
//! the working tree root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::object::FileMode;

/// Metadata of a working-tree path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    /// Symbolic links are never followed or tracked
    pub is_symlink: bool,
    pub mode: FileMode,
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch
    pub mtime: i64,
}

impl FileStat {
    fn from_metadata(meta: &fs::Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
            mode: file_mode(meta),
            size: meta.len(),
            mtime: meta.modified().map(system_time_nanos).unwrap_or(0),
        }
    }

    /// A regular file, the only kind of path that can be staged
    pub fn is_file(&self) -> bool {
        !self.is_dir && !self.is_symlink
    }
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;
    FileMode::from_permissions(meta.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> FileMode {
    FileMode::Regular
}

/// Convert a timestamp to signed nanoseconds since the epoch
pub fn system_time_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_nanos()).unwrap_or(i64::MAX),
    }
}

/// Working directory of a non-bare repository
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
    meta_name: String,
}

impl WorkTree {
    /// `meta_name` is the metadata directory directly under `root`, which is
    /// never treated as part of the working tree.
    pub fn new(root: impl Into<PathBuf>, meta_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            meta_name: meta_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a root-relative path
    pub fn abs_path(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            return self.root.clone();
        }
        rel.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }

    /// Convert a path (absolute, or relative to `cwd`) into a root-relative
    /// `/`-separated path. The root itself becomes the empty string.
    pub fn relativize(&self, path: &Path, cwd: &Path) -> Result<String> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        let normalized = normalize(&joined);

        let rel = normalized
            .strip_prefix(&self.root)
            .map_err(|_| Error::PathOutsideRepository(path.to_path_buf()))?;

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(seg) => {
                    let seg = seg
                        .to_str()
                        .ok_or_else(|| Error::PathNotFound(path.to_path_buf()))?;
                    if !is_representable(seg) {
                        return Err(Error::UnrepresentablePath(path.to_path_buf()));
                    }
                    parts.push(seg.to_string());
                }
                _ => return Err(Error::PathOutsideRepository(path.to_path_buf())),
            }
        }

        if parts.first().map(|s| s.as_str()) == Some(self.meta_name.as_str()) {
            return Err(Error::PathOutsideRepository(path.to_path_buf()));
        }
        Ok(parts.join("/"))
    }

    /// Stat a path without following symlinks; `None` if it does not exist
    pub fn stat(&self, rel: &str) -> Result<Option<FileStat>> {
        let path = self.abs_path(rel);
        match fs::symlink_metadata(&path) {
            Ok(meta) => Ok(Some(FileStat::from_metadata(&meta))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Read a file's contents together with its metadata
    pub fn read(&self, rel: &str) -> Result<(Vec<u8>, FileStat)> {
        let path = self.abs_path(rel);
        let stat = self
            .stat(rel)?
            .ok_or_else(|| Error::PathNotFound(PathBuf::from(rel)))?;
        if !stat.is_file() {
            return Err(Error::NotAFile(PathBuf::from(rel)));
        }
        let data = fs::read(&path).at_path(&path)?;
        Ok((data, stat))
    }

    /// All regular files below `rel` (or the whole tree for ""), sorted
    pub fn files_under(&self, rel: &str) -> Result<Vec<String>> {
        let base = self.abs_path(rel);
        let mut files = Vec::new();

        let walker = WalkDir::new(&base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && self.is_meta_dir(e.path())));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| base.clone());
                Error::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel_path = entry
                .path()
                .strip_prefix(&self.root)
                .ok()
                .and_then(|p| p.to_str())
                .map(|p| p.replace(std::path::MAIN_SEPARATOR, "/"));
            match rel_path {
                Some(p) if is_representable(&p) => files.push(p),
                _ => tracing::warn!(path = %entry.path().display(), "skipping unrepresentable path"),
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_meta_dir(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path())
            && path.file_name().and_then(|n| n.to_str()) == Some(self.meta_name.as_str())
    }
}

/// Index records are newline-terminated and NUL-separated
fn is_representable(path: &str) -> bool {
    !path.contains(['\n', '\0'])
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
