//! Staging index
//!
//! The index maps working-tree paths to the blob staged for the next commit,
//! together with the size and mtime observed when the file was staged. It is
//! the only mutable structure in the repository that is not content-addressed.
//!
//! On-disk format: one record per line, fields separated by NUL:
//!
//! ```text
//! path \0 mode \0 hex-digest \0 size \0 mtime-ns
//! ```
//!
//! Record order on disk carries no meaning; entries are kept sorted by path.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{self, ObjectId, ObjectKind};
use crate::object::FileMode;
use crate::storage::ObjectStore;
use crate::worktree::{FileStat, WorkTree, system_time_nanos};

/// A staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Root-relative, `/`-separated path
    pub path: String,
    pub mode: FileMode,
    /// Staged blob
    pub id: ObjectId,
    /// Size in bytes when staged
    pub size: u64,
    /// Modification time (ns since epoch) when staged
    pub mtime: i64,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, mode: FileMode, id: ObjectId, size: u64, mtime: i64) -> Self {
        Self {
            path: path.into(),
            mode,
            id,
            size,
            mtime,
        }
    }

    fn encode(&self) -> String {
        format!(
            "{}\0{}\0{}\0{}\0{}\n",
            self.path, self.mode, self.id, self.size, self.mtime
        )
    }

    fn decode(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('\0').collect();
        let [path, mode, id, size, mtime] = fields.as_slice() else {
            return Err(Error::CorruptIndex(format!(
                "expected 5 fields, found {}",
                fields.len()
            )));
        };

        if path.is_empty() || path.starts_with('/') || path.split('/').any(|s| s.is_empty()) {
            return Err(Error::CorruptIndex(format!("invalid path '{}'", path)));
        }
        let mode = FileMode::parse(mode)
            .filter(|m| !m.is_tree())
            .ok_or_else(|| Error::CorruptIndex(format!("invalid mode '{}' for '{}'", mode, path)))?;
        let id = ObjectId::from_hex(id)
            .map_err(|_| Error::CorruptIndex(format!("invalid digest for '{}'", path)))?;
        let size = size
            .parse()
            .map_err(|_| Error::CorruptIndex(format!("invalid size for '{}'", path)))?;
        let mtime = mtime
            .parse()
            .map_err(|_| Error::CorruptIndex(format!("invalid mtime for '{}'", path)))?;

        Ok(Self::new(*path, mode, id, size, mtime))
    }

    /// Whether cached metadata proves the working file unchanged without
    /// re-hashing.
    ///
    /// Entries whose file was modified at or after the moment the index was
    /// written are "racy": a same-size edit in the same clock tick would go
    /// unnoticed, so they are always re-hashed.
    pub fn stat_matches(&self, stat: &FileStat, index_mtime: Option<i64>) -> bool {
        let settled = matches!(index_mtime, Some(written) if self.mtime < written);
        settled && stat.size == self.size && stat.mtime == self.mtime && stat.mode == self.mode
    }
}

/// The staging area
#[derive(Debug, Clone)]
pub struct Index {
    path: PathBuf,
    entries: BTreeMap<String, IndexEntry>,
    /// mtime of the index file when loaded
    written_at: Option<i64>,
}

impl Index {
    /// Empty index that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            written_at: None,
        }
    }

    /// Load the index from disk. A missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        let mut index = Self::new(path);

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(index),
            Err(e) => return Err(Error::io(path, e)),
        };
        index.written_at = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(system_time_nanos);

        let text = String::from_utf8(data)
            .map_err(|_| Error::CorruptIndex("index is not valid UTF-8".to_string()))?;
        for line in text.lines().filter(|l| !l.is_empty()) {
            let entry = IndexEntry::decode(line)?;
            if index.entries.contains_key(&entry.path) {
                return Err(Error::CorruptIndex(format!("duplicate path '{}'", entry.path)));
            }
            index.entries.insert(entry.path.clone(), entry);
        }

        tracing::debug!(path = %path.display(), entries = index.len(), "loaded index");
        Ok(index)
    }

    /// Persist the index (write to a temp file, then rename into place)
    pub fn save(&mut self) -> Result<()> {
        let data: String = self.entries.values().map(IndexEntry::encode).collect();
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data).at_path(&tmp)?;
        fs::rename(&tmp, &self.path).at_path(&self.path)?;

        self.written_at = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(system_time_nanos);
        tracing::debug!(path = %self.path.display(), entries = self.len(), "saved index");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// mtime of the index file as last loaded or saved
    pub fn written_at(&self) -> Option<i64> {
        self.written_at
    }

    /// Stage a working-tree file: store its content as a blob and upsert the
    /// entry. Returns the blob ID.
    pub fn stage<S: ObjectStore>(&mut self, store: &S, worktree: &WorkTree, rel: &str) -> Result<ObjectId> {
        let (data, stat) = worktree.read(rel)?;
        let id = store.put(ObjectKind::Blob, &data)?;
        debug_assert_eq!(id, hash::hash(ObjectKind::Blob, &data));

        self.insert(IndexEntry::new(rel, stat.mode, id, stat.size, stat.mtime));
        tracing::debug!(path = rel, %id, "staged file");
        Ok(id)
    }

    /// Upsert an entry, evicting entries that would conflict with it in the
    /// tree (a file where a directory is now, or files under a path that is
    /// now a file).
    pub fn insert(&mut self, entry: IndexEntry) {
        let mut prefix = String::new();
        for segment in entry.path.split('/') {
            if !prefix.is_empty() {
                // An ancestor of this path recorded as a file
                self.entries.remove(&prefix);
                prefix.push('/');
            }
            prefix.push_str(segment);
        }

        let dir_prefix = format!("{}/", entry.path);
        let nested: Vec<String> = self
            .entries
            .range(dir_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&dir_prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in nested {
            self.entries.remove(&key);
        }

        self.entries.insert(entry.path.clone(), entry);
    }

    /// Remove an entry from the index
    pub fn unstage(&mut self, path: &str) -> Option<IndexEntry> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Entries in path order
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Tracked paths equal to `rel` or below it (all paths for "")
    pub fn paths_under(&self, rel: &str) -> Vec<String> {
        if rel.is_empty() {
            return self.entries.keys().cloned().collect();
        }
        let dir_prefix = format!("{}/", rel);
        self.entries
            .keys()
            .filter(|k| k.as_str() == rel || k.starts_with(&dir_prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
