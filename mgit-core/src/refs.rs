//! Reference storage (HEAD, branches & tags)
//!
//! Refs are the only mutable pointers into the object graph. Each ref is a
//! plain-text file under `refs/` holding one hex digest; `HEAD` names the
//! current branch symbolically.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::ObjectId;

const HEADS: &str = "refs/heads";
const TAGS: &str = "refs/tags";
const SYMREF_PREFIX: &str = "ref: ";

/// What HEAD points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// Symbolic reference to a branch (which may not exist yet)
    Branch(String),
    /// Direct reference to a commit
    Detached(ObjectId),
}

/// Reference store rooted at the repository metadata directory
#[derive(Debug, Clone)]
pub struct RefStore {
    root: PathBuf,
}

impl RefStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the `refs/heads` and `refs/tags` directories
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [HEADS, TAGS] {
            let path = self.root.join(dir);
            fs::create_dir_all(&path).at_path(&path)?;
        }
        Ok(())
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }

    pub fn head(&self) -> Result<Head> {
        let path = self.head_path();
        let text = fs::read_to_string(&path).at_path(&path)?;
        let text = text.trim_end();

        if let Some(target) = text.strip_prefix(SYMREF_PREFIX) {
            let branch = target.strip_prefix("refs/heads/").ok_or_else(|| Error::CorruptRef {
                name: "HEAD".to_string(),
                reason: format!("points outside refs/heads: '{}'", target),
            })?;
            return Ok(Head::Branch(branch.to_string()));
        }

        ObjectId::from_hex(text)
            .map(Head::Detached)
            .map_err(|_| Error::CorruptRef {
                name: "HEAD".to_string(),
                reason: "neither a symbolic ref nor a digest".to_string(),
            })
    }

    /// Point HEAD at a branch
    pub fn set_head_branch(&self, branch: &str) -> Result<()> {
        validate_ref_name(branch)?;
        write_atomic(&self.head_path(), &format!("{}{}/{}\n", SYMREF_PREFIX, HEADS, branch))
    }

    /// Current branch name, if HEAD is symbolic
    pub fn current_branch(&self) -> Result<Option<String>> {
        Ok(match self.head()? {
            Head::Branch(name) => Some(name),
            Head::Detached(_) => None,
        })
    }

    /// Commit HEAD resolves to; `None` on an unborn branch
    pub fn head_commit(&self) -> Result<Option<ObjectId>> {
        match self.head()? {
            Head::Branch(name) => self.read_ref(&format!("{}/{}", HEADS, name)),
            Head::Detached(id) => Ok(Some(id)),
        }
    }

    /// Advance whatever HEAD points at to `id`
    pub fn update_head(&self, id: &ObjectId) -> Result<()> {
        match self.head()? {
            Head::Branch(name) => self.write_ref(&format!("{}/{}", HEADS, name), id),
            Head::Detached(_) => write_atomic(&self.head_path(), &format!("{}\n", id)),
        }
    }

    /// Read a full ref name like `refs/heads/main`; `None` if absent
    pub fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let path = self.ref_path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if path.is_dir() => {
                tracing::trace!(ref_name = name, error = %e, "ref path is a directory");
                return Ok(None);
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        ObjectId::from_hex(text.trim())
            .map(Some)
            .map_err(|_| Error::CorruptRef {
                name: name.to_string(),
                reason: "not a hex digest".to_string(),
            })
    }

    pub fn write_ref(&self, name: &str, id: &ObjectId) -> Result<()> {
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).at_path(parent)?;
        }
        write_atomic(&path, &format!("{}\n", id))?;
        tracing::debug!(ref_name = name, %id, "updated ref");
        Ok(())
    }

    pub fn branch(&self, name: &str) -> Result<Option<ObjectId>> {
        self.read_ref(&format!("{}/{}", HEADS, name))
    }

    pub fn tag(&self, name: &str) -> Result<Option<ObjectId>> {
        self.read_ref(&format!("{}/{}", TAGS, name))
    }

    /// Create a tag ref; fails if the name is taken
    pub fn create_tag(&self, name: &str, id: &ObjectId) -> Result<()> {
        validate_ref_name(name)?;
        if self.tag(name)?.is_some() {
            return Err(Error::TagExists(name.to_string()));
        }
        self.write_ref(&format!("{}/{}", TAGS, name), id)
    }

    /// Remove a tag ref, returning what it pointed at
    pub fn delete_tag(&self, name: &str) -> Result<ObjectId> {
        validate_ref_name(name)?;
        let id = self
            .tag(name)?
            .ok_or_else(|| Error::TagNotFound(name.to_string()))?;
        let path = self.ref_path(&format!("{}/{}", TAGS, name));
        fs::remove_file(&path).at_path(&path)?;
        tracing::debug!(tag = name, %id, "deleted tag");
        Ok(id)
    }

    /// All branches, sorted by name
    pub fn list_branches(&self) -> Result<Vec<(String, ObjectId)>> {
        self.list(HEADS)
    }

    /// All tags, sorted by name
    pub fn list_tags(&self) -> Result<Vec<(String, ObjectId)>> {
        self.list(TAGS)
    }

    fn list(&self, namespace: &str) -> Result<Vec<(String, ObjectId)>> {
        let base = self.ref_path(namespace);
        let mut out = Vec::new();
        let mut stack = vec![(base, String::new())];

        while let Some((dir, prefix)) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(dir, e)),
            };
            for entry in entries {
                let entry = entry.at_path(&dir)?;
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if file_name.ends_with(".lock") {
                    continue;
                }
                let short = if prefix.is_empty() {
                    file_name
                } else {
                    format!("{}/{}", prefix, file_name)
                };
                let path = entry.path();
                if path.is_dir() {
                    stack.push((path, short));
                } else if let Some(id) = self.read_ref(&format!("{}/{}", namespace, short))? {
                    out.push((short, id));
                }
            }
        }

        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// Check a branch or tag name against the ref naming rules
pub fn validate_ref_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('-')
        || name.starts_with('/')
        || name.ends_with('/')
        || name.ends_with('.')
        || name.ends_with(".lock")
        || name.contains("..")
        || name.contains("//")
        || name.contains("@{")
        || name == "@"
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c))
        || name.split('/').any(|seg| seg.starts_with('.'));

    if invalid {
        return Err(Error::InvalidRefName(name.to_string()));
    }
    Ok(())
}

/// Write through a sibling `.lock` file, which no valid ref name can collide
/// with, then rename into place
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".lock");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).at_path(&tmp)?;
    fs::rename(&tmp, path).at_path(path)
}
