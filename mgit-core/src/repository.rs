//! Repository context
//!
//! A [`Repository`] ties together the object store, refs, config, index and
//! working tree of one repository and implements the user-facing commands on
//! top of them. Every mutating operation writes objects before it moves a
//! ref, so an interrupted command leaves at worst unreferenced objects.
//!
//! Layout:
//! ```text
//! {root}/.mgit/            (metadata lives at {root}/ for bare repositories)
//!   HEAD                   ref: refs/heads/<branch>
//!   config                 JSON key/value map
//!   index                  staging index (non-bare only)
//!   objects/{xx}/{yyyy..}  content-addressed objects
//!   refs/heads/<branch>    branch tips
//!   refs/tags/<tag>        tags
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, CORE_BARE, ConfigFile, ConfigStore};
use crate::diff::{Change, Patch, diff_trees, unified_diff};
use crate::error::{Error, IoResultExt, Result};
use crate::hash::{HEX_LEN, ObjectId, ObjectKind};
use crate::history::History;
use crate::index::Index;
use crate::object::{Blob, Commit, Object, Signature, Tag};
use crate::refs::{Head, RefStore, validate_ref_name};
use crate::status::{Status, compute_status, worktree_change};
use crate::storage::{LooseObjectStore, ObjectStore, OverlayStore};
use crate::tree_builder::{build_tree, flatten_tree, lookup_path};
use crate::worktree::WorkTree;

/// Name of the metadata directory of a non-bare repository
pub const META_DIR: &str = ".mgit";

/// Shortest hex prefix accepted as a revision
pub const MIN_PREFIX_LEN: usize = 4;

/// Options for [`Repository::init`]
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// No working tree; metadata lives at the root
    pub bare: bool,
    /// Re-initialize an existing repository instead of failing
    pub force: bool,
}

/// Options for [`Repository::commit_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    /// Record a commit even when the tree matches the parent's
    pub allow_empty: bool,
}

/// Status plus the HEAD it was computed against
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Current branch; `None` when HEAD is detached
    pub branch: Option<String>,
    /// Commit HEAD points at; `None` before the first commit
    pub head: Option<ObjectId>,
    #[serde(flatten)]
    pub status: Status,
}

/// Outcome of [`Repository::fsck`]
#[derive(Debug, Default)]
pub struct FsckReport {
    /// Number of objects examined
    pub checked: usize,
    /// Objects that failed verification, with the reason
    pub corrupt: Vec<(ObjectId, Error)>,
    /// Refs whose target is missing or unreadable
    pub broken_refs: Vec<(String, Error)>,
}

impl FsckReport {
    pub fn is_ok(&self) -> bool {
        self.corrupt.is_empty() && self.broken_refs.is_empty()
    }
}

/// Which side of a change to read content from when rendering patches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// Both sides are stored blobs
    Store,
    /// The new side is the working-tree file
    WorkTree,
}

/// An open repository
pub struct Repository {
    meta: PathBuf,
    worktree: Option<WorkTree>,
    store: LooseObjectStore,
    refs: RefStore,
    config: ConfigStore,
    /// Directory relative paths are resolved against
    cwd: PathBuf,
}

impl Repository {
    /// Create a repository at `path` (created if missing)
    pub fn init(path: &Path, options: InitOptions) -> Result<Self> {
        fs::create_dir_all(path).at_path(path)?;
        let root = path.canonicalize().at_path(path)?;
        let meta = if options.bare {
            root.clone()
        } else {
            root.join(META_DIR)
        };

        if meta.join("HEAD").is_file() && !options.force {
            return Err(Error::AlreadyInitialized(root));
        }

        let store = LooseObjectStore::open(&meta.join("objects"))?;
        let refs = RefStore::new(&meta);
        refs.create_dirs()?;
        refs.set_head_branch(&config::default_branch()?)?;

        let mut config = ConfigStore::load(&meta.join("config"))?;
        let mut values = BTreeMap::new();
        values.insert(CORE_BARE.to_string(), options.bare.to_string());
        config.reset(values)?;

        let worktree = if options.bare {
            None
        } else {
            Index::new(meta.join("index")).save()?;
            Some(WorkTree::new(&root, META_DIR))
        };

        tracing::info!(root = %root.display(), bare = options.bare, "initialized repository");
        Ok(Self {
            meta,
            worktree,
            store,
            refs,
            config,
            cwd: root,
        })
    }

    /// Find the repository containing `start` by walking up its ancestors
    pub fn discover(start: &Path) -> Result<Self> {
        let start = start.canonicalize().at_path(start)?;
        for dir in start.ancestors() {
            if dir.join(META_DIR).join("HEAD").is_file() {
                tracing::debug!(root = %dir.display(), "discovered repository");
                return Self::open_at(dir.join(META_DIR), Some(dir.to_path_buf()), start.clone());
            }
            if is_bare_repository(dir)? {
                tracing::debug!(root = %dir.display(), "discovered bare repository");
                return Self::open_at(dir.to_path_buf(), None, start.clone());
            }
        }
        Err(Error::NotARepository(start))
    }

    /// Open the repository rooted exactly at `root`
    pub fn open(root: &Path) -> Result<Self> {
        let root = root.canonicalize().map_err(|_| Error::NotARepository(root.to_path_buf()))?;
        if root.join(META_DIR).join("HEAD").is_file() {
            return Self::open_at(root.join(META_DIR), Some(root.clone()), root);
        }
        if is_bare_repository(&root)? {
            return Self::open_at(root.clone(), None, root);
        }
        Err(Error::NotARepository(root))
    }

    fn open_at(meta: PathBuf, work_root: Option<PathBuf>, cwd: PathBuf) -> Result<Self> {
        let store = LooseObjectStore::open(&meta.join("objects"))?;
        let refs = RefStore::new(&meta);
        let config = ConfigStore::load(&meta.join("config"))?;
        Ok(Self {
            worktree: work_root.map(|root| WorkTree::new(root, META_DIR)),
            meta,
            store,
            refs,
            config,
            cwd,
        })
    }

    /// Metadata directory
    pub fn meta_dir(&self) -> &Path {
        &self.meta
    }

    /// Working tree root; `None` for bare repositories
    pub fn work_dir(&self) -> Option<&Path> {
        self.worktree.as_ref().map(WorkTree::root)
    }

    pub fn is_bare(&self) -> bool {
        self.worktree.is_none()
    }

    pub fn store(&self) -> &LooseObjectStore {
        &self.store
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    fn worktree(&self) -> Result<&WorkTree> {
        self.worktree.as_ref().ok_or(Error::BareRepository)
    }

    /// Load the staging index
    pub fn index(&self) -> Result<Index> {
        self.worktree()?;
        Index::load(&self.meta.join("index"))
    }

    /// Branch name for messages about HEAD
    fn head_name(&self) -> Result<String> {
        Ok(match self.refs.head()? {
            Head::Branch(name) => name,
            Head::Detached(_) => "HEAD".to_string(),
        })
    }

    /// Commit HEAD points at, if any
    pub fn head(&self) -> Result<Option<ObjectId>> {
        self.refs.head_commit()
    }

    fn head_tree(&self) -> Result<Option<ObjectId>> {
        match self.head()? {
            Some(id) => Ok(Some(self.store.read::<Commit>(&id)?.tree)),
            None => Ok(None),
        }
    }

    /// Stage files. Directories are expanded to the files below them; a
    /// tracked path that no longer exists is removed from the index.
    /// Returns the paths whose index entry changed or was removed.
    pub fn add<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<String>> {
        let worktree = self.worktree()?;
        let mut index = self.index()?;
        let mut touched = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let rel = worktree.relativize(path, &self.cwd)?;

            match worktree.stat(&rel)? {
                Some(stat) if stat.is_dir => {
                    let files = worktree.files_under(&rel)?;
                    for tracked in index.paths_under(&rel) {
                        if files.binary_search(&tracked).is_err() {
                            index.unstage(&tracked);
                            touched.push(tracked);
                        }
                    }
                    for file in files {
                        index.stage(&self.store, worktree, &file)?;
                        touched.push(file);
                    }
                }
                Some(_) => {
                    index.stage(&self.store, worktree, &rel)?;
                    touched.push(rel);
                }
                None => {
                    let tracked = index.paths_under(&rel);
                    if tracked.is_empty() {
                        return Err(Error::PathNotFound(path.to_path_buf()));
                    }
                    for p in tracked {
                        index.unstage(&p);
                        touched.push(p);
                    }
                }
            }
        }

        index.save()?;
        touched.sort();
        touched.dedup();
        Ok(touched)
    }

    /// Stage every change in the working tree, deletions included
    pub fn add_all(&self) -> Result<Vec<String>> {
        let root = self.worktree()?.root().to_path_buf();
        self.add(&[root])
    }

    /// Remove paths (or everything below a directory) from the index
    pub fn unstage<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<String>> {
        let worktree = self.worktree()?;
        let mut index = self.index()?;
        let mut removed = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let rel = worktree.relativize(path, &self.cwd)?;
            let tracked = index.paths_under(&rel);
            if tracked.is_empty() {
                return Err(Error::PathNotFound(path.to_path_buf()));
            }
            for p in tracked {
                index.unstage(&p);
                removed.push(p);
            }
        }

        index.save()?;
        Ok(removed)
    }

    /// Commit the index with the configured identity
    pub fn commit(&self, message: &str, options: CommitOptions) -> Result<ObjectId> {
        let author = self.config.identity()?;
        self.commit_with(message, author, options)
    }

    /// Commit the index as `author` and advance the current branch
    pub fn commit_as(&self, message: &str, author: Signature) -> Result<ObjectId> {
        self.commit_with(message, author, CommitOptions::default())
    }

    pub fn commit_with(&self, message: &str, author: Signature, options: CommitOptions) -> Result<ObjectId> {
        let index = self.index()?;
        let tree = build_tree(&self.store, index.entries())?;

        let parent = self.head()?;
        if !options.allow_empty {
            match parent {
                Some(parent) => {
                    if self.store.read::<Commit>(&parent)?.tree == tree {
                        return Err(Error::NothingToCommit);
                    }
                }
                None if index.is_empty() => return Err(Error::NothingToCommit),
                None => {}
            }
        }

        let commit = Commit::new(tree, parent.into_iter().collect(), author.clone(), author, message);
        let id = self.store.write(&commit)?;
        self.refs.update_head(&id)?;

        tracing::info!(commit = %id, branch = %self.head_name()?, %tree, "created commit");
        Ok(id)
    }

    /// Staged, unstaged and untracked changes
    pub fn status(&self) -> Result<StatusReport> {
        let worktree = self.worktree()?;
        let index = self.index()?;
        let head = self.head()?;
        let head_tree = self.head_tree()?;
        let status = compute_status(&self.store, worktree, &index, head_tree.as_ref())?;
        Ok(StatusReport {
            branch: self.refs.current_branch()?,
            head,
            status,
        })
    }

    /// First-parent history from `start` (default HEAD)
    pub fn log(&self, start: Option<&str>) -> Result<History<'_, LooseObjectStore>> {
        let start = match start {
            Some(rev) => self.resolve(rev)?,
            None => self
                .head()?
                .ok_or_else(|| Error::NoCommits(self.head_name().unwrap_or_else(|_| "HEAD".into())))?,
        };
        Ok(History::new(&self.store, start))
    }

    /// Resolve a revision to the commit it names
    ///
    /// Accepts `HEAD`, a branch, a tag (annotated tags are followed to their
    /// commit), a full digest or a unique digest prefix.
    pub fn resolve(&self, rev: &str) -> Result<ObjectId> {
        let id = self.resolve_object(rev)?;
        self.peel_to_commit(id)
    }

    /// Resolve a revision without peeling tags. `<rev>:<path>` names the
    /// blob or tree at `path` in that commit's snapshot.
    pub fn resolve_object(&self, rev: &str) -> Result<ObjectId> {
        if let Some((base, path)) = rev.split_once(':') {
            let tree = self.commit_tree(&self.resolve(base)?)?;
            let path = path.trim_matches('/');
            if path.is_empty() {
                return Ok(tree);
            }
            return lookup_path(&self.store, &tree, path)?
                .map(|entry| entry.id)
                .ok_or_else(|| Error::UnknownRevision(rev.to_string()));
        }
        if rev == "HEAD" {
            return self.head()?.ok_or_else(|| {
                Error::NoCommits(self.head_name().unwrap_or_else(|_| "HEAD".into()))
            });
        }
        if validate_ref_name(rev).is_ok() {
            let found = if rev.starts_with("refs/") {
                self.refs.read_ref(rev)?
            } else {
                match self.refs.branch(rev)? {
                    Some(id) => Some(id),
                    None => self.refs.tag(rev)?,
                }
            };
            if let Some(id) = found {
                return Ok(id);
            }
        }

        let is_hex = rev.len() >= MIN_PREFIX_LEN
            && rev.len() <= HEX_LEN
            && rev.chars().all(|c| c.is_ascii_hexdigit());
        if is_hex {
            match self.store.find_prefix(rev)?.as_slice() {
                [id] => return Ok(*id),
                [] => {}
                many => tracing::debug!(rev, candidates = many.len(), "ambiguous revision"),
            }
        }
        Err(Error::UnknownRevision(rev.to_string()))
    }

    fn peel_to_commit(&self, mut id: ObjectId) -> Result<ObjectId> {
        let mut depth = 0;
        loop {
            match self.store.read_object(&id)? {
                Object::Commit(_) => return Ok(id),
                Object::Tag(tag) if depth < 16 => {
                    id = tag.object;
                    depth += 1;
                }
                other => {
                    return Err(Error::UnexpectedKind {
                        id,
                        expected: ObjectKind::Commit,
                        actual: other.kind(),
                    });
                }
            }
        }
    }

    /// Tree of a commit
    pub fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId> {
        Ok(self.store.read::<Commit>(commit)?.tree)
    }

    /// Changes between two revisions
    pub fn diff_revisions(&self, old: &str, new: &str) -> Result<Vec<Change>> {
        let old_tree = self.commit_tree(&self.resolve(old)?)?;
        let new_tree = self.commit_tree(&self.resolve(new)?)?;
        diff_trees(&self.store, Some(&old_tree), Some(&new_tree))
    }

    /// Changes staged for the next commit (HEAD vs index)
    pub fn diff_cached(&self) -> Result<Vec<Change>> {
        let index = self.index()?;
        let overlay = OverlayStore::new(&self.store);
        let index_tree = build_tree(&overlay, index.entries())?;
        let head_tree = self.head_tree()?;
        diff_trees(&overlay, head_tree.as_ref(), Some(&index_tree))
    }

    /// Changes not yet staged (index vs working tree)
    pub fn diff_worktree(&self) -> Result<Vec<Change>> {
        let worktree = self.worktree()?;
        let index = self.index()?;
        let mut changes = Vec::new();
        for entry in index.entries() {
            if let Some(change) = worktree_change(worktree, entry, index.written_at())? {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Render the content difference for one change
    pub fn patch(&self, change: &Change, source: ContentSource) -> Result<Patch> {
        let old = match &change.old {
            Some(side) => self.store.read::<Blob>(&side.id)?.data,
            None => Vec::new(),
        };
        let new = match (&change.new, source) {
            (None, _) => Vec::new(),
            (Some(_), ContentSource::WorkTree) => self.worktree()?.read(&change.path)?.0,
            (Some(side), ContentSource::Store) => self.store.read::<Blob>(&side.id)?.data,
        };

        let old_label = match change.old {
            Some(_) => format!("a/{}", change.path),
            None => "/dev/null".to_string(),
        };
        let new_label = match change.new {
            Some(_) => format!("b/{}", change.path),
            None => "/dev/null".to_string(),
        };
        Ok(unified_diff(&old, &new, &old_label, &new_label))
    }

    /// Create a tag on `target` (default HEAD). With a message the tag is
    /// annotated: a tag object is stored and the ref points at it.
    /// Returns the id the tag ref points at.
    pub fn tag(&self, name: &str, target: Option<&str>, message: Option<&str>) -> Result<ObjectId> {
        validate_ref_name(name)?;
        if self.refs.tag(name)?.is_some() {
            return Err(Error::TagExists(name.to_string()));
        }
        let commit = self.resolve(target.unwrap_or("HEAD"))?;

        let ref_target = match message {
            Some(message) => {
                let tagger = self.config.identity()?;
                self.store.write(&Tag::new(commit, name, tagger, message))?
            }
            None => commit,
        };
        self.refs.create_tag(name, &ref_target)?;
        tracing::info!(tag = name, target = %ref_target, annotated = message.is_some(), "created tag");
        Ok(ref_target)
    }

    /// Delete a tag ref. An annotated tag's object stays in the store.
    pub fn delete_tag(&self, name: &str) -> Result<ObjectId> {
        let id = self.refs.delete_tag(name)?;
        tracing::info!(tag = name, target = %id, "deleted tag");
        Ok(id)
    }

    /// All tags, sorted by name
    pub fn tags(&self) -> Result<Vec<(String, ObjectId)>> {
        self.refs.list_tags()
    }

    /// Load the object a revision or digest names
    pub fn read_object(&self, rev: &str) -> Result<(ObjectId, Object)> {
        let id = self.resolve_object(rev)?;
        Ok((id, self.store.read_object(&id)?))
    }

    /// Verify every stored object and ref. Each ref must also reach a commit
    /// whose snapshot has all its blobs present.
    pub fn fsck(&self) -> Result<FsckReport> {
        let mut report = FsckReport::default();
        for id in self.store.list()? {
            report.checked += 1;
            if let Err(e) = self.store.read_object(&id) {
                tracing::warn!(%id, error = %e, "object failed verification");
                report.corrupt.push((id, e));
            }
        }

        let refs = self
            .refs
            .list_branches()?
            .into_iter()
            .map(|(name, id)| (format!("refs/heads/{}", name), id))
            .chain(
                self.refs
                    .list_tags()?
                    .into_iter()
                    .map(|(name, id)| (format!("refs/tags/{}", name), id)),
            );
        for (name, id) in refs {
            if let Err(e) = self.check_snapshot(&id, &name, &mut report) {
                report.broken_refs.push((name, e));
            }
        }
        Ok(report)
    }

    fn check_snapshot(&self, id: &ObjectId, name: &str, report: &mut FsckReport) -> Result<()> {
        self.store.read_object(id)?;
        let tree = self.commit_tree(&self.peel_to_commit(*id)?)?;
        for (path, (_, blob)) in flatten_tree(&self.store, &tree)? {
            if !self.store.exists(&blob)? {
                report
                    .broken_refs
                    .push((format!("{}:{}", name, path), Error::ObjectNotFound(blob)));
            }
        }
        Ok(())
    }
}

fn is_bare_repository(dir: &Path) -> Result<bool> {
    if !dir.join("HEAD").is_file() || !dir.join("objects").is_dir() {
        return Ok(false);
    }
    let config = ConfigFile::load(&dir.join("config"))?;
    Ok(config.values.get(CORE_BARE).map(String::as_str) == Some("true"))
}
