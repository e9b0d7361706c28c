//! Working tree status
//!
//! Three comparisons make up a status report:
//!
//! - staged: HEAD tree vs the tree the index would produce
//! - unstaged: index vs working tree, using cached size/mtime before re-hashing
//! - untracked: working-tree files the index does not know about

use serde::Serialize;

use crate::diff::{Change, Side, diff_trees};
use crate::error::Result;
use crate::hash::{self, ObjectId, ObjectKind};
use crate::index::{Index, IndexEntry};
use crate::storage::{ObjectStore, OverlayStore};
use crate::tree_builder::build_tree;
use crate::worktree::WorkTree;

/// Result of comparing HEAD, the index and the working tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub staged: Vec<Change>,
    pub unstaged: Vec<Change>,
    pub untracked: Vec<String>,
}

impl Status {
    /// No staged, unstaged or untracked changes
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }
}

/// Compute status against `head_tree` (`None` before the first commit).
///
/// The index tree is built in an overlay so computing status never writes
/// objects to `store`.
pub fn compute_status<S: ObjectStore>(
    store: &S,
    worktree: &WorkTree,
    index: &Index,
    head_tree: Option<&ObjectId>,
) -> Result<Status> {
    let overlay = OverlayStore::new(store);
    let index_tree = build_tree(&overlay, index.entries())?;
    let staged = diff_trees(&overlay, head_tree, Some(&index_tree))?;

    let mut unstaged = Vec::new();
    for entry in index.entries() {
        if let Some(change) = worktree_change(worktree, entry, index.written_at())? {
            unstaged.push(change);
        }
    }

    let untracked = worktree
        .files_under("")?
        .into_iter()
        .filter(|path| !index.contains(path))
        .collect();

    tracing::debug!(
        staged = staged.len(),
        unstaged = unstaged.len(),
        scratch_objects = overlay.pending(),
        "computed status"
    );
    Ok(Status {
        staged,
        unstaged,
        untracked,
    })
}

/// Compare one index entry with the working tree
pub fn worktree_change(worktree: &WorkTree, entry: &IndexEntry, index_mtime: Option<i64>) -> Result<Option<Change>> {
    let old = Side {
        mode: entry.mode,
        id: entry.id,
    };

    let stat = match worktree.stat(&entry.path)? {
        Some(stat) if stat.is_file() => stat,
        _ => return Ok(Some(Change::deleted(entry.path.clone(), old))),
    };

    if entry.stat_matches(&stat, index_mtime) {
        return Ok(None);
    }

    let (data, stat) = worktree.read(&entry.path)?;
    let id = hash::hash(ObjectKind::Blob, &data);
    if id == entry.id && stat.mode == entry.mode {
        return Ok(None);
    }
    Ok(Some(Change::modified(
        entry.path.clone(),
        old,
        Side { mode: stat.mode, id },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeKind;
    use crate::storage::LooseObjectStore;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        wt: WorkTree,
        store: LooseObjectStore,
        index: Index,
    }

    fn setup() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let store = LooseObjectStore::open(&root.join(".mgit/objects")).unwrap();
        let index = Index::new(root.join(".mgit/index"));
        Fixture {
            _dir: dir,
            wt: WorkTree::new(root, ".mgit"),
            store,
            index,
        }
    }

    impl Fixture {
        fn write(&self, path: &str, content: &str) {
            let abs = self.wt.abs_path(path);
            fs::create_dir_all(abs.parent().unwrap()).unwrap();
            fs::write(abs, content).unwrap();
        }
    }

    fn paths(changes: &[Change]) -> Vec<(&str, ChangeKind)> {
        changes.iter().map(|c| (c.path.as_str(), c.kind)).collect()
    }

    #[test]
    fn test_fresh_repository() {
        let mut f = setup();
        f.write("new.txt", "n");
        let status = compute_status(&f.store, &f.wt, &f.index, None).unwrap();
        assert!(status.staged.is_empty());
        assert!(status.unstaged.is_empty());
        assert_eq!(status.untracked, vec!["new.txt"]);

        f.index.stage(&f.store, &f.wt, "new.txt").unwrap();
        f.index.save().unwrap();
        let status = compute_status(&f.store, &f.wt, &f.index, None).unwrap();
        assert_eq!(paths(&status.staged), vec![("new.txt", ChangeKind::Added)]);
        assert!(status.untracked.is_empty());
    }

    #[test]
    fn test_unstaged_modification_and_deletion() {
        let mut f = setup();
        f.write("a.txt", "A");
        f.write("b.txt", "B");
        f.index.stage(&f.store, &f.wt, "a.txt").unwrap();
        f.index.stage(&f.store, &f.wt, "b.txt").unwrap();
        f.index.save().unwrap();

        f.write("a.txt", "changed");
        fs::remove_file(f.wt.abs_path("b.txt")).unwrap();

        let status = compute_status(&f.store, &f.wt, &f.index, None).unwrap();
        assert_eq!(
            paths(&status.unstaged),
            vec![("a.txt", ChangeKind::Modified), ("b.txt", ChangeKind::Deleted)]
        );
    }

    #[test]
    fn test_same_size_edit_is_detected() {
        let mut f = setup();
        f.write("a.txt", "AAAA");
        f.index.stage(&f.store, &f.wt, "a.txt").unwrap();
        f.index.save().unwrap();
        // Same size, possibly same mtime tick as the index write
        f.write("a.txt", "BBBB");

        let status = compute_status(&f.store, &f.wt, &f.index, None).unwrap();
        assert_eq!(paths(&status.unstaged), vec![("a.txt", ChangeKind::Modified)]);
    }

    #[test]
    fn test_status_does_not_write_objects() {
        let mut f = setup();
        f.write("d/a.txt", "A");
        f.index.stage(&f.store, &f.wt, "d/a.txt").unwrap();
        let before = f.store.list().unwrap();
        compute_status(&f.store, &f.wt, &f.index, None).unwrap();
        assert_eq!(f.store.list().unwrap(), before);
    }

    #[test]
    fn test_staged_against_head() {
        let mut f = setup();
        f.write("a.txt", "A");
        f.index.stage(&f.store, &f.wt, "a.txt").unwrap();
        let head_tree = build_tree(&f.store, f.index.entries()).unwrap();

        f.write("a.txt", "B");
        f.index.stage(&f.store, &f.wt, "a.txt").unwrap();
        f.index.save().unwrap();

        let status = compute_status(&f.store, &f.wt, &f.index, Some(&head_tree)).unwrap();
        assert_eq!(paths(&status.staged), vec![("a.txt", ChangeKind::Modified)]);
        assert!(status.unstaged.is_empty());
        assert!(!status.is_clean());
    }
}
