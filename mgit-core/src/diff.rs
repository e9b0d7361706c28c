//! Structural and textual diffs
//!
//! `diff_trees` walks two stored trees in lock-step by entry name and reports
//! file-level changes. Unchanged subtrees are skipped by digest without
//! being read, so the cost is proportional to what changed.

use serde::Serialize;
use similar::{Algorithm, TextDiff};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::hash::ObjectId;
use crate::object::{FileMode, Tree, TreeEntry};
use crate::storage::ObjectStore;

/// Type of change for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// The change seen from the other side
    pub fn inverse(&self) -> Self {
        match self {
            ChangeKind::Added => ChangeKind::Deleted,
            ChangeKind::Deleted => ChangeKind::Added,
            ChangeKind::Modified => ChangeKind::Modified,
        }
    }

    /// Single-letter status code
    pub fn code(&self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Modified => 'M',
            ChangeKind::Deleted => 'D',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One side of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Side {
    #[serde(serialize_with = "serialize_mode")]
    pub mode: FileMode,
    pub id: ObjectId,
}

fn serialize_mode<S: serde::Serializer>(mode: &FileMode, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(mode.as_str())
}

/// A file-level difference between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub path: String,
    pub kind: ChangeKind,
    pub old: Option<Side>,
    pub new: Option<Side>,
}

impl Change {
    pub fn added(path: impl Into<String>, new: Side) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Added,
            old: None,
            new: Some(new),
        }
    }

    pub fn deleted(path: impl Into<String>, old: Side) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Deleted,
            old: Some(old),
            new: None,
        }
    }

    pub fn modified(path: impl Into<String>, old: Side, new: Side) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
            old: Some(old),
            new: Some(new),
        }
    }
}

/// Diff two trees; `None` stands for "no snapshot" (e.g. before the first
/// commit) and behaves like the empty tree.
///
/// Output order is depth-first by entry name. A path whose type changed
/// (file replaced by directory or back) yields the deletion side before the
/// addition side.
pub fn diff_trees<S: ObjectStore>(
    store: &S,
    old: Option<&ObjectId>,
    new: Option<&ObjectId>,
) -> Result<Vec<Change>> {
    let mut out = Vec::new();
    if old == new {
        return Ok(out);
    }
    let old_tree = load(store, old)?;
    let new_tree = load(store, new)?;
    diff_level(store, "", &old_tree, &new_tree, &mut out)?;
    Ok(out)
}

fn load<S: ObjectStore>(store: &S, id: Option<&ObjectId>) -> Result<Tree> {
    match id {
        Some(id) => store.read(id),
        None => Ok(Tree::new()),
    }
}

fn diff_level<S: ObjectStore>(
    store: &S,
    dir: &str,
    old: &Tree,
    new: &Tree,
    out: &mut Vec<Change>,
) -> Result<()> {
    let names: BTreeSet<&String> = old.entries.keys().chain(new.entries.keys()).collect();

    for name in names {
        let path = if dir.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", dir, name)
        };

        match (old.get(name), new.get(name)) {
            (Some(a), None) => emit_all(store, &path, a, ChangeKind::Deleted, out)?,
            (None, Some(b)) => emit_all(store, &path, b, ChangeKind::Added, out)?,
            (Some(a), Some(b)) => {
                if a.id == b.id && a.mode == b.mode {
                    continue;
                }
                match (a.is_tree(), b.is_tree()) {
                    (false, false) => out.push(Change::modified(
                        path,
                        Side { mode: a.mode, id: a.id },
                        Side { mode: b.mode, id: b.id },
                    )),
                    (true, true) => {
                        let a_tree: Tree = store.read(&a.id)?;
                        let b_tree: Tree = store.read(&b.id)?;
                        diff_level(store, &path, &a_tree, &b_tree, out)?;
                    }
                    // Type change is not a modification
                    _ => {
                        emit_all(store, &path, a, ChangeKind::Deleted, out)?;
                        emit_all(store, &path, b, ChangeKind::Added, out)?;
                    }
                }
            }
            (None, None) => {}
        }
    }
    Ok(())
}

/// Emit an Added/Deleted change for a file, or for every file under a tree
fn emit_all<S: ObjectStore>(
    store: &S,
    path: &str,
    entry: &TreeEntry,
    kind: ChangeKind,
    out: &mut Vec<Change>,
) -> Result<()> {
    let side = |mode, id| Side { mode, id };
    if !entry.is_tree() {
        out.push(match kind {
            ChangeKind::Deleted => Change::deleted(path, side(entry.mode, entry.id)),
            _ => Change::added(path, side(entry.mode, entry.id)),
        });
        return Ok(());
    }

    let tree: Tree = store.read(&entry.id)?;
    for child in tree.iter() {
        emit_all(store, &format!("{}/{}", path, child.name), child, kind, out)?;
    }
    Ok(())
}

/// Rendered content difference for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Unified diff text (empty when contents are equal)
    Text(String),
    /// At least one side is not valid UTF-8
    Binary,
}

/// Unified line diff with three lines of context
pub fn unified_diff(old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> Patch {
    let (Ok(old), Ok(new)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return Patch::Binary;
    };

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);
    let text = diff
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string();
    Patch::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ObjectKind;
    use crate::index::IndexEntry;
    use crate::storage::MemoryObjectStore;
    use crate::tree_builder::build_tree;

    fn snapshot(store: &MemoryObjectStore, files: &[(&str, &str)]) -> ObjectId {
        let entries: Vec<IndexEntry> = files
            .iter()
            .map(|(path, content)| {
                let id = store.put(ObjectKind::Blob, content.as_bytes()).unwrap();
                IndexEntry::new(*path, FileMode::Regular, id, 0, 0)
            })
            .collect();
        build_tree(store, &entries).unwrap()
    }

    fn summary(changes: &[Change]) -> Vec<(String, ChangeKind)> {
        changes.iter().map(|c| (c.path.clone(), c.kind)).collect()
    }

    #[test]
    fn test_identical_trees_have_no_changes() {
        let store = MemoryObjectStore::new();
        let a = snapshot(&store, &[("a.txt", "A"), ("d/b.txt", "B")]);
        assert!(diff_trees(&store, Some(&a), Some(&a)).unwrap().is_empty());
    }

    #[test]
    fn test_added_modified_deleted() {
        let store = MemoryObjectStore::new();
        let a = snapshot(&store, &[("a.txt", "A"), ("b.txt", "B"), ("d/keep.txt", "k")]);
        let b = snapshot(&store, &[("a.txt", "A2"), ("c.txt", "C"), ("d/keep.txt", "k")]);
        let changes = diff_trees(&store, Some(&a), Some(&b)).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("a.txt".to_string(), ChangeKind::Modified),
                ("b.txt".to_string(), ChangeKind::Deleted),
                ("c.txt".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn test_nested_directory_changes_are_expanded() {
        let store = MemoryObjectStore::new();
        let a = snapshot(&store, &[("top.txt", "t")]);
        let b = snapshot(&store, &[("top.txt", "t"), ("new/x.txt", "x"), ("new/y/z.txt", "z")]);
        let changes = diff_trees(&store, Some(&a), Some(&b)).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("new/x.txt".to_string(), ChangeKind::Added),
                ("new/y/z.txt".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn test_type_change_is_delete_then_add() {
        let store = MemoryObjectStore::new();
        let a = snapshot(&store, &[("x", "file")]);
        let b = snapshot(&store, &[("x/inner.txt", "dir now")]);
        let changes = diff_trees(&store, Some(&a), Some(&b)).unwrap();
        assert_eq!(
            summary(&changes),
            vec![
                ("x".to_string(), ChangeKind::Deleted),
                ("x/inner.txt".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn test_diff_against_nothing() {
        let store = MemoryObjectStore::new();
        let a = snapshot(&store, &[("a.txt", "A")]);
        let changes = diff_trees(&store, None, Some(&a)).unwrap();
        assert_eq!(summary(&changes), vec![("a.txt".to_string(), ChangeKind::Added)]);
        assert!(diff_trees(&store, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_diff_is_symmetric() {
        let store = MemoryObjectStore::new();
        let a = snapshot(&store, &[("a.txt", "1"), ("x", "f"), ("d/e.txt", "e")]);
        let b = snapshot(&store, &[("a.txt", "2"), ("x/y", "d"), ("n.txt", "n")]);
        let forward = diff_trees(&store, Some(&a), Some(&b)).unwrap();
        let backward = diff_trees(&store, Some(&b), Some(&a)).unwrap();

        let mut f: Vec<_> = forward.iter().map(|c| (c.path.clone(), c.kind.inverse())).collect();
        let mut r: Vec<_> = backward.iter().map(|c| (c.path.clone(), c.kind)).collect();
        f.sort_by(|x, y| x.0.cmp(&y.0));
        r.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(f, r);
    }

    #[test]
    fn test_mode_change_is_modification() {
        let store = MemoryObjectStore::new();
        let id = store.put(ObjectKind::Blob, b"#!/bin/sh").unwrap();
        let plain = vec![IndexEntry::new("run.sh", FileMode::Regular, id, 0, 0)];
        let exec = vec![IndexEntry::new("run.sh", FileMode::Executable, id, 0, 0)];
        let a = build_tree(&store, &plain).unwrap();
        let b = build_tree(&store, &exec).unwrap();
        let changes = diff_trees(&store, Some(&a), Some(&b)).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_unified_diff() {
        let Patch::Text(text) = unified_diff(b"one\ntwo\n", b"one\nthree\n", "a/f", "b/f") else {
            panic!("expected text patch");
        };
        assert!(text.contains("--- a/f"));
        assert!(text.contains("+++ b/f"));
        assert!(text.contains("-two"));
        assert!(text.contains("+three"));
        assert_eq!(unified_diff(&[0xff, 0xfe], b"x", "a", "b"), Patch::Binary);
    }
}
