//! Converting between the flat index and the nested tree graph
//!
//! `build_tree` turns sorted index entries into Tree objects bottom-up and
//! returns the root digest. `flatten_tree` walks a stored tree back into a
//! flat path map.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::index::IndexEntry;
use crate::object::{FileMode, Tree, TreeEntry};
use crate::storage::ObjectStore;

/// Mode and target of a file in a snapshot
pub type FileRef = (FileMode, ObjectId);

/// Build and persist the tree for a set of index entries, returning the root
/// tree digest. An empty entry set produces the empty tree.
pub fn build_tree<'a, S, I>(store: &S, entries: I) -> Result<ObjectId>
where
    S: ObjectStore,
    I: IntoIterator<Item = &'a IndexEntry>,
{
    let items: Vec<(Vec<&str>, FileRef)> = entries
        .into_iter()
        .map(|e| (e.path.split('/').collect(), (e.mode, e.id)))
        .collect();
    let root = build_level(store, &items, 0, "")?;
    tracing::debug!(%root, files = items.len(), "built tree");
    Ok(root)
}

/// Build the tree for `items`, all of which share the first `depth` path
/// segments. Items are partitioned by their next segment; single-segment
/// remainders become blob entries and the rest recurse into subtrees.
fn build_level<S: ObjectStore>(
    store: &S,
    items: &[(Vec<&str>, FileRef)],
    depth: usize,
    dir: &str,
) -> Result<ObjectId> {
    let mut groups: BTreeMap<&str, Vec<&(Vec<&str>, FileRef)>> = BTreeMap::new();
    for item in items {
        groups.entry(item.0[depth]).or_default().push(item);
    }

    let mut tree = Tree::new();
    for (name, group) in groups {
        let leaf = group.iter().find(|(segments, _)| segments.len() == depth + 1);
        let entry = match leaf {
            Some((_, (mode, id))) => {
                if group.len() > 1 {
                    return Err(Error::CorruptIndex(format!(
                        "'{}' is staged both as a file and as a directory",
                        join(dir, name)
                    )));
                }
                TreeEntry::new(*mode, name, *id)
            }
            None => {
                let children: Vec<(Vec<&str>, FileRef)> = group.into_iter().cloned().collect();
                let id = build_level(store, &children, depth + 1, &join(dir, name))?;
                TreeEntry::new(FileMode::Directory, name, id)
            }
        };
        tree.insert(entry);
    }

    store.write(&tree)
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Every file reachable from `tree_id`, keyed by root-relative path
pub fn flatten_tree<S: ObjectStore>(store: &S, tree_id: &ObjectId) -> Result<BTreeMap<String, FileRef>> {
    let mut out = BTreeMap::new();
    // Explicit stack instead of recursion: depth is bounded only by the data
    let mut stack = vec![(String::new(), *tree_id)];
    while let Some((dir, id)) = stack.pop() {
        let tree: Tree = store.read(&id)?;
        for entry in tree.iter() {
            let path = join(&dir, &entry.name);
            if entry.is_tree() {
                stack.push((path, entry.id));
            } else {
                out.insert(path, (entry.mode, entry.id));
            }
        }
    }
    Ok(out)
}

/// Look up the entry at a root-relative path
pub fn lookup_path<S: ObjectStore>(store: &S, tree_id: &ObjectId, path: &str) -> Result<Option<TreeEntry>> {
    let mut current = *tree_id;
    let mut segments = path.split('/').peekable();
    while let Some(segment) = segments.next() {
        let tree: Tree = store.read(&current)?;
        let Some(entry) = tree.get(segment) else {
            return Ok(None);
        };
        if segments.peek().is_none() {
            return Ok(Some(entry.clone()));
        }
        if !entry.is_tree() {
            return Ok(None);
        }
        current = entry.id;
    }
    Ok(None)
}
