//! Commit graph traversal

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::object::Commit;
use crate::storage::ObjectStore;

/// Lazy first-parent walk from a starting commit back to the root commit.
///
/// Yields `(id, commit)` pairs newest first. A commit seen twice means the
/// graph has a cycle; that is reported once as `HistoryCycle` and the walk
/// ends. Any other error also ends the walk after being yielded.
pub struct History<'a, S: ObjectStore> {
    store: &'a S,
    next: Option<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl<'a, S: ObjectStore> History<'a, S> {
    pub fn new(store: &'a S, start: ObjectId) -> Self {
        Self {
            store,
            next: Some(start),
            seen: HashSet::new(),
        }
    }

    /// Walk that yields nothing
    pub fn empty(store: &'a S) -> Self {
        Self {
            store,
            next: None,
            seen: HashSet::new(),
        }
    }
}

impl<S: ObjectStore> Iterator for History<'_, S> {
    type Item = Result<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return Some(Err(Error::HistoryCycle(id)));
        }

        match self.store.read::<Commit>(&id) {
            Ok(commit) => {
                self.next = commit.parents.first().copied();
                Some(Ok((id, commit)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
