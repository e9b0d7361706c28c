//! Storage abstraction layer for MGit
//!
//! Objects are immutable and keyed by the digest of their canonical encoding.
//! Writing the same content twice is a no-op, which is the only deduplication
//! mechanism the engine needs.

use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{self, HEX_LEN, ObjectId, ObjectKind};
use crate::object::{Object, ObjectData};

/// Generic object store interface
pub trait ObjectStore {
    /// Store a payload, returning its digest. Idempotent.
    fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId>;

    /// Get object kind and payload by ID
    fn get(&self, id: &ObjectId) -> Result<(ObjectKind, Bytes)>;

    /// Check if object exists
    fn exists(&self, id: &ObjectId) -> Result<bool>;

    /// List all stored object IDs
    fn list(&self) -> Result<Vec<ObjectId>>;

    /// Object IDs whose hex form starts with `prefix`
    fn find_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|id| id.starts_with(prefix))
            .collect())
    }

    /// Store a typed object
    fn write<T: ObjectData>(&self, object: &T) -> Result<ObjectId>
    where
        Self: Sized,
    {
        self.put(T::KIND, &object.serialize())
    }

    /// Load a typed object, failing if the stored kind differs
    fn read<T: ObjectData>(&self, id: &ObjectId) -> Result<T>
    where
        Self: Sized,
    {
        let (kind, payload) = self.get(id)?;
        if kind != T::KIND {
            return Err(Error::UnexpectedKind {
                id: *id,
                expected: T::KIND,
                actual: kind,
            });
        }
        T::deserialize(&payload)
    }

    /// Load any object
    fn read_object(&self, id: &ObjectId) -> Result<Object> {
        let (kind, payload) = self.get(id)?;
        Object::parse(kind, &payload)
    }
}

/// Filesystem store of loose objects
///
/// Layout: `{root}/{hex[0..2]}/{hex[2..]}`, each file holding the full
/// canonical encoding (header and payload).
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    root: PathBuf,
}

impl LooseObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).at_path(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}

impl ObjectStore for LooseObjectStore {
    fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let id = hash::hash(kind, payload);
        let path = self.object_path(&id);
        if path.exists() {
            tracing::trace!(%id, %kind, "object already stored");
            return Ok(id); // content-addressed = idempotent
        }

        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).at_path(dir)?;

        // Write atomically via temp file
        let tmp_path = dir.join(format!(
            "{}.tmp-{}",
            &id.to_hex()[2..],
            std::process::id()
        ));
        fs::write(&tmp_path, hash::encode(kind, payload)).at_path(&tmp_path)?;
        fs::rename(&tmp_path, &path).at_path(&path)?;

        tracing::debug!(%id, %kind, size = payload.len(), "stored object");
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> Result<(ObjectKind, Bytes)> {
        let path = self.object_path(id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::ObjectNotFound(*id)),
            Err(e) => return Err(Error::io(path, e)),
        };

        let actual = ObjectId::from_data(&raw);
        if actual != *id {
            tracing::warn!(expected = %id, %actual, "object failed digest verification");
            return Err(Error::Integrity {
                expected: *id,
                actual,
            });
        }

        let (kind, offset) = hash::decode(&raw)?;
        Ok((kind, Bytes::from(raw).slice(offset..)))
    }

    fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn list(&self) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::new();
        for fanout in fs::read_dir(&self.root).at_path(&self.root)? {
            let fanout = fanout.at_path(&self.root)?;
            let prefix = fanout.file_name().to_string_lossy().into_owned();
            if prefix.len() != 2 || !fanout.path().is_dir() {
                continue;
            }
            ids.extend(self.list_fanout(&prefix)?);
        }
        ids.sort();
        Ok(ids)
    }

    fn find_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        if prefix.len() < 2 {
            return Ok(self
                .list()?
                .into_iter()
                .filter(|id| id.starts_with(prefix))
                .collect());
        }
        let prefix = prefix.to_ascii_lowercase();
        Ok(self
            .list_fanout(&prefix[..2])?
            .into_iter()
            .filter(|id| id.starts_with(&prefix))
            .collect())
    }
}

impl LooseObjectStore {
    fn list_fanout(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let dir = self.root.join(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.at_path(&dir)?;
            let rest = entry.file_name().to_string_lossy().into_owned();
            // Leftover temp files and foreign names are skipped
            if rest.len() != HEX_LEN - 2 {
                continue;
            }
            if let Ok(id) = ObjectId::from_hex(&format!("{}{}", prefix, rest)) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-memory object store
///
/// Holds objects for a single operation, e.g. trees synthesized while
/// computing status that should never reach disk.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RefCell<HashMap<ObjectId, (ObjectKind, Bytes)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let id = hash::hash(kind, payload);
        self.objects
            .borrow_mut()
            .entry(id)
            .or_insert_with(|| (kind, Bytes::copy_from_slice(payload)));
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> Result<(ObjectKind, Bytes)> {
        self.objects
            .borrow()
            .get(id)
            .cloned()
            .ok_or(Error::ObjectNotFound(*id))
    }

    fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.objects.borrow().contains_key(id))
    }

    fn list(&self) -> Result<Vec<ObjectId>> {
        let mut ids: Vec<_> = self.objects.borrow().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Read-through overlay: reads fall back to `base`, writes stay in memory
pub struct OverlayStore<'a, S: ObjectStore> {
    base: &'a S,
    scratch: MemoryObjectStore,
}

impl<'a, S: ObjectStore> OverlayStore<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            scratch: MemoryObjectStore::new(),
        }
    }

    /// Number of objects held only in memory
    pub fn pending(&self) -> usize {
        self.scratch.len()
    }
}

impl<S: ObjectStore> ObjectStore for OverlayStore<'_, S> {
    fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let id = hash::hash(kind, payload);
        if self.base.exists(&id)? {
            return Ok(id);
        }
        self.scratch.put(kind, payload)
    }

    fn get(&self, id: &ObjectId) -> Result<(ObjectKind, Bytes)> {
        match self.scratch.get(id) {
            Err(Error::ObjectNotFound(_)) => self.base.get(id),
            other => other,
        }
    }

    fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.scratch.exists(id)? || self.base.exists(id)?)
    }

    fn list(&self) -> Result<Vec<ObjectId>> {
        let mut ids = self.base.list()?;
        ids.extend(self.scratch.list()?);
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
