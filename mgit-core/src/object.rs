//! Core object model for MGit
//!
//! Implements the four content-addressed object kinds: Blob, Tree, Commit and
//! Tag. Each has a canonical byte encoding that round-trips exactly, so the
//! digest of an object is stable across runs and platforms.

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::hash::{self, DIGEST_LEN, ObjectId, ObjectKind};

/// Typed object with a canonical encoding
pub trait ObjectData: Sized {
    /// Kind tag written in the encoding header
    const KIND: ObjectKind;

    /// Canonical payload bytes (without header)
    fn serialize(&self) -> Vec<u8>;

    /// Parse a payload produced by [`ObjectData::serialize`]
    fn deserialize(payload: &[u8]) -> Result<Self>;

    /// Compute the object ID
    fn id(&self) -> ObjectId {
        hash::hash(Self::KIND, &self.serialize())
    }
}

/// File content object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Raw content data
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from data
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ObjectData for Blob {
    const KIND: ObjectKind = ObjectKind::Blob;

    fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn deserialize(payload: &[u8]) -> Result<Self> {
        Ok(Self::new(payload.to_vec()))
    }

    // Avoids the copy in serialize()
    fn id(&self) -> ObjectId {
        hash::hash(ObjectKind::Blob, &self.data)
    }
}

/// Mode of a tree or index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Subdirectory (40000)
    Directory,
}

impl FileMode {
    /// Octal form used in tree and index encodings
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Directory => "40000",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "100644" => Some(FileMode::Regular),
            "100755" => Some(FileMode::Executable),
            "40000" => Some(FileMode::Directory),
            _ => None,
        }
    }

    /// Mode for a file with the given Unix permission bits
    pub fn from_permissions(bits: u32) -> Self {
        if bits & 0o111 != 0 {
            FileMode::Executable
        } else {
            FileMode::Regular
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, FileMode::Directory)
    }

    /// Kind of object an entry with this mode points at
    pub fn object_kind(&self) -> ObjectKind {
        if self.is_tree() {
            ObjectKind::Tree
        } else {
            ObjectKind::Blob
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory tree entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry mode (file, executable or directory)
    pub mode: FileMode,
    /// Name of the entry (a single path segment)
    pub name: String,
    /// Object ID (points to Blob or Tree)
    pub id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry
    pub fn new(mode: FileMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

/// Directory object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    /// Sorted entries for deterministic hashing
    pub entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or update an entry
    pub fn insert(&mut self, entry: TreeEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Remove an entry
    pub fn remove(&mut self, name: &str) -> Option<TreeEntry> {
        self.entries.remove(name)
    }

    /// Get an entry
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    /// Iterate over entries in name order
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn valid_entry_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0', '\n'])
}

impl ObjectData for Tree {
    const KIND: ObjectKind = ObjectKind::Tree;

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // BTreeMap iteration is byte-wise name order
        for entry in self.entries.values() {
            out.extend_from_slice(entry.mode.as_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    fn deserialize(payload: &[u8]) -> Result<Self> {
        let mut tree = Tree::new();
        let mut rest = payload;
        let mut last_name: Option<String> = None;

        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Error::malformed(ObjectKind::Tree, "entry missing mode separator"))?;
            let mode_str = std::str::from_utf8(&rest[..space])
                .map_err(|_| Error::malformed(ObjectKind::Tree, "mode is not UTF-8"))?;
            let mode = FileMode::parse(mode_str).ok_or_else(|| {
                Error::malformed(ObjectKind::Tree, format!("unknown mode '{}'", mode_str))
            })?;
            rest = &rest[space + 1..];

            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::malformed(ObjectKind::Tree, "entry missing name terminator"))?;
            let name = std::str::from_utf8(&rest[..nul])
                .map_err(|_| Error::malformed(ObjectKind::Tree, "entry name is not UTF-8"))?
                .to_string();
            if !valid_entry_name(&name) {
                return Err(Error::malformed(
                    ObjectKind::Tree,
                    format!("invalid entry name '{}'", name),
                ));
            }
            rest = &rest[nul + 1..];

            if rest.len() < DIGEST_LEN {
                return Err(Error::malformed(ObjectKind::Tree, "truncated entry digest"));
            }
            let mut digest = [0u8; DIGEST_LEN];
            digest.copy_from_slice(&rest[..DIGEST_LEN]);
            rest = &rest[DIGEST_LEN..];

            // Canonical trees are strictly sorted; anything else would hash differently
            if let Some(prev) = &last_name {
                if prev.as_str() >= name.as_str() {
                    return Err(Error::malformed(
                        ObjectKind::Tree,
                        format!("entries out of order at '{}'", name),
                    ));
                }
            }
            last_name = Some(name.clone());
            tree.insert(TreeEntry::new(mode, name, ObjectId::new(digest)));
        }

        Ok(tree)
    }
}

/// Identity and timestamp of an author, committer or tagger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Unix seconds
    pub timestamp: i64,
    /// Timezone offset in minutes east of UTC
    pub tz_offset: i32,
}

impl Signature {
    /// Create a signature, stripping characters that would break the encoding
    pub fn new(name: &str, email: &str, timestamp: i64, tz_offset: i32) -> Self {
        let clean = |s: &str| -> String {
            s.chars()
                .filter(|c| !matches!(c, '<' | '>' | '\n' | '\0'))
                .collect::<String>()
                .trim()
                .to_string()
        };
        Self {
            name: clean(name),
            email: clean(email),
            timestamp,
            tz_offset,
        }
    }

    /// Signature stamped with the current local time
    pub fn now(name: &str, email: &str) -> Self {
        let now = Local::now();
        Self::new(
            name,
            email,
            now.timestamp(),
            now.offset().local_minus_utc() / 60,
        )
    }

    /// Timezone offset rendered as `+HHMM` / `-HHMM`
    pub fn tz_string(&self) -> String {
        let sign = if self.tz_offset < 0 { '-' } else { '+' };
        let minutes = self.tz_offset.abs();
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }

    /// Timestamp in the signature's own timezone
    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.tz_offset * 60)?;
        offset.timestamp_opt(self.timestamp, 0).single()
    }

    fn encode(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp,
            self.tz_string()
        )
    }

    fn parse(kind: ObjectKind, line: &str) -> Result<Self> {
        let bad = || Error::malformed(kind, format!("bad identity line '{}'", line));

        let mut parts = line.rsplitn(3, ' ');
        let tz = parts.next().ok_or_else(bad)?;
        let timestamp = parts.next().ok_or_else(bad)?;
        let ident = parts.next().ok_or_else(bad)?;

        let timestamp: i64 = timestamp.parse().map_err(|_| bad())?;
        let tz_offset = parse_tz(tz).ok_or_else(bad)?;

        let ident = ident.strip_suffix('>').ok_or_else(bad)?;
        let lt = ident.rfind('<').ok_or_else(bad)?;
        let email = &ident[lt + 1..];
        let name = &ident[..lt];
        let name = name.strip_suffix(' ').ok_or_else(bad)?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            timestamp,
            tz_offset,
        })
    }
}

fn parse_tz(tz: &str) -> Option<i32> {
    let (sign, digits) = match tz.as_bytes() {
        [b'+', rest @ ..] => (1, rest),
        [b'-', rest @ ..] => (-1, rest),
        _ => return None,
    };
    if digits.len() != 4 || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value = |pair: &[u8]| i32::from(pair[0] - b'0') * 10 + i32::from(pair[1] - b'0');
    let hours = value(&digits[..2]);
    let minutes = value(&digits[2..]);
    if minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Commit object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Root tree ID for this snapshot
    pub tree: ObjectId,
    /// Parent commit IDs (empty for initial commit)
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    /// Create a new commit
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parents,
            author,
            committer,
            message: message.into(),
        }
    }

    /// Check if this is an initial commit (no parents)
    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    /// First line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Split a text payload into header lines and the message body
fn split_message(kind: ObjectKind, payload: &[u8]) -> Result<(Vec<&str>, String)> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::malformed(kind, "payload is not valid UTF-8"))?;
    let (headers, message) = text
        .split_once("\n\n")
        .ok_or_else(|| Error::malformed(kind, "missing blank line before message"))?;
    Ok((headers.split('\n').collect(), message.to_string()))
}

fn expect_field<'a>(kind: ObjectKind, line: Option<&&'a str>, field: &str) -> Result<&'a str> {
    line.copied()
        .and_then(|l| l.strip_prefix(field))
        .and_then(|l| l.strip_prefix(' '))
        .ok_or_else(|| Error::malformed(kind, format!("expected '{}' field", field)))
}

fn parse_hex(kind: ObjectKind, hex: &str) -> Result<ObjectId> {
    ObjectId::from_hex(hex).map_err(|_| Error::malformed(kind, format!("bad digest '{}'", hex)))
}

impl ObjectData for Commit {
    const KIND: ObjectKind = ObjectKind::Commit;

    fn serialize(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree));
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author.encode()));
        out.push_str(&format!("committer {}\n", self.committer.encode()));
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }

    fn deserialize(payload: &[u8]) -> Result<Self> {
        const KIND: ObjectKind = ObjectKind::Commit;
        let (lines, message) = split_message(KIND, payload)?;
        let mut lines = lines.iter().peekable();

        let tree = parse_hex(KIND, expect_field(KIND, lines.next(), "tree")?)?;

        let mut parents = Vec::new();
        while let Some(hex) = lines.peek().and_then(|l| l.strip_prefix("parent ")) {
            parents.push(parse_hex(KIND, hex)?);
            lines.next();
        }

        let author = Signature::parse(KIND, expect_field(KIND, lines.next(), "author")?)?;
        let committer = Signature::parse(KIND, expect_field(KIND, lines.next(), "committer")?)?;

        if let Some(extra) = lines.next() {
            return Err(Error::malformed(KIND, format!("unexpected header '{}'", extra)));
        }

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message,
        })
    }
}

/// Annotated tag object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tagged object
    pub object: ObjectId,
    /// Kind of the tagged object
    pub target_kind: ObjectKind,
    /// Tag name (without refs/tags/)
    pub name: String,
    pub tagger: Signature,
    pub message: String,
}

impl Tag {
    /// Create an annotated tag pointing at a commit
    pub fn new(
        object: ObjectId,
        name: impl Into<String>,
        tagger: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            object,
            target_kind: ObjectKind::Commit,
            name: name.into(),
            tagger,
            message: message.into(),
        }
    }
}

impl ObjectData for Tag {
    const KIND: ObjectKind = ObjectKind::Tag;

    fn serialize(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("object {}\n", self.object));
        out.push_str(&format!("type {}\n", self.target_kind));
        out.push_str(&format!("tag {}\n", self.name));
        out.push_str(&format!("tagger {}\n", self.tagger.encode()));
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }

    fn deserialize(payload: &[u8]) -> Result<Self> {
        const KIND: ObjectKind = ObjectKind::Tag;
        let (lines, message) = split_message(KIND, payload)?;
        let mut lines = lines.iter();

        let object = parse_hex(KIND, expect_field(KIND, lines.next(), "object")?)?;
        let target_kind: ObjectKind = expect_field(KIND, lines.next(), "type")?.parse()?;
        let name = expect_field(KIND, lines.next(), "tag")?.to_string();
        let tagger = Signature::parse(KIND, expect_field(KIND, lines.next(), "tagger")?)?;

        if let Some(extra) = lines.next() {
            return Err(Error::malformed(KIND, format!("unexpected header '{}'", extra)));
        }

        Ok(Self {
            object,
            target_kind,
            name,
            tagger,
            message,
        })
    }
}

/// Generic object that can be any type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    /// Parse a payload of a known kind
    pub fn parse(kind: ObjectKind, payload: &[u8]) -> Result<Self> {
        Ok(match kind {
            ObjectKind::Blob => Object::Blob(Blob::deserialize(payload)?),
            ObjectKind::Tree => Object::Tree(Tree::deserialize(payload)?),
            ObjectKind::Commit => Object::Commit(Commit::deserialize(payload)?),
            ObjectKind::Tag => Object::Tag(Tag::deserialize(payload)?),
        })
    }

    /// Get the object kind
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Commit(_) => ObjectKind::Commit,
            Object::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Serialize to the canonical payload
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Object::Blob(blob) => blob.serialize(),
            Object::Tree(tree) => tree.serialize(),
            Object::Commit(commit) => commit.serialize(),
            Object::Tag(tag) => tag.serialize(),
        }
    }

    /// Get the object ID
    pub fn id(&self) -> ObjectId {
        match self {
            Object::Blob(blob) => blob.id(),
            Object::Tree(tree) => tree.id(),
            Object::Commit(commit) => commit.id(),
            Object::Tag(tag) => tag.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(name: &str) -> Signature {
        Signature::new(name, "dev@example.com", 1_700_000_000, 120)
    }

    #[test]
    fn test_blob_id_uses_canonical_encoding() {
        let blob = Blob::new(b"hello world".to_vec());
        assert_eq!(blob.id(), hash::hash(ObjectKind::Blob, b"hello world"));
        assert_eq!(blob.id().to_hex().len(), 64);
    }

    #[test]
    fn test_tree_insert_remove() {
        let mut tree = Tree::new();
        let entry = TreeEntry::new(FileMode::Regular, "test.txt", ObjectId::new([0u8; 32]));
        tree.insert(entry);
        assert!(tree.get("test.txt").is_some());
        tree.remove("test.txt");
        assert!(tree.get("test.txt").is_none());
    }

    #[test]
    fn test_tree_encoding_layout() {
        let id = ObjectId::new([7u8; 32]);
        let mut tree = Tree::new();
        tree.insert(TreeEntry::new(FileMode::Regular, "a.txt", id));
        let bytes = tree.serialize();

        let mut expected = b"100644 a.txt\0".to_vec();
        expected.extend_from_slice(&[7u8; 32]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_tree_hash_independent_of_insertion_order() {
        let a = TreeEntry::new(FileMode::Regular, "a", ObjectId::new([1u8; 32]));
        let b = TreeEntry::new(FileMode::Directory, "b", ObjectId::new([2u8; 32]));
        let c = TreeEntry::new(FileMode::Executable, "c", ObjectId::new([3u8; 32]));

        let mut t1 = Tree::new();
        t1.insert(a.clone());
        t1.insert(b.clone());
        t1.insert(c.clone());

        let mut t2 = Tree::new();
        t2.insert(c);
        t2.insert(a);
        t2.insert(b);

        assert_eq!(t1.serialize(), t2.serialize());
        assert_eq!(t1.id(), t2.id());
    }

    #[test]
    fn test_tree_roundtrip() {
        let mut tree = Tree::new();
        tree.insert(TreeEntry::new(FileMode::Regular, "README.md", ObjectId::new([9u8; 32])));
        tree.insert(TreeEntry::new(FileMode::Directory, "src", ObjectId::new([8u8; 32])));
        tree.insert(TreeEntry::new(FileMode::Executable, "run.sh", ObjectId::new([0u8; 32])));
        let decoded = Tree::deserialize(&tree.serialize()).unwrap();
        assert_eq!(tree, decoded);
    }

    #[test]
    fn test_tree_rejects_unsorted_payload() {
        let mut payload = b"100644 b\0".to_vec();
        payload.extend_from_slice(&[1u8; 32]);
        payload.extend_from_slice(b"100644 a\0");
        payload.extend_from_slice(&[2u8; 32]);
        assert!(matches!(
            Tree::deserialize(&payload),
            Err(Error::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_tree_rejects_truncated_digest() {
        let mut payload = b"100644 a\0".to_vec();
        payload.extend_from_slice(&[1u8; 10]);
        assert!(Tree::deserialize(&payload).is_err());
    }

    #[test]
    fn test_commit_roundtrip() {
        let commit = Commit::new(
            ObjectId::new([1u8; 32]),
            vec![ObjectId::new([2u8; 32])],
            sig("Test Author"),
            sig("Test Committer"),
            "Test message\n\nWith a body\n",
        );
        let bytes = commit.serialize();
        let commit2 = Commit::deserialize(&bytes).unwrap();
        assert_eq!(commit, commit2);
        assert_eq!(commit.id(), commit2.id());
    }

    #[test]
    fn test_commit_encoding_layout() {
        let commit = Commit::new(
            ObjectId::new([1u8; 32]),
            vec![],
            Signature::new("A U Thor", "a@b.c", 100, -330),
            Signature::new("A U Thor", "a@b.c", 100, -330),
            "c1",
        );
        let text = String::from_utf8(commit.serialize()).unwrap();
        let expected = format!(
            "tree {}\nauthor A U Thor <a@b.c> 100 -0530\ncommitter A U Thor <a@b.c> 100 -0530\n\nc1",
            ObjectId::new([1u8; 32])
        );
        assert_eq!(text, expected);
        assert!(commit.is_initial());
    }

    #[test]
    fn test_commit_with_empty_message() {
        let commit = Commit::new(ObjectId::new([1u8; 32]), vec![], sig("a"), sig("a"), "");
        assert_eq!(Commit::deserialize(&commit.serialize()).unwrap(), commit);
    }

    #[test]
    fn test_commit_rejects_missing_author() {
        let payload = format!("tree {}\n\nmsg", ObjectId::new([1u8; 32]));
        assert!(Commit::deserialize(payload.as_bytes()).is_err());
    }

    #[test]
    fn test_commit_rejects_non_ascii_timezone() {
        let tree = ObjectId::new([1u8; 32]);
        let payload = format!(
            "tree {}\nauthor a <b> 0 \u{e9}+12\ncommitter a <b> 0 +0000\n\nmsg",
            tree
        );
        assert!(matches!(
            Commit::deserialize(payload.as_bytes()),
            Err(Error::MalformedObject { .. })
        ));
        assert_eq!(parse_tz("+0530"), Some(330));
        assert_eq!(parse_tz("-0100"), Some(-60));
        assert_eq!(parse_tz("+1\u{e9}"), None);
        assert_eq!(parse_tz("+0075"), None);
    }

    #[test]
    fn test_tag_roundtrip() {
        let tag = Tag::new(ObjectId::new([5u8; 32]), "v1.0", sig("Tagger"), "Release 1.0\n");
        let decoded = Tag::deserialize(&tag.serialize()).unwrap();
        assert_eq!(tag, decoded);
        assert_eq!(decoded.target_kind, ObjectKind::Commit);
    }

    #[test]
    fn test_signature_sanitizes_and_formats() {
        let s = Signature::new(" Eve <evil> ", "e@x\n", 0, 0);
        assert_eq!(s.name, "Eve evil");
        assert_eq!(s.email, "e@x");
        assert_eq!(s.tz_string(), "+0000");
        assert_eq!(Signature::new("a", "b", 0, -60).tz_string(), "-0100");
    }

    #[test]
    fn test_object_dispatch() {
        let blob = Blob::new(b"x".to_vec());
        let obj = Object::parse(ObjectKind::Blob, &blob.serialize()).unwrap();
        assert_eq!(obj.kind(), ObjectKind::Blob);
        assert_eq!(obj.id(), blob.id());
    }
}
