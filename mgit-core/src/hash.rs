//! Content hashing
//!
//! Every object is hashed over its canonical encoding
//! `"<kind> <byte-length>\0<payload>"`, so payloads of different kinds
//! never share a digest.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Length of a digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Length of a digest in hex characters
pub const HEX_LEN: usize = DIGEST_LEN * 2;

/// Unique identifier for any stored object (SHA-256 digest)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; DIGEST_LEN]);

impl ObjectId {
    /// Create a new ObjectId from raw bytes
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Compute ObjectId from already-encoded data
    pub fn from_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex form for display
    pub fn short(&self) -> String {
        self.to_hex()[..10].to_string()
    }

    /// Parse from hexadecimal string
    pub fn from_hex(hex_str: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != DIGEST_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Check whether the hex form starts with `prefix` (case-insensitive)
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Object type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    /// Tag used in the canonical encoding header
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            "tag" => Ok(ObjectKind::Tag),
            other => Err(Error::malformed("unknown", format!("unknown object kind '{}'", other))),
        }
    }
}

fn header(kind: ObjectKind, len: usize) -> String {
    format!("{} {}\0", kind, len)
}

/// Canonical encoding of an object: header followed by payload
pub fn encode(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let header = header(kind, payload.len());
    let mut out = Vec::with_capacity(header.len() + payload.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(payload);
    out
}

/// Hash a payload of the given kind
pub fn hash(kind: ObjectKind, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(header(kind, payload.len()).as_bytes());
    hasher.update(payload);
    ObjectId(hasher.finalize().into())
}

/// Split a canonical encoding into its kind and payload.
///
/// Returns the payload offset so callers holding shared buffers can slice
/// without copying.
pub fn decode(raw: &[u8]) -> Result<(ObjectKind, usize)> {
    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::malformed("unknown", "missing header terminator"))?;
    let header = std::str::from_utf8(&raw[..nul])
        .map_err(|_| Error::malformed("unknown", "header is not valid UTF-8"))?;
    let (kind, len) = header
        .split_once(' ')
        .ok_or_else(|| Error::malformed("unknown", format!("bad header '{}'", header)))?;
    let kind: ObjectKind = kind.parse()?;
    let canonical = !len.is_empty()
        && len.bytes().all(|b| b.is_ascii_digit())
        && (len == "0" || !len.starts_with('0'));
    let len: usize = len
        .parse()
        .ok()
        .filter(|_| canonical)
        .ok_or_else(|| Error::malformed(kind, format!("bad length '{}'", len)))?;

    let offset = nul + 1;
    if raw.len() - offset != len {
        return Err(Error::malformed(
            kind,
            format!("header declares {} bytes, found {}", len, raw.len() - offset),
        ));
    }
    Ok((kind, offset))
}
