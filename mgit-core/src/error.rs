//! Error types for the MGit engine
//!
//! Every failure belongs to one of three classes. User errors are expected
//! outcomes of a command (no repository, nothing to commit, bad path).
//! Integrity errors mean the on-disk repository is corrupt or inconsistent.
//! System errors wrap the underlying I/O or parse failure.

use std::path::{Path, PathBuf};

use crate::hash::{ObjectId, ObjectKind};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    User,
    Integrity,
    System,
}

/// Errors that can occur during repository operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not an mgit repository (or any of the parent directories): {}", .0.display())]
    NotARepository(PathBuf),

    #[error("repository already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("pathspec '{}' did not match any files", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("path is outside the repository: {}", .0.display())]
    PathOutsideRepository(PathBuf),

    #[error("path cannot be tracked (contains a newline or NUL): {}", .0.display())]
    UnrepresentablePath(PathBuf),

    #[error("nothing to commit (no staged changes)")]
    NothingToCommit,

    #[error("this operation must be run in a work tree (repository is bare)")]
    BareRepository,

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("current branch '{0}' does not have any commits yet")]
    NoCommits(String),

    #[error("invalid reference name: '{0}'")]
    InvalidRefName(String),

    #[error("tag '{0}' already exists")]
    TagExists(String),

    #[error("tag '{0}' not found")]
    TagNotFound(String),

    #[error("invalid config key: '{0}'")]
    InvalidConfigKey(String),

    #[error("config key not found: {0}")]
    ConfigKeyNotFound(String),

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("integrity error: object stored as {expected} hashes to {actual}")]
    Integrity { expected: ObjectId, actual: ObjectId },

    #[error("malformed {kind} object: {reason}")]
    MalformedObject { kind: String, reason: String },

    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("history cycle detected at commit {0}")]
    HistoryCycle(ObjectId),

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("corrupt ref '{name}': {reason}")]
    CorruptRef { name: String, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(kind: impl ToString, reason: impl Into<String>) -> Self {
        Error::MalformedObject {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify the error for reporting
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NotARepository(_)
            | Error::AlreadyInitialized(_)
            | Error::PathNotFound(_)
            | Error::NotAFile(_)
            | Error::PathOutsideRepository(_)
            | Error::UnrepresentablePath(_)
            | Error::NothingToCommit
            | Error::BareRepository
            | Error::UnknownRevision(_)
            | Error::NoCommits(_)
            | Error::InvalidRefName(_)
            | Error::TagExists(_)
            | Error::TagNotFound(_)
            | Error::InvalidConfigKey(_)
            | Error::ConfigKeyNotFound(_) => ErrorClass::User,

            Error::ObjectNotFound(_)
            | Error::Integrity { .. }
            | Error::MalformedObject { .. }
            | Error::UnexpectedKind { .. }
            | Error::HistoryCycle(_)
            | Error::CorruptIndex(_)
            | Error::CorruptRef { .. } => ErrorClass::Integrity,

            Error::Io { .. } | Error::Config { .. } => ErrorClass::System,
        }
    }

    /// Check if the error was caused by the user rather than the repository
    pub fn is_user_error(&self) -> bool {
        self.class() == ErrorClass::User
    }

    /// Process exit code: 1 for user errors, 2 for integrity and system errors
    pub fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::User => 1,
            ErrorClass::Integrity | ErrorClass::System => 2,
        }
    }
}

/// Attach the offending path to an I/O error
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
