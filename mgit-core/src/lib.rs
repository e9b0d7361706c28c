//! MGit Core Library
//!
//! Content-addressable version control engine including:
//! - Object model (Blob, Tree, Commit, Tag) with SHA-256 addressing
//! - Loose object storage with read-time integrity checks
//! - Staging index and working tree access
//! - Tree building, structural diff and status
//! - First-parent history walking
//! - Refs (HEAD, branches, tags) and layered configuration

pub mod config;
pub mod diff;
pub mod error;
pub mod hash;
pub mod history;
pub mod index;
pub mod object;
pub mod refs;
pub mod repository;
pub mod status;
pub mod storage;
pub mod tree_builder;
pub mod worktree;

pub use config::ConfigStore;
pub use diff::{Change, ChangeKind, Patch, Side};
pub use error::{Error, ErrorClass, Result};
pub use hash::{ObjectId, ObjectKind};
pub use history::History;
pub use index::{Index, IndexEntry};
pub use object::{Blob, Commit, FileMode, Object, ObjectData, Signature, Tag, Tree, TreeEntry};
pub use refs::{Head, RefStore};
pub use repository::{CommitOptions, ContentSource, FsckReport, InitOptions, Repository, StatusReport, META_DIR};
pub use status::Status;
pub use storage::{LooseObjectStore, MemoryObjectStore, ObjectStore, OverlayStore};
