//! The virtual-filesystem node tree.
//!
//! Every mounted entry is one of a closed set of node kinds dispatched
//! through the [`Node`] trait: the root, one directory per gist, the
//! synthetic `.gist` metadata directory, the content files backed by the
//! remote store, and the read-only metadata files. A kind that lacks a
//! capability does not disappear from the type — the default methods return
//! [`GistFsError::PermissionDenied`] instead.
//!
//! Ownership is strictly tree-shaped: directories rebuild their children
//! wholesale on every enumeration, and content files carry their
//! synchronization address (gist id, blob name) by value.

mod dir;
mod file;
mod listing;
mod meta;

pub use dir::{GistDir, META_DIR_NAME, MetaDir, Root};
pub use file::ContentFile;
pub use listing::{DEFAULT_REFRESH, ListingCache};
pub use meta::{MetaBoolFile, MetaStringFile};

use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{GistFsError, GistFsResult};

/// Creation and modification timestamps reported for a node.
#[derive(Debug, Clone, Copy)]
pub struct NodeTimes {
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl NodeTimes {
    pub fn new(created: SystemTime, modified: SystemTime) -> Self {
        Self { created, modified }
    }

    pub fn now() -> Self {
        let now = SystemTime::now();
        Self::new(now, now)
    }
}

/// One entry in the mounted tree.
///
/// The base capability set is {name, kind, attributes}; directories add
/// [`list_children`](Node::list_children), files add the open/read/write/
/// truncate/flush group. Defaults reject the operation rather than omit it.
pub trait Node: Send + Sync {
    /// Display name within the parent directory.
    fn name(&self) -> &str;

    fn is_dir(&self) -> bool;

    /// Whether writes are permitted. Only real content files are writable;
    /// metadata files and the directory hierarchy are read-only.
    fn writable(&self) -> bool {
        false
    }

    /// Size in bytes as reported in attributes.
    fn size(&self) -> u64;

    fn times(&self) -> NodeTimes;

    /// Enumerate children, rebuilding them wholesale.
    fn list_children(&self) -> GistFsResult<Vec<Arc<dyn Node>>> {
        Err(GistFsError::PermissionDenied("not a directory"))
    }

    /// Prepare the node for I/O. For content files this populates the
    /// content cache on first open; reopening never discards buffered edits.
    fn open(&self, write: bool) -> GistFsResult<()> {
        let _ = write;
        Err(GistFsError::PermissionDenied("not a regular file"))
    }

    /// Return the entire buffered content. Partial reads are sliced at the
    /// protocol layer; the cache always holds the full object after open.
    fn read(&self) -> GistFsResult<Vec<u8>> {
        Err(GistFsError::PermissionDenied("not a regular file"))
    }

    /// Patch `data` into the buffer at `offset`, extending it when the write
    /// reaches past the current end.
    fn write_at(&self, offset: u64, data: &[u8]) -> GistFsResult<usize> {
        let _ = (offset, data);
        Err(GistFsError::PermissionDenied("node is read-only"))
    }

    /// Discard buffered content. The requested size is ignored; see the
    /// content-file implementation for the observed contract.
    fn truncate(&self, size: u64) -> GistFsResult<()> {
        let _ = size;
        Err(GistFsError::PermissionDenied("node is read-only"))
    }

    /// Push buffered modifications upstream. A no-op for clean or read-only
    /// nodes, so the protocol layer may call it unconditionally on close.
    fn flush(&self) -> GistFsResult<()> {
        Ok(())
    }
}

/// Generic lookup shared by every directory kind: re-enumerate (so the
/// current child set is materialized) and locate by name.
pub fn lookup_child(dir: &dyn Node, name: &str) -> GistFsResult<Arc<dyn Node>> {
    dir.list_children()?
        .into_iter()
        .find(|child| child.name() == name)
        .ok_or_else(|| GistFsError::NotFound(name.to_string()))
}
