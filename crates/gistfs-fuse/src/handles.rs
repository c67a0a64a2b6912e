//! Open-file handle tracking.
//!
//! The write buffer itself lives in the core node's content cache; a handle
//! only pins the node and remembers the access mode so read-only descriptors
//! cannot write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use gistfs_core::Node;

/// One open file descriptor.
pub struct OpenHandle {
    pub node: Arc<dyn Node>,
    /// Opened for writing.
    pub write: bool,
}

/// Thread-safe table mapping 64-bit handle ids to open files.
pub struct HandleTable {
    handles: DashMap<u64, OpenHandle>,
    next_id: AtomicU64,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a handle and return its id.
    pub fn insert(&self, handle: OpenHandle) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(id, handle);
        id
    }

    pub fn get(&self, id: u64) -> Option<dashmap::mapref::one::Ref<'_, u64, OpenHandle>> {
        self.handles.get(&id)
    }

    /// Remove a handle by id and return it.
    pub fn remove(&self, id: u64) -> Option<OpenHandle> {
        self.handles.remove(&id).map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
