//! Inode management for the FUSE filesystem.
//!
//! Maps kernel inode numbers to nodes in the gist tree. Directory
//! enumeration rebuilds child nodes wholesale, but the table keeps the first
//! node materialized for a path: an open content file's cache entry must
//! survive re-enumeration and reopen, so a later rebuild never replaces a
//! node the kernel may still hold a reference to.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use gistfs_core::Node;

/// The root inode number (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// An entry in the inode table.
pub struct InodeEntry {
    /// Path within the mounted tree, rooted at `/`.
    pub path: PathBuf,
    /// The tree node this inode resolves to.
    pub node: Arc<dyn Node>,
    /// Lookup count for proper `forget()` handling.
    nlookup: AtomicU64,
}

impl InodeEntry {
    fn new(path: PathBuf, node: Arc<dyn Node>) -> Self {
        Self {
            path,
            node,
            nlookup: AtomicU64::new(1),
        }
    }

    fn inc_nlookup(&self) {
        self.nlookup.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements by `count`, returning the remaining count, or `None` if it
    /// would go negative.
    fn dec_nlookup(&self, count: u64) -> Option<u64> {
        let old = self.nlookup.fetch_sub(count, Ordering::SeqCst);
        if old < count {
            self.nlookup.fetch_add(count, Ordering::SeqCst);
            None
        } else {
            Some(old - count)
        }
    }

    #[cfg(test)]
    pub fn nlookup(&self) -> u64 {
        self.nlookup.load(Ordering::SeqCst)
    }
}

/// Thread-safe bidirectional mapping between inodes and tree paths.
pub struct InodeTable {
    path_to_inode: DashMap<PathBuf, u64>,
    inode_to_entry: DashMap<u64, InodeEntry>,
    next_inode: AtomicU64,
}

impl InodeTable {
    /// Creates a table with `root` pre-allocated at inode 1.
    pub fn new(root: Arc<dyn Node>) -> Self {
        let table = Self {
            path_to_inode: DashMap::new(),
            inode_to_entry: DashMap::new(),
            // Inode 1 is reserved for root
            next_inode: AtomicU64::new(2),
        };

        let root_path = PathBuf::from("/");
        table.path_to_inode.insert(root_path.clone(), ROOT_INODE);
        table
            .inode_to_entry
            .insert(ROOT_INODE, InodeEntry::new(root_path, root));
        table
    }

    /// Resolves `path` to an inode, allocating one if needed.
    ///
    /// When the path is already present, the existing node wins and `node` is
    /// dropped — callers get back whichever instance the kernel already
    /// knows, with its content cache intact.
    pub fn get_or_insert(&self, path: PathBuf, node: Arc<dyn Node>) -> (u64, Arc<dyn Node>) {
        if let Some(inode) = self.path_to_inode.get(&path) {
            let ino = *inode;
            drop(inode);
            if let Some(entry) = self.inode_to_entry.get(&ino) {
                entry.inc_nlookup();
                return (ino, Arc::clone(&entry.node));
            }
        }

        // Entry API avoids a TOCTOU race between concurrent allocations.
        let ino = *self.path_to_inode.entry(path.clone()).or_insert_with(|| {
            let ino = self.next_inode.fetch_add(1, Ordering::SeqCst);
            self.inode_to_entry
                .insert(ino, InodeEntry::new(path.clone(), Arc::clone(&node)));
            ino
        });

        let node = self
            .inode_to_entry
            .get(&ino)
            .map_or(node, |entry| Arc::clone(&entry.node));
        (ino, node)
    }

    /// Looks up an entry by inode number.
    pub fn get(&self, inode: u64) -> Option<dashmap::mapref::one::Ref<'_, u64, InodeEntry>> {
        self.inode_to_entry.get(&inode)
    }

    /// Looks up an inode by tree path.
    pub fn get_inode(&self, path: &Path) -> Option<u64> {
        self.path_to_inode.get(path).map(|r| *r)
    }

    /// Decrements the lookup count; evicts the inode when it reaches zero.
    /// Returns `true` if the inode was evicted.
    pub fn forget(&self, inode: u64, nlookup: u64) -> bool {
        if inode == ROOT_INODE {
            return false;
        }

        if let Some(entry) = self.inode_to_entry.get(&inode)
            && let Some(remaining) = entry.dec_nlookup(nlookup)
            && remaining == 0
        {
            drop(entry);
            return self.evict(inode);
        }
        false
    }

    fn evict(&self, inode: u64) -> bool {
        if let Some((_, entry)) = self.inode_to_entry.remove(&inode) {
            self.path_to_inode.remove(&entry.path);
            true
        } else {
            false
        }
    }

    /// Number of live inodes, root included.
    pub fn len(&self) -> usize {
        self.inode_to_entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inode_to_entry.len() <= 1
    }
}
