//! FUSE dispatch onto the gist node tree.
//!
//! Each callback resolves its inode or handle, delegates to the core node,
//! and maps the closed error taxonomy onto errno values. The node tree owns
//! all caching; this layer only slices full-content reads to the requested
//! window and keeps the inode/handle bookkeeping.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use gistfs_core::{Node, RemoteStore, Root, lookup_child};
use libc::c_int;
use tracing::{debug, error, info, trace};

use crate::error::ToErrno;
use crate::handles::{HandleTable, OpenHandle};
use crate::inode::{InodeTable, ROOT_INODE};

/// Block size for attribute reporting.
const BLOCK_SIZE: u32 = 4096;

/// Writable content files (rw-r--r--).
const FILE_PERM: u16 = 0o644;

/// Metadata files (r--r--r--).
const READONLY_FILE_PERM: u16 = 0o444;

/// Directories; the hierarchy cannot be modified from within the mount.
const DIR_PERM: u16 = 0o555;

/// TTL handed to the kernel for attributes and entries.
const ATTR_TTL: Duration = Duration::from_secs(1);

/// FUSE filesystem over a remote gist store.
pub struct GistFs {
    inodes: InodeTable,
    handles: HandleTable,
    uid: u32,
    gid: u32,
}

impl GistFs {
    /// Builds the tree root over `store` with the given listing refresh
    /// period. The remote is not contacted until the first enumeration.
    pub fn new(store: Arc<dyn RemoteStore>, refresh: Duration) -> Self {
        let root: Arc<dyn Node> = Arc::new(Root::new(store, refresh));
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };

        Self {
            inodes: InodeTable::new(root),
            handles: HandleTable::new(),
            uid,
            gid,
        }
    }

    fn make_attr(&self, ino: u64, node: &dyn Node) -> FileAttr {
        let times = node.times();
        let (kind, perm, nlink, size) = if node.is_dir() {
            (FileType::Directory, DIR_PERM, 2, 0)
        } else if node.writable() {
            (FileType::RegularFile, FILE_PERM, 1, node.size())
        } else {
            (FileType::RegularFile, READONLY_FILE_PERM, 1, node.size())
        };

        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: times.modified,
            mtime: times.modified,
            ctime: times.modified,
            crtime: times.created,
            kind,
            perm,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}

impl Filesystem for GistFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!("gist filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("gist filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name_str) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        trace!(parent = parent, name = name_str, "lookup");

        let Some(parent_entry) = self.inodes.get(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_node = Arc::clone(&parent_entry.node);
        let parent_path = parent_entry.path.clone();
        drop(parent_entry);

        match lookup_child(parent_node.as_ref(), name_str) {
            Ok(child) => {
                let child_path = parent_path.join(name_str);
                let (ino, node) = self.inodes.get_or_insert(child_path, child);
                let attr = self.make_attr(ino, node.as_ref());
                reply.entry(&ATTR_TTL, &attr, 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        trace!(inode = ino, nlookup = nlookup, "forget");
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        trace!(inode = ino, "getattr");

        let Some(entry) = self.inodes.get(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let node = Arc::clone(&entry.node);
        drop(entry);

        let attr = self.make_attr(ino, node.as_ref());
        reply.attr(&ATTR_TTL, &attr);
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        trace!(inode = ino, mode = ?mode, uid = ?uid, gid = ?gid, size = ?size, "setattr");

        let Some(entry) = self.inodes.get(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let node = Arc::clone(&entry.node);
        drop(entry);

        // Only size changes are honored; the remote store has no notion of
        // ownership, permissions, or client-set timestamps.
        if let Some(requested) = size {
            if let Err(e) = node.truncate(requested) {
                reply.error(e.to_errno());
                return;
            }
        }

        let attr = self.make_attr(ino, node.as_ref());
        reply.attr(&ATTR_TTL, &attr);
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        trace!(inode = ino, flags = flags, "open");

        let Some(entry) = self.inodes.get(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let node = Arc::clone(&entry.node);
        drop(entry);

        if node.is_dir() {
            reply.error(libc::EISDIR);
            return;
        }

        let write = (flags & libc::O_ACCMODE) != libc::O_RDONLY;
        if let Err(e) = node.open(write) {
            reply.error(e.to_errno());
            return;
        }

        if write && (flags & libc::O_TRUNC) != 0
            && let Err(e) = node.truncate(0)
        {
            reply.error(e.to_errno());
            return;
        }

        let fh = self.handles.insert(OpenHandle { node, write });
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        trace!(inode = ino, fh = fh, offset = offset, size = size, "read");

        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };
        let node = Arc::clone(&handle.node);
        drop(handle);

        // The cache holds the whole object; slice the requested window here.
        match node.read() {
            Ok(content) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
                let end = start.saturating_add(size as usize).min(content.len());
                reply.data(&content[start..end]);
            }
            Err(e) => {
                error!(inode = ino, error = %e, "read failed");
                reply.error(e.to_errno());
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        trace!(inode = ino, fh = fh, offset = offset, size = data.len(), "write");

        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };
        if !handle.write {
            reply.error(libc::EBADF);
            return;
        }
        let node = Arc::clone(&handle.node);
        drop(handle);

        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        match node.write_at(offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        trace!(inode = ino, fh = fh, "flush");

        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };
        let node = Arc::clone(&handle.node);
        drop(handle);

        match node.flush() {
            Ok(()) => reply.ok(),
            Err(e) => {
                error!(inode = ino, error = %e, "flush failed");
                reply.error(e.to_errno());
            }
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        trace!(fh = fh, "release");

        let Some(handle) = self.handles.remove(fh) else {
            // Already released or never existed.
            reply.ok();
            return;
        };

        // The kernel does not guarantee a flush callback for every close;
        // push any remaining dirty content before the handle goes away. A
        // clean entry makes this a no-op.
        match handle.node.flush() {
            Ok(()) => {
                debug!(fh = fh, "handle released");
                reply.ok();
            }
            Err(e) => {
                error!(inode = ino, error = %e, "write-back on release failed");
                reply.error(e.to_errno());
            }
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        trace!(inode = ino, "opendir");

        let Some(entry) = self.inodes.get(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        if entry.node.is_dir() {
            reply.opened(0, 0);
        } else {
            reply.error(libc::ENOTDIR);
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        trace!(inode = ino, offset = offset, "readdir");

        let Some(entry) = self.inodes.get(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let node = Arc::clone(&entry.node);
        let current_path = entry.path.clone();
        drop(entry);

        if !node.is_dir() {
            reply.error(libc::ENOTDIR);
            return;
        }

        let children = match node.list_children() {
            Ok(children) => children,
            Err(e) => {
                error!(inode = ino, error = %e, "directory enumeration failed");
                reply.error(e.to_errno());
                return;
            }
        };

        let parent_ino = current_path
            .parent()
            .and_then(|parent| self.inodes.get_inode(parent))
            .unwrap_or(ROOT_INODE);

        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];
        for child in children {
            let child_path = current_path.join(child.name());
            let kind = if child.is_dir() {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            let name = child.name().to_string();
            let (child_ino, _) = self.inodes.get_or_insert(child_path, child);
            entries.push((child_ino, kind, name));
        }

        for (i, (entry_ino, kind, name)) in entries.iter().enumerate().skip(offset as usize) {
            // add returns true when the reply buffer is full
            if reply.add(*entry_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }
}
