//! FUSE filesystem for mounting GitHub gists.
//!
//! This crate provides the kernel-facing side of gistfs: inode and handle
//! bookkeeping, errno mapping, and the `fuser::Filesystem` implementation
//! that dispatches callbacks onto the node tree in `gistfs-core`.
//!
//! # Usage
//!
//! ```ignore
//! use gistfs_fuse::GistFs;
//!
//! let fs = GistFs::new(store, refresh);
//! fuser::spawn_mount2(fs, mountpoint, &options)?;
//! ```

pub mod error;
pub mod filesystem;
pub mod handles;
pub mod inode;

pub use error::ToErrno;
pub use filesystem::GistFs;
pub use handles::{HandleTable, OpenHandle};
pub use inode::{InodeEntry, InodeTable, ROOT_INODE};
