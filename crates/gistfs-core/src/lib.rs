//! Core of gistfs: the virtual-filesystem node tree over a remote gist
//! store, with time-boxed listing caching and dirty-tracked write-back.
//!
//! The crate is protocol-agnostic: it exposes nodes, caches, the remote
//! store boundary and a closed error taxonomy, and leaves kernel-facing
//! dispatch to the mount crate. All remote calls are blocking and happen on
//! the thread of the operation that triggered them.

pub mod client;
pub mod error;
pub mod fs;
pub mod gist;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{GistClient, RemoteStore};
pub use error::{GistFsError, GistFsResult};
pub use fs::{
    ContentFile, DEFAULT_REFRESH, GistDir, ListingCache, META_DIR_NAME, MetaBoolFile, MetaDir,
    MetaStringFile, Node, NodeTimes, Root, lookup_child,
};
pub use gist::{FilePatch, Gist, GistFile, GistPatch};
