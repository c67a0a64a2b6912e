//! Error types shared across the gistfs core.
//!
//! The taxonomy is deliberately closed: every node operation resolves to one
//! of these variants, and the mount layer maps them onto protocol status
//! codes. Remote errors carry the message extracted from the API error
//! payload; there is no retry or backoff anywhere in the core.

use thiserror::Error;

/// Errors surfaced by node operations and the remote store boundary.
#[derive(Debug, Error)]
pub enum GistFsError {
    /// A listing or content fetch failed (network failure or non-success
    /// API response).
    #[error("remote fetch failed: {0}")]
    RemoteFetch(String),

    /// A partial update failed to apply on the remote store.
    #[error("remote update failed: {0}")]
    RemoteUpdate(String),

    /// Lookup of a name not present among the current children.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// Write, truncate, or open-for-write on a node whose capability set
    /// excludes writing.
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
}

/// Result type for core operations.
pub type GistFsResult<T> = Result<T, GistFsError>;
