//! Mapping from core errors to POSIX error codes.
//!
//! The core's taxonomy is closed, so the mapping is total: remote failures
//! become I/O errors, missing names become `ENOENT`, and capability
//! violations become `EPERM`. Structural codes (`EBADF`, `EISDIR`,
//! `ENOTDIR`, `EINVAL`) are produced directly at the dispatch layer.

use gistfs_core::GistFsError;

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for GistFsError {
    fn to_errno(&self) -> i32 {
        match self {
            GistFsError::RemoteFetch(_) | GistFsError::RemoteUpdate(_) => libc::EIO,
            GistFsError::NotFound(_) => libc::ENOENT,
            GistFsError::PermissionDenied(_) => libc::EPERM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_protocol_codes() {
        assert_eq!(
            GistFsError::RemoteFetch("down".to_string()).to_errno(),
            libc::EIO
        );
        assert_eq!(
            GistFsError::RemoteUpdate("rejected".to_string()).to_errno(),
            libc::EIO
        );
        assert_eq!(
            GistFsError::NotFound("main.c".to_string()).to_errno(),
            libc::ENOENT
        );
        assert_eq!(
            GistFsError::PermissionDenied("read-only").to_errno(),
            libc::EPERM
        );
    }
}
