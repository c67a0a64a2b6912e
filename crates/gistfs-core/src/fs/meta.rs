//! Read-only synthetic files exposing a gist's scalar metadata.
//!
//! These are snapshots taken at enumeration time: no cache, no network, and
//! any attempt to open them for writing fails before a request could be
//! issued.

use crate::error::{GistFsError, GistFsResult};
use crate::fs::{Node, NodeTimes};

/// A scalar string field rendered as `<value>\n`.
pub struct MetaStringFile {
    name: &'static str,
    content: Vec<u8>,
    times: NodeTimes,
}

impl MetaStringFile {
    pub fn new(name: &'static str, value: &str, times: NodeTimes) -> Self {
        Self {
            name,
            content: format!("{value}\n").into_bytes(),
            times,
        }
    }
}

impl Node for MetaStringFile {
    fn name(&self) -> &str {
        self.name
    }

    fn is_dir(&self) -> bool {
        false
    }

    fn size(&self) -> u64 {
        self.content.len() as u64
    }

    fn times(&self) -> NodeTimes {
        self.times
    }

    fn open(&self, write: bool) -> GistFsResult<()> {
        if write {
            return Err(GistFsError::PermissionDenied("metadata files are read-only"));
        }
        Ok(())
    }

    fn read(&self) -> GistFsResult<Vec<u8>> {
        Ok(self.content.clone())
    }
}

/// A boolean field rendered as `1\n` or `0\n`.
pub struct MetaBoolFile {
    name: &'static str,
    value: bool,
    times: NodeTimes,
}

impl MetaBoolFile {
    pub fn new(name: &'static str, value: bool, times: NodeTimes) -> Self {
        Self { name, value, times }
    }
}

impl Node for MetaBoolFile {
    fn name(&self) -> &str {
        self.name
    }

    fn is_dir(&self) -> bool {
        false
    }

    fn size(&self) -> u64 {
        2
    }

    fn times(&self) -> NodeTimes {
        self.times
    }

    fn open(&self, write: bool) -> GistFsResult<()> {
        if write {
            return Err(GistFsError::PermissionDenied("metadata files are read-only"));
        }
        Ok(())
    }

    fn read(&self) -> GistFsResult<Vec<u8>> {
        Ok(if self.value { b"1\n".to_vec() } else { b"0\n".to_vec() })
    }
}
