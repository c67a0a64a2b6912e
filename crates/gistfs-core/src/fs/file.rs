//! Content files and their per-open cache entries.
//!
//! Each content file buffers the whole blob in memory and tracks dirtiness
//! through a pair of timestamps: `local_mtime > fetched_at` means there are
//! buffered edits the remote has not seen. A successful push moves
//! `fetched_at` up to the `local_mtime` captured before the network call, so
//! a write that lands during the push keeps the entry dirty.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::client::RemoteStore;
use crate::error::GistFsResult;
use crate::fs::{Node, NodeTimes};

/// Buffered blob state for one content file.
#[derive(Debug)]
struct ContentCache {
    /// Unset until the first fetch; unset again after truncate.
    content: Option<Vec<u8>>,
    /// When content was last pulled from or pushed to the remote.
    fetched_at: SystemTime,
    /// When content was last locally mutated.
    local_mtime: SystemTime,
}

impl ContentCache {
    fn new() -> Self {
        Self {
            content: None,
            fetched_at: UNIX_EPOCH,
            local_mtime: UNIX_EPOCH,
        }
    }

    fn is_dirty(&self) -> bool {
        self.local_mtime > self.fetched_at
    }

    /// Record a local mutation. The dirty invariant needs `local_mtime`
    /// strictly after `fetched_at`, which a coarse clock cannot guarantee
    /// when the fetch happened on the same tick.
    fn touch_local(&mut self) {
        let now = SystemTime::now();
        self.local_mtime = if now > self.fetched_at {
            now
        } else {
            self.fetched_at + Duration::from_nanos(1)
        };
    }
}

/// A mounted blob, writable and synchronized back to the remote on flush.
///
/// Carries its synchronization address as a plain `(gist id, blob name)`
/// value pair; there is no back-pointer to the gist record.
pub struct ContentFile {
    gist_id: String,
    name: String,
    /// Size as last reported by the remote, used until content is buffered.
    remote_size: u64,
    raw_url: String,
    remote_times: NodeTimes,
    store: Arc<dyn RemoteStore>,
    cache: Mutex<ContentCache>,
}

impl ContentFile {
    pub fn new(
        gist_id: String,
        name: String,
        remote_size: u64,
        raw_url: String,
        remote_times: NodeTimes,
        store: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            gist_id,
            name,
            remote_size,
            raw_url,
            remote_times,
            store,
            cache: Mutex::new(ContentCache::new()),
        }
    }

    pub fn gist_id(&self) -> &str {
        &self.gist_id
    }

    fn ensure_fetched(&self, cache: &mut ContentCache) -> GistFsResult<()> {
        if cache.content.is_some() {
            return Ok(());
        }
        let bytes = self.store.fetch_content(&self.raw_url)?;
        debug!(gist = %self.gist_id, name = %self.name, size = bytes.len(), "fetched blob");
        cache.content = Some(bytes);
        cache.fetched_at = SystemTime::now();
        Ok(())
    }
}

impl Node for ContentFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_dir(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        let cache = self.cache.lock();
        cache
            .content
            .as_ref()
            .map_or(self.remote_size, |c| c.len() as u64)
    }

    fn times(&self) -> NodeTimes {
        let cache = self.cache.lock();
        if cache.content.is_some() {
            NodeTimes::new(cache.fetched_at, cache.local_mtime.max(cache.fetched_at))
        } else {
            self.remote_times
        }
    }

    /// Populate the cache on first open. Reopening an already-open file must
    /// not discard unflushed edits, so an existing buffer is left untouched.
    fn open(&self, _write: bool) -> GistFsResult<()> {
        let mut cache = self.cache.lock();
        self.ensure_fetched(&mut cache)
    }

    fn read(&self) -> GistFsResult<Vec<u8>> {
        let mut cache = self.cache.lock();
        // A truncated entry has no buffer; reading refetches remote state.
        self.ensure_fetched(&mut cache)?;
        Ok(cache.content.clone().unwrap_or_default())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> GistFsResult<usize> {
        let mut cache = self.cache.lock();
        let buf = cache.content.get_or_insert_with(Vec::new);

        let offset = offset as usize;
        let end = offset + data.len();
        if end > buf.len() {
            // Extends the buffer; a write starting past the end zero-fills
            // the gap.
            buf.resize(end, 0);
        }
        buf[offset..end].copy_from_slice(data);
        cache.touch_local();

        trace!(gist = %self.gist_id, name = %self.name, offset, len = data.len(), "buffered write");
        Ok(data.len())
    }

    /// The requested size is ignored: truncate of any size, including the
    /// current one, discards the whole buffer and forces a refetch on the
    /// next read. Nothing remains buffered, so the entry is left clean.
    fn truncate(&self, _size: u64) -> GistFsResult<()> {
        let mut cache = self.cache.lock();
        cache.content = None;
        cache.local_mtime = cache.fetched_at;
        Ok(())
    }

    fn flush(&self) -> GistFsResult<()> {
        let mut cache = self.cache.lock();
        if !cache.is_dirty() {
            return Ok(());
        }
        let Some(content) = cache.content.as_deref() else {
            return Ok(());
        };

        // Capture the mtime before the push: a concurrent write cannot
        // interleave (the entry lock is held across the call), but the push
        // itself takes time and the clean invariant must be re-established
        // with the timestamp the pushed bytes correspond to.
        let pushed_mtime = cache.local_mtime;
        let size = content.len();
        self.store
            .update_content(&self.gist_id, &self.name, content)?;
        cache.fetched_at = pushed_mtime;

        debug!(gist = %self.gist_id, name = %self.name, size, "flushed blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;
    use std::sync::atomic::Ordering;

    fn file_with(content: &[u8]) -> (Arc<MockStore>, ContentFile) {
        let store = Arc::new(MockStore::default());
        store.put_content("raw://blob", content);
        let file = ContentFile::new(
            "abcd1234".to_string(),
            "main.c".to_string(),
            content.len() as u64,
            "raw://blob".to_string(),
            NodeTimes::now(),
            Arc::clone(&store) as Arc<dyn RemoteStore>,
        );
        (store, file)
    }

    #[test]
    fn first_read_returns_fetched_bytes_exactly() {
        let (store, file) = file_with(b"printf(\"Hello world\\n\");");
        file.open(false).unwrap();
        assert_eq!(file.read().unwrap(), b"printf(\"Hello world\\n\");");
        assert_eq!(store.content_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reopen_does_not_refetch_or_discard() {
        let (store, file) = file_with(b"one");
        file.open(true).unwrap();
        file.write_at(0, b"two").unwrap();
        file.open(true).unwrap();
        assert_eq!(file.read().unwrap(), b"two");
        assert_eq!(store.content_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn write_within_buffer_keeps_length() {
        let (_store, file) = file_with(b"abcdefgh");
        file.open(true).unwrap();
        assert_eq!(file.write_at(2, b"XY").unwrap(), 2);
        assert_eq!(file.read().unwrap(), b"abXYefgh");
        assert_eq!(file.size(), 8);
    }

    #[test]
    fn write_past_end_extends_buffer() {
        let (_store, file) = file_with(b"abcd");
        file.open(true).unwrap();
        assert_eq!(file.write_at(2, b"WXYZ").unwrap(), 4);
        assert_eq!(file.read().unwrap(), b"abWXYZ");
        assert_eq!(file.size(), 6);
    }

    #[test]
    fn write_beyond_end_zero_fills_gap() {
        let (_store, file) = file_with(b"ab");
        file.open(true).unwrap();
        file.write_at(4, b"cd").unwrap();
        assert_eq!(file.read().unwrap(), b"ab\0\0cd");
    }

    #[test]
    fn truncate_empties_and_forces_refetch() {
        let (store, file) = file_with(b"original");
        file.open(true).unwrap();
        file.write_at(0, b"modified").unwrap();

        // Any size argument clears the whole buffer.
        file.truncate(3).unwrap();
        assert_eq!(file.read().unwrap(), b"original");
        assert_eq!(store.content_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn truncate_discards_dirty_state() {
        let (store, file) = file_with(b"original");
        file.open(true).unwrap();
        file.write_at(0, b"modified").unwrap();
        file.truncate(0).unwrap();

        file.flush().unwrap();
        assert!(store.update_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn flush_is_noop_when_clean() {
        let (store, file) = file_with(b"content");
        file.open(false).unwrap();
        file.flush().unwrap();
        assert!(store.update_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn flush_pushes_once_then_noops() {
        let (store, file) = file_with(b"");
        file.open(true).unwrap();
        file.write_at(0, b"int x;").unwrap();

        file.flush().unwrap();
        file.flush().unwrap();

        let calls = store.update_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "abcd1234");
        assert_eq!(calls[0].1, "main.c");
        assert_eq!(calls[0].2, b"int x;");
    }

    #[test]
    fn failed_flush_stays_dirty() {
        let (store, file) = file_with(b"");
        file.open(true).unwrap();
        file.write_at(0, b"data").unwrap();

        store.fail_update.store(true, Ordering::SeqCst);
        assert!(file.flush().is_err());

        store.fail_update.store(false, Ordering::SeqCst);
        file.flush().unwrap();
        assert_eq!(store.update_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn write_after_flush_marks_dirty_again() {
        let (store, file) = file_with(b"");
        file.open(true).unwrap();
        file.write_at(0, b"v1").unwrap();
        file.flush().unwrap();

        file.write_at(0, b"v2").unwrap();
        file.flush().unwrap();

        let calls = store.update_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].2, b"v2");
    }

    #[test]
    fn size_reports_remote_until_opened() {
        let store = Arc::new(MockStore::default());
        store.put_content("raw://blob", b"12345");
        let file = ContentFile::new(
            "abcd1234".to_string(),
            "main.c".to_string(),
            42,
            "raw://blob".to_string(),
            NodeTimes::now(),
            store as Arc<dyn RemoteStore>,
        );

        assert_eq!(file.size(), 42);
        file.open(false).unwrap();
        assert_eq!(file.size(), 5);
    }
}
