//! Time-boxed cache of the top-level gist list.
//!
//! Directory listings are expensive network calls and the same mount sees
//! many of them (repeated `ls`, shell completion). Bounding staleness to a
//! fixed window trades consistency for request volume, which is acceptable
//! because gist creation and deletion are rare relative to filesystem
//! traffic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::client::RemoteStore;
use crate::error::GistFsResult;
use crate::gist::Gist;

/// Default refresh period for the gist list (5 minutes).
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(300);

struct CachedListing {
    fetched_at: Instant,
    gists: Arc<Vec<Gist>>,
}

/// TTL-boxed cache of the full gist list, refreshed wholesale.
///
/// The check-then-refetch-then-replace sequence runs under one lock so
/// concurrent enumerations of the root cannot trigger duplicate fetches. On
/// fetch failure the prior cache is retained untouched and the error is
/// returned to the caller.
pub struct ListingCache {
    refresh: Duration,
    state: Mutex<Option<CachedListing>>,
}

impl ListingCache {
    pub fn new(refresh: Duration) -> Self {
        Self {
            refresh,
            state: Mutex::new(None),
        }
    }

    /// The cached list, refetched through `store` when empty or older than
    /// the refresh period.
    pub fn snippets(&self, store: &dyn RemoteStore) -> GistFsResult<Arc<Vec<Gist>>> {
        let mut state = self.state.lock();

        if let Some(cached) = state.as_ref()
            && cached.fetched_at.elapsed() <= self.refresh
        {
            return Ok(Arc::clone(&cached.gists));
        }

        let gists = Arc::new(store.fetch_list()?);
        debug!(count = gists.len(), "refreshed gist list");
        *state = Some(CachedListing {
            fetched_at: Instant::now(),
            gists: Arc::clone(&gists),
        });
        Ok(gists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;
    use std::sync::atomic::Ordering;

    #[test]
    fn second_call_within_window_hits_cache() {
        let store = MockStore::with_gists(vec![MockStore::gist("abcd1234")]);
        let cache = ListingCache::new(Duration::from_secs(60));

        let first = cache.snippets(&store).unwrap();
        let second = cache.snippets(&store).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn call_after_window_refetches() {
        let store = MockStore::with_gists(vec![MockStore::gist("abcd1234")]);
        let cache = ListingCache::new(Duration::from_millis(10));

        cache.snippets(&store).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        cache.snippets(&store).unwrap();

        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_refresh_keeps_prior_cache() {
        let store = MockStore::with_gists(vec![MockStore::gist("abcd1234")]);
        let cache = ListingCache::new(Duration::from_millis(10));

        cache.snippets(&store).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        store.fail_list.store(true, Ordering::SeqCst);
        assert!(cache.snippets(&store).is_err());

        // The stale entry survives the failure and serves again once the
        // store recovers within a fresh window.
        store.fail_list.store(false, Ordering::SeqCst);
        let gists = cache.snippets(&store).unwrap();
        assert_eq!(gists[0].id, "abcd1234");
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        use std::sync::Arc as StdArc;

        let store = StdArc::new(MockStore::with_gists(vec![MockStore::gist("abcd1234")]));
        let cache = StdArc::new(ListingCache::new(Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = StdArc::clone(&store);
                let cache = StdArc::clone(&cache);
                std::thread::spawn(move || cache.snippets(store.as_ref()).unwrap().len())
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 1);
        }
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }
}
