//! In-memory remote store double used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use crate::client::RemoteStore;
use crate::error::{GistFsError, GistFsResult};
use crate::gist::Gist;

/// Remote store double: serves canned gists and records every call.
#[derive(Default)]
pub struct MockStore {
    gists: Mutex<Vec<Gist>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    pub list_calls: AtomicUsize,
    pub content_calls: AtomicUsize,
    /// `(gist id, blob name, content)` per update_content call.
    pub update_calls: Mutex<Vec<(String, String, Vec<u8>)>>,
    pub fail_list: AtomicBool,
    pub fail_update: AtomicBool,
}

impl MockStore {
    pub fn with_gists(gists: Vec<Gist>) -> Self {
        let store = Self::default();
        store.set_gists(gists);
        store
    }

    pub fn set_gists(&self, gists: Vec<Gist>) {
        *self.gists.lock().unwrap() = gists;
    }

    pub fn put_content(&self, raw_url: &str, content: &[u8]) {
        self.contents
            .lock()
            .unwrap()
            .insert(raw_url.to_string(), content.to_vec());
    }

    fn fixed_time() -> DateTime<Utc> {
        "2024-03-01T10:00:00Z".parse().unwrap()
    }

    pub fn gist(id: &str) -> Gist {
        Self::gist_with(id, "", true)
    }

    pub fn gist_with(id: &str, description: &str, public: bool) -> Gist {
        Gist {
            id: id.to_string(),
            description: description.to_string(),
            public,
            created_at: Self::fixed_time(),
            updated_at: Self::fixed_time(),
            files: HashMap::new(),
        }
    }
}

impl RemoteStore for MockStore {
    fn fetch_list(&self) -> GistFsResult<Vec<Gist>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(GistFsError::RemoteFetch("listing unavailable".to_string()));
        }
        Ok(self.gists.lock().unwrap().clone())
    }

    fn fetch_content(&self, raw_url: &str) -> GistFsResult<Vec<u8>> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        self.contents
            .lock()
            .unwrap()
            .get(raw_url)
            .cloned()
            .ok_or_else(|| GistFsError::RemoteFetch(format!("no blob at {raw_url}")))
    }

    fn update_content(&self, id: &str, filename: &str, content: &[u8]) -> GistFsResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(GistFsError::RemoteUpdate("update rejected".to_string()));
        }
        self.update_calls.lock().unwrap().push((
            id.to_string(),
            filename.to_string(),
            content.to_vec(),
        ));
        Ok(())
    }
}
