//! Shared remote-store double for integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use gistfs_core::{Gist, GistFile, GistFsError, GistFsResult, RemoteStore};

/// Canned remote store that records every call it serves.
#[derive(Default)]
pub struct FakeRemote {
    gists: Mutex<Vec<Gist>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    pub list_calls: AtomicUsize,
    pub content_calls: AtomicUsize,
    pub update_calls: Mutex<Vec<(String, String, Vec<u8>)>>,
}

impl FakeRemote {
    pub fn add_gist(&self, gist: Gist) {
        self.gists.lock().unwrap().push(gist);
    }

    pub fn put_content(&self, raw_url: &str, content: &[u8]) {
        self.contents
            .lock()
            .unwrap()
            .insert(raw_url.to_string(), content.to_vec());
    }

    pub fn gist(id: &str, description: &str, public: bool) -> Gist {
        let t: DateTime<Utc> = "2024-03-01T10:00:00Z".parse().unwrap();
        Gist {
            id: id.to_string(),
            description: description.to_string(),
            public,
            created_at: t,
            updated_at: t,
            files: HashMap::new(),
        }
    }

    pub fn blob(size: u64, raw_url: &str) -> GistFile {
        GistFile {
            size,
            raw_url: raw_url.to_string(),
        }
    }
}

impl RemoteStore for FakeRemote {
    fn fetch_list(&self) -> GistFsResult<Vec<Gist>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
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
        self.update_calls.lock().unwrap().push((
            id.to_string(),
            filename.to_string(),
            content.to_vec(),
        ));
        Ok(())
    }
}
