//! Gist records as returned by the remote store, and the sparse patch form
//! used to push edits back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One remote gist: scalar metadata plus a set of named text blobs.
///
/// Fetched as a batch by [`crate::client::RemoteStore::fetch_list`] and held
/// immutable for the lifetime of one listing-cache entry — the cache refreshes
/// wholesale, it never patches a record in place.
#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    /// Immutable identifier; doubles as the directory name.
    pub id: String,
    /// The API reports an absent description as JSON `null`.
    #[serde(default, deserialize_with = "null_to_empty")]
    pub description: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Blob name -> blob reference. Keys are unique; order is irrelevant.
    pub files: HashMap<String, GistFile>,
}

/// Reference to one blob within a gist.
///
/// `size` is whatever the remote last reported and is used only for attribute
/// reporting; `raw_url` is the opaque handle the content fetch is addressed
/// by. Synchronization is addressed by the `(gist id, filename)` pair carried
/// by value on the file node, never by a back-pointer.
#[derive(Debug, Clone, Deserialize)]
pub struct GistFile {
    pub size: u64,
    pub raw_url: String,
}

fn null_to_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

/// Sparse edit form for `PATCH /gists/{id}`.
///
/// The remote API distinguishes a present-but-empty field from an absent one:
/// an absent field means "leave unchanged", an empty string means "set to
/// empty". Only fields actually supplied are serialized. A `None` entry in
/// `files` serializes as JSON `null`, which deletes that blob remotely.
#[derive(Debug, Default, Serialize)]
pub struct GistPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub files: HashMap<String, Option<FilePatch>>,
}

impl GistPatch {
    /// Patch exactly one blob's content, leaving everything else unchanged.
    pub fn content(filename: &str, content: String) -> Self {
        let mut files = HashMap::new();
        files.insert(
            filename.to_string(),
            Some(FilePatch {
                filename: None,
                content: Some(content),
            }),
        );
        Self {
            description: None,
            files,
        }
    }
}

/// Per-blob slice of a [`GistPatch`].
#[derive(Debug, Default, Serialize)]
pub struct FilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
