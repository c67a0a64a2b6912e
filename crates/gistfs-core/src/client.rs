//! Remote store boundary: the narrow interface the node tree consumes, and
//! the concrete client that speaks to the gist API.
//!
//! All three operations are blocking; the callback that triggered a call
//! suspends until it completes. A stuck call stalls only that callback. The
//! core imposes no timeout and performs no retry — failures propagate
//! unchanged to the node operation that triggered them.

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{GistFsError, GistFsResult};
use crate::gist::{Gist, GistPatch};

/// Operations the node tree requires from the remote store.
///
/// `update_content` must encode only the fields actually supplied: the remote
/// API interprets a present-but-empty field differently from an absent one.
pub trait RemoteStore: Send + Sync {
    /// Fetch the full gist list for the authenticated user.
    fn fetch_list(&self) -> GistFsResult<Vec<Gist>>;

    /// Fetch a blob's bytes through its opaque content-location handle.
    fn fetch_content(&self, raw_url: &str) -> GistFsResult<Vec<u8>>;

    /// Push new content for one blob as a sparse partial update.
    fn update_content(&self, id: &str, filename: &str, content: &[u8]) -> GistFsResult<()>;
}

/// Authenticated client for the gist REST API.
///
/// The base URL and credentials are injected at construction; there is no
/// ambient default client or global configuration.
pub struct GistClient {
    base: Url,
    http: Client,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GistClient {
    /// Build a client against `base` (e.g. `https://api.github.com/`)
    /// authenticating with `token`.
    pub fn new(base: Url, token: &str) -> GistFsResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("gistfs"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| GistFsError::RemoteFetch(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GistFsError::RemoteFetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base, http })
    }

    fn endpoint(&self, path: &str) -> GistFsResult<Url> {
        self.base
            .join(path)
            .map_err(|e| GistFsError::RemoteFetch(format!("bad endpoint {path}: {e}")))
    }

    /// Extract the API error payload's `message` field, falling back to the
    /// HTTP status line when the body is not the expected shape.
    fn error_message(resp: Response) -> String {
        let status = resp.status();
        match resp.json::<ApiErrorBody>() {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => format!("HTTP {status}"),
        }
    }
}

impl RemoteStore for GistClient {
    fn fetch_list(&self) -> GistFsResult<Vec<Gist>> {
        let url = self.endpoint("gists")?;
        debug!(%url, "fetching gist list");

        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| GistFsError::RemoteFetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GistFsError::RemoteFetch(Self::error_message(resp)));
        }
        resp.json::<Vec<Gist>>()
            .map_err(|e| GistFsError::RemoteFetch(format!("malformed gist list: {e}")))
    }

    fn fetch_content(&self, raw_url: &str) -> GistFsResult<Vec<u8>> {
        debug!(url = raw_url, "fetching blob content");

        let resp = self
            .http
            .get(raw_url)
            .send()
            .map_err(|e| GistFsError::RemoteFetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GistFsError::RemoteFetch(Self::error_message(resp)));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| GistFsError::RemoteFetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn update_content(&self, id: &str, filename: &str, content: &[u8]) -> GistFsResult<()> {
        let url = self.endpoint(&format!("gists/{id}"))?;
        debug!(%url, filename, size = content.len(), "pushing blob content");

        // Gist blobs are text; the API takes the new content as a string.
        let patch = GistPatch::content(filename, String::from_utf8_lossy(content).into_owned());

        let resp = self
            .http
            .patch(url)
            .json(&patch)
            .send()
            .map_err(|e| GistFsError::RemoteUpdate(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GistFsError::RemoteUpdate(Self::error_message(resp)));
        }
        Ok(())
    }
}
