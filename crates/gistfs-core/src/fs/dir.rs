//! Directory kinds: the root, one directory per gist, and the synthetic
//! metadata directory.
//!
//! Directories hold no materialized children of their own; every enumeration
//! rebuilds the child set wholesale from the listing cache or the gist
//! record, so stale entries cannot accumulate between listings.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::client::RemoteStore;
use crate::error::GistFsResult;
use crate::fs::{ContentFile, ListingCache, MetaBoolFile, MetaStringFile, Node, NodeTimes};
use crate::gist::Gist;

/// Name of the synthetic metadata directory inside every gist directory.
/// Gist blob names never start with a dot, so it cannot collide.
pub const META_DIR_NAME: &str = ".gist";

/// Mount root: one child directory per gist in the listing cache.
pub struct Root {
    store: Arc<dyn RemoteStore>,
    listing: ListingCache,
}

impl Root {
    /// The refresh period is injected here; nothing else in the tree holds
    /// cache-policy configuration.
    pub fn new(store: Arc<dyn RemoteStore>, refresh: Duration) -> Self {
        Self {
            store,
            listing: ListingCache::new(refresh),
        }
    }
}

impl Node for Root {
    fn name(&self) -> &str {
        "/"
    }

    fn is_dir(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        0
    }

    fn times(&self) -> NodeTimes {
        NodeTimes::now()
    }

    fn list_children(&self) -> GistFsResult<Vec<Arc<dyn Node>>> {
        let gists = self.listing.snippets(self.store.as_ref())?;
        Ok(gists
            .iter()
            .map(|gist| {
                Arc::new(GistDir::new(gist.clone(), Arc::clone(&self.store))) as Arc<dyn Node>
            })
            .collect())
    }
}

/// One gist: a content file per blob plus the `.gist` metadata directory.
pub struct GistDir {
    gist: Gist,
    store: Arc<dyn RemoteStore>,
}

impl GistDir {
    pub fn new(gist: Gist, store: Arc<dyn RemoteStore>) -> Self {
        Self { gist, store }
    }

    fn remote_times(&self) -> NodeTimes {
        NodeTimes::new(
            SystemTime::from(self.gist.created_at),
            SystemTime::from(self.gist.updated_at),
        )
    }
}

impl Node for GistDir {
    fn name(&self) -> &str {
        &self.gist.id
    }

    fn is_dir(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        0
    }

    fn times(&self) -> NodeTimes {
        self.remote_times()
    }

    fn list_children(&self) -> GistFsResult<Vec<Arc<dyn Node>>> {
        let times = self.remote_times();
        let mut children: Vec<Arc<dyn Node>> = self
            .gist
            .files
            .iter()
            .map(|(name, file)| {
                Arc::new(ContentFile::new(
                    self.gist.id.clone(),
                    name.clone(),
                    file.size,
                    file.raw_url.clone(),
                    times,
                    Arc::clone(&self.store),
                )) as Arc<dyn Node>
            })
            .collect();
        children.push(Arc::new(MetaDir::new(&self.gist)));
        Ok(children)
    }
}

/// The `.gist` directory: exactly three read-only files recomputed from the
/// gist record on every enumeration.
pub struct MetaDir {
    id: String,
    description: String,
    public: bool,
    times: NodeTimes,
}

impl MetaDir {
    pub fn new(gist: &Gist) -> Self {
        Self {
            id: gist.id.clone(),
            description: gist.description.clone(),
            public: gist.public,
            times: NodeTimes::new(
                SystemTime::from(gist.created_at),
                SystemTime::from(gist.updated_at),
            ),
        }
    }
}

impl Node for MetaDir {
    fn name(&self) -> &str {
        META_DIR_NAME
    }

    fn is_dir(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        0
    }

    fn times(&self) -> NodeTimes {
        self.times
    }

    fn list_children(&self) -> GistFsResult<Vec<Arc<dyn Node>>> {
        Ok(vec![
            Arc::new(MetaStringFile::new("description", &self.description, self.times)),
            Arc::new(MetaStringFile::new("id", &self.id, self.times)),
            Arc::new(MetaBoolFile::new("public", self.public, self.times)),
        ])
    }
}
