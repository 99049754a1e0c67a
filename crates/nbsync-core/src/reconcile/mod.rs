// ── Thin reconcilers ──
//
// One apply per declared object. A failure is recorded against the object
// and the loop moves on; successful objects are registered in the cache so
// later stages resolve them within the same run.

pub mod device_types;
pub mod foundation;
pub mod network;

use nbsync_api::Object;
use serde_json::Value;
use tracing::warn;

use crate::apply::Applier;
use crate::cache::{Resource, SiteCache};

/// Shared handles every reconciler works through.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub applier: &'a Applier,
    pub cache: &'a SiteCache,
}

impl<'a> Context<'a> {
    pub fn new(applier: &'a Applier, cache: &'a SiteCache) -> Self {
        Self { applier, cache }
    }

    /// Resolve declared tag slugs to ids. Unknown slugs are dropped with a warning.
    pub fn tag_ids(&self, owner: &str, slugs: &[String]) -> Vec<u64> {
        slugs
            .iter()
            .filter_map(|slug| {
                let id = self.cache.get_global_id(Resource::Tags, slug);
                if id.is_none() {
                    warn!(owner, tag = %slug, "unknown tag, dropping");
                }
                id
            })
            .collect()
    }
}

/// Payload builder that skips absent optional fields.
#[derive(Debug, Default)]
pub(crate) struct Payload(Object);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    pub fn opt<T: Into<Value>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.0.insert(key.to_owned(), v.into());
        }
        self
    }

    /// Set `tags` when any were resolved.
    pub fn tags(self, ids: Vec<u64>) -> Self {
        if ids.is_empty() {
            self
        } else {
            self.set("tags", ids)
        }
    }

    pub fn build(self) -> Object {
        self.0
    }
}
