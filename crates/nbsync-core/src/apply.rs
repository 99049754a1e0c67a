// ── Idempotent create-or-update ──
//
// `Applier::apply` looks an object up by an exact-match filter, creates it
// when absent, and otherwise patches only the fields that differ. Running
// the same apply twice performs at most one write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nbsync_api::{Endpoint, NetBoxClient, Object, Query, object_id};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::diff::compute_diff;
use crate::error::CoreError;
use crate::tags::inject_managed_tag;

/// What an apply did to the remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Created,
    /// Names of the patched fields.
    Updated(Vec<String>),
    Unchanged,
}

/// Result of [`Applier::apply`].
#[derive(Debug, Clone)]
pub struct Applied {
    /// The remote object after the apply. Carries `"id": 0` after a dry-run create.
    pub object: Object,
    pub action: Action,
}

impl Applied {
    /// Remote id, `None` for dry-run placeholders.
    pub fn id(&self) -> Option<u64> {
        object_id(&self.object)
    }
}

/// Write counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub deleted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    updated: AtomicU64,
    unchanged: AtomicU64,
    deleted: AtomicU64,
}

/// Create-or-update engine shared by every reconciler.
pub struct Applier {
    client: Arc<NetBoxClient>,
    managed_tag: Option<u64>,
    counters: Counters,
}

impl Applier {
    pub fn new(client: Arc<NetBoxClient>, managed_tag: Option<u64>) -> Self {
        Self {
            client,
            managed_tag,
            counters: Counters::default(),
        }
    }

    pub fn client(&self) -> &NetBoxClient {
        &self.client
    }

    pub fn managed_tag(&self) -> Option<u64> {
        self.managed_tag
    }

    pub fn stats(&self) -> ApplyStats {
        ApplyStats {
            created: self.counters.created.load(Ordering::Relaxed),
            updated: self.counters.updated.load(Ordering::Relaxed),
            unchanged: self.counters.unchanged.load(Ordering::Relaxed),
            deleted: self.counters.deleted.load(Ordering::Relaxed),
        }
    }

    // ── Apply ────────────────────────────────────────────────────────

    /// Converge the object matched by `lookup` to `desired`.
    ///
    /// Errors carry the endpoint and lookup. Nothing is retried.
    pub async fn apply(
        &self,
        endpoint: Endpoint,
        lookup: &Query,
        mut desired: Object,
    ) -> Result<Applied, CoreError> {
        self.stamp(endpoint, &mut desired);
        debug!(%endpoint, %lookup, "applying");

        let existing = self
            .client
            .list(endpoint, lookup)
            .await
            .map_err(CoreError::remote(endpoint, lookup))?;
        if existing.len() > 1 {
            warn!(%endpoint, %lookup, matches = existing.len(), "lookup is ambiguous, using the first match");
        }

        let Some(current) = existing.into_iter().next() else {
            let object = self.create_stamped(endpoint, lookup, desired).await?;
            return Ok(Applied {
                object,
                action: Action::Created,
            });
        };

        let Some(id) = object_id(&current) else {
            return Err(CoreError::remote(endpoint, lookup)(nbsync_api::Error::Deserialization {
                message: "matched object has no id".into(),
                body: Value::Object(current).to_string(),
            }));
        };

        let changes = compute_diff(&current, &desired);
        if changes.is_empty() {
            debug!(%endpoint, id, "unchanged");
            self.counters.unchanged.fetch_add(1, Ordering::Relaxed);
            return Ok(Applied {
                object: current,
                action: Action::Unchanged,
            });
        }

        info!(%endpoint, id, %lookup, fields = changes.len(), "updating");
        for (field, after) in &changes {
            let before = current.get(field).unwrap_or(&Value::Null);
            info!(%endpoint, id, field = %field, %before, %after, "  field changed");
        }
        self.client
            .update(endpoint, id, &changes)
            .await
            .map_err(CoreError::remote(endpoint, lookup))?;
        self.counters.updated.fetch_add(1, Ordering::Relaxed);

        let fields = changes.keys().cloned().collect();
        let mut object = current;
        object.extend(changes);
        Ok(Applied {
            object,
            action: Action::Updated(fields),
        })
    }

    // ── Direct writes ────────────────────────────────────────────────

    /// Create without a lookup. The managed tag is still stamped.
    pub async fn create(&self, endpoint: Endpoint, mut payload: Object) -> Result<Object, CoreError> {
        self.stamp(endpoint, &mut payload);
        self.create_stamped(endpoint, &Query::new(), payload).await
    }

    /// Patch `changes` onto object `id`, logging each field.
    pub async fn update(
        &self,
        endpoint: Endpoint,
        id: u64,
        changes: &Object,
    ) -> Result<(), CoreError> {
        info!(%endpoint, id, fields = changes.len(), "updating");
        for (field, after) in changes {
            info!(%endpoint, id, field = %field, %after, "  field set");
        }
        self.client
            .update(endpoint, id, changes)
            .await
            .map_err(CoreError::remote(endpoint, format!("id={id}")))?;
        self.counters.updated.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub async fn delete(&self, endpoint: Endpoint, id: u64) -> Result<(), CoreError> {
        info!(%endpoint, id, "deleting");
        self.client
            .delete(endpoint, id)
            .await
            .map_err(CoreError::remote(endpoint, format!("id={id}")))?;
        self.counters.deleted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn stamp(&self, endpoint: Endpoint, payload: &mut Object) {
        if !endpoint.supports_tags() {
            payload.remove("tags");
            return;
        }
        if let Some(tag) = self.managed_tag {
            inject_managed_tag(payload, tag);
        }
    }

    async fn create_stamped(
        &self,
        endpoint: Endpoint,
        lookup: &Query,
        mut payload: Object,
    ) -> Result<Object, CoreError> {
        payload.retain(|_, v| !v.is_null());

        info!(%endpoint, %lookup, "creating");
        for (field, after) in &payload {
            info!(%endpoint, field = %field, before = "-", %after, "  field set");
        }

        let created = self
            .client
            .create(endpoint, &payload)
            .await
            .map_err(CoreError::remote(endpoint, lookup))?;
        self.counters.created.fetch_add(1, Ordering::Relaxed);

        if object_id(&created).is_some() {
            Ok(created)
        } else {
            // Dry-run placeholder: keep the desired fields for downstream logs.
            payload.extend(created);
            Ok(payload)
        }
    }
}
