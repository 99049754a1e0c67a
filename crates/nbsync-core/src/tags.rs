// ── Ownership tag ──
//
// Every object this tool creates or updates carries the managed tag.
// Anything that later prunes must only touch objects carrying it.

use nbsync_api::{Endpoint, NetBoxClient, Object, Query, id_of, object_id};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::CoreError;

pub const MANAGED_TAG_SLUG: &str = "gitops";
pub const MANAGED_TAG_NAME: &str = "GitOps Managed";
pub const MANAGED_TAG_COLOR: &str = "4caf50";
pub const MANAGED_TAG_DESCRIPTION: &str = "Managed by GitOps Controller";

/// Look up the managed tag by slug, creating it when absent.
///
/// Returns `None` when no real id exists, which only happens in dry-run
/// against an instance that has never been synced. Callers then skip
/// tag injection entirely.
pub async fn ensure_managed_tag(client: &NetBoxClient) -> Result<Option<u64>, CoreError> {
    let query = Query::new().eq("slug", MANAGED_TAG_SLUG);
    if let Some(id) = lookup(client, &query).await? {
        return Ok(Some(id));
    }

    let mut payload = Object::new();
    payload.insert("slug".into(), MANAGED_TAG_SLUG.into());
    payload.insert("name".into(), MANAGED_TAG_NAME.into());
    payload.insert("color".into(), MANAGED_TAG_COLOR.into());
    payload.insert("description".into(), MANAGED_TAG_DESCRIPTION.into());

    match client.create(Endpoint::Tags, &payload).await {
        Ok(tag) => {
            let id = object_id(&tag);
            if id.is_some() {
                info!(slug = MANAGED_TAG_SLUG, "created managed tag");
            }
            Ok(id)
        }
        Err(e) => {
            // Someone else may have created it between lookup and create.
            warn!(error = %e, "managed tag creation failed, retrying lookup");
            match lookup(client, &query).await? {
                Some(id) => Ok(Some(id)),
                None => Err(CoreError::remote(Endpoint::Tags, &query)(e)),
            }
        }
    }
}

async fn lookup(client: &NetBoxClient, query: &Query) -> Result<Option<u64>, CoreError> {
    let tags = client
        .list(Endpoint::Tags, query)
        .await
        .map_err(CoreError::remote(Endpoint::Tags, query))?;
    Ok(tags.first().and_then(object_id))
}

/// Normalise `payload.tags` to an id list and append `tag_id` if missing.
pub fn inject_managed_tag(payload: &mut Object, tag_id: u64) {
    let mut ids: Vec<u64> = payload
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(id_of).collect())
        .unwrap_or_default();
    if !ids.contains(&tag_id) {
        ids.push(tag_id);
    }
    payload.insert(
        "tags".into(),
        Value::Array(ids.into_iter().map(Value::from).collect()),
    );
}

/// Whether `object` carries the managed tag, by id or by slug.
pub fn is_managed(object: &Object, tag_id: Option<u64>) -> bool {
    let Some(tags) = object.get("tags").and_then(Value::as_array) else {
        return false;
    };
    tags.iter().any(|tag| {
        tag_id.is_some_and(|id| id_of(tag) == Some(id))
            || tag.get("slug").and_then(Value::as_str) == Some(MANAGED_TAG_SLUG)
    })
}
