// ── Scoped identifier cache ──
//
// Resolves declared identifiers (slug, name, model, label) to remote ids.
// Site-scoped resources are keyed by (resource, site id, identifier) so the
// same VLAN or rack name at two sites never collapses into one entry.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use nbsync_api::{Endpoint, NetBoxClient, Object, Query, object_id};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Resource families held in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    Sites,
    Roles,
    DeviceTypes,
    ModuleTypes,
    Manufacturers,
    Vrfs,
    Tags,
    Vlans,
    Racks,
    VlanGroups,
}

impl Resource {
    /// Collection backing this resource.
    pub fn endpoint(self) -> Endpoint {
        match self {
            Self::Sites => Endpoint::Sites,
            Self::Roles => Endpoint::DeviceRoles,
            Self::DeviceTypes => Endpoint::DeviceTypes,
            Self::ModuleTypes => Endpoint::ModuleTypes,
            Self::Manufacturers => Endpoint::Manufacturers,
            Self::Vrfs => Endpoint::Vrfs,
            Self::Tags => Endpoint::Tags,
            Self::Vlans => Endpoint::Vlans,
            Self::Racks => Endpoint::Racks,
            Self::VlanGroups => Endpoint::VlanGroups,
        }
    }
}

/// Resources loaded by [`SiteCache::load_global`].
const GLOBAL_RESOURCES: [Resource; 7] = [
    Resource::Sites,
    Resource::Roles,
    Resource::DeviceTypes,
    Resource::ModuleTypes,
    Resource::Manufacturers,
    Resource::Vrfs,
    Resource::Tags,
];

/// Resources loaded per site by [`SiteCache::load_site`].
const SITE_RESOURCES: [Resource; 3] = [Resource::Vlans, Resource::Racks, Resource::VlanGroups];

/// Namespace an identifier resolves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Site(u64),
}

type Key = (Resource, Scope, String);

/// Identifier → id cache for one sync run.
///
/// Constructed empty, filled by the `load_*` calls and by reconcilers
/// registering what they apply, then dropped with the run. All access goes
/// through one mutex so it can be shared across tasks.
#[derive(Debug, Default)]
pub struct SiteCache {
    entries: Mutex<HashMap<Key, u64>>,
}

impl SiteCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Bulk-fetch every global collection and index it.
    pub async fn load_global(&self, client: &NetBoxClient) -> Result<(), CoreError> {
        info!("loading global caches");
        for resource in GLOBAL_RESOURCES {
            self.load(client, resource, &Query::new(), Scope::Global).await?;
        }
        Ok(())
    }

    /// Resolve `site_slug`, then load its VLANs, racks and VLAN groups
    /// under `Scope::Site(id)`. Returns the site id.
    pub async fn load_site(&self, client: &NetBoxClient, site_slug: &str) -> Result<u64, CoreError> {
        let site_id = match self.get_global_id(Resource::Sites, site_slug) {
            Some(id) => id,
            None => {
                self.load(client, Resource::Sites, &Query::new(), Scope::Global)
                    .await?;
                self.get_global_id(Resource::Sites, site_slug)
                    .ok_or_else(|| CoreError::NotFound {
                        kind: "site",
                        identifier: site_slug.to_owned(),
                    })?
            }
        };
        info!(site = site_slug, site_id, "loading site caches");

        let scope = Scope::Site(site_id);
        for resource in SITE_RESOURCES {
            let query = Query::new().eq("site_id", site_id);
            self.load(client, resource, &query, scope).await?;
        }

        // VLAN groups without a site are global.
        let unscoped = Query::new().eq("site_id", "null");
        if let Err(e) = self
            .load(client, Resource::VlanGroups, &unscoped, Scope::Global)
            .await
        {
            warn!(error = %e, "failed to load global VLAN groups");
        }

        Ok(site_id)
    }

    async fn load(
        &self,
        client: &NetBoxClient,
        resource: Resource,
        query: &Query,
        scope: Scope,
    ) -> Result<(), CoreError> {
        let endpoint = resource.endpoint();
        let objects = client
            .list(endpoint, query)
            .await
            .map_err(CoreError::remote(endpoint, query))?;

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut indexed = 0usize;
        for obj in &objects {
            let Some(id) = object_id(obj) else { continue };
            for identifier in identifiers(obj) {
                entries.insert((resource, scope, identifier.to_owned()), id);
            }
            indexed += 1;
        }
        debug!(%resource, ?scope, count = indexed, "cache loaded");
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn get_global_id(&self, resource: Resource, identifier: &str) -> Option<u64> {
        self.get(resource, Scope::Global, identifier)
    }

    /// Site-scoped lookup. There is no fallback to the global scope.
    pub fn get_site_id(&self, resource: Resource, site_id: u64, identifier: &str) -> Option<u64> {
        self.get(resource, Scope::Site(site_id), identifier)
    }

    pub fn get(&self, resource: Resource, scope: Scope, identifier: &str) -> Option<u64> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(resource, scope, identifier.to_owned()))
            .copied()
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Record an id under one identifier.
    pub fn insert(&self, resource: Resource, scope: Scope, identifier: &str, id: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert((resource, scope, identifier.to_owned()), id);
    }

    /// Record an applied object under every identifier it carries.
    /// Objects without a real id (dry-run placeholders) are ignored.
    pub fn register(&self, resource: Resource, scope: Scope, object: &Object) {
        let Some(id) = object_id(object) else { return };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for identifier in identifiers(object) {
            entries.insert((resource, scope, identifier.to_owned()), id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slug, plus the first of name / model / label.
fn identifiers(obj: &Object) -> Vec<&str> {
    let text = |key: &str| obj.get(key).and_then(Value::as_str);
    let mut out = Vec::with_capacity(2);
    if let Some(slug) = text("slug") {
        out.push(slug);
    }
    if let Some(name) = text("name").or_else(|| text("model")).or_else(|| text("label")) {
        out.push(name);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn same_name_at_two_sites_stays_distinct() {
        let cache = SiteCache::new();
        cache.insert(Resource::Vlans, Scope::Site(1), "idrac", 75);
        cache.insert(Resource::Vlans, Scope::Site(2), "idrac", 74);

        assert_eq!(cache.get_site_id(Resource::Vlans, 1, "idrac"), Some(75));
        assert_eq!(cache.get_site_id(Resource::Vlans, 2, "idrac"), Some(74));
        assert_eq!(cache.get_global_id(Resource::Vlans, "idrac"), None);
    }

    #[test]
    fn site_lookup_never_falls_back_to_global() {
        let cache = SiteCache::new();
        cache.insert(Resource::VlanGroups, Scope::Global, "core", 9);
        assert_eq!(cache.get_site_id(Resource::VlanGroups, 1, "core"), None);
    }

    #[test]
    fn register_indexes_slug_and_name() {
        let cache = SiteCache::new();
        cache.register(
            Resource::Roles,
            Scope::Global,
            &obj(json!({"id": 3, "slug": "patch-panel", "name": "Patch Panel"})),
        );
        assert_eq!(cache.get_global_id(Resource::Roles, "patch-panel"), Some(3));
        assert_eq!(cache.get_global_id(Resource::Roles, "Patch Panel"), Some(3));
    }

    #[test]
    fn register_falls_back_to_model() {
        let cache = SiteCache::new();
        cache.register(
            Resource::DeviceTypes,
            Scope::Global,
            &obj(json!({"id": 8, "slug": "r750", "model": "PowerEdge R750"})),
        );
        assert_eq!(cache.get_global_id(Resource::DeviceTypes, "PowerEdge R750"), Some(8));
    }

    #[test]
    fn dry_run_placeholders_are_not_registered() {
        let cache = SiteCache::new();
        cache.register(Resource::Sites, Scope::Global, &obj(json!({"id": 0, "slug": "dc1"})));
        assert!(cache.is_empty());
    }

    #[test]
    fn resource_names_are_snake_case() {
        assert_eq!(Resource::VlanGroups.to_string(), "vlan_groups");
        assert_eq!(Resource::DeviceTypes.as_ref(), "device_types");
    }
}
