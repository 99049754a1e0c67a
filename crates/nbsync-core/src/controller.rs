// ── Controller ──
//
// Facade over one NetBox connection. `connect` authenticates by ensuring
// the ownership tag; `sync` runs a full pass over a set of definitions and
// returns what happened.

use std::sync::Arc;

use nbsync_api::{NetBoxClient, TransportConfig};
use tracing::{info, warn};

use crate::apply::Applier;
use crate::cache::SiteCache;
use crate::config::SyncConfig;
use crate::devices::DeviceReconciler;
use crate::error::CoreError;
use crate::model::Definitions;
use crate::reconcile::{Context, device_types, foundation, network};
use crate::report::SyncReport;
use crate::tags::ensure_managed_tag;

pub struct Controller {
    client: Arc<NetBoxClient>,
    managed_tag: Option<u64>,
    patch_panel_role: String,
}

impl Controller {
    /// Build the client from `config` and ensure the ownership tag exists.
    pub async fn connect(config: SyncConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let mut client = NetBoxClient::new(config.url.as_str(), &config.token, &transport)?;
        client.set_dry_run(config.dry_run);
        Self::with_client(client, &config.patch_panel_role).await
    }

    /// Wrap an already-configured client.
    pub async fn with_client(
        client: NetBoxClient,
        patch_panel_role: &str,
    ) -> Result<Self, CoreError> {
        info!(url = %client.base_url(), dry_run = client.is_dry_run(), "connecting to NetBox");
        let managed_tag = ensure_managed_tag(&client).await?;
        if managed_tag.is_none() {
            warn!("ownership tag not available yet (dry-run), objects will not be tagged");
        }
        Ok(Self {
            client: Arc::new(client),
            managed_tag,
            patch_panel_role: patch_panel_role.to_owned(),
        })
    }

    pub fn client(&self) -> &NetBoxClient {
        &self.client
    }

    pub fn managed_tag(&self) -> Option<u64> {
        self.managed_tag
    }

    /// Run one full pass.
    ///
    /// Per-object failures land in the report. Only a failure to load the
    /// global caches aborts the pass, since nothing after it could resolve.
    pub async fn sync(&self, defs: &Definitions) -> Result<SyncReport, CoreError> {
        let applier = Applier::new(Arc::clone(&self.client), self.managed_tag);
        let cache = SiteCache::new();
        let ctx = Context::new(&applier, &cache);
        let mut report = SyncReport {
            dry_run: self.client.is_dry_run(),
            ..SyncReport::default()
        };

        info!(objects = defs.len(), "starting sync");

        // ── Foundation ──
        foundation::sync_tags(ctx, &defs.tags, &mut report).await;
        foundation::sync_roles(ctx, &defs.roles, &mut report).await;
        foundation::sync_manufacturers(ctx, &defs.manufacturers, &mut report).await;
        foundation::sync_sites(ctx, &defs.sites, &mut report).await;
        foundation::sync_racks(ctx, &defs.racks, &mut report).await;

        // ── Network ──
        network::sync_vrfs(ctx, &defs.vrfs, &mut report).await;
        network::sync_vlan_groups(ctx, &defs.vlan_groups, &mut report).await;
        network::sync_vlans(ctx, &defs.vlans, &mut report).await;
        network::sync_prefixes(ctx, &defs.prefixes, &mut report).await;

        // ── Device types ──
        device_types::sync_module_types(ctx, &defs.module_types, &mut report).await;
        device_types::sync_device_types(ctx, &defs.device_types, &mut report).await;

        // ── Caches ──
        cache.load_global(&self.client).await?;
        for site in defs.device_sites() {
            if let Err(e) = cache.load_site(&self.client, site).await {
                report.fail("site", site, &e);
            }
        }

        // ── Devices and cables ──
        let mut devices = DeviceReconciler::new(ctx, &self.patch_panel_role);
        devices.reconcile(&defs.devices, &mut report).await;

        report.objects = applier.stats();
        info!(
            created = report.objects.created,
            updated = report.objects.updated,
            unchanged = report.objects.unchanged,
            deleted = report.objects.deleted,
            failures = report.failures.len(),
            skipped_links = report.skipped_links.len(),
            "sync finished"
        );
        Ok(report)
    }
}

fn build_transport(config: &SyncConfig) -> TransportConfig {
    TransportConfig {
        tls: (&config.tls).into(),
        timeout: config.timeout,
    }
}
