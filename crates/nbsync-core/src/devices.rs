// ── Device/port orchestration ──
//
// Phase 1 applies every device with its bays, ports, interfaces, IPs and
// modules, and queues each declared link. Phase 2 runs only after all
// devices exist, so any device can be the peer of one processed earlier.

use std::collections::HashMap;

use nbsync_api::{Endpoint, Object, Query, id_of, object_id};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cable::{CableEndpoint, CableReconciler, TerminationKind};
use crate::cache::Resource;
use crate::error::CoreError;
use crate::model::{
    DeviceConfig, FrontPortConfig, InterfaceConfig, LinkIntent, ModuleConfig, RearPortConfig,
};
use crate::reconcile::{Context, Payload};
use crate::report::{SkippedLink, SyncReport};

// ── Link planning ────────────────────────────────────────────────────

/// Termination kinds for a link, decided by which ends are patch panels.
///
/// | source | peer | result |
/// |---|---|---|
/// | panel | panel | rear ↔ rear (backbone) |
/// | other | panel | source as declared ↔ front |
/// | panel | other | front ↔ interface |
/// | other | other | interface ↔ interface |
pub fn plan_link(
    source_kind: TerminationKind,
    source_is_panel: bool,
    peer_is_panel: bool,
) -> (TerminationKind, TerminationKind) {
    use TerminationKind::{FrontPort, Interface, RearPort};
    match (source_is_panel, peer_is_panel) {
        (true, true) => (RearPort, RearPort),
        (false, true) => (source_kind, FrontPort),
        (true, false) => (FrontPort, Interface),
        (false, false) => (Interface, Interface),
    }
}

// ── Registries ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct KnownDevice {
    id: u64,
    role: Option<String>,
}

#[derive(Debug, Clone)]
struct PendingLink {
    source: CableEndpoint,
    source_role: String,
    link: LinkIntent,
}

type PortKey = (String, String, TerminationKind);

// ── Reconciler ───────────────────────────────────────────────────────

/// Two-phase device reconciler for one run.
pub struct DeviceReconciler<'a> {
    ctx: Context<'a>,
    cables: CableReconciler<'a>,
    patch_panel_role: String,
    devices: HashMap<String, KnownDevice>,
    ports: HashMap<PortKey, u64>,
    pending: Vec<PendingLink>,
}

impl<'a> DeviceReconciler<'a> {
    pub fn new(ctx: Context<'a>, patch_panel_role: &str) -> Self {
        Self {
            ctx,
            cables: CableReconciler::new(ctx.applier),
            patch_panel_role: patch_panel_role.to_owned(),
            devices: HashMap::new(),
            ports: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Run both phases over `devices`.
    pub async fn reconcile(&mut self, devices: &[DeviceConfig], report: &mut SyncReport) {
        info!(count = devices.len(), "reconciling devices");

        // Chassis first so children can be installed into their bays.
        let (parents, children): (Vec<_>, Vec<_>) =
            devices.iter().partition(|d| d.parent_device.is_none());

        debug!("phase 1: devices and ports");
        for device in parents.into_iter().chain(children) {
            if let Err(e) = self.reconcile_device(device, report).await {
                report.fail("device", &device.name, &e);
            }
        }

        debug!(pending = self.pending.len(), "phase 2: cables");
        self.reconcile_links(report).await;
    }

    /// Number of queued link intents not yet consumed.
    pub fn pending_links(&self) -> usize {
        self.pending.len()
    }

    // ── Phase 1 ──────────────────────────────────────────────────────

    #[allow(clippy::too_many_lines)]
    async fn reconcile_device(
        &mut self,
        dev: &DeviceConfig,
        report: &mut SyncReport,
    ) -> Result<(), CoreError> {
        let cache = self.ctx.cache;
        let required = |resource: Resource, kind: &'static str, ident: &str| {
            cache
                .get_global_id(resource, ident)
                .ok_or_else(|| CoreError::NotFound {
                    kind,
                    identifier: ident.to_owned(),
                })
        };
        let site_id = required(Resource::Sites, "site", &dev.site_slug)?;
        let role_id = required(Resource::Roles, "role", &dev.role_slug)?;
        let type_id = required(Resource::DeviceTypes, "device type", &dev.device_type_slug)?;

        let rack = dev.rack_slug.as_deref().and_then(|slug| {
            let id = cache.get_site_id(Resource::Racks, site_id, slug);
            if id.is_none() {
                warn!(device = %dev.name, rack = slug, "rack not found at site, leaving unset");
            }
            id
        });

        let bay = match dev.parent_device.as_deref() {
            Some(parent) => Some(self.parent_bay(dev, parent).await?),
            None => None,
        };

        let mut payload = Payload::new()
            .set("name", dev.name.as_str())
            .set("site", site_id)
            .set("role", role_id)
            .set("device_type", type_id)
            .set("status", dev.status.as_str())
            .opt("rack", rack)
            .opt("serial", dev.serial.as_deref())
            .opt("asset_tag", dev.asset_tag.as_deref())
            .tags(self.ctx.tag_ids(&dev.name, &dev.tags));
        // Children sit in a bay, not at a rack position.
        if bay.is_none() && rack.is_some() {
            if let Some(position) = dev.position {
                payload = payload
                    .set("position", position)
                    .set("face", dev.face.as_deref().unwrap_or("front"));
            }
        }

        let lookup = Query::new().eq("name", &dev.name).eq("site_id", site_id);
        let applied = self
            .ctx
            .applier
            .apply(Endpoint::Devices, &lookup, payload.build())
            .await?;
        let Some(device_id) = applied.id() else {
            debug!(device = %dev.name, "device not created yet (dry-run), skipping components");
            return Ok(());
        };
        self.devices.insert(
            dev.name.clone(),
            KnownDevice {
                id: device_id,
                role: Some(dev.role_slug.clone()),
            },
        );

        if let Some(bay) = bay {
            self.install_into_bay(dev, device_id, &bay).await?;
        }
        self.heal_device_bays(dev, device_id, type_id).await?;

        for rp in &dev.rear_ports {
            if let Err(e) = self.rear_port(dev, device_id, rp).await {
                report.fail("rear_port", &format!("{}/{}", dev.name, rp.name), &e);
            }
        }
        for fp in &dev.front_ports {
            if let Err(e) = self.front_port(dev, device_id, fp).await {
                report.fail("front_port", &format!("{}/{}", dev.name, fp.name), &e);
            }
        }
        let mut device_obj = applied.object;
        for iface in &dev.interfaces {
            if let Err(e) = self
                .interface(dev, device_id, site_id, &mut device_obj, iface)
                .await
            {
                report.fail("interface", &format!("{}/{}", dev.name, iface.name), &e);
            }
        }
        for module in &dev.modules {
            if let Err(e) = self.module(dev, device_id, module).await {
                report.fail("module", &format!("{}/{}", dev.name, module.name), &e);
            }
        }
        Ok(())
    }

    /// Resolve the parent's device bay. A missing bay is a declaration defect.
    async fn parent_bay(&mut self, dev: &DeviceConfig, parent: &str) -> Result<Object, CoreError> {
        let Some(bay_name) = dev.device_bay.as_deref() else {
            return Err(CoreError::ValidationFailed {
                message: format!("{} names parent '{parent}' but no device_bay", dev.name),
            });
        };
        let parent_id = self
            .find_device(parent)
            .await?
            .map(|d| d.id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "parent device",
                identifier: parent.to_owned(),
            })?;

        let query = Query::new().eq("device_id", parent_id).eq("name", bay_name);
        let bays = self.list(Endpoint::DeviceBays, &query).await?;
        bays.into_iter()
            .next()
            .ok_or_else(|| CoreError::MissingDeviceBay {
                parent: parent.to_owned(),
                bay: bay_name.to_owned(),
            })
    }

    async fn install_into_bay(
        &self,
        dev: &DeviceConfig,
        device_id: u64,
        bay: &Object,
    ) -> Result<(), CoreError> {
        let Some(bay_id) = object_id(bay) else {
            return Ok(());
        };
        if bay.get("installed_device").and_then(id_of) == Some(device_id) {
            debug!(device = %dev.name, bay_id, "already installed in bay");
            return Ok(());
        }
        info!(device = %dev.name, bay_id, "installing into device bay");
        let mut changes = Object::new();
        changes.insert("installed_device".into(), device_id.into());
        self.ctx
            .applier
            .update(Endpoint::DeviceBays, bay_id, &changes)
            .await
    }

    /// Create bays the device type defines but the device lacks.
    async fn heal_device_bays(
        &self,
        dev: &DeviceConfig,
        device_id: u64,
        type_id: u64,
    ) -> Result<(), CoreError> {
        let templates = self
            .list(
                Endpoint::DeviceBayTemplates,
                &Query::new().eq("device_type_id", type_id),
            )
            .await?;
        if templates.is_empty() {
            return Ok(());
        }
        let existing = self
            .list(Endpoint::DeviceBays, &Query::new().eq("device_id", device_id))
            .await?;
        let present: Vec<&str> = existing
            .iter()
            .filter_map(|b| b.get("name").and_then(Value::as_str))
            .collect();

        for template in &templates {
            let Some(name) = template.get("name").and_then(Value::as_str) else {
                continue;
            };
            if present.contains(&name) {
                continue;
            }
            warn!(device = %dev.name, bay = name, "device bay missing, creating");
            let payload = Payload::new()
                .set("device", device_id)
                .set("name", name)
                .opt("label", template.get("label").and_then(Value::as_str).filter(|l| !l.is_empty()))
                .build();
            self.ctx.applier.create(Endpoint::DeviceBays, payload).await?;
        }
        Ok(())
    }

    async fn rear_port(
        &mut self,
        dev: &DeviceConfig,
        device_id: u64,
        rp: &RearPortConfig,
    ) -> Result<(), CoreError> {
        let payload = Payload::new()
            .set("device", device_id)
            .set("name", rp.name.as_str())
            .set("type", rp.kind.as_str())
            .set("positions", rp.positions)
            .opt("label", rp.label.as_deref())
            .opt("description", rp.description.as_deref())
            .tags(self.ctx.tag_ids(&rp.name, &rp.tags))
            .build();
        let id = self
            .apply_port(TerminationKind::RearPort, device_id, &rp.name, payload)
            .await?;
        self.record_port(dev, &rp.name, TerminationKind::RearPort, id, rp.link.as_ref());
        Ok(())
    }

    async fn front_port(
        &mut self,
        dev: &DeviceConfig,
        device_id: u64,
        fp: &FrontPortConfig,
    ) -> Result<(), CoreError> {
        let Some(rear_id) = self
            .resolve_port(&dev.name, device_id, &fp.rear_port, TerminationKind::RearPort)
            .await?
        else {
            warn!(device = %dev.name, front = %fp.name, rear = %fp.rear_port, "rear port not found, skipping front port");
            return Ok(());
        };

        let payload = Payload::new()
            .set("device", device_id)
            .set("name", fp.name.as_str())
            .set("type", fp.kind.as_str())
            .set("rear_port", rear_id)
            .set("rear_port_position", fp.rear_port_position)
            .opt("label", fp.label.as_deref())
            .opt("description", fp.description.as_deref())
            .tags(self.ctx.tag_ids(&fp.name, &fp.tags))
            .build();
        let id = self
            .apply_port(TerminationKind::FrontPort, device_id, &fp.name, payload)
            .await?;
        self.record_port(dev, &fp.name, TerminationKind::FrontPort, id, fp.link.as_ref());
        Ok(())
    }

    async fn interface(
        &mut self,
        dev: &DeviceConfig,
        device_id: u64,
        site_id: u64,
        device_obj: &mut Object,
        iface: &InterfaceConfig,
    ) -> Result<(), CoreError> {
        let vlan = |name: &str| {
            let id = self.ctx.cache.get_site_id(Resource::Vlans, site_id, name);
            if id.is_none() {
                warn!(device = %dev.name, interface = %iface.name, vlan = name, "VLAN not found at site");
            }
            id
        };
        let untagged = iface.untagged_vlan.as_deref().and_then(vlan);
        let tagged: Vec<u64> = iface.tagged_vlans.iter().filter_map(|v| vlan(v)).collect();

        let payload = Payload::new()
            .set("device", device_id)
            .set("name", iface.name.as_str())
            .set("type", iface.kind.as_str())
            .set("enabled", iface.enabled)
            .opt("label", iface.label.as_deref())
            .opt("description", iface.description.as_deref())
            .opt("mtu", iface.mtu)
            .opt("mode", iface.mode.as_deref())
            .opt("untagged_vlan", untagged)
            .opt("tagged_vlans", (!tagged.is_empty()).then_some(tagged))
            .tags(self.ctx.tag_ids(&iface.name, &iface.tags))
            .build();
        let id = self
            .apply_port(TerminationKind::Interface, device_id, &iface.name, payload)
            .await?;
        self.record_port(dev, &iface.name, TerminationKind::Interface, id, iface.link.as_ref());

        if let (Some(ip), Some(iface_id)) = (&iface.ip, id) {
            let vrf = ip.vrf.as_deref().and_then(|name| {
                let id = self.ctx.cache.get_global_id(Resource::Vrfs, name);
                if id.is_none() {
                    warn!(address = %ip.address, vrf = name, "VRF not found");
                }
                id
            });
            let payload = Payload::new()
                .set("address", ip.address.as_str())
                .set("status", ip.status.as_str())
                .set("assigned_object_type", TerminationKind::Interface.object_type())
                .set("assigned_object_id", iface_id)
                .opt("vrf", vrf)
                .opt("dns_name", ip.dns_name.as_deref())
                .opt("description", ip.description.as_deref())
                .tags(self.ctx.tag_ids(&ip.address, &ip.tags))
                .build();
            let mut lookup = Query::new().eq("address", &ip.address);
            if let Some(vrf) = vrf {
                lookup = lookup.eq("vrf_id", vrf);
            }
            let applied = self
                .ctx
                .applier
                .apply(Endpoint::IpAddresses, &lookup, payload)
                .await?;

            if let (true, Some(ip_id)) = (iface.is_primary(), applied.id()) {
                let field = if ip.address.contains(':') {
                    "primary_ip6"
                } else {
                    "primary_ip4"
                };
                if device_obj.get(field).and_then(id_of) != Some(ip_id) {
                    info!(device = %dev.name, address = %ip.address, field, "setting primary IP");
                    let mut changes = Object::new();
                    changes.insert(field.into(), ip_id.into());
                    self.ctx
                        .applier
                        .update(Endpoint::Devices, device_id, &changes)
                        .await?;
                    device_obj.insert(field.into(), ip_id.into());
                }
            }
        }
        Ok(())
    }

    async fn module(
        &self,
        dev: &DeviceConfig,
        device_id: u64,
        module: &ModuleConfig,
    ) -> Result<(), CoreError> {
        let Some(type_id) = self
            .ctx
            .cache
            .get_global_id(Resource::ModuleTypes, &module.module_type_slug)
        else {
            warn!(device = %dev.name, module_type = %module.module_type_slug, "module type not found, skipping module");
            return Ok(());
        };
        let bays = self
            .list(
                Endpoint::ModuleBays,
                &Query::new().eq("device_id", device_id).eq("name", &module.name),
            )
            .await?;
        let Some(bay_id) = bays.first().and_then(object_id) else {
            warn!(device = %dev.name, bay = %module.name, "module bay not found, skipping module");
            return Ok(());
        };

        let payload = Payload::new()
            .set("device", device_id)
            .set("module_bay", bay_id)
            .set("module_type", type_id)
            .set("status", module.status.as_str())
            .opt("serial", module.serial.as_deref())
            .opt("asset_tag", module.asset_tag.as_deref())
            .opt("description", module.description.as_deref())
            .tags(self.ctx.tag_ids(&module.name, &module.tags))
            .build();
        let lookup = Query::new()
            .eq("device_id", device_id)
            .eq("module_bay_id", bay_id);
        self.ctx
            .applier
            .apply(Endpoint::Modules, &lookup, payload)
            .await?;
        Ok(())
    }

    async fn apply_port(
        &self,
        kind: TerminationKind,
        device_id: u64,
        name: &str,
        payload: Object,
    ) -> Result<Option<u64>, CoreError> {
        let lookup = Query::new().eq("device_id", device_id).eq("name", name);
        let applied = self
            .ctx
            .applier
            .apply(kind.endpoint(), &lookup, payload)
            .await?;
        Ok(applied.id())
    }

    /// Remember an applied port and queue its link, if it has a real id.
    fn record_port(
        &mut self,
        dev: &DeviceConfig,
        port: &str,
        kind: TerminationKind,
        id: Option<u64>,
        link: Option<&LinkIntent>,
    ) {
        let Some(id) = id else { return };
        self.ports
            .insert((dev.name.clone(), port.to_owned(), kind), id);
        if let Some(link) = link {
            debug!(device = %dev.name, port, peer = %link.peer_device, peer_port = %link.peer_port, "queued link");
            self.pending.push(PendingLink {
                source: CableEndpoint::new(&dev.name, port, kind, id),
                source_role: dev.role_slug.clone(),
                link: link.clone(),
            });
        }
    }

    // ── Phase 2 ──────────────────────────────────────────────────────

    #[allow(clippy::too_many_lines)]
    async fn reconcile_links(&mut self, report: &mut SyncReport) {
        let pending = std::mem::take(&mut self.pending);
        info!(count = pending.len(), "reconciling cables");

        for intent in pending {
            let source = &intent.source;
            let link = &intent.link;
            let skip = |report: &mut SyncReport, reason: String| {
                warn!(device = %source.device, port = %source.port, peer = %link.peer_device, peer_port = %link.peer_port, %reason, "skipping link");
                report.skipped_links.push(SkippedLink {
                    device: source.device.clone(),
                    port: source.port.clone(),
                    peer_device: link.peer_device.clone(),
                    peer_port: link.peer_port.clone(),
                    reason,
                });
            };

            let peer = match self.find_device(&link.peer_device).await {
                Ok(Some(peer)) => peer,
                Ok(None) => {
                    skip(report, "peer device not found".into());
                    continue;
                }
                Err(e) => {
                    skip(report, e.to_string());
                    continue;
                }
            };

            let source_is_panel = intent.source_role == self.patch_panel_role;
            let peer_is_panel = peer.role.as_deref() == Some(self.patch_panel_role.as_str());
            let (source_kind, peer_kind) = plan_link(source.kind, source_is_panel, peer_is_panel);

            let a = if source_kind == source.kind {
                Some(source.clone())
            } else {
                let device_id = self.devices.get(&source.device).map(|d| d.id);
                match device_id {
                    Some(id) => self
                        .resolve_port(&source.device, id, &source.port, source_kind)
                        .await
                        .ok()
                        .flatten()
                        .map(|pid| CableEndpoint::new(&source.device, &source.port, source_kind, pid)),
                    None => None,
                }
            };
            let Some(a) = a else {
                skip(report, format!("source port not found as {source_kind}"));
                continue;
            };

            let b = match self
                .resolve_port(&link.peer_device, peer.id, &link.peer_port, peer_kind)
                .await
            {
                Ok(Some(id)) => CableEndpoint::new(&link.peer_device, &link.peer_port, peer_kind, id),
                Ok(None) => {
                    skip(report, format!("peer port not found as {peer_kind}"));
                    continue;
                }
                Err(e) => {
                    skip(report, e.to_string());
                    continue;
                }
            };

            match self.cables.reconcile(&a, &b, link).await {
                Ok(outcome) => report.cables.record(outcome),
                Err(e) => report.fail("cable", &format!("{a} <-> {b}"), &e),
            }
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Device by name: registry first, then the API.
    async fn find_device(&mut self, name: &str) -> Result<Option<KnownDevice>, CoreError> {
        if let Some(known) = self.devices.get(name) {
            return Ok(Some(known.clone()));
        }
        let found = self
            .list(Endpoint::Devices, &Query::new().eq("name", name))
            .await?;
        if found.len() > 1 {
            warn!(device = name, matches = found.len(), "device name is ambiguous, using first match");
        }
        let Some(obj) = found.first() else {
            return Ok(None);
        };
        let Some(id) = object_id(obj) else {
            return Ok(None);
        };
        let role = ["role", "device_role"].iter().find_map(|key| {
            obj.get(*key)
                .and_then(|r| r.get("slug"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
        let known = KnownDevice { id, role };
        self.devices.insert(name.to_owned(), known.clone());
        Ok(Some(known))
    }

    /// Port id by (device, name, kind): registry first, then the API.
    async fn resolve_port(
        &mut self,
        device: &str,
        device_id: u64,
        port: &str,
        kind: TerminationKind,
    ) -> Result<Option<u64>, CoreError> {
        let key = (device.to_owned(), port.to_owned(), kind);
        if let Some(&id) = self.ports.get(&key) {
            return Ok(Some(id));
        }
        let found = self
            .list(
                kind.endpoint(),
                &Query::new().eq("device_id", device_id).eq("name", port),
            )
            .await?;
        let id = found.first().and_then(object_id);
        if let Some(id) = id {
            self.ports.insert(key, id);
        }
        Ok(id)
    }

    async fn list(&self, endpoint: Endpoint, query: &Query) -> Result<Vec<Object>, CoreError> {
        self.ctx
            .applier
            .client()
            .list(endpoint, query)
            .await
            .map_err(CoreError::remote(endpoint, query))
    }
}
