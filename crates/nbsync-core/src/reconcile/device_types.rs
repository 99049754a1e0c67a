// Module types, device types and their component templates.

use std::collections::HashMap;

use nbsync_api::{Endpoint, Query};
use tracing::{debug, info, warn};

use super::{Context, Payload};
use crate::cache::{Resource, Scope};
use crate::error::CoreError;
use crate::model::{DeviceType, ModuleType, slugify};
use crate::report::SyncReport;

/// Resolve a manufacturer by slug or name, creating it when unknown.
async fn ensure_manufacturer(ctx: Context<'_>, name: &str) -> Result<Option<u64>, CoreError> {
    let slug = slugify(name);
    if let Some(id) = ctx
        .cache
        .get_global_id(Resource::Manufacturers, name)
        .or_else(|| ctx.cache.get_global_id(Resource::Manufacturers, &slug))
    {
        return Ok(Some(id));
    }

    let payload = Payload::new()
        .set("name", name)
        .set("slug", slug.as_str())
        .build();
    let applied = ctx
        .applier
        .apply(Endpoint::Manufacturers, &Query::new().eq("slug", &slug), payload)
        .await?;
    ctx.cache
        .register(Resource::Manufacturers, Scope::Global, &applied.object);
    Ok(applied.id())
}

pub async fn sync_module_types(ctx: Context<'_>, types: &[ModuleType], report: &mut SyncReport) {
    info!(count = types.len(), "reconciling module types");
    for mt in types {
        if let Err(e) = sync_module_type(ctx, mt).await {
            report.fail("module_type", &mt.slug, &e);
        }
    }
}

async fn sync_module_type(ctx: Context<'_>, mt: &ModuleType) -> Result<(), CoreError> {
    let manufacturer = ensure_manufacturer(ctx, &mt.manufacturer).await?;
    let payload = Payload::new()
        .set("model", mt.model.as_str())
        .set("slug", mt.slug.as_str())
        .opt("manufacturer", manufacturer)
        .opt("description", mt.description.as_deref())
        .tags(ctx.tag_ids(&mt.slug, &mt.tags))
        .build();
    let applied = ctx
        .applier
        .apply(Endpoint::ModuleTypes, &Query::new().eq("slug", &mt.slug), payload)
        .await?;
    ctx.cache
        .register(Resource::ModuleTypes, Scope::Global, &applied.object);
    Ok(())
}

pub async fn sync_device_types(ctx: Context<'_>, types: &[DeviceType], report: &mut SyncReport) {
    info!(count = types.len(), "reconciling device types");
    for dt in types {
        match sync_device_type(ctx, dt).await {
            Ok(Some(id)) => sync_templates(ctx, id, dt, report).await,
            Ok(None) => debug!(slug = %dt.slug, "device type not created yet, skipping templates"),
            Err(e) => report.fail("device_type", &dt.slug, &e),
        }
    }
}

async fn sync_device_type(ctx: Context<'_>, dt: &DeviceType) -> Result<Option<u64>, CoreError> {
    let manufacturer = ensure_manufacturer(ctx, &dt.manufacturer).await?;
    let payload = Payload::new()
        .set("model", dt.model.as_str())
        .set("slug", dt.slug.as_str())
        .opt("manufacturer", manufacturer)
        .set("u_height", dt.u_height)
        .set("is_full_depth", dt.is_full_depth)
        .opt("subdevice_role", dt.subdevice_role.as_deref())
        .tags(ctx.tag_ids(&dt.slug, &dt.tags))
        .build();
    let applied = ctx
        .applier
        .apply(Endpoint::DeviceTypes, &Query::new().eq("slug", &dt.slug), payload)
        .await?;
    ctx.cache
        .register(Resource::DeviceTypes, Scope::Global, &applied.object);
    Ok(applied.id())
}

/// Templates in dependency order: rear ports before the front ports
/// that map onto them, then interfaces, module bays, device bays.
async fn sync_templates(ctx: Context<'_>, type_id: u64, dt: &DeviceType, report: &mut SyncReport) {
    let lookup = |name: &str| Query::new().eq("device_type_id", type_id).eq("name", name);
    let base = |name: &str| Payload::new().set("device_type", type_id).set("name", name);
    let label = |template: &str| format!("{}/{template}", dt.slug);

    let mut rear_ids: HashMap<&str, u64> = HashMap::new();
    for rp in &dt.rear_ports {
        let payload = base(&rp.name)
            .set("type", rp.kind.as_str())
            .set("positions", 1)
            .build();
        match ctx
            .applier
            .apply(Endpoint::RearPortTemplates, &lookup(&rp.name), payload)
            .await
        {
            Ok(applied) => {
                if let Some(id) = applied.id() {
                    rear_ids.insert(rp.name.as_str(), id);
                }
            }
            Err(e) => report.fail("rear_port_template", &label(&rp.name), &e),
        }
    }

    for fp in &dt.front_ports {
        let mut payload = base(&fp.name).set("type", fp.kind.as_str());
        if let Some(rear) = fp.rear_port.as_deref() {
            let Some(&rear_id) = rear_ids.get(rear) else {
                warn!(device_type = %dt.slug, front = %fp.name, rear, "rear port template missing, skipping front port");
                continue;
            };
            payload = payload.set("rear_port", rear_id).set("rear_port_position", 1);
        }
        if let Err(e) = ctx
            .applier
            .apply(Endpoint::FrontPortTemplates, &lookup(&fp.name), payload.build())
            .await
        {
            report.fail("front_port_template", &label(&fp.name), &e);
        }
    }

    for iface in &dt.interfaces {
        let payload = base(&iface.name)
            .set("type", iface.kind.as_str())
            .set("mgmt_only", iface.mgmt_only)
            .build();
        if let Err(e) = ctx
            .applier
            .apply(Endpoint::InterfaceTemplates, &lookup(&iface.name), payload)
            .await
        {
            report.fail("interface_template", &label(&iface.name), &e);
        }
    }

    for bay in &dt.module_bays {
        let payload = base(&bay.name)
            .opt("label", bay.label.as_deref())
            .opt("description", bay.description.as_deref())
            .opt("position", bay.position.as_deref())
            .build();
        if let Err(e) = ctx
            .applier
            .apply(Endpoint::ModuleBayTemplates, &lookup(&bay.name), payload)
            .await
        {
            report.fail("module_bay_template", &label(&bay.name), &e);
        }
    }

    for bay in &dt.device_bays {
        let payload = base(&bay.name)
            .opt("label", bay.label.as_deref())
            .opt("description", bay.description.as_deref())
            .build();
        if let Err(e) = ctx
            .applier
            .apply(Endpoint::DeviceBayTemplates, &lookup(&bay.name), payload)
            .await
        {
            report.fail("device_bay_template", &label(&bay.name), &e);
        }
    }
}
