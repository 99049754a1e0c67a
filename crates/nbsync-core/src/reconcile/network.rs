// VRFs, VLAN groups, VLANs and prefixes. Site-bound objects are always
// looked up and registered under their site's scope.

use nbsync_api::{Endpoint, Query};
use tracing::{info, warn};

use super::{Context, Payload};
use crate::cache::{Resource, Scope};
use crate::error::CoreError;
use crate::model::{Prefix, Vlan, VlanGroup, Vrf};
use crate::report::SyncReport;

fn site_id(ctx: Context<'_>, slug: &str) -> Result<u64, CoreError> {
    ctx.cache
        .get_global_id(Resource::Sites, slug)
        .ok_or_else(|| CoreError::NotFound {
            kind: "site",
            identifier: slug.to_owned(),
        })
}

pub async fn sync_vrfs(ctx: Context<'_>, vrfs: &[Vrf], report: &mut SyncReport) {
    info!(count = vrfs.len(), "reconciling VRFs");
    for vrf in vrfs {
        let payload = Payload::new()
            .set("name", vrf.name.as_str())
            .set("enforce_unique", vrf.enforce_unique)
            .opt("rd", vrf.rd.as_deref())
            .opt("description", vrf.description.as_deref())
            .tags(ctx.tag_ids(&vrf.name, &vrf.tags))
            .build();
        match ctx
            .applier
            .apply(Endpoint::Vrfs, &Query::new().eq("name", &vrf.name), payload)
            .await
        {
            Ok(applied) => ctx.cache.register(Resource::Vrfs, Scope::Global, &applied.object),
            Err(e) => report.fail("vrf", &vrf.name, &e),
        }
    }
}

pub async fn sync_vlan_groups(ctx: Context<'_>, groups: &[VlanGroup], report: &mut SyncReport) {
    info!(count = groups.len(), "reconciling VLAN groups");
    for group in groups {
        if let Err(e) = sync_vlan_group(ctx, group).await {
            report.fail("vlan_group", &group.slug, &e);
        }
    }
}

async fn sync_vlan_group(ctx: Context<'_>, group: &VlanGroup) -> Result<(), CoreError> {
    let site = group
        .site_slug
        .as_deref()
        .map(|slug| site_id(ctx, slug))
        .transpose()?;

    let payload = Payload::new()
        .set("name", group.name.as_str())
        .set("slug", group.slug.as_str())
        .opt("site", site)
        .opt("description", group.description.as_deref())
        .opt("min_vid", group.min_vid)
        .opt("max_vid", group.max_vid)
        .tags(ctx.tag_ids(&group.slug, &group.tags))
        .build();
    let applied = ctx
        .applier
        .apply(
            Endpoint::VlanGroups,
            &Query::new().eq("slug", &group.slug),
            payload,
        )
        .await?;

    let scope = site.map_or(Scope::Global, Scope::Site);
    ctx.cache.register(Resource::VlanGroups, scope, &applied.object);
    Ok(())
}

pub async fn sync_vlans(ctx: Context<'_>, vlans: &[Vlan], report: &mut SyncReport) {
    info!(count = vlans.len(), "reconciling VLANs");
    for vlan in vlans {
        if let Err(e) = sync_vlan(ctx, vlan).await {
            report.fail("vlan", &format!("{}/{}", vlan.site_slug, vlan.name), &e);
        }
    }
}

async fn sync_vlan(ctx: Context<'_>, vlan: &Vlan) -> Result<(), CoreError> {
    let site_id = site_id(ctx, &vlan.site_slug)?;

    // A group is looked up in the VLAN's site first, then among global groups.
    let group = vlan.group_slug.as_deref().and_then(|slug| {
        let id = ctx
            .cache
            .get_site_id(Resource::VlanGroups, site_id, slug)
            .or_else(|| ctx.cache.get_global_id(Resource::VlanGroups, slug));
        if id.is_none() {
            warn!(vlan = %vlan.name, group = slug, "VLAN group not found, leaving unset");
        }
        id
    });

    let payload = Payload::new()
        .set("name", vlan.name.as_str())
        .set("vid", vlan.vid)
        .set("site", site_id)
        .set("status", vlan.status.as_str())
        .opt("group", group)
        .opt("role", vlan.role.as_deref())
        .opt("description", vlan.description.as_deref())
        .tags(ctx.tag_ids(&vlan.name, &vlan.tags))
        .build();
    let lookup = Query::new().eq("site_id", site_id).eq("vid", vlan.vid);
    let applied = ctx.applier.apply(Endpoint::Vlans, &lookup, payload).await?;
    ctx.cache
        .register(Resource::Vlans, Scope::Site(site_id), &applied.object);
    Ok(())
}

pub async fn sync_prefixes(ctx: Context<'_>, prefixes: &[Prefix], report: &mut SyncReport) {
    info!(count = prefixes.len(), "reconciling prefixes");
    for prefix in prefixes {
        if let Err(e) = sync_prefix(ctx, prefix).await {
            report.fail("prefix", &prefix.prefix, &e);
        }
    }
}

async fn sync_prefix(ctx: Context<'_>, prefix: &Prefix) -> Result<(), CoreError> {
    let site = prefix
        .site_slug
        .as_deref()
        .map(|slug| site_id(ctx, slug))
        .transpose()?;
    let vrf = prefix
        .vrf_name
        .as_deref()
        .map(|name| {
            ctx.cache
                .get_global_id(Resource::Vrfs, name)
                .ok_or_else(|| CoreError::NotFound {
                    kind: "vrf",
                    identifier: name.to_owned(),
                })
        })
        .transpose()?;
    let vlan = match (prefix.vlan_name.as_deref(), site) {
        (Some(name), Some(site_id)) => {
            let id = ctx.cache.get_site_id(Resource::Vlans, site_id, name);
            if id.is_none() {
                warn!(prefix = %prefix.prefix, vlan = name, "VLAN not found at site, leaving unset");
            }
            id
        }
        (Some(name), None) => {
            warn!(prefix = %prefix.prefix, vlan = name, "VLAN needs a site_slug to resolve, leaving unset");
            None
        }
        (None, _) => None,
    };

    let payload = Payload::new()
        .set("prefix", prefix.prefix.as_str())
        .set("status", prefix.status.as_str())
        .set("is_pool", prefix.is_pool)
        .opt("site", site)
        .opt("vrf", vrf)
        .opt("vlan", vlan)
        .opt("role", prefix.role.as_deref())
        .opt("description", prefix.description.as_deref())
        .tags(ctx.tag_ids(&prefix.prefix, &prefix.tags))
        .build();

    let mut lookup = Query::new().eq("prefix", &prefix.prefix);
    if let Some(vrf) = vrf {
        lookup = lookup.eq("vrf_id", vrf);
    }
    ctx.applier.apply(Endpoint::Prefixes, &lookup, payload).await?;
    Ok(())
}
