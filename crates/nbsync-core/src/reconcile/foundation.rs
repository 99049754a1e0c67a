// Tags, roles, manufacturers, sites and racks.

use nbsync_api::{Endpoint, Query};
use tracing::info;

use super::{Context, Payload};
use crate::cache::{Resource, Scope};
use crate::color::Color;
use crate::error::CoreError;
use crate::model::{Manufacturer, Rack, Role, Site, Tag};
use crate::report::SyncReport;

fn color(raw: &str) -> Result<String, CoreError> {
    raw.parse::<Color>()
        .map(|c| c.as_hex().to_owned())
        .map_err(|e| CoreError::ValidationFailed {
            message: e.to_string(),
        })
}

pub async fn sync_tags(ctx: Context<'_>, tags: &[Tag], report: &mut SyncReport) {
    info!(count = tags.len(), "reconciling tags");
    for tag in tags {
        if let Err(e) = sync_tag(ctx, tag).await {
            report.fail("tag", &tag.slug, &e);
        }
    }
}

async fn sync_tag(ctx: Context<'_>, tag: &Tag) -> Result<(), CoreError> {
    let payload = Payload::new()
        .set("name", tag.name.as_str())
        .set("slug", tag.slug.as_str())
        .set("color", color(&tag.color)?)
        .set("description", tag.description.as_str())
        .build();
    let applied = ctx
        .applier
        .apply(Endpoint::Tags, &Query::new().eq("slug", &tag.slug), payload)
        .await?;
    ctx.cache.register(Resource::Tags, Scope::Global, &applied.object);
    Ok(())
}

pub async fn sync_roles(ctx: Context<'_>, roles: &[Role], report: &mut SyncReport) {
    info!(count = roles.len(), "reconciling roles");
    for role in roles {
        if let Err(e) = sync_role(ctx, role).await {
            report.fail("role", &role.slug, &e);
        }
    }
}

async fn sync_role(ctx: Context<'_>, role: &Role) -> Result<(), CoreError> {
    let payload = Payload::new()
        .set("name", role.name.as_str())
        .set("slug", role.slug.as_str())
        .set("color", color(&role.color)?)
        .set("vm_role", role.vm_role)
        .opt("description", role.description.as_deref())
        .build();
    let applied = ctx
        .applier
        .apply(
            Endpoint::DeviceRoles,
            &Query::new().eq("slug", &role.slug),
            payload,
        )
        .await?;
    ctx.cache.register(Resource::Roles, Scope::Global, &applied.object);
    Ok(())
}

pub async fn sync_manufacturers(
    ctx: Context<'_>,
    manufacturers: &[Manufacturer],
    report: &mut SyncReport,
) {
    info!(count = manufacturers.len(), "reconciling manufacturers");
    for mfg in manufacturers {
        let payload = Payload::new()
            .set("name", mfg.name.as_str())
            .set("slug", mfg.slug.as_str())
            .opt("description", mfg.description.as_deref())
            .tags(ctx.tag_ids(&mfg.slug, &mfg.tags))
            .build();
        match ctx
            .applier
            .apply(
                Endpoint::Manufacturers,
                &Query::new().eq("slug", &mfg.slug),
                payload,
            )
            .await
        {
            Ok(applied) => {
                ctx.cache
                    .register(Resource::Manufacturers, Scope::Global, &applied.object);
            }
            Err(e) => report.fail("manufacturer", &mfg.slug, &e),
        }
    }
}

pub async fn sync_sites(ctx: Context<'_>, sites: &[Site], report: &mut SyncReport) {
    info!(count = sites.len(), "reconciling sites");
    for site in sites {
        let payload = Payload::new()
            .set("name", site.name.as_str())
            .set("slug", site.slug.as_str())
            .set("status", site.status.as_str())
            .set("time_zone", site.time_zone.as_str())
            .opt("description", site.description.as_deref())
            .opt("comments", site.comments.as_deref())
            .tags(ctx.tag_ids(&site.slug, &site.tags))
            .build();
        match ctx
            .applier
            .apply(Endpoint::Sites, &Query::new().eq("slug", &site.slug), payload)
            .await
        {
            Ok(applied) => ctx.cache.register(Resource::Sites, Scope::Global, &applied.object),
            Err(e) => report.fail("site", &site.slug, &e),
        }
    }
}

pub async fn sync_racks(ctx: Context<'_>, racks: &[Rack], report: &mut SyncReport) {
    info!(count = racks.len(), "reconciling racks");
    for rack in racks {
        if let Err(e) = sync_rack(ctx, rack).await {
            report.fail("rack", &rack.name, &e);
        }
    }
}

async fn sync_rack(ctx: Context<'_>, rack: &Rack) -> Result<(), CoreError> {
    let site_id = ctx
        .cache
        .get_global_id(Resource::Sites, &rack.site_slug)
        .ok_or_else(|| CoreError::NotFound {
            kind: "site",
            identifier: rack.site_slug.clone(),
        })?;

    let payload = Payload::new()
        .set("name", rack.name.as_str())
        .set("site", site_id)
        .set("status", rack.status.as_str())
        .set("u_height", rack.u_height)
        .opt("width", rack.width)
        .opt("description", rack.description.as_deref())
        .tags(ctx.tag_ids(&rack.name, &rack.tags))
        .build();
    let lookup = Query::new().eq("site_id", site_id).eq("name", &rack.name);
    let applied = ctx.applier.apply(Endpoint::Racks, &lookup, payload).await?;

    let scope = Scope::Site(site_id);
    ctx.cache.register(Resource::Racks, scope, &applied.object);
    if let (Some(slug), Some(id)) = (&rack.slug, applied.id()) {
        ctx.cache.insert(Resource::Racks, scope, slug, id);
    }
    Ok(())
}
