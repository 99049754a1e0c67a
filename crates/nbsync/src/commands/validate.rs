//! `nbsync validate`: load and check declarations offline.

use serde::Serialize;

use crate::cli::{GlobalOpts, ValidateArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Summary {
    tags: usize,
    roles: usize,
    manufacturers: usize,
    sites: usize,
    racks: usize,
    vrfs: usize,
    vlan_groups: usize,
    vlans: usize,
    prefixes: usize,
    module_types: usize,
    device_types: usize,
    devices: usize,
    links: usize,
}

pub fn handle(args: ValidateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data_dir = config::resolve_data_dir(args.data_dir, global);
    let defs = super::load_checked(&data_dir)?;

    let links = defs
        .devices
        .iter()
        .map(|d| {
            d.interfaces.iter().filter(|i| i.link.is_some()).count()
                + d.front_ports.iter().filter(|p| p.link.is_some()).count()
                + d.rear_ports.iter().filter(|p| p.link.is_some()).count()
        })
        .sum();
    let summary = Summary {
        tags: defs.tags.len(),
        roles: defs.roles.len(),
        manufacturers: defs.manufacturers.len(),
        sites: defs.sites.len(),
        racks: defs.racks.len(),
        vrfs: defs.vrfs.len(),
        vlan_groups: defs.vlan_groups.len(),
        vlans: defs.vlans.len(),
        prefixes: defs.prefixes.len(),
        module_types: defs.module_types.len(),
        device_types: defs.device_types.len(),
        devices: defs.devices.len(),
        links,
    };

    let out = output::render(&global.output, &summary, |s| {
        format!(
            "✓ {} objects valid ({} devices, {} links) in {}",
            defs.len(),
            s.devices,
            s.links,
            data_dir.display()
        )
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
