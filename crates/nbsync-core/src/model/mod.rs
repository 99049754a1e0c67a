// ── Declared state ──
//
// Typed forms of the YAML declarations. Everything here is plain data;
// reconcilers turn it into API payloads.

pub mod device_types;
pub mod devices;
pub mod foundation;
pub mod network;

pub use device_types::{
    DeviceBayTemplate, DeviceType, InterfaceTemplate, ModuleBayTemplate, ModuleType, PortTemplate,
};
pub use devices::{
    DeviceConfig, FrontPortConfig, InterfaceConfig, IpConfig, LinkIntent, ModuleConfig,
    RearPortConfig,
};
pub use foundation::{Manufacturer, Rack, Role, Site, Tag};
pub use network::{Prefix, Vlan, VlanGroup, Vrf};

use serde::{Deserialize, Serialize};

/// Every declaration loaded for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub tags: Vec<Tag>,
    pub roles: Vec<Role>,
    pub manufacturers: Vec<Manufacturer>,
    pub sites: Vec<Site>,
    pub racks: Vec<Rack>,
    pub vrfs: Vec<Vrf>,
    pub vlan_groups: Vec<VlanGroup>,
    pub vlans: Vec<Vlan>,
    pub prefixes: Vec<Prefix>,
    pub module_types: Vec<ModuleType>,
    pub device_types: Vec<DeviceType>,
    pub devices: Vec<DeviceConfig>,
}

impl Definitions {
    /// Site slugs referenced by devices, sorted and deduplicated.
    pub fn device_sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = self.devices.iter().map(|d| d.site_slug.as_str()).collect();
        sites.sort_unstable();
        sites.dedup();
        sites
    }

    /// Total number of declared objects, components excluded.
    pub fn len(&self) -> usize {
        self.tags.len()
            + self.roles.len()
            + self.manufacturers.len()
            + self.sites.len()
            + self.racks.len()
            + self.vrfs.len()
            + self.vlan_groups.len()
            + self.vlans.len()
            + self.prefixes.len()
            + self.module_types.len()
            + self.device_types.len()
            + self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowercase, spaces to dashes.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

pub(crate) fn active() -> String {
    "active".into()
}

pub(crate) fn yes() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Dell Inc"), "dell-inc");
        assert_eq!(slugify(" NVIDIA "), "nvidia");
    }
}
