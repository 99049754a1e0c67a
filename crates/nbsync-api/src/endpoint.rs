// REST collections and exact-match filter queries.

use std::fmt;

/// A NetBox REST collection, addressed as `/api/{app}/{path}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    // ── dcim ──
    Sites,
    Racks,
    DeviceRoles,
    Manufacturers,
    DeviceTypes,
    ModuleTypes,
    Devices,
    Interfaces,
    FrontPorts,
    RearPorts,
    DeviceBays,
    ModuleBays,
    Modules,
    Cables,
    InterfaceTemplates,
    FrontPortTemplates,
    RearPortTemplates,
    ModuleBayTemplates,
    DeviceBayTemplates,
    // ── ipam ──
    Vrfs,
    VlanGroups,
    Vlans,
    Prefixes,
    IpAddresses,
    // ── extras ──
    Tags,
}

impl Endpoint {
    /// Application namespace (`dcim`, `ipam`, `extras`).
    pub fn app(self) -> &'static str {
        match self {
            Self::Vrfs | Self::VlanGroups | Self::Vlans | Self::Prefixes | Self::IpAddresses => {
                "ipam"
            }
            Self::Tags => "extras",
            _ => "dcim",
        }
    }

    /// Collection path segment within the application.
    pub fn path(self) -> &'static str {
        match self {
            Self::Sites => "sites",
            Self::Racks => "racks",
            Self::DeviceRoles => "device-roles",
            Self::Manufacturers => "manufacturers",
            Self::DeviceTypes => "device-types",
            Self::ModuleTypes => "module-types",
            Self::Devices => "devices",
            Self::Interfaces => "interfaces",
            Self::FrontPorts => "front-ports",
            Self::RearPorts => "rear-ports",
            Self::DeviceBays => "device-bays",
            Self::ModuleBays => "module-bays",
            Self::Modules => "modules",
            Self::Cables => "cables",
            Self::InterfaceTemplates => "interface-templates",
            Self::FrontPortTemplates => "front-port-templates",
            Self::RearPortTemplates => "rear-port-templates",
            Self::ModuleBayTemplates => "module-bay-templates",
            Self::DeviceBayTemplates => "device-bay-templates",
            Self::Vrfs => "vrfs",
            Self::VlanGroups => "vlan-groups",
            Self::Vlans => "vlans",
            Self::Prefixes => "prefixes",
            Self::IpAddresses => "ip-addresses",
            Self::Tags => "tags",
        }
    }

    /// Component templates reject the `tags` field.
    pub fn supports_tags(self) -> bool {
        !matches!(
            self,
            Self::InterfaceTemplates
                | Self::FrontPortTemplates
                | Self::RearPortTemplates
                | Self::ModuleBayTemplates
                | Self::DeviceBayTemplates
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app(), self.path())
    }
}

// ── Query ────────────────────────────────────────────────────────────

/// Exact-match list filters, sent as query parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key=value` filter.
    pub fn eq(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.pairs.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return f.write_str("{}");
        }
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}
