use serde::{Deserialize, Serialize};

use super::{active, yes};

fn cat6a() -> String {
    "cat6a".into()
}

fn copper() -> String {
    "1000base-t".into()
}

fn fiber() -> String {
    "lc".into()
}

fn one() -> u32 {
    1
}

/// A declared cable from the owning port to `peer_device`/`peer_port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkIntent {
    pub peer_device: String,
    pub peer_port: String,
    #[serde(default = "cat6a")]
    pub cable_type: String,
    /// Color name or hex; see [`crate::color::Color`].
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    /// Applied only with `length`; defaults to metres.
    #[serde(default)]
    pub length_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpConfig {
    /// CIDR notation, e.g. `10.0.0.1/24`.
    pub address: String,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub vrf: Option<String>,
    #[serde(default)]
    pub address_role: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    #[serde(rename = "type", default = "copper")]
    pub kind: String,
    #[serde(default = "yes")]
    pub enabled: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub link: Option<LinkIntent>,
    /// `access`, `tagged` or `tagged-all`.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub untagged_vlan: Option<String>,
    #[serde(default)]
    pub tagged_vlans: Vec<String>,
    #[serde(default)]
    pub ip: Option<IpConfig>,
    /// `primary` makes the IP the device's primary address.
    #[serde(default)]
    pub address_role: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl InterfaceConfig {
    pub fn is_primary(&self) -> bool {
        let primary = |role: Option<&String>| role.is_some_and(|r| r == "primary");
        primary(self.address_role.as_ref())
            || primary(self.ip.as_ref().and_then(|ip| ip.address_role.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RearPortConfig {
    pub name: String,
    #[serde(rename = "type", default = "fiber")]
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "one")]
    pub positions: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub link: Option<LinkIntent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontPortConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Rear port on the same device this front port maps onto.
    pub rear_port: String,
    #[serde(default = "one")]
    pub rear_port_position: u32,
    #[serde(default)]
    pub link: Option<LinkIntent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module bay name on the device.
    pub name: String,
    pub module_type_slug: String,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub asset_tag: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub site_slug: String,
    pub device_type_slug: String,
    pub role_slug: String,

    // ── Rack placement ──
    #[serde(default)]
    pub rack_slug: Option<String>,
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(default)]
    pub face: Option<String>,

    // ── Chassis placement ──
    #[serde(default)]
    pub parent_device: Option<String>,
    #[serde(default)]
    pub device_bay: Option<String>,

    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub asset_tag: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub front_ports: Vec<FrontPortConfig>,
    #[serde(default)]
    pub rear_ports: Vec<RearPortConfig>,
}
