use serde::{Deserialize, Serialize};

use super::yes;

fn one_unit() -> u32 {
    1
}

fn patch_port() -> String {
    "8p8c".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub mgmt_only: bool,
}

/// Front or rear port template. Front templates name their rear port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortTemplate {
    pub name: String,
    #[serde(rename = "type", default = "patch_port")]
    pub kind: String,
    #[serde(default)]
    pub rear_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleBayTemplate {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBayTemplate {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleType {
    pub model: String,
    pub slug: String,
    /// Manufacturer name; its slug is derived.
    pub manufacturer: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    pub model: String,
    pub slug: String,
    pub manufacturer: String,
    #[serde(default = "one_unit")]
    pub u_height: u32,
    #[serde(default = "yes")]
    pub is_full_depth: bool,
    /// `parent` or `child`.
    #[serde(default)]
    pub subdevice_role: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceTemplate>,
    #[serde(default)]
    pub front_ports: Vec<PortTemplate>,
    #[serde(default)]
    pub rear_ports: Vec<PortTemplate>,
    #[serde(default)]
    pub module_bays: Vec<ModuleBayTemplate>,
    #[serde(default)]
    pub device_bays: Vec<DeviceBayTemplate>,
}
