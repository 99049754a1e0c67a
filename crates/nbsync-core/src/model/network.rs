use serde::{Deserialize, Serialize};

use super::{active, yes};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vrf {
    pub name: String,
    #[serde(default)]
    pub rd: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "yes")]
    pub enforce_unique: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanGroup {
    pub name: String,
    pub slug: String,
    /// Groups without a site are global.
    #[serde(default)]
    pub site_slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_vid: Option<u16>,
    #[serde(default)]
    pub max_vid: Option<u16>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vlan {
    pub vid: u16,
    pub name: String,
    pub site_slug: String,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub group_slug: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub prefix: String,
    #[serde(default)]
    pub site_slug: Option<String>,
    #[serde(default)]
    pub vrf_name: Option<String>,
    /// Resolved within `site_slug`; ignored without one.
    #[serde(default)]
    pub vlan_name: Option<String>,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_pool: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
