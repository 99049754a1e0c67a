use serde::{Deserialize, Serialize};

use super::active;

fn default_color() -> String {
    "9e9e9e".into()
}

fn utc() -> String {
    "UTC".into()
}

fn rack_height() -> u32 {
    42
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub vm_role: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub slug: String,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default = "utc")]
    pub time_zone: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rack {
    pub name: String,
    /// Identifier devices use in `rack_slug`; defaults to the name.
    #[serde(default)]
    pub slug: Option<String>,
    pub site_slug: String,
    #[serde(default = "rack_height")]
    pub u_height: u32,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
