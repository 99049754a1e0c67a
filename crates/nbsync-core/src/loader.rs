// ── Declaration loader ──
//
// Reads the YAML tree into typed `Definitions`. Each file holds a list of
// objects of the folder's kind; files are read recursively in sorted order
// so runs are reproducible.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::Definitions;

const DEVICE_DIRS: [&str; 2] = ["inventory/hardware/active", "inventory/hardware/passive"];

/// Load every declaration below `root`.
pub fn load_definitions(root: &Path) -> Result<Definitions, CoreError> {
    if !root.is_dir() {
        return Err(CoreError::Loader {
            path: root.to_path_buf(),
            message: "data directory does not exist".into(),
        });
    }
    let defs = root.join("definitions");

    let mut out = Definitions {
        tags: load_dir(&defs.join("extras"))?,
        roles: load_dir(&defs.join("roles"))?,
        manufacturers: load_dir(&defs.join("manufacturers"))?,
        sites: load_dir(&defs.join("sites"))?,
        racks: load_dir(&defs.join("racks"))?,
        vrfs: load_dir(&defs.join("vrfs"))?,
        vlan_groups: load_dir(&defs.join("vlan_groups"))?,
        vlans: load_dir(&defs.join("vlans"))?,
        prefixes: load_dir(&defs.join("prefixes"))?,
        module_types: load_dir(&defs.join("module_types"))?,
        device_types: load_dir(&defs.join("device_types"))?,
        devices: Vec::new(),
    };
    for dir in DEVICE_DIRS {
        out.devices.extend(load_dir(&root.join(dir))?);
    }

    debug!(root = %root.display(), objects = out.len(), "definitions loaded");
    Ok(out)
}

fn load_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, CoreError> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "definitions folder missing, skipping");
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    collect_yaml(dir, &mut files)?;
    files.sort();

    let mut items = Vec::new();
    for path in files {
        items.extend(load_file::<T>(&path)?);
    }
    Ok(items)
}

fn collect_yaml(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CoreError> {
    let io_err = |e: std::io::Error| CoreError::Loader {
        path: dir.to_path_buf(),
        message: e.to_string(),
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_yaml(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            out.push(path);
        }
    }
    Ok(())
}

fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CoreError> {
    let err = |message: String| CoreError::Loader {
        path: path.to_path_buf(),
        message,
    };
    let text = fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
    // An empty file parses as null.
    let items: Option<Vec<T>> = serde_yaml::from_str(&text).map_err(|e| err(e.to_string()))?;
    let items = items.unwrap_or_default();
    debug!(path = %path.display(), count = items.len(), "loaded file");
    Ok(items)
}

// ── Validation ───────────────────────────────────────────────────────

impl Definitions {
    /// Structural problems that would make a run misbehave.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for vlan in &self.vlans {
            if !(1..=4094).contains(&vlan.vid) {
                problems.push(format!("VLAN '{}' has vid {} outside 1..=4094", vlan.name, vlan.vid));
            }
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.name.as_str()) {
                problems.push(format!("device '{}' is declared more than once", device.name));
            }
            for fp in &device.front_ports {
                if fp.rear_port.trim().is_empty() {
                    problems.push(format!(
                        "front port '{}/{}' does not name a rear port",
                        device.name, fp.name
                    ));
                }
            }
            if device.parent_device.is_some() && device.device_bay.is_none() {
                problems.push(format!(
                    "device '{}' names a parent device but no device_bay",
                    device.name
                ));
            }
        }
        problems
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ValidationFailed {
                message: problems.join("; "),
            })
        }
    }
}
