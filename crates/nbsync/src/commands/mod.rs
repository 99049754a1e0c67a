//! Subcommand handlers.

pub mod config_cmd;
pub mod sync;
pub mod validate;

use std::path::Path;

use nbsync_core::{Definitions, load_definitions};

use crate::error::CliError;

/// Load and validate the declaration tree under `data_dir`.
pub(crate) fn load_checked(data_dir: &Path) -> Result<Definitions, CliError> {
    let defs = load_definitions(data_dir)?;
    let problems = defs.problems();
    if !problems.is_empty() {
        return Err(CliError::InvalidDefinitions {
            count: problems.len(),
            details: problems.join("\n"),
        });
    }
    Ok(defs)
}
