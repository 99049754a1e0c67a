//! `nbsync sync`: one full reconciliation pass.

use tracing::info;

use nbsync_core::Controller;

use crate::cli::{GlobalOpts, SyncArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data_dir = config::resolve_data_dir(args.data_dir, global);
    let defs = super::load_checked(&data_dir)?;
    info!(data_dir = %data_dir.display(), objects = defs.len(), "declarations loaded");

    let sync_config = config::resolve_sync_config(global, args.dry_run)?;
    let controller = Controller::connect(sync_config).await?;
    let report = controller.sync(&defs).await?;

    let out = output::render(&global.output, &report, output::report_table);
    output::print_output(&out, global.quiet);

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            failures: report.failures.len(),
        })
    }
}
