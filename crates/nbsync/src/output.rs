//! Output formatting: table, JSON, YAML.
//!
//! Renders sync reports in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use nbsync_core::SyncReport;

use crate::cli::OutputFormat;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a serde-serializable value, using `table_fn` for table output.
pub fn render<T>(format: &OutputFormat, data: &T, table_fn: impl Fn(&T) -> String) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => table_fn(data),
        OutputFormat::Json => render_json(data),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Sync report ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Objects")]
    what: &'static str,
    #[tabled(rename = "Count")]
    count: u64,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Tabled)]
struct SkippedRow {
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Peer")]
    peer: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Table view of a report: counters, then skipped links and failures.
pub fn report_table(report: &SyncReport) -> String {
    let counts = [
        ("created", report.objects.created),
        ("updated", report.objects.updated),
        ("unchanged", report.objects.unchanged),
        ("deleted", report.objects.deleted),
        ("cables created", report.cables.created),
        ("cables updated", report.cables.updated),
        ("cables unchanged", report.cables.unchanged + report.cables.already_connected),
    ]
    .into_iter()
    .map(|(what, count)| CountRow { what, count })
    .collect::<Vec<_>>();

    let mut out = String::new();
    if report.dry_run {
        out.push_str(&paint("DRY RUN: no changes were written", Tone::Warn));
        out.push('\n');
    }
    out.push_str(&render_table(&counts));

    if !report.skipped_links.is_empty() {
        let rows: Vec<_> = report
            .skipped_links
            .iter()
            .map(|s| SkippedRow {
                port: format!("{}[{}]", s.device, s.port),
                peer: format!("{}[{}]", s.peer_device, s.peer_port),
                reason: s.reason.clone(),
            })
            .collect();
        out.push_str("\n\n");
        out.push_str(&paint("Skipped links", Tone::Warn));
        out.push('\n');
        out.push_str(&render_table(&rows));
    }

    if !report.failures.is_empty() {
        let rows: Vec<_> = report
            .failures
            .iter()
            .map(|f| FailureRow {
                kind: f.kind.to_owned(),
                name: f.name.clone(),
                error: f.error.clone(),
            })
            .collect();
        out.push_str("\n\n");
        out.push_str(&paint("Failures", Tone::Error));
        out.push('\n');
        out.push_str(&render_table(&rows));
    }
    out
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: {e}"))
}

// ── Color helpers ────────────────────────────────────────────────────

enum Tone {
    Warn,
    Error,
}

fn paint(text: &str, tone: Tone) -> String {
    if !io::stdout().is_terminal() || std::env::var_os("NO_COLOR").is_some() {
        return text.to_owned();
    }
    match tone {
        Tone::Warn => text.yellow().bold().to_string(),
        Tone::Error => text.red().bold().to_string(),
    }
}
