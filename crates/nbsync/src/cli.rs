//! Clap derive structures for the `nbsync` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nbsync -- converge NetBox to declared YAML inventory
#[derive(Debug, Parser)]
#[command(
    name = "nbsync",
    version,
    about = "Sync NetBox inventory from declarative YAML",
    long_about = "Reads sites, racks, devices, ports and cables from a YAML tree and\n\
        converges a NetBox instance to match. Objects it creates carry an\n\
        ownership tag; nothing it does not declare is removed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "NBSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// NetBox URL (overrides profile and NETBOX_URL)
    #[arg(long, short = 'u', global = true)]
    pub url: Option<String>,

    /// API token (overrides NETBOX_TOKEN, keyring and profile)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "NBSYNC_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NBSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NBSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converge NetBox to the declared inventory
    Sync(SyncArgs),

    /// Load and check declarations without contacting NetBox
    Validate(ValidateArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sync / Validate ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Log intended writes without performing them
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Root of the declaration tree (contains definitions/ and inventory/)
    #[arg(long, short = 'd', env = "NBSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Root of the declaration tree (contains definitions/ and inventory/)
    #[arg(long, short = 'd', env = "NBSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Create or update a profile
    Init {
        /// NetBox base URL
        #[arg(long)]
        url: String,

        /// Environment variable holding the API token
        #[arg(long)]
        token_env: Option<String>,

        /// Root of the declaration tree
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Store an API token in the system keyring (reads stdin if omitted)
    SetToken {
        /// Token value
        token: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
