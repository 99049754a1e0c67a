//! CLI configuration: thin wrapper around `nbsync_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --token, --insecure, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use nbsync_core::{SyncConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nbsync_config::{Config, Profile, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Load config and pick the active profile, honouring `--profile`.
pub fn active_profile(global: &GlobalOpts) -> Result<(Config, String, Profile), CliError> {
    let cfg = load_config()?;
    let (name, profile) = cfg
        .select_profile(global.profile.as_deref())
        .map_err(|e| match e {
            nbsync_config::ConfigError::ProfileNotFound { name } => {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                CliError::ProfileNotFound {
                    name,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                }
            }
            other => other.into(),
        })?;
    Ok((cfg, name, profile))
}

/// Translate the active profile + global flags into a `SyncConfig`.
///
/// CLI flag overrides take priority over environment and profile values.
pub fn resolve_sync_config(global: &GlobalOpts, dry_run: bool) -> Result<SyncConfig, CliError> {
    let (cfg, name, profile) = active_profile(global)?;
    let env = |key: &str| std::env::var(key).ok();

    // 1. URL (flag > NETBOX_URL > profile)
    let url = match global.url.as_deref() {
        Some(raw) => nbsync_config::parse_url(raw)?,
        None => nbsync_config::resolve_url_with(&profile, &name, env)?,
    };

    // 2. Token (flag > shared chain)
    let token = match global.token.as_ref() {
        Some(token) => SecretString::from(token.clone()),
        None => nbsync_config::resolve_token_with(&profile, &name, env)?,
    };

    let mut config = SyncConfig::new(url, token);

    // 3. TLS verification
    config.tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        nbsync_config::tls_for(&profile, &cfg.defaults)
    };

    // 4. Timeout (flag > profile > defaults)
    let secs = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    config.timeout = Duration::from_secs(secs);

    config.dry_run = dry_run;
    config.patch_panel_role = profile
        .patch_panel_role
        .clone()
        .unwrap_or_else(|| cfg.defaults.patch_panel_role.clone());
    Ok(config)
}

/// Data directory: flag, then profile/defaults, then the working directory.
pub fn resolve_data_dir(flag: Option<PathBuf>, global: &GlobalOpts) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    active_profile(global)
        .ok()
        .and_then(|(cfg, _, profile)| nbsync_config::data_dir_for(&profile, &cfg.defaults))
        .unwrap_or_else(|| PathBuf::from("."))
}
