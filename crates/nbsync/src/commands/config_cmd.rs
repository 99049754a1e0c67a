//! Config subcommand handlers.

use std::io::BufRead;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "patch_panel_role = \"{}\"", cfg.defaults.patch_panel_role);
    if let Some(ref dir) = cfg.defaults.data_dir {
        let _ = writeln!(out, "data_dir = \"{}\"", dir.display());
    }

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref url) = p.url {
            let _ = writeln!(out, "url = \"{url}\"");
        }
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ref dir) = p.data_dir {
            let _ = writeln!(out, "data_dir = \"{}\"", dir.display());
        }
        if let Some(ref role) = p.patch_panel_role {
            let _ = writeln!(out, "patch_panel_role = \"{role}\"");
        }
    }

    out
}

/// Redacted copy for structured output.
fn redacted(cfg: &Config) -> Config {
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: nbsync_config::Defaults {
            output: cfg.defaults.output.clone(),
            insecure: cfg.defaults.insecure,
            timeout: cfg.defaults.timeout,
            data_dir: cfg.defaults.data_dir.clone(),
            patch_panel_role: cfg.defaults.patch_panel_role.clone(),
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let mut p = p.clone();
                if p.token.is_some() {
                    p.token = Some("****".into());
                }
                (name.clone(), p)
            })
            .collect(),
    }
}

fn profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render(&global.output, &cfg, format_config_redacted);
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init {
            url,
            token_env,
            data_dir,
            default,
        } => {
            nbsync_config::parse_url(&url)?;
            let mut cfg = config::load_config()?;
            let name = global.profile.clone().unwrap_or_else(|| "default".into());

            let profile = cfg.profiles.entry(name.clone()).or_insert_with(Profile::default);
            profile.url = Some(url);
            if token_env.is_some() {
                profile.token_env = token_env;
            }
            if data_dir.is_some() {
                profile.data_dir = data_dir;
            }
            if default || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Profile '{name}' written to {}", config::config_path().display());
                eprintln!("  Store a token with: nbsync config set-token --profile {name}");
            }
            Ok(())
        }

        // ── Set token ───────────────────────────────────────────────
        ConfigCommand::SetToken { token } => {
            let cfg = config::load_config()?;
            let name = profile_name(global, &cfg);

            let token = match token {
                Some(token) => token,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line.trim().to_owned()
                }
            };
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }

            nbsync_config::store_token(&name, &token)?;
            if !global.quiet {
                eprintln!("✓ Token for profile '{name}' stored in system keyring");
            }
            Ok(())
        }
    }
}
