//! Shared configuration for nbsync.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `nbsync_core::SyncConfig`. The CLI layers its flags on
//! top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nbsync_core::{DEFAULT_PATCH_PANEL_ROLE, SyncConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/token`.
pub const KEYRING_SERVICE: &str = "nbsync";
pub const TOKEN_ENV: &str = "NETBOX_TOKEN";
pub const URL_ENV: &str = "NETBOX_URL";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("no NetBox URL configured for profile '{profile}'")]
    NoUrl { profile: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named NetBox profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Root of the declaration tree.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_patch_panel_role")]
    pub patch_panel_role: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            data_dir: None,
            patch_panel_role: default_patch_panel_role(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_patch_panel_role() -> String {
    DEFAULT_PATCH_PANEL_ROLE.into()
}

/// A named NetBox profile. Every field may be left to the environment.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// NetBox base URL (e.g., "https://netbox.example.com").
    pub url: Option<String>,

    /// API token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override data directory.
    pub data_dir: Option<PathBuf>,

    /// Override the patch panel role slug.
    pub patch_panel_role: Option<String>,
}

impl Config {
    /// Pick the active profile: explicit name, then `default_profile`.
    ///
    /// An explicitly named profile must exist. The implicit default may be
    /// absent, in which case an empty profile leaves everything to the
    /// environment.
    pub fn select_profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .cloned()
                .map(|p| (name.to_owned(), p))
                .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() });
        }
        let name = self.default_profile.as_deref().unwrap_or("default");
        let profile = self.profiles.get(name).cloned().unwrap_or_default();
        Ok((name.to_owned(), profile))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "nbsync", "nbsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nbsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then merge `NBSYNC_*` variables (`__` separates
/// nesting, e.g. `NBSYNC_DEFAULTS__TIMEOUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NBSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the API token from the process environment and keyring.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_with(profile, profile_name, |key| std::env::var(key).ok())
}

/// Token chain with an injectable environment lookup.
pub fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Well-known env var
    if let Some(val) = env(TOKEN_ENV) {
        return Ok(SecretString::from(val));
    }

    // 2. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Some(val) = env(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

/// `NETBOX_URL`, then the profile's `url`.
pub fn resolve_url_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<url::Url, ConfigError> {
    let raw = env(URL_ENV)
        .or_else(|| profile.url.clone())
        .ok_or_else(|| ConfigError::NoUrl {
            profile: profile_name.into(),
        })?;
    parse_url(&raw)
}

pub fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// TLS mode from the profile, falling back to `defaults`.
pub fn tls_for(profile: &Profile, defaults: &Defaults) -> TlsVerification {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `SyncConfig` from a profile, no CLI flag overrides.
pub fn profile_to_sync_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SyncConfig, ConfigError> {
    let url = resolve_url_with(profile, profile_name, |key| std::env::var(key).ok())?;
    let token = resolve_token(profile, profile_name)?;

    let mut config = SyncConfig::new(url, token);
    config.tls = tls_for(profile, defaults);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.patch_panel_role = profile
        .patch_panel_role
        .clone()
        .unwrap_or_else(|| defaults.patch_panel_role.clone());
    Ok(config)
}

/// Data directory from the profile, then defaults.
pub fn data_dir_for(profile: &Profile, defaults: &Defaults) -> Option<PathBuf> {
    profile.data_dir.clone().or_else(|| defaults.data_dir.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[defaults]
timeout = 10

[profiles.lab]
url = "https://netbox.lab"
token_env = "LAB_TOKEN"
insecure = true
patch_panel_role = "panel"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        let (name, profile) = cfg.select_profile(None).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(profile.url.as_deref(), Some("https://netbox.lab"));
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(tls_for(&profile, &cfg.defaults), TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.defaults.patch_panel_role, "patch-panel");
    }

    #[test]
    fn explicit_profile_must_exist() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.select_profile(Some("prod")),
            Err(ConfigError::ProfileNotFound { .. })
        ));
        let (name, profile) = cfg.select_profile(None).unwrap();
        assert_eq!(name, "default");
        assert!(profile.url.is_none());
    }

    #[test]
    fn token_chain_prefers_well_known_env() {
        let profile = Profile {
            token: Some("plain".into()),
            token_env: Some("LAB_TOKEN".into()),
            ..Profile::default()
        };
        let env = env_of(&[("NETBOX_TOKEN", "from-env"), ("LAB_TOKEN", "from-profile-env")]);
        let token = resolve_token_with(&profile, "nbsync-test-unused", env).unwrap();
        assert_eq!(token.expose_secret(), "from-env");

        let env = env_of(&[("LAB_TOKEN", "from-profile-env")]);
        let token = resolve_token_with(&profile, "nbsync-test-unused", env).unwrap();
        assert_eq!(token.expose_secret(), "from-profile-env");
    }

    #[test]
    fn url_env_overrides_profile() {
        let profile = Profile {
            url: Some("https://from-profile".into()),
            ..Profile::default()
        };
        let url = resolve_url_with(&profile, "p", env_of(&[("NETBOX_URL", "https://from-env")])).unwrap();
        assert_eq!(url.as_str(), "https://from-env/");

        let url = resolve_url_with(&profile, "p", env_of(&[])).unwrap();
        assert_eq!(url.host_str(), Some("from-profile"));

        let err = resolve_url_with(&Profile::default(), "p", env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NoUrl { .. }));
    }

    #[test]
    fn save_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                url: Some("https://netbox.example.com".into()),
                ..Profile::default()
            },
        );
        save_config_to(&path, &cfg).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(
            loaded.profiles["default"].url.as_deref(),
            Some("https://netbox.example.com")
        );
    }
}
