// ── Runtime sync configuration ──
//
// Describes how to reach a NetBox instance and how a sync pass behaves.
// Built by the CLI from profiles and flags; core never reads config files.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Role slug that marks a device as a patch panel unless overridden.
pub const DEFAULT_PATCH_PANEL_ROLE: &str = "patch-panel";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed lab instances).
    DangerAcceptInvalid,
}

/// Configuration for one sync pass against a single NetBox instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// NetBox base URL (e.g., `https://netbox.example.com`).
    pub url: Url,
    /// API token.
    pub token: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Log every mutating call instead of performing it.
    pub dry_run: bool,
    /// Device role slug treated as a patch panel during cable planning.
    pub patch_panel_role: String,
}

impl SyncConfig {
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            dry_run: false,
            patch_panel_role: DEFAULT_PATCH_PANEL_ROLE.into(),
        }
    }
}

impl From<&TlsVerification> for nbsync_api::TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}
