//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nbsync_config::ConfigError;
use nbsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INCOMPLETE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to NetBox at {url}")]
    #[diagnostic(
        code(nbsync::connection_failed),
        help(
            "Check that NetBox is running and reachable.\n\
             Reason: {reason}\n\
             Self-signed certificate? Use --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(nbsync::timeout),
        help("Increase the timeout with --timeout or check NetBox responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(nbsync::auth_failed),
        help(
            "Verify the API token has write permission.\n\
             Store a new one with: nbsync config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(nbsync::no_credentials),
        help(
            "Set NETBOX_TOKEN, pass --token, or run: nbsync config set-token --profile {profile}"
        )
    )]
    NoCredentials { profile: String },

    #[error("No NetBox URL configured for profile '{profile}'")]
    #[diagnostic(
        code(nbsync::no_url),
        help("Set NETBOX_URL, pass --url, or run: nbsync config init --url <URL>")
    )]
    NoUrl { profile: String },

    // ── Resolution ───────────────────────────────────────────────────
    #[error("{kind} '{identifier}' not found")]
    #[diagnostic(
        code(nbsync::not_found),
        help("Declare it under definitions/ or create it in NetBox first.")
    )]
    NotFound { kind: String, identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("NetBox API error: {message}")]
    #[diagnostic(code(nbsync::api_error))]
    ApiError { message: String },

    // ── Declarations ─────────────────────────────────────────────────
    #[error("Failed to load declarations: {message}")]
    #[diagnostic(
        code(nbsync::loader),
        help("While reading {path}")
    )]
    Loader { path: String, message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nbsync::validation))]
    Validation { field: String, reason: String },

    #[error("{count} declaration problem(s) found")]
    #[diagnostic(code(nbsync::invalid_definitions), help("{details}"))]
    InvalidDefinitions { count: usize, details: String },

    // ── Run outcome ──────────────────────────────────────────────────
    #[error("Sync finished with {failures} failure(s)")]
    #[diagnostic(
        code(nbsync::incomplete),
        help("Re-run with -v for details; converged objects were kept.")
    )]
    Incomplete { failures: usize },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nbsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: nbsync config init --url <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(nbsync::config))]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoUrl { .. } | Self::InvalidDefinitions { .. } => {
                exit_code::USAGE
            }
            Self::Incomplete { .. } => exit_code::INCOMPLETE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_timeout() {
            return CliError::Timeout;
        }
        if err.is_auth_failure() {
            return CliError::AuthFailed {
                message: err.to_string(),
            };
        }
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::NotFound { kind, identifier } => CliError::NotFound {
                kind: kind.into(),
                identifier,
            },

            CoreError::Loader { path, message } => CliError::Loader {
                path: path.display().to_string(),
                message,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "definitions".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Config { message },

            err @ (CoreError::Remote { .. }
            | CoreError::AuthenticationFailed { .. }
            | CoreError::InvalidEndpoint { .. }
            | CoreError::MissingDeviceBay { .. }) => {
                if err.is_connection_failure() {
                    CliError::ConnectionFailed {
                        url: String::new(),
                        reason: err.to_string(),
                    }
                } else {
                    CliError::ApiError {
                        message: err.to_string(),
                    }
                }
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::NoUrl { profile } => CliError::NoUrl { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_stable_exit_codes() {
        let not_found = CliError::from(CoreError::NotFound {
            kind: "site",
            identifier: "dc9".into(),
        });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let auth = CliError::from(CoreError::AuthenticationFailed {
            message: "Invalid token".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let conn = CliError::from(CoreError::ConnectionFailed {
            url: "https://netbox".into(),
            reason: "refused".into(),
        });
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);

        assert_eq!(CliError::Incomplete { failures: 2 }.exit_code(), exit_code::INCOMPLETE);
    }

    #[test]
    fn config_errors_keep_their_meaning() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "lab".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
