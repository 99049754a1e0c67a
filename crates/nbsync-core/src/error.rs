// ── Core error types ──
//
// Errors surfaced by the reconciliation engine. Transport failures are
// wrapped with the endpoint and lookup that triggered them so a failed
// object can be traced back to its declaration.

use std::path::PathBuf;

use nbsync_api::Endpoint;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to NetBox at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Remote errors (annotated) ────────────────────────────────────
    #[error("{endpoint} [{context}]: {source}")]
    Remote {
        endpoint: Endpoint,
        context: String,
        #[source]
        source: nbsync_api::Error,
    },

    // ── Resolution errors ────────────────────────────────────────────
    /// A mandatory dependency could not be resolved to an id.
    #[error("{kind} not found: {identifier}")]
    NotFound {
        kind: &'static str,
        identifier: String,
    },

    // ── Invariant violations ─────────────────────────────────────────
    #[error("Invalid cable endpoint: {reason}")]
    InvalidEndpoint { reason: String },

    #[error("Device bay '{bay}' not found on parent device '{parent}'")]
    MissingDeviceBay { parent: String, bay: String },

    // ── Declaration errors ───────────────────────────────────────────
    #[error("Failed to load {}: {message}", path.display())]
    Loader { path: PathBuf, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Build a closure that annotates an API error with its endpoint and lookup.
    ///
    /// ```ignore
    /// client.list(endpoint, &query).await.map_err(CoreError::remote(endpoint, &query))?;
    /// ```
    pub fn remote(
        endpoint: Endpoint,
        context: impl ToString,
    ) -> impl FnOnce(nbsync_api::Error) -> Self {
        let context = context.to_string();
        move |source| Self::Remote {
            endpoint,
            context,
            source,
        }
    }

    /// Returns `true` if the server rejected the token.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. } => true,
            Self::Remote { source, .. } => source.is_auth_failure(),
            _ => false,
        }
    }

    /// Returns `true` if the server could not be reached at all.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::Remote {
                source: nbsync_api::Error::Transport(e),
                ..
            } => e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if a request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Remote { source: nbsync_api::Error::Transport(e), .. } if e.is_timeout()
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nbsync_api::Error> for CoreError {
    fn from(err: nbsync_api::Error) -> Self {
        match err {
            nbsync_api::Error::Authentication { message }
            | nbsync_api::Error::PermissionDenied { message } => {
                CoreError::AuthenticationFailed { message }
            }
            nbsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            nbsync_api::Error::Tls(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            nbsync_api::Error::Transport(ref e) if e.is_connect() => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            other => CoreError::ConnectionFailed {
                url: String::new(),
                reason: other.to_string(),
            },
        }
    }
}
