// Async HTTP client for the NetBox REST API.
//
// Base path: /api/{app}/{endpoint}/
// Auth: Authorization: Token <secret>

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::object::Object;
use crate::transport::TransportConfig;

/// Page size requested on list calls. Larger collections are followed via `next`.
const PAGE_LIMIT: u32 = 1000;

// ── Response shapes ──────────────────────────────────────────────────

/// Paginated list envelope: `{ "count": N, "next": url|null, "results": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Page {
        #[serde(default)]
        next: Option<String>,
        results: Vec<Object>,
    },
    Bare(Vec<Object>),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for a single NetBox instance.
///
/// In dry-run mode every mutating call is logged and skipped; reads still
/// hit the server so diffs are computed against real state.
pub struct NetBoxClient {
    http: reqwest::Client,
    base_url: Url,
    dry_run: bool,
}

impl NetBoxClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and API token.
    ///
    /// Injects `Authorization: Token <secret>` as a default header.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            dry_run: false,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            dry_run: false,
        })
    }

    /// Accept `https://host`, `https://host/` or `https://host/api/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        let path = path.strip_suffix("/api").unwrap_or(&path).to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn collection_url(&self, endpoint: Endpoint) -> Result<Url, Error> {
        Ok(self
            .base_url
            .join(&format!("api/{}/{}/", endpoint.app(), endpoint.path()))?)
    }

    fn object_url(&self, endpoint: Endpoint, id: u64) -> Result<Url, Error> {
        Ok(self
            .base_url
            .join(&format!("api/{}/{}/{id}/", endpoint.app(), endpoint.path()))?)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// List every object matching `query`, following `next` links.
    ///
    /// Accepts both the paginated envelope and a bare JSON array.
    pub async fn list(&self, endpoint: Endpoint, query: &Query) -> Result<Vec<Object>, Error> {
        let base = self.collection_url(endpoint)?;
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query.pairs() {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("limit", &PAGE_LIMIT.to_string());
        }

        let mut all = Vec::new();
        loop {
            debug!("GET {url}");
            let resp = self.http.get(url.clone()).send().await?;
            let body: ListBody = self.handle_response(resp).await?;
            match body {
                ListBody::Bare(items) => {
                    all.extend(items);
                    break;
                }
                ListBody::Page { next, results } => {
                    all.extend(results);
                    let Some(next) = next else { break };
                    // Keep our own origin; only the cursor query is taken from `next`.
                    let next = Url::parse(&next)?;
                    let mut following = base.clone();
                    following.set_query(next.query());
                    url = following;
                }
            }
        }
        Ok(all)
    }

    /// Fetch one object by id. A 404 yields `None`.
    pub async fn get(&self, endpoint: Endpoint, id: u64) -> Result<Option<Object>, Error> {
        let url = self.object_url(endpoint, id)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        match self.handle_response(resp).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Create an object. In dry-run mode returns `{ "id": 0 }`.
    pub async fn create(&self, endpoint: Endpoint, payload: &Object) -> Result<Object, Error> {
        if self.dry_run {
            info!(dry_run = true, %endpoint, payload = %serde_json::Value::Object(payload.clone()), "would create");
            let mut placeholder = Object::new();
            placeholder.insert("id".into(), Value::from(0));
            return Ok(placeholder);
        }

        let url = self.collection_url(endpoint)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(payload).send().await?;
        self.handle_response(resp).await
    }

    /// Partially update an object (PATCH).
    pub async fn update(&self, endpoint: Endpoint, id: u64, changes: &Object) -> Result<(), Error> {
        if self.dry_run {
            info!(dry_run = true, %endpoint, id, changes = %serde_json::Value::Object(changes.clone()), "would update");
            return Ok(());
        }

        let url = self.object_url(endpoint, id)?;
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(changes).send().await?;
        self.handle_empty(resp).await
    }

    /// Delete an object by id.
    pub async fn delete(&self, endpoint: Endpoint, id: u64) -> Result<(), Error> {
        if self.dry_run {
            info!(dry_run = true, %endpoint, id, "would delete");
            return Ok(());
        }

        let url = self.object_url(endpoint, id)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = preview(&body);
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&raw)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    preview(&raw).to_owned()
                }
            });

        match status {
            reqwest::StatusCode::UNAUTHORIZED => Error::Authentication { message },
            reqwest::StatusCode::FORBIDDEN => Error::PermissionDenied { message },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_api_suffix() {
        let url = NetBoxClient::normalize_base_url("https://netbox.example/api/").unwrap();
        assert_eq!(url.as_str(), "https://netbox.example/");
        let url = NetBoxClient::normalize_base_url("https://host/netbox").unwrap();
        assert_eq!(url.as_str(), "https://host/netbox/");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert!(preview(&body).len() <= 200);
    }
}
