//! Admin dashboard API client.
//!
//! Defines the injectable [`ApiClient`] seam the session store and fetch
//! hooks are built against, plus the `reqwest`-backed [`HttpClient`]
//! implementation with base-URL normalisation, a shared bearer-token slot,
//! and mapping of transport/status failures to typed [`Error`] values.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

use crate::error::Error;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Injectable client seam
// ---------------------------------------------------------------------------

/// Abstraction over the admin dashboard REST collaborator.
///
/// Paths include the leading slash, e.g. `/menus` or `/auth/login`. All
/// methods resolve to the JSON response body (`Value::Null` for empty 2xx
/// responses) or a typed [`Error`].
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, Error>;
    async fn post(&self, path: &str, body: &Value) -> Result<Value, Error>;
    async fn put(&self, path: &str, body: &Value) -> Result<Value, Error>;
    async fn delete(&self, path: &str) -> Result<Value, Error>;

    /// Install or clear the bearer token used for authenticated requests.
    /// The session store is the only caller.
    fn set_auth_token(&self, token: Option<&str>);
}

/// Paginated list envelope returned by collection endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the admin dashboard base URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly `Error::Network`.
fn friendly_error(url: &str, err: &reqwest::Error) -> Error {
    if err.is_connect() {
        return Error::Network(format!("Cannot reach admin dashboard at {url}"));
    }
    if err.is_timeout() {
        return Error::Network(format!("Connection to {url} timed out"));
    }
    if err.is_builder() {
        return Error::Network(format!("Invalid admin dashboard URL: {url}"));
    }
    Error::Network(format!("Network error communicating with {url}: {err}"))
}

/// Generic message for a non-2xx status without a usable JSON body.
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Session is invalid or expired".to_string(),
        403 => "Not authorized for this resource".to_string(),
        404 => "Admin dashboard endpoint not found".to_string(),
        s if s >= 500 => format!("Admin dashboard server error (HTTP {s})"),
        s => format!("Unexpected response from admin dashboard (HTTP {s})"),
    }
}

/// Map a non-2xx response to a typed error, preferring the `message` (or
/// `error`) field of a JSON body when the collaborator provides one.
fn status_error(status: StatusCode, body_text: &str) -> Error {
    let message = serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| status_message(status));

    match status.as_u16() {
        401 => Error::SessionExpired,
        403 => Error::Forbidden,
        400 | 422 => Error::Validation(message),
        s => Error::Api { status: s, message },
    }
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// HTTP implementation of [`ApiClient`] against the admin dashboard.
pub struct HttpClient {
    base_url: String,
    client: Client,
    token: Mutex<Option<String>>,
}

impl HttpClient {
    /// Build a client for the given base URL (normalised per
    /// [`normalize_base_url`]).
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: normalize_base_url(base_url),
            client,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let full_url = format!("{}/api{path}", self.base_url);

        let mut req = self
            .client
            .request(method, &full_url)
            .header("Accept", "application/json");

        if !query.is_empty() {
            req = req.query(query);
        }
        let token = self.token.lock().map(|t| t.clone()).unwrap_or_default();
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let err = status_error(status, &body_text);
            warn!(path, status = status.as_u16(), error = %err, "admin dashboard request failed");
            return Err(err);
        }

        // Empty 204-style responses resolve to null.
        if body_text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, Error> {
        self.request(reqwest::Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.request(reqwest::Method::POST, path, &[], Some(body))
            .await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.request(reqwest::Method::PUT, path, &[], Some(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.request(reqwest::Method::DELETE, path, &[], None).await
    }

    fn set_auth_token(&self, token: Option<&str>) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = token.map(|t| t.to_string());
        }
    }
}
