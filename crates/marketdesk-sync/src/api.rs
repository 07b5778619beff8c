//! # REST API Client
//!
//! Thin JSON wrapper over one REST root. Each feature area owns one
//! [`ApiClient`] tagged with its service name (`rentals`, `purchases`, ...).
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get / post / put / patch / delete                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  send(method, path, params, body, cancel)                               │
//! │        │  Accept: application/json, session cookies                     │
//! │        │  Content-Type: application/json (when a body is sent)          │
//! │        ▼                                                                │
//! │  ┌──────────────────────┐     cancel fired ──► Err(Cancelled)           │
//! │  │ select! { send, ◄────┼──── CancellationToken                        │
//! │  │           cancel }   │                                               │
//! │  └──────────┬───────────┘                                               │
//! │             │                                                           │
//! │     ┌───────┴────────┬───────────────────┬───────────────────┐          │
//! │     ▼                ▼                   ▼                   ▼          │
//! │  2xx JSON        2xx other           non-2xx           no response      │
//! │  Some(value)     None                Server {          Transport {      │
//! │                                        status,           "Unable to     │
//! │                                        message }         reach X" }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries and no caching happen here.

use std::sync::Arc;
use std::time::Duration;

use marketdesk_core::{ListMeta, QueryParams};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiSettings;
use crate::error::{WorkspaceError, WorkspaceResult};

const JSON: &str = "application/json";

// =============================================================================
// Response Envelope
// =============================================================================

/// `{ data, meta? }` wrapper every endpoint responds with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,

    #[serde(default)]
    pub meta: Option<ListMeta>,
}

impl<T> Envelope<T> {
    /// The server's `meta`, or a total of `len` when it left `meta` out.
    pub fn meta_or_total(&self, len: usize) -> ListMeta {
        self.meta.clone().unwrap_or_else(|| ListMeta {
            total: u32::try_from(len).unwrap_or(u32::MAX),
            ..ListMeta::default()
        })
    }
}

// =============================================================================
// Request Paths
// =============================================================================

/// Path under the base URL: a literal resource root plus segments.
///
/// Segments are escaped one by one when the URL is built, so an id holding
/// `/`, `?`, `#` or spaces stays a single path segment.
///
/// ```rust
/// use marketdesk_sync::ApiPath;
///
/// let path = ApiPath::new("/api/admin/rentals").segment("r-101").segment("approve");
/// assert_eq!(path.segments(), ["r-101", "approve"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath {
    root: String,
    segments: Vec<String>,
}

impl ApiPath {
    pub fn new(root: impl Into<String>) -> Self {
        ApiPath {
            root: root.into(),
            segments: Vec::new(),
        }
    }

    /// Appends one segment, escaped when the URL is built.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl From<&str> for ApiPath {
    fn from(root: &str) -> Self {
        ApiPath::new(root)
    }
}

// =============================================================================
// API Client
// =============================================================================

/// JSON client bound to one service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    service: &'static str,
}

impl ApiClient {
    /// Builds a client with a cookie store seeded from the settings.
    pub fn new(settings: &ApiSettings, service: &'static str) -> WorkspaceResult<Self> {
        let base = Url::parse(&settings.base_url)?;

        let jar = reqwest::cookie::Jar::default();
        if let Some(cookie) = &settings.session_cookie {
            jar.add_cookie_str(cookie, &base);
        }

        let client = Client::builder()
            .cookie_provider(Arc::new(jar))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| WorkspaceError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base, service))
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn with_client(client: Client, base: Url, service: &'static str) -> Self {
        ApiClient { client, base, service }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    pub async fn get(
        &self,
        path: impl Into<ApiPath>,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> WorkspaceResult<Option<Value>> {
        self.send::<Value>(Method::GET, path, params, None, cancel).await
    }

    pub async fn post<B>(&self, path: impl Into<ApiPath>, body: Option<&B>, cancel: &CancellationToken) -> WorkspaceResult<Option<Value>>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::POST, path, &QueryParams::new(), body, cancel).await
    }

    pub async fn put<B>(&self, path: impl Into<ApiPath>, body: Option<&B>, cancel: &CancellationToken) -> WorkspaceResult<Option<Value>>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::PUT, path, &QueryParams::new(), body, cancel).await
    }

    pub async fn patch<B>(&self, path: impl Into<ApiPath>, body: Option<&B>, cancel: &CancellationToken) -> WorkspaceResult<Option<Value>>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::PATCH, path, &QueryParams::new(), body, cancel).await
    }

    pub async fn delete(&self, path: impl Into<ApiPath>, cancel: &CancellationToken) -> WorkspaceResult<Option<Value>> {
        self.send::<Value>(Method::DELETE, path, &QueryParams::new(), None, cancel).await
    }

    /// Issues one request and classifies the outcome.
    pub async fn send<B>(
        &self,
        method: Method,
        path: impl Into<ApiPath>,
        params: &QueryParams,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> WorkspaceResult<Option<Value>>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(&path.into(), params)?;

        let mut request = self.client.request(method.clone(), url.clone()).header(ACCEPT, JSON);
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| WorkspaceError::Decode {
                service: self.service.to_string(),
                reason: format!("request body: {}", e),
            })?;
            request = request.header(CONTENT_TYPE, JSON).body(bytes);
        }

        debug!(service = self.service, %method, %url, "API request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(service = self.service, %method, %url, "API request cancelled");
                return Err(WorkspaceError::Cancelled);
            }
            result = request.send() => result.map_err(|e| self.transport(e))?,
        };

        self.read_response(response, cancel).await
    }

    async fn read_response(&self, response: Response, cancel: &CancellationToken) -> WorkspaceResult<Option<Value>> {
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkspaceError::Cancelled),
            result = response.bytes() => result.map_err(|e| self.transport(e))?,
        };

        debug!(service = self.service, status = status.as_u16(), len = bytes.len(), "API response");

        if status.is_success() {
            if !is_json || bytes.is_empty() {
                return Ok(None);
            }
            let value = serde_json::from_slice(&bytes).map_err(|e| self.decode_error(e))?;
            return Ok(Some(value));
        }

        let details: Option<Value> = if is_json {
            serde_json::from_slice(&bytes).ok()
        } else {
            None
        };

        let message = details
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        warn!(service = self.service, status = status.as_u16(), %message, "API request rejected");

        Err(WorkspaceError::Server {
            status: status.as_u16(),
            message,
            details,
        })
    }

    // =========================================================================
    // Decoding Helpers
    // =========================================================================

    /// Decodes a `{ data, meta? }` body.
    pub fn envelope<T: DeserializeOwned>(&self, body: Option<Value>) -> WorkspaceResult<Envelope<T>> {
        let body = body.ok_or_else(|| WorkspaceError::Decode {
            service: self.service.to_string(),
            reason: "empty response body".to_string(),
        })?;
        serde_json::from_value(body).map_err(|e| self.decode_error(e))
    }

    /// Decodes a `{ data }` body and returns `data`.
    pub fn data<T: DeserializeOwned>(&self, body: Option<Value>) -> WorkspaceResult<T> {
        self.envelope(body).map(|envelope| envelope.data)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn url(&self, path: &ApiPath, params: &QueryParams) -> WorkspaceResult<Url> {
        let base = self.base.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, path.root))?;
        if !path.segments.is_empty() {
            // None of these can name a child resource.
            if let Some(bad) = path.segments.iter().find(|s| matches!(s.as_str(), "" | "." | "..")) {
                return Err(WorkspaceError::InvalidUrl(format!("path segment {:?} under {}", bad, path.root)));
            }
            url.path_segments_mut()
                .map_err(|_| WorkspaceError::InvalidUrl(format!("{} cannot take path segments", base)))?
                .pop_if_empty()
                .extend(path.segments.iter());
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.pairs().iter());
        }
        Ok(url)
    }

    fn transport(&self, err: reqwest::Error) -> WorkspaceError {
        warn!(service = self.service, error = %err, "API transport failure");
        WorkspaceError::Transport {
            message: format!("Unable to reach {} service", self.service),
            source: Box::new(err),
        }
    }

    fn decode_error(&self, err: serde_json::Error) -> WorkspaceError {
        WorkspaceError::Decode {
            service: self.service.to_string(),
            reason: err.to_string(),
        }
    }
}
