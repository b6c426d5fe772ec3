// API HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection, base-URL joining
// and envelope parsing. Endpoint methods live in `entities.rs`,
// `members.rs` and `invitations.rs` as inherent methods so this module
// stays focused on transport mechanics.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::envelope::ApiResponse;
use crate::error::Error;
use crate::transport::ClientConfig;

/// Per-request knobs for [`ApiClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Defaults to `GET`.
    pub method: Method,
    /// JSON body, sent verbatim.
    pub body: Option<serde_json::Value>,
    /// Extra headers, merged over the defaults (caller wins).
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Async client for the entity management API.
///
/// Every call resolves the bearer token from the injected
/// [`TokenProvider`] first. Calls never fail with `Err`: transport and
/// application failures alike come back as a `success: false`
/// [`ApiResponse`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from configuration, creating a fresh `reqwest::Client`.
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Ok(Self::with_client(http, config.base_url.clone(), tokens))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url,
            tokens,
        }
    }

    /// The API root every resource path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append a resource path to the base URL, keeping any base path
    /// (`https://host/api` + `/entities` = `https://host/api/entities`).
    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Transport ────────────────────────────────────────────────────

    /// Issue one authenticated request and return its envelope.
    ///
    /// Without a token the result is `{success: false, error: "Not
    /// authenticated"}` and nothing is sent.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        let method = options.method.clone();
        match self.try_request(path, options).await {
            Ok(resp) => {
                if let Some(ref message) = resp.error {
                    debug!(%method, path, error = %message, "request rejected");
                }
                resp
            }
            Err(e) => {
                warn!(%method, path, error = %e, "request failed");
                ApiResponse::failure(e.to_string())
            }
        }
    }

    async fn try_request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, Error> {
        let Some(token) = self.tokens.auth_token().await else {
            debug!(path, "no auth token, skipping request");
            return Ok(ApiResponse::not_authenticated());
        };

        let url = self.url(path)?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);

        debug!("{} {url}", options.method);

        let mut builder = self.http.request(options.method, url).headers(headers);
        if let Some(ref body) = options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("HTTP {}: {e} (body preview: {preview:?})", status.as_u16()),
                body,
            }
        })
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(path, RequestOptions::new(Method::GET)).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> ApiResponse<T> {
        self.send_json(Method::POST, path, body).await
    }

    /// POST without a request body (action endpoints).
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(path, RequestOptions::new(Method::POST)).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> ApiResponse<T> {
        self.send_json(Method::PUT, path, body).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(path, RequestOptions::new(Method::DELETE)).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> ApiResponse<T> {
        match serde_json::to_value(body) {
            Ok(value) => self.request(path, RequestOptions::new(method).json(value)).await,
            Err(e) => ApiResponse::failure(Error::from(e).to_string()),
        }
    }
}

/// Join path segments into `/a/b/c`, percent-encoding each one so slugs,
/// ids and tokens can never escape their segment.
pub(crate) fn resource_path(segments: &[&str]) -> String {
    segments.iter().fold(String::new(), |mut path, segment| {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
        path
    })
}
