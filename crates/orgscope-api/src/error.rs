use thiserror::Error;

/// Top-level error type for the `orgscope-api` crate.
///
/// [`ApiClient::request`](crate::ApiClient::request) never returns these
/// directly: every failure is folded into a `success: false` envelope whose
/// `error` field is this type's `Display` output. They surface as values
/// again through [`ApiResponse::into_result`](crate::ApiResponse::into_result).
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token provider had no token; no request was sent.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The token could not be encoded as an HTTP header value.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Application ─────────────────────────────────────────────────
    /// The server answered with `success: false`. The message is passed
    /// through unchanged.
    #[error("{message}")]
    Api { message: String },

    /// `success: true` envelope without a `data` payload where one is required.
    #[error("Response reported success but carried no data")]
    MissingData,

    // ── Data ────────────────────────────────────────────────────────
    /// A request body could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The response body was not a JSON envelope. Keeps the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }

    /// Returns `true` for network-level failures (as opposed to the server
    /// rejecting the request).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Tls(_))
    }
}
