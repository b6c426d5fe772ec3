// ── Core error types ──
//
// Errors surfaced by query bindings and the selection layer. They are
// `Clone` because one in-flight fetch result is shared by every caller
// coalesced onto it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No auth token was available; nothing was sent.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The server (or the transport) reported a failure. The upstream
    /// message is passed through unchanged.
    #[error("{message}")]
    Api { message: String },

    /// The selection storage backend failed.
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<orgscope_api::Error> for CoreError {
    fn from(err: orgscope_api::Error) -> Self {
        match err {
            orgscope_api::Error::NotAuthenticated => Self::NotAuthenticated,
            orgscope_api::Error::Api { message } => Self::Api { message },
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage {
            message: format!("corrupt selection file: {err}"),
        }
    }
}
