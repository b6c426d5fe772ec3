// Response envelope
//
// Every endpoint answers with `{ success, data?, error? }`. The transport
// layer also uses this shape for its own failures, so callers deal with a
// single type whether the request never left the process or the server
// rejected it.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Message carried by the envelope when no auth token was available.
pub const NOT_AUTHENTICATED: &str = "Not authenticated";

/// Uniform result wrapper for every API call.
///
/// ```json
/// { "success": true, "data": { ... } }
/// { "success": false, "error": "Entity not found" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed envelope with the given message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// The envelope produced when no auth token could be resolved.
    pub fn not_authenticated() -> Self {
        Self::failure(NOT_AUTHENTICATED)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Transform the payload, keeping success/error untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Drop the payload and keep only pass/fail.
    pub fn discard(self) -> ApiResponse<()> {
        ApiResponse {
            success: self.success,
            data: None,
            error: self.error,
        }
    }

    /// Unwrap into a `Result`.
    ///
    /// A failed envelope becomes [`Error::NotAuthenticated`] or
    /// [`Error::Api`] with the message passed through. A successful envelope
    /// without `data` is accepted when `T` can be built from JSON `null`
    /// (`()`, `Option<_>`), otherwise it is [`Error::MissingData`].
    pub fn into_result(self) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        if !self.success {
            let message = self.error.unwrap_or_else(|| "Request failed".to_owned());
            return Err(if message == NOT_AUTHENTICATED {
                Error::NotAuthenticated
            } else {
                Error::Api { message }
            });
        }

        match self.data {
            Some(data) => Ok(data),
            None => serde_json::from_value(serde_json::Value::Null).map_err(|_| Error::MissingData),
        }
    }
}

impl ApiResponse<IgnoredAny> {
    /// Parse-side helper for endpoints whose payload is never inspected.
    pub(crate) fn ignored(self) -> ApiResponse<()> {
        self.discard()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_envelope_passes_message_through() {
        let resp: ApiResponse<String> = serde_json::from_value(json!({
            "success": false,
            "error": "Slug already taken"
        }))
        .unwrap();

        let err = resp.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Slug already taken");
    }

    #[test]
    fn not_authenticated_maps_back_to_typed_error() {
        let resp: ApiResponse<String> = ApiResponse::not_authenticated();
        assert_eq!(resp.error.as_deref(), Some("Not authenticated"));
        assert!(matches!(resp.into_result(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn success_without_data_is_fine_for_unit() {
        let resp: ApiResponse<()> = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(resp.into_result().is_ok());
    }

    #[test]
    fn success_without_data_is_missing_for_records() {
        let resp: ApiResponse<Vec<String>> =
            serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(matches!(resp.into_result(), Err(Error::MissingData)));
    }

    #[test]
    fn payload_types_need_no_default() {
        // `Entity` has no `Default`; the envelope must still parse around it.
        let resp: ApiResponse<crate::models::Entity> =
            serde_json::from_value(json!({ "success": false, "error": "Entity not found" }))
                .unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.into_result().unwrap_err().to_string(), "Entity not found");

        let resp: ApiResponse<crate::models::Entity> =
            serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(matches!(resp.into_result(), Err(Error::MissingData)));
    }

    #[test]
    fn ignored_payload_discards_data() {
        let resp: ApiResponse<IgnoredAny> = serde_json::from_value(json!({
            "success": true,
            "data": { "id": "e1", "deleted": true }
        }))
        .unwrap();

        let resp = resp.ignored();
        assert!(resp.success);
        assert!(resp.data.is_none());
    }
}
