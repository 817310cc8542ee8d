use kg_auth::TokenError;
use kg_http::HttpError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error reported by the KG, either in the response envelope or derived from
/// the HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("KG error {code}: {}", message.as_deref().unwrap_or("no message"))]
pub struct KgError {
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub instance_id: Option<Uuid>,
}

impl KgError {
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            instance_id: None,
        }
    }
}

/// Errors returned by [`KgClient`](crate::KgClient) calls.
///
/// API-level failures are not errors of the call itself: they are carried in
/// the `error` field of the returned result. [`ClientError::Api`] only shows
/// up where a failure has nowhere else to go, e.g. in item streams.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("failed to decode response data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] KgError),

    #[error("client configuration error: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn kg_error_display() {
        assert_eq!(KgError::new(404, "not found").to_string(), "KG error 404: not found");
        let bare = KgError {
            code: 500,
            message: None,
            instance_id: None,
        };
        assert_eq!(bare.to_string(), "KG error 500: no message");
    }

    #[test]
    fn kg_error_from_envelope() {
        let err: KgError = serde_json::from_value(serde_json::json!({
            "code": 409,
            "message": "conflict",
            "instanceId": "3e0f3b5e-6d3c-4a55-9d4a-0b7c4d4c1c2a"
        }))
        .unwrap();
        assert_eq!(err.code, 409);
        assert!(err.instance_id.is_some());
    }

    #[test]
    fn client_error_wraps_sources() {
        let err = ClientError::from(TokenError::Cancelled);
        assert_eq!(err.to_string(), "token acquisition cancelled");

        let err = ClientError::from(KgError::new(401, "Unauthorized"));
        assert!(matches!(err, ClientError::Api(ref e) if e.code == 401));
    }
}
