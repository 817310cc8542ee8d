use thiserror::Error;

/// Errors raised while obtaining a bearer token.
///
/// No variant ever carries a secret (client secret, access or refresh token).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// Transport failure talking to the KG or the identity provider.
    ///
    /// The message comes from
    /// [`format_http_error`](crate::http_error::format_http_error).
    #[error("{0}")]
    Http(String),

    /// The identity provider answered with something unparseable.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The flow is missing a client id or an endpoint.
    #[error("token configuration error: {0}")]
    ConfigError(String),

    /// The flow gave up without obtaining a token.
    #[error("token unavailable: {0}")]
    Unavailable(String),

    /// The caller cancelled an interactive flow.
    #[error("token acquisition cancelled")]
    Cancelled,
}
