use kg_http::HttpClient;
use url::Url;

use super::types::{KgEndpointEnvelope, OpenIdConfiguration};
use crate::error::TokenError;
use crate::http_error::format_http_error;

const TOKEN_ENDPOINT_PATH: &str = "users/authorization/tokenEndpoint";
const OPENID_CONFIG_PATH: &str = "users/authorization/config";

/// Token endpoint URL the KG advertises for client credentials.
///
/// # Errors
///
/// Returns [`TokenError::Http`] on transport or status failures and
/// [`TokenError::InvalidResponse`] when the body has no usable URL.
pub async fn discover_auth_endpoint(
    http: &HttpClient,
    kg_endpoint: &Url,
) -> Result<Url, TokenError> {
    fetch_kg_endpoint(http, kg_endpoint, TOKEN_ENDPOINT_PATH, "token endpoint discovery").await
}

/// `OpenID` configuration URL (the well-known document) the KG advertises.
///
/// # Errors
///
/// Same as [`discover_auth_endpoint`].
pub async fn discover_openid_config_url(
    http: &HttpClient,
    kg_endpoint: &Url,
) -> Result<Url, TokenError> {
    fetch_kg_endpoint(http, kg_endpoint, OPENID_CONFIG_PATH, "OIDC config discovery").await
}

async fn fetch_kg_endpoint(
    http: &HttpClient,
    kg_endpoint: &Url,
    path: &str,
    what: &str,
) -> Result<Url, TokenError> {
    let url = kg_endpoint
        .join(path)
        .map_err(|e| TokenError::ConfigError(format!("invalid KG endpoint: {e}")))?;

    let envelope: KgEndpointEnvelope = http
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| TokenError::Http(format_http_error(&e, what)))?
        .json()
        .await
        .map_err(|e| TokenError::Http(format_http_error(&e, what)))?;

    let endpoint = envelope
        .data
        .and_then(|d| d.endpoint)
        .ok_or_else(|| TokenError::InvalidResponse(format!("{what}: missing data.endpoint")))?;

    Url::parse(&endpoint)
        .map_err(|e| TokenError::InvalidResponse(format!("{what}: invalid URL: {e}")))
}

/// Fetch the `OpenID` discovery document.
///
/// # Errors
///
/// Returns [`TokenError::Http`] when the document cannot be fetched or parsed.
pub(crate) async fn fetch_openid_configuration(
    http: &HttpClient,
    well_known: &Url,
) -> Result<OpenIdConfiguration, TokenError> {
    http.get(well_known.as_str())
        .send()
        .await
        .map_err(|e| TokenError::Http(format_http_error(&e, "OIDC discovery")))?
        .json()
        .await
        .map_err(|e| TokenError::Http(format_http_error(&e, "OIDC discovery")))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client() -> HttpClient {
        kg_http::HttpClientBuilder::with_config(kg_http::HttpClientConfig::for_testing())
            .build()
            .unwrap()
    }

    fn kg(server: &MockServer) -> Url {
        Url::parse(&format!("http://localhost:{}/v3-beta/", server.port())).unwrap()
    }

    #[tokio::test]
    async fn discovers_openid_config_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v3-beta/users/authorization/config");
            then.status(200).json_body(json!({
                "data": {"endpoint": "https://iam.ebrains.eu/auth/realms/hbp/.well-known/openid-configuration"}
            }));
        });

        let url = discover_openid_config_url(&client(), &kg(&server))
            .await
            .unwrap();
        assert_eq!(url.path(), "/auth/realms/hbp/.well-known/openid-configuration");
        mock.assert();
    }

    #[tokio::test]
    async fn missing_endpoint_is_invalid_response() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET)
                .path("/v3-beta/users/authorization/tokenEndpoint");
            then.status(200).json_body(json!({"data": {}}));
        });

        let err = discover_auth_endpoint(&client(), &kg(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn error_status_is_http_error() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET)
                .path("/v3-beta/users/authorization/tokenEndpoint");
            then.status(503);
        });

        let err = discover_auth_endpoint(&client(), &kg(&server))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "token endpoint discovery HTTP 503 Service Unavailable"
        );
    }

    #[tokio::test]
    async fn reads_openid_document() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/.well-known/openid-configuration");
            then.status(200).json_body(json!({
                "issuer": "https://iam",
                "token_endpoint": "https://iam/token",
                "device_authorization_endpoint": "https://iam/device"
            }));
        });

        let url = Url::parse(&server.url("/.well-known/openid-configuration")).unwrap();
        let doc = fetch_openid_configuration(&client(), &url).await.unwrap();
        assert_eq!(doc.token_endpoint.as_deref(), Some("https://iam/token"));
        assert_eq!(
            doc.device_authorization_endpoint.as_deref(),
            Some("https://iam/device")
        );
    }
}
