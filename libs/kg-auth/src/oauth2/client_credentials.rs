use async_trait::async_trait;
use url::Url;
use zeroize::Zeroizing;

use super::types::TokenResponse;
use crate::error::TokenError;
use crate::handler::{TokenContext, TokenSource};
use crate::http_error::format_http_error;
use crate::secret::SecretString;

/// `OAuth2` client credentials grant against the token endpoint the KG
/// advertises, or an explicitly configured one.
///
/// A rejected grant yields no token rather than an error, so requests are
/// still sent and the KG answers with its own 401.
pub struct ClientCredentials {
    client_id: String,
    client_secret: SecretString,
    token_endpoint: Option<Url>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

impl ClientCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<SecretString>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_endpoint: None,
        }
    }

    /// Skip discovery and post to `url`.
    #[must_use]
    pub fn with_token_endpoint(mut self, url: Url) -> Self {
        self.token_endpoint = Some(url);
        self
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn fetch_token(
        &self,
        ctx: Option<&TokenContext>,
    ) -> Result<Option<SecretString>, TokenError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            tracing::warn!("client credentials incomplete, no token requested");
            return Ok(None);
        }
        let Some(ctx) = ctx else {
            return Err(TokenError::ConfigError(
                "client credentials need a KG endpoint before fetching".into(),
            ));
        };
        let Some(endpoint) = self.token_endpoint.as_ref().or(ctx.auth_endpoint.as_ref()) else {
            tracing::warn!("no token endpoint known, no token requested");
            return Ok(None);
        };

        let secret = Zeroizing::new(self.client_secret.expose().to_owned());
        let fields = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret.as_str()),
        ];

        let response = ctx
            .http
            .post(endpoint.as_str())
            .form(&fields)
            .map_err(|e| TokenError::Http(format_http_error(&e, "client credentials")))?
            .send()
            .await
            .map_err(|e| TokenError::Http(format_http_error(&e, "client credentials")))?;

        let status = response.status();
        if status != http::StatusCode::OK {
            tracing::warn!(%status, client_id = %self.client_id, "client credentials grant rejected");
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TokenError::Http(format_http_error(&e, "client credentials")))?;
        match serde_json::from_slice::<TokenResponse>(&body) {
            Ok(token) => Ok(Some(SecretString::new(token.access_token))),
            Err(e) => {
                tracing::warn!(error = %e, "client credentials response has no access_token");
                Ok(None)
            }
        }
    }

    fn wants_auth_endpoint(&self) -> bool {
        self.token_endpoint.is_none()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn context(server: &MockServer) -> TokenContext {
        TokenContext {
            http: kg_http::HttpClientBuilder::with_config(kg_http::HttpClientConfig::for_testing())
                .build()
                .unwrap(),
            kg_endpoint: Url::parse(&server.url("/v3-beta/")).unwrap(),
            auth_endpoint: Some(Url::parse(&server.url("/token")).unwrap()),
        }
    }

    #[tokio::test]
    async fn posts_client_credentials_form() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=client_credentials&client_id=svc&client_secret=s3cret");
            then.status(200)
                .json_body(json!({"access_token": "service-token", "expires_in": 300}));
        });

        let source = ClientCredentials::new("svc", "s3cret");
        let token = source.fetch_token(Some(&context(&server))).await.unwrap();

        assert_eq!(token.unwrap().expose(), "service-token");
        mock.assert();
    }

    #[tokio::test]
    async fn rejected_grant_yields_no_token() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(401).json_body(json!({"error": "invalid_client"}));
        });

        let source = ClientCredentials::new("svc", "wrong");
        let token = source.fetch_token(Some(&context(&server))).await.unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn missing_endpoint_yields_no_token() {
        let server = MockServer::start();
        let mut ctx = context(&server);
        ctx.auth_endpoint = None;

        let source = ClientCredentials::new("svc", "s3cret");
        assert!(source.wants_auth_endpoint());
        assert!(source.fetch_token(Some(&ctx)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn explicit_endpoint_wins() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/custom/token");
            then.status(200).json_body(json!({"access_token": "custom"}));
        });

        let source = ClientCredentials::new("svc", "s3cret")
            .with_token_endpoint(Url::parse(&server.url("/custom/token")).unwrap());
        assert!(!source.wants_auth_endpoint());

        let token = source.fetch_token(Some(&context(&server))).await.unwrap();
        assert_eq!(token.unwrap().expose(), "custom");
        mock.assert();
    }

    #[test]
    fn debug_redacts_secret() {
        let source = ClientCredentials::new("svc", "s3cret");
        let dbg = format!("{source:?}");
        assert!(dbg.contains("svc"));
        assert!(!dbg.contains("s3cret"));
    }
}
