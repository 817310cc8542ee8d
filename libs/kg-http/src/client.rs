use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use bytes::Bytes;
use http::{HeaderValue, Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use tower::util::BoxCloneSyncService;

/// Type-erased service stack (timeout + pooled hyper client)
pub(crate) type InnerService =
    BoxCloneSyncService<Request<Full<Bytes>>, Response<Incoming>, HttpError>;

/// HTTP client over a tower service stack
///
/// `HttpClient` is `Clone + Send + Sync` and cloning is cheap; store it directly
/// rather than behind a mutex.
///
/// # Example
///
/// ```ignore
/// let client = HttpClient::builder().build()?;
/// let resp = client.get("https://core.kg.ebrains.eu/v3-beta/spaces").send().await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: InnerService,
    pub(crate) user_agent: HeaderValue,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("user_agent", &self.user_agent)
            .field("max_body_size", &self.max_body_size)
            .field("transport_security", &self.transport_security)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring the HTTP client
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Create a request builder for an arbitrary method
    ///
    /// The URL must be absolute (scheme and host). Query parameters must be
    /// encoded into the URL by the caller, e.g. with `url::Url::query_pairs_mut`.
    pub fn request(&self, method: http::Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.user_agent.clone(),
            self.max_body_size,
            method,
            url.to_owned(),
            self.transport_security,
        )
    }

    /// Create a GET request builder
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::GET, url)
    }

    /// Create a POST request builder
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::POST, url)
    }

    /// Create a PUT request builder
    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::PUT, url)
    }

    /// Create a PATCH request builder
    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::PATCH, url)
    }

    /// Create a DELETE request builder
    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::DELETE, url)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::{HttpError, InvalidUriKind};
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client() -> HttpClient {
        HttpClientBuilder::new().allow_insecure_http().build().unwrap()
    }

    #[tokio::test]
    async fn test_http_client_get() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200).json_body(json!({"success": true}));
        });

        let client = test_client();
        let url = format!("{}/test", server.base_url());
        let resp = client.get(&url).send().await.unwrap();

        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_http_client_post_form() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=client_credentials&client_id=kg");
            then.status(200).json_body(json!({"access_token": "abc"}));
        });

        let client = test_client();
        let url = format!("{}/token", server.base_url());
        let resp = client
            .post(&url)
            .form(&[("grant_type", "client_credentials"), ("client_id", "kg")])
            .unwrap()
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::OK);
        m.assert();
    }

    #[tokio::test]
    async fn test_request_builder_json_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(PUT)
                .path("/instances/1")
                .header("content-type", "application/json")
                .json_body(json!({"@type": "Dataset"}));
            then.status(200);
        });

        let client = test_client();
        let url = format!("{}/instances/1", server.base_url());
        let resp = client
            .put(&url)
            .json(&json!({"@type": "Dataset"}))
            .unwrap()
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::OK);
        m.assert();
    }

    #[tokio::test]
    async fn test_json_body_parsing() {
        #[derive(serde::Deserialize)]
        struct TestResponse {
            name: String,
            value: i32,
        }

        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200)
                .json_body(json!({"name": "test", "value": 42}));
        });

        let client = test_client();
        let url = format!("{}/json", server.base_url());

        let data: TestResponse = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(data.name, "test");
        assert_eq!(data.value, 42);
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let server = MockServer::start();
        let large_body = "x".repeat(64 * 1024);
        let _m = server.mock(|when, then| {
            when.method(GET).path("/large");
            then.status(200).body(&large_body);
        });

        let client = HttpClientBuilder::new()
            .allow_insecure_http()
            .max_body_size(1024)
            .build()
            .unwrap();

        let url = format!("{}/large", server.base_url());
        let result = client.get(&url).send().await.unwrap().bytes().await;

        assert!(matches!(result, Err(HttpError::BodyTooLarge { limit: 1024 })));
    }

    #[tokio::test]
    async fn test_custom_user_agent() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/test")
                .header("user-agent", "custom/1.0");
            then.status(200);
        });

        let client = HttpClientBuilder::new()
            .allow_insecure_http()
            .user_agent("custom/1.0")
            .build()
            .unwrap();

        let url = format!("{}/test", server.base_url());
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        m.assert();
    }

    #[tokio::test]
    async fn test_non_2xx_is_not_a_send_error() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(DELETE).path("/missing");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"error": {"code": 404}}));
        });

        let client = test_client();
        let url = format!("{}/missing", server.base_url());
        let resp = client.delete(&url).send().await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);

        let err = resp.error_for_status().unwrap_err();
        assert!(
            matches!(err, HttpError::HttpStatus { status, ref content_type }
                if status == http::StatusCode::NOT_FOUND
                    && content_type.as_deref() == Some("application/json")),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_patch_with_custom_headers() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(PATCH)
                .path("/setup/permissions/admin")
                .header("authorization", "Bearer tok")
                .header("client-authorization", "Bearer client-tok");
            then.status(204);
        });

        let client = test_client();
        let url = format!("{}/setup/permissions/admin", server.base_url());
        let resp = client
            .patch(&url)
            .header("authorization", "Bearer tok")
            .header("client-authorization", "Bearer client-tok")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::NO_CONTENT);
        assert!(resp.bytes().await.unwrap().is_empty());
        m.assert();
    }

    #[tokio::test]
    async fn test_tls_only_rejects_http() {
        let client = HttpClient::new().unwrap();
        let result = client.get("http://localhost:1/test").send().await;

        assert!(
            matches!(result, Err(HttpError::InvalidScheme { ref scheme, .. }) if scheme == "http"),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_relative_url_rejected() {
        let client = test_client();
        let result = client.get("/relative/path").send().await;

        assert!(matches!(
            result,
            Err(HttpError::InvalidUri {
                kind: InvalidUriKind::MissingAuthority,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_header_deferred_to_send() {
        let client = test_client();
        let result = client
            .get("http://localhost:1/test")
            .header("bad header", "value")
            .send()
            .await;

        assert!(matches!(result, Err(HttpError::InvalidHeaderName(_))));
    }
}
