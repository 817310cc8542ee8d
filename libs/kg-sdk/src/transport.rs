//! Authenticated request execution against the KG API.
//!
//! Every call attaches the bearer token of the primary [`TokenHandler`] and,
//! when configured, the `Client-Authorization` token of the service account.
//! A `401` triggers one forced token refresh and a single retry.

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use kg_auth::TokenHandler;
use kg_http::{HttpClient, HttpResponse};
use serde_json::Value;
use url::Url;

use crate::context::ResponseContext;
use crate::error::ClientError;

const AUTHORIZATION: &str = "authorization";
const CLIENT_AUTHORIZATION: &str = "client-authorization";

/// Ordered query parameters. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key=value`.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        self.0.push((key.to_owned(), value.to_string()));
        self
    }

    /// Append `key=value` when `value` is set.
    #[must_use]
    pub fn with_opt<V: Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Append `key=v` for every value.
    #[must_use]
    pub fn with_all<I>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.0
            .extend(values.into_iter().map(|v| (key.to_owned(), v.to_string())));
        self
    }

    /// Replace the first `key` in place, or append it.
    pub fn set(&mut self, key: &str, value: impl Display) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_owned(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Everything needed to issue a request again, e.g. for the next page.
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub method: Method,
    pub url: Url,
    pub params: QueryParams,
    pub payload: Option<Value>,
}

impl RequestArgs {
    /// `url` with `params` appended to its query string.
    #[must_use]
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        url
    }
}

/// Inputs of [`Transport::new`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// API base, e.g. `https://core.kg.ebrains.eu/v3-beta/`. Request paths
    /// are resolved against it, so it must end with `/`.
    pub endpoint: Url,
    pub id_namespace: String,
    /// Log per-request timings.
    pub profiling: bool,
    pub token_handler: Arc<TokenHandler>,
    pub client_token_handler: Option<Arc<TokenHandler>>,
}

/// Cheap-to-clone handle that sends requests to the KG.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    http: HttpClient,
    config: TransportConfig,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = &self.inner.config;
        f.debug_struct("Transport")
            .field("endpoint", &config.endpoint.as_str())
            .field("id_namespace", &config.id_namespace)
            .field("profiling", &config.profiling)
            .field("client_authentication", &config.client_token_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Transport {
    #[must_use]
    pub fn new(http: HttpClient, config: TransportConfig) -> Self {
        Self {
            inner: Arc::new(TransportInner { http, config }),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.config.endpoint
    }

    #[must_use]
    pub fn id_namespace(&self) -> &str {
        &self.inner.config.id_namespace
    }

    #[must_use]
    pub fn token_handler(&self) -> &Arc<TokenHandler> {
        &self.inner.config.token_handler
    }

    #[must_use]
    pub fn client_token_handler(&self) -> Option<&Arc<TokenHandler>> {
        self.inner.config.client_token_handler.as_ref()
    }

    /// Issue `method path` relative to the API base.
    ///
    /// Resolves for every HTTP status; API failures end up in
    /// [`ResponseContext::error`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] for a path that does not resolve,
    /// [`ClientError::Token`] when a token source fails, and
    /// [`ClientError::Transport`] for network failures.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseContext, ClientError> {
        let args = RequestArgs {
            method,
            url: self.endpoint().join(path)?,
            params,
            payload,
        };
        self.execute(args).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get(
        &self,
        path: &str,
        params: QueryParams,
    ) -> Result<ResponseContext, ClientError> {
        self.request(Method::GET, path, None, params).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post(
        &self,
        path: &str,
        payload: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseContext, ClientError> {
        self.request(Method::POST, path, payload, params).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put(
        &self,
        path: &str,
        payload: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseContext, ClientError> {
        self.request(Method::PUT, path, payload, params).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn patch(
        &self,
        path: &str,
        payload: Option<Value>,
        params: QueryParams,
    ) -> Result<ResponseContext, ClientError> {
        self.request(Method::PATCH, path, payload, params).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete(
        &self,
        path: &str,
        params: QueryParams,
    ) -> Result<ResponseContext, ClientError> {
        self.request(Method::DELETE, path, None, params).await
    }

    /// Send `args`, retrying once with fresh tokens after a `401`.
    pub(crate) async fn execute(&self, args: RequestArgs) -> Result<ResponseContext, ClientError> {
        let config = &self.inner.config;
        config
            .token_handler
            .define_endpoint(&self.inner.http, &config.endpoint)
            .await;
        if let Some(handler) = &config.client_token_handler {
            handler
                .define_endpoint(&self.inner.http, &config.endpoint)
                .await;
        }

        let url = args.full_url();
        let started = Instant::now();

        let mut response = self.send(&args, &url, false).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(
                method = %args.method,
                url = %url,
                "unauthorized, refreshing tokens and retrying once"
            );
            response = self.send(&args, &url, true).await?;
        }

        let status = response.status();
        let body = response.bytes().await?;
        let arrived = started.elapsed();

        let decode_started = Instant::now();
        let content = if body.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&body).ok()
        };
        let decoding = decode_started.elapsed();

        tracing::debug!(
            method = %args.method,
            url = %url,
            status = status.as_u16(),
            has_content = content.is_some(),
            "KG request completed"
        );

        if config.profiling {
            report_timings(
                &url,
                Timings {
                    total: started.elapsed(),
                    arrival: arrived,
                    decoding,
                },
                content.as_ref(),
            );
        }

        Ok(ResponseContext::new(content, args, status, self.clone()))
    }

    async fn send(
        &self,
        args: &RequestArgs,
        url: &Url,
        force_token_fetch: bool,
    ) -> Result<HttpResponse, ClientError> {
        let config = &self.inner.config;
        let mut request = self.inner.http.request(args.method.clone(), url.as_str());

        if let Some(token) = config.token_handler.get_token(force_token_fetch).await? {
            request = request.header(AUTHORIZATION, &format!("Bearer {}", token.expose()));
        }
        if let Some(handler) = &config.client_token_handler
            && let Some(token) = handler.get_token(force_token_fetch).await?
        {
            request = request.header(CLIENT_AUTHORIZATION, &format!("Bearer {}", token.expose()));
        }
        if let Some(payload) = &args.payload {
            request = request.json(payload)?;
        }

        Ok(request.send().await?)
    }
}

#[derive(Clone, Copy)]
struct Timings {
    total: Duration,
    arrival: Duration,
    decoding: Duration,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn report_timings(url: &Url, timings: Timings, content: Option<&Value>) {
    let server_ms = content
        .and_then(|c| c.get("durationInMs"))
        .and_then(Value::as_f64);

    let Some(server_ms) = server_ms else {
        tracing::info!(
            url = %url,
            total_ms = millis(timings.total),
            deserialization_ms = millis(timings.decoding),
            "KG request timings (no server duration reported)"
        );
        return;
    };

    let client_ms = millis(timings.arrival) - server_ms;
    tracing::info!(
        url = %url,
        total_ms = millis(timings.total),
        server_ms,
        client_ms,
        deserialization_ms = millis(timings.decoding),
        "KG request timings"
    );
    if client_ms > server_ms {
        tracing::warn!(
            url = %url,
            server_ms,
            client_ms,
            "client/network time exceeds server time"
        );
    }
}
