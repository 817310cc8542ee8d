use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use kg_http::HttpClient;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

use crate::error::TokenError;
use crate::oauth2::discovery;
use crate::secret::SecretString;

/// What a [`TokenSource`] knows about the KG it is authenticating against.
///
/// Built once per handler by [`TokenHandler::define_endpoint`].
#[derive(Debug, Clone)]
pub struct TokenContext {
    /// Client shared with the transport.
    pub http: HttpClient,
    /// KG API base URL, e.g. `https://core.kg.ebrains.eu/v3-beta/`.
    pub kg_endpoint: Url,
    /// Token endpoint advertised by the KG. `None` when discovery was not
    /// needed or failed.
    pub auth_endpoint: Option<Url>,
}

/// Produces bearer tokens on demand.
///
/// `Ok(None)` means "no token available"; requests then go out without the
/// header. Errors are reserved for failures the caller should see.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(
        &self,
        ctx: Option<&TokenContext>,
    ) -> Result<Option<SecretString>, TokenError>;

    /// Whether [`TokenHandler::define_endpoint`] should ask the KG for its
    /// token endpoint.
    fn wants_auth_endpoint(&self) -> bool {
        false
    }
}

/// Caches the token of one [`TokenSource`] and serializes refreshes.
///
/// Reads are lock-free. A refresh takes an async mutex; callers that queued
/// behind an in-flight refresh reuse its result instead of fetching again.
pub struct TokenHandler {
    source: Box<dyn TokenSource>,
    token: ArcSwapOption<SecretString>,
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
    context: OnceCell<TokenContext>,
}

impl std::fmt::Debug for TokenHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHandler")
            .field("has_token", &self.token.load().is_some())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("context", &self.context.get())
            .finish_non_exhaustive()
    }
}

impl TokenHandler {
    #[must_use]
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            token: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            context: OnceCell::new(),
        }
    }

    /// Handler that always answers with `token`.
    #[must_use]
    pub fn static_token(token: impl Into<SecretString>) -> Self {
        Self::new(StaticToken::new(token))
    }

    /// Handler backed by a synchronous callback.
    #[must_use]
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self::new(CallableToken::new(f))
    }

    /// Record the KG endpoint and, for sources that need it, discover the
    /// token endpoint from `users/authorization/tokenEndpoint`.
    ///
    /// Runs at most once per handler. A failed discovery leaves
    /// [`TokenContext::auth_endpoint`] empty for good.
    pub async fn define_endpoint(&self, http: &HttpClient, kg_endpoint: &Url) {
        self.context
            .get_or_init(|| async {
                let auth_endpoint = if self.source.wants_auth_endpoint() {
                    match discovery::discover_auth_endpoint(http, kg_endpoint).await {
                        Ok(url) => {
                            tracing::debug!(auth_endpoint = %url, "discovered token endpoint");
                            Some(url)
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "token endpoint discovery failed");
                            None
                        }
                    }
                } else {
                    None
                };
                TokenContext {
                    http: http.clone(),
                    kg_endpoint: kg_endpoint.clone(),
                    auth_endpoint,
                }
            })
            .await;
    }

    /// The context recorded by [`define_endpoint`](Self::define_endpoint).
    #[must_use]
    pub fn context(&self) -> Option<&TokenContext> {
        self.context.get()
    }

    /// Return the cached token, fetching one when the cache is empty or
    /// `force_fetch` is set.
    ///
    /// Concurrent callers that reach the refresh while another one is in
    /// flight get that refresh's result.
    ///
    /// # Errors
    ///
    /// Propagates the [`TokenError`] of the underlying source.
    pub async fn get_token(&self, force_fetch: bool) -> Result<Option<SecretString>, TokenError> {
        let seen = self.generation.load(Ordering::Acquire);
        if !force_fetch && let Some(token) = self.token.load_full() {
            return Ok(Some((*token).clone()));
        }

        let _guard = self.refresh_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            return Ok(self.cached());
        }

        let fetched = self.source.fetch_token(self.context.get()).await?;
        self.token.store(fetched.clone().map(Arc::new));
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(fetched)
    }

    /// Last token stored, without fetching.
    #[must_use]
    pub fn cached(&self) -> Option<SecretString> {
        self.token.load_full().map(|t| (*t).clone())
    }
}

/// A fixed bearer token.
#[derive(Debug, Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn fetch_token(
        &self,
        _ctx: Option<&TokenContext>,
    ) -> Result<Option<SecretString>, TokenError> {
        Ok(Some(self.0.clone()))
    }
}

/// Token supplied by a caller-provided function, called on every fetch.
pub struct CallableToken<F>(F);

impl<F> CallableToken<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    #[must_use]
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> TokenSource for CallableToken<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    async fn fetch_token(
        &self,
        _ctx: Option<&TokenContext>,
    ) -> Result<Option<SecretString>, TokenError> {
        Ok((self.0)().map(SecretString::from))
    }
}
