//! `OAuth2` device authorization grant (RFC 8628) for interactive users.
//!
//! One attempt requests a device code, shows the verification URI and polls
//! the token endpoint until the user approves or the code expires. Expired
//! attempts start over until the flow is cancelled or runs out of attempts.
//! A refresh token from an earlier grant is tried first.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::discovery;
use super::types::{DeviceAuthorizationResponse, OAuthErrorResponse, TokenResponse};
use crate::error::TokenError;
use crate::handler::{TokenContext, TokenSource};
use crate::http_error::format_http_error;
use crate::secret::SecretString;

pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const SLOW_DOWN_STEP: Duration = Duration::from_secs(1);

const BANNER: &str = "*************************************************************************";

/// Called with `verification_uri_complete` at the start of each attempt.
pub type VerificationPrompt = Arc<dyn Fn(&str) + Send + Sync>;

/// Settings for [`DeviceFlow`].
#[derive(Clone)]
pub struct DeviceFlowConfig {
    pub client_id: String,
    /// Well-known `OpenID` configuration URL. Asked from the KG when unset.
    pub openid_config_url: Option<Url>,
    pub poll_interval: Duration,
    /// `None` restarts expired attempts until cancelled.
    pub max_attempts: Option<NonZeroU32>,
    pub cancellation: CancellationToken,
    pub prompt: VerificationPrompt,
}

impl std::fmt::Debug for DeviceFlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFlowConfig")
            .field("client_id", &self.client_id)
            .field("openid_config_url", &self.openid_config_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_attempts", &self.max_attempts)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

impl DeviceFlowConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            openid_config_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            cancellation: CancellationToken::new(),
            prompt: Arc::new(print_verification_banner),
        }
    }

    #[must_use]
    pub fn openid_config_url(mut self, url: Url) -> Self {
        self.openid_config_url = Some(url);
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: NonZeroU32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }
}

fn print_verification_banner(uri: &str) {
    eprintln!("{BANNER}");
    eprintln!("To continue, you need to authenticate. To do so, please visit {uri}");
    eprintln!("{BANNER}");
}

/// Where the flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFlowState {
    NeedDeviceCode,
    Polling { interval: Duration },
    Authenticated,
    Expired,
}

/// Tokens granted by the identity provider.
#[derive(Debug, Clone)]
pub struct DeviceTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl From<TokenResponse> for DeviceTokens {
    fn from(r: TokenResponse) -> Self {
        Self {
            access_token: SecretString::new(r.access_token),
            refresh_token: r.refresh_token.map(SecretString::new),
        }
    }
}

/// Result of feeding one token endpoint response to a [`DevicePoller`].
#[derive(Debug)]
pub enum PollOutcome {
    Granted(DeviceTokens),
    /// Poll again after the given delay.
    Continue(Duration),
    /// The device code expired; the attempt is over.
    Expired,
    /// Unexpected status or body; the attempt is over.
    Rejected(StatusCode),
}

/// Polling state of a single device-code attempt.
///
/// - 200 with an access token grants
/// - 400 `slow_down` adds one second to the interval
/// - 400 `expired_token` ends the attempt
/// - any other 400 keeps polling at the current interval
/// - anything else ends the attempt
#[derive(Debug, Clone)]
pub struct DevicePoller {
    interval: Duration,
    polls: u32,
}

impl DevicePoller {
    #[must_use]
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            interval: initial_interval,
            polls: 0,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Responses observed so far.
    #[must_use]
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn observe(&mut self, status: StatusCode, body: &[u8]) -> PollOutcome {
        self.polls += 1;
        match status {
            StatusCode::OK => match serde_json::from_slice::<TokenResponse>(body) {
                Ok(tokens) => PollOutcome::Granted(tokens.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "device token response has no access_token");
                    PollOutcome::Rejected(status)
                }
            },
            StatusCode::BAD_REQUEST => {
                let error = serde_json::from_slice::<OAuthErrorResponse>(body)
                    .unwrap_or_default()
                    .error;
                match error.as_deref() {
                    Some("expired_token") => PollOutcome::Expired,
                    Some("slow_down") => {
                        self.interval += SLOW_DOWN_STEP;
                        tracing::debug!(interval = ?self.interval, "device flow asked to slow down");
                        PollOutcome::Continue(self.interval)
                    }
                    _ => PollOutcome::Continue(self.interval),
                }
            }
            _ => PollOutcome::Rejected(status),
        }
    }
}

#[derive(Debug)]
struct DeviceEndpoints {
    device_authorization: Url,
    token: Url,
}

/// Device authorization grant as a [`TokenSource`].
///
/// Endpoints are resolved on first use from the `OpenID` configuration.
pub struct DeviceFlow {
    config: DeviceFlowConfig,
    endpoints: OnceCell<DeviceEndpoints>,
    refresh_token: Mutex<Option<SecretString>>,
    state: Mutex<DeviceFlowState>,
}

impl std::fmt::Debug for DeviceFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFlow")
            .field("config", &self.config)
            .field("endpoints", &self.endpoints.get())
            .field("has_refresh_token", &self.has_refresh_token())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl DeviceFlow {
    #[must_use]
    pub fn new(config: DeviceFlowConfig) -> Self {
        Self {
            config,
            endpoints: OnceCell::new(),
            refresh_token: Mutex::new(None),
            state: Mutex::new(DeviceFlowState::NeedDeviceCode),
        }
    }

    #[must_use]
    pub fn state(&self) -> DeviceFlowState {
        *self.state.lock()
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.lock().is_some()
    }

    fn set_state(&self, state: DeviceFlowState) {
        *self.state.lock() = state;
    }

    async fn endpoints(&self, ctx: &TokenContext) -> Result<&DeviceEndpoints, TokenError> {
        self.endpoints
            .get_or_try_init(|| async {
                let well_known = match &self.config.openid_config_url {
                    Some(url) => url.clone(),
                    None => discovery::discover_openid_config_url(&ctx.http, &ctx.kg_endpoint)
                        .await?,
                };
                let doc = discovery::fetch_openid_configuration(&ctx.http, &well_known).await?;

                let parse = |value: Option<String>, name: &str| -> Result<Url, TokenError> {
                    let value = value.ok_or_else(|| {
                        TokenError::ConfigError(format!("{name} missing from OpenID configuration"))
                    })?;
                    Url::parse(&value)
                        .map_err(|e| TokenError::ConfigError(format!("invalid {name}: {e}")))
                };
                Ok::<_, TokenError>(DeviceEndpoints {
                    device_authorization: parse(
                        doc.device_authorization_endpoint,
                        "device_authorization_endpoint",
                    )?,
                    token: parse(doc.token_endpoint, "token_endpoint")?,
                })
            })
            .await
    }

    fn accept(&self, tokens: DeviceTokens) -> SecretString {
        if let Some(refresh) = tokens.refresh_token {
            *self.refresh_token.lock() = Some(refresh);
        }
        self.set_state(DeviceFlowState::Authenticated);
        tokens.access_token
    }

    async fn refresh(
        &self,
        ctx: &TokenContext,
        endpoints: &DeviceEndpoints,
    ) -> Result<Option<DeviceTokens>, TokenError> {
        let Some(refresh_token) = self.refresh_token.lock().clone() else {
            return Ok(None);
        };

        let response = ctx
            .http
            .post(endpoints.token.as_str())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token.expose()),
            ])
            .map_err(|e| TokenError::Http(format_http_error(&e, "token refresh")))?
            .send()
            .await
            .map_err(|e| TokenError::Http(format_http_error(&e, "token refresh")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("refresh token rejected, starting a new device authorization");
            *self.refresh_token.lock() = None;
            return Ok(None);
        }
        if status != StatusCode::OK {
            tracing::warn!(%status, "token refresh failed");
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TokenError::Http(format_http_error(&e, "token refresh")))?;
        Ok(serde_json::from_slice::<TokenResponse>(&body)
            .ok()
            .map(DeviceTokens::from))
    }

    /// One device-code attempt. `Ok(None)` when the code expired or the
    /// identity provider gave up on it. A 4xx on the device authorization
    /// request is a configuration error.
    async fn attempt(
        &self,
        ctx: &TokenContext,
        endpoints: &DeviceEndpoints,
    ) -> Result<Option<DeviceTokens>, TokenError> {
        self.set_state(DeviceFlowState::NeedDeviceCode);

        let response = ctx
            .http
            .post(endpoints.device_authorization.as_str())
            .form(&[("client_id", self.config.client_id.as_str())])
            .map_err(|e| TokenError::Http(format_http_error(&e, "device authorization")))?
            .send()
            .await
            .map_err(|e| TokenError::Http(format_http_error(&e, "device authorization")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TokenError::Http(format_http_error(&e, "device authorization")))?;
        if status.is_client_error() {
            let error = serde_json::from_slice::<OAuthErrorResponse>(&body)
                .unwrap_or_default()
                .error;
            return Err(TokenError::ConfigError(format!(
                "device authorization rejected for client {} ({status}, {})",
                self.config.client_id,
                error.as_deref().unwrap_or("no error code")
            )));
        }
        if status != StatusCode::OK {
            tracing::warn!(%status, "device authorization request failed");
            return Ok(None);
        }
        let parsed = serde_json::from_slice::<DeviceAuthorizationResponse>(&body);
        let (device_code, verification_uri) = match parsed {
            Ok(DeviceAuthorizationResponse {
                device_code,
                verification_uri_complete: Some(uri),
            }) => (device_code, uri),
            Ok(_) => {
                tracing::warn!("device authorization response has no verification_uri_complete");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "invalid device authorization response");
                return Ok(None);
            }
        };

        (self.config.prompt)(&verification_uri);

        let mut poller = DevicePoller::new(self.config.poll_interval);
        loop {
            self.set_state(DeviceFlowState::Polling {
                interval: poller.interval(),
            });

            let response = ctx
                .http
                .post(endpoints.token.as_str())
                .form(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.config.client_id.as_str()),
                    ("device_code", device_code.as_str()),
                ])
                .map_err(|e| TokenError::Http(format_http_error(&e, "device token")))?
                .send()
                .await
                .map_err(|e| TokenError::Http(format_http_error(&e, "device token")))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| TokenError::Http(format_http_error(&e, "device token")))?;

            match poller.observe(status, &body) {
                PollOutcome::Granted(tokens) => return Ok(Some(tokens)),
                PollOutcome::Expired => {
                    self.set_state(DeviceFlowState::Expired);
                    return Ok(None);
                }
                PollOutcome::Rejected(status) => {
                    tracing::warn!(%status, polls = poller.polls(), "device token polling rejected");
                    self.set_state(DeviceFlowState::Expired);
                    return Ok(None);
                }
                PollOutcome::Continue(wait) => {
                    tokio::select! {
                        () = self.config.cancellation.cancelled() => return Err(TokenError::Cancelled),
                        () = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl TokenSource for DeviceFlow {
    async fn fetch_token(
        &self,
        ctx: Option<&TokenContext>,
    ) -> Result<Option<SecretString>, TokenError> {
        if self.config.client_id.trim().is_empty() {
            return Err(TokenError::ConfigError(
                "device flow requires a client id".into(),
            ));
        }
        let Some(ctx) = ctx else {
            return Err(TokenError::ConfigError(
                "device flow needs a KG endpoint before fetching".into(),
            ));
        };
        let endpoints = self.endpoints(ctx).await?;

        if let Some(tokens) = self.refresh(ctx, endpoints).await? {
            tracing::debug!("access token refreshed");
            return Ok(Some(self.accept(tokens)));
        }

        let mut attempts: u32 = 0;
        loop {
            if self.config.cancellation.is_cancelled() {
                return Err(TokenError::Cancelled);
            }
            attempts += 1;
            if let Some(tokens) = self.attempt(ctx, endpoints).await? {
                tracing::info!(attempts, "device authorization completed");
                return Ok(Some(self.accept(tokens)));
            }
            if let Some(max) = self.config.max_attempts
                && attempts >= max.get()
            {
                return Err(TokenError::Unavailable(format!(
                    "device flow gave up after {attempts} attempts"
                )));
            }
            tracing::warn!(attempts, "device code expired, restarting device authorization");
            tokio::select! {
                () = self.config.cancellation.cancelled() => return Err(TokenError::Cancelled),
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn pending(error: &str) -> Vec<u8> {
        format!(r#"{{"error":"{error}"}}"#).into_bytes()
    }

    #[test]
    fn slow_down_raises_interval_by_one_second() {
        let mut poller = DevicePoller::new(Duration::from_secs(1));

        let first = poller.observe(StatusCode::BAD_REQUEST, &pending("slow_down"));
        assert!(matches!(first, PollOutcome::Continue(d) if d == Duration::from_secs(2)));

        let second = poller.observe(StatusCode::BAD_REQUEST, &pending("slow_down"));
        assert!(matches!(second, PollOutcome::Continue(d) if d == Duration::from_secs(3)));

        let granted = poller.observe(
            StatusCode::OK,
            br#"{"access_token":"at","refresh_token":"rt"}"#,
        );
        let PollOutcome::Granted(tokens) = granted else {
            panic!("expected a grant, got {granted:?}");
        };
        assert_eq!(tokens.access_token.expose(), "at");
        assert_eq!(tokens.refresh_token.unwrap().expose(), "rt");
        assert_eq!(poller.polls(), 3);
    }

    #[test]
    fn pending_keeps_interval() {
        let mut poller = DevicePoller::new(Duration::from_secs(1));
        let outcome = poller.observe(StatusCode::BAD_REQUEST, &pending("authorization_pending"));
        assert!(matches!(outcome, PollOutcome::Continue(d) if d == Duration::from_secs(1)));

        let unparseable = poller.observe(StatusCode::BAD_REQUEST, b"not json");
        assert!(matches!(unparseable, PollOutcome::Continue(_)));
        assert_eq!(poller.interval(), Duration::from_secs(1));
    }

    #[test]
    fn expired_and_unexpected_status_end_attempt() {
        let mut poller = DevicePoller::new(DEFAULT_POLL_INTERVAL);
        assert!(matches!(
            poller.observe(StatusCode::BAD_REQUEST, &pending("expired_token")),
            PollOutcome::Expired
        ));
        assert!(matches!(
            poller.observe(StatusCode::INTERNAL_SERVER_ERROR, b""),
            PollOutcome::Rejected(StatusCode::INTERNAL_SERVER_ERROR)
        ));
        assert!(matches!(
            poller.observe(StatusCode::OK, b"{}"),
            PollOutcome::Rejected(StatusCode::OK)
        ));
    }

    #[tokio::test]
    async fn empty_client_id_is_config_error() {
        let flow = DeviceFlow::new(DeviceFlowConfig::new("  "));
        let err = flow.fetch_token(None).await.unwrap_err();
        assert!(matches!(err, TokenError::ConfigError(_)), "got {err:?}");
    }

    #[test]
    fn config_builder() {
        let url = Url::parse("https://iam.ebrains.eu/.well-known/openid-configuration").unwrap();
        let config = DeviceFlowConfig::new("kg-core-python")
            .openid_config_url(url.clone())
            .poll_interval(Duration::from_millis(5))
            .max_attempts(NonZeroU32::new(2).unwrap());
        assert_eq!(config.openid_config_url, Some(url));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.max_attempts.map(NonZeroU32::get), Some(2));
        assert!(!config.cancellation.is_cancelled());
    }
}
