//! Assembles a [`KgClient`] from explicit settings, `KG_*` environment
//! variables, or an interactive device flow as the last resort.

use std::sync::Arc;

use kg_auth::{
    ClientCredentials, DeviceFlow, DeviceFlowConfig, SecretString, TokenHandler,
};
use kg_http::{HttpClientBuilder, HttpClientConfig, TransportSecurity};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::{KgAdminClient, KgClient};
use crate::config::KgSettings;
use crate::error::ClientError;
use crate::transport::{Transport, TransportConfig};

enum PrimaryAuth {
    Handler(Arc<TokenHandler>),
    DeviceFlow(DeviceFlowConfig),
}

/// Builder for [`KgClient`] and [`KgAdminClient`].
///
/// The primary token source is the first of:
/// 1. an explicit `with_*` call,
/// 2. `KG_TOKEN`,
/// 3. `KG_CLIENT_ID` and `KG_CLIENT_SECRET` (client credentials),
/// 4. the device flow with client id `KG_DEVICE_FLOW_CLIENT_ID`.
///
/// [`new`](Self::new) and [`from_env`](Self::from_env) read the `KG_*`
/// variables; [`from_settings`](Self::from_settings) uses only what it is
/// given.
///
/// # Example
///
/// ```rust,ignore
/// let client = KgClient::builder()
///     .host("core.kg-ppd.ebrains.eu")
///     .build()?;
/// let me = client.users().my_info().await?;
/// ```
#[must_use]
pub struct ClientBuilder {
    settings: KgSettings,
    endpoint: Option<String>,
    primary: Option<PrimaryAuth>,
    client_token_handler: Option<Arc<TokenHandler>>,
    cancellation: Option<CancellationToken>,
    http_config: Option<HttpClientConfig>,
    /// Malformed environment, reported by `build`.
    settings_error: Option<ClientError>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let primary = match &self.primary {
            Some(PrimaryAuth::Handler(_)) => "explicit",
            Some(PrimaryAuth::DeviceFlow(_)) => "device flow",
            None => "from settings",
        };
        f.debug_struct("ClientBuilder")
            .field("settings", &self.settings)
            .field("endpoint", &self.endpoint)
            .field("primary", &primary)
            .field("client_authentication", &self.client_token_handler.is_some())
            .field("http_config", &self.http_config)
            .field("settings_error", &self.settings_error.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        match KgSettings::from_env() {
            Ok(settings) => Self::from_settings(settings),
            Err(e) => Self {
                settings_error: Some(e),
                ..Self::from_settings(KgSettings::default())
            },
        }
    }
}

impl ClientBuilder {
    /// Builder over defaults overlaid with `KG_*` variables. A malformed
    /// variable surfaces as an error from [`build`](Self::build).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: KgSettings) -> Self {
        Self {
            settings,
            endpoint: None,
            primary: None,
            client_token_handler: None,
            cancellation: None,
            http_config: None,
            settings_error: None,
        }
    }

    /// Builder over [`KgSettings::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when a `KG_*` variable is malformed.
    pub fn from_env() -> Result<Self, ClientError> {
        KgSettings::from_env().map(Self::from_settings)
    }

    /// KG host name; `localhost*` hosts are reached over plain HTTP.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.settings.host = host.into();
        self
    }

    /// Full API base URL, overriding `host`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn id_namespace(mut self, id_namespace: impl Into<String>) -> Self {
        self.settings.id_namespace = id_namespace.into();
        self
    }

    pub fn profiling(mut self, enabled: bool) -> Self {
        self.settings.profiling = enabled;
        self
    }

    pub fn with_token(self, token: impl Into<SecretString>) -> Self {
        self.with_token_handler(Arc::new(TokenHandler::static_token(token)))
    }

    /// Client credentials grant for the primary token.
    pub fn with_credentials(
        self,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Self {
        self.with_token_handler(Arc::new(TokenHandler::new(ClientCredentials::new(
            client_id,
            client_secret,
        ))))
    }

    /// Interactive device flow for `client_id`. Without an explicit
    /// `openid_config_url` the KG is asked for it on first use.
    pub fn with_device_flow(
        self,
        client_id: impl Into<String>,
        openid_config_url: Option<Url>,
    ) -> Self {
        let mut config = DeviceFlowConfig::new(client_id);
        if let Some(url) = openid_config_url {
            config = config.openid_config_url(url);
        }
        self.with_device_flow_config(config)
    }

    pub fn with_device_flow_config(mut self, config: DeviceFlowConfig) -> Self {
        self.primary = Some(PrimaryAuth::DeviceFlow(config));
        self
    }

    /// Token produced by `provider` on every refresh.
    pub fn with_custom_token_provider<F>(self, provider: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.with_token_handler(Arc::new(TokenHandler::from_fn(provider)))
    }

    pub fn with_token_handler(mut self, handler: Arc<TokenHandler>) -> Self {
        self.primary = Some(PrimaryAuth::Handler(handler));
        self
    }

    /// Authenticate the calling service as well, through the
    /// `Client-Authorization` header.
    pub fn add_client_authentication(
        self,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Self {
        self.with_client_token_handler(Arc::new(TokenHandler::new(ClientCredentials::new(
            client_id,
            client_secret,
        ))))
    }

    pub fn with_client_token_handler(mut self, handler: Arc<TokenHandler>) -> Self {
        self.client_token_handler = Some(handler);
        self
    }

    /// Cancels a pending device flow.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = Some(config);
        self
    }

    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] for a malformed endpoint or
    /// `OpenID` configuration URL, and [`ClientError::Transport`] when the
    /// HTTP client cannot be set up.
    pub fn build(self) -> Result<KgClient, ClientError> {
        self.into_transport().map(KgClient::new)
    }

    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub fn build_admin(self) -> Result<KgAdminClient, ClientError> {
        self.into_transport().map(KgAdminClient::new)
    }

    fn resolve_endpoint(&self) -> Result<Url, ClientError> {
        let mut endpoint = self
            .endpoint
            .clone()
            .unwrap_or_else(|| self.settings.endpoint());
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        Ok(Url::parse(&endpoint)?)
    }

    fn into_transport(mut self) -> Result<Transport, ClientError> {
        if let Some(e) = self.settings_error.take() {
            return Err(e);
        }
        let endpoint = self.resolve_endpoint()?;
        let Self {
            settings,
            primary,
            client_token_handler,
            cancellation,
            http_config,
            ..
        } = self;

        let mut http_config = http_config.unwrap_or_default();
        if endpoint.scheme() == "http" {
            http_config.transport = TransportSecurity::AllowInsecureHttp;
        }
        let http = HttpClientBuilder::with_config(http_config).build()?;

        let token_handler = primary_handler(primary, &settings, cancellation)?;
        let client_token_handler = client_token_handler.or_else(|| {
            settings.client_auth_credentials().map(|(id, secret)| {
                tracing::debug!(client_id = id, "client authentication from settings");
                Arc::new(TokenHandler::new(ClientCredentials::new(id, secret)))
            })
        });

        tracing::debug!(endpoint = %endpoint, "KG client configured");
        Ok(Transport::new(
            http,
            TransportConfig {
                endpoint,
                id_namespace: settings.id_namespace,
                profiling: settings.profiling,
                token_handler,
                client_token_handler,
            },
        ))
    }
}

fn primary_handler(
    primary: Option<PrimaryAuth>,
    settings: &KgSettings,
    cancellation: Option<CancellationToken>,
) -> Result<Arc<TokenHandler>, ClientError> {
    let config = match primary {
        Some(PrimaryAuth::Handler(handler)) => return Ok(handler),
        Some(PrimaryAuth::DeviceFlow(config)) => config,
        None => {
            if let Some(token) = settings.token.as_deref().filter(|t| !t.is_empty()) {
                tracing::debug!("using static token from settings");
                return Ok(Arc::new(TokenHandler::static_token(token)));
            }
            if let Some((id, secret)) = settings.client_credentials() {
                tracing::debug!(client_id = id, "using client credentials from settings");
                return Ok(Arc::new(TokenHandler::new(ClientCredentials::new(id, secret))));
            }
            tracing::debug!(
                client_id = %settings.device_flow_client_id,
                "no token configured, falling back to the device flow"
            );
            let mut config = DeviceFlowConfig::new(settings.device_flow_client_id.as_str());
            if let Some(url) = &settings.openid_config_url {
                config = config.openid_config_url(Url::parse(url)?);
            }
            config
        }
    };

    let config = match cancellation {
        Some(token) => config.cancellation(token),
        None => config,
    };
    Ok(Arc::new(TokenHandler::new(DeviceFlow::new(config))))
}
