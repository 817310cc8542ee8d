//! Client settings resolved from defaults, an optional YAML file and `KG_*`
//! environment variables.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const DEFAULT_HOST: &str = "core.kg.ebrains.eu";
pub const API_VERSION: &str = "v3-beta";
pub const DEFAULT_ID_NAMESPACE: &str = "https://kg.ebrains.eu/api/instances/";
pub const DEFAULT_DEVICE_FLOW_CLIENT_ID: &str = "kg-core-python";

/// Prefix of the environment variables read by [`KgSettings::from_env`].
pub const ENV_PREFIX: &str = "KG_";

/// Settings for [`ClientBuilder`](crate::ClientBuilder).
///
/// Environment variables map to fields by dropping the `KG_` prefix:
/// `KG_TOKEN`, `KG_CLIENT_ID`, `KG_CLIENT_SECRET`, `KG_CLIENT_AUTH_ID`,
/// `KG_CLIENT_AUTH_SECRET`, `KG_HOST`, `KG_ID_NAMESPACE`, `KG_PROFILING`,
/// `KG_DEVICE_FLOW_CLIENT_ID`, `KG_OPENID_CONFIG_URL`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KgSettings {
    pub host: String,
    pub id_namespace: String,
    pub profiling: bool,
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_auth_id: Option<String>,
    pub client_auth_secret: Option<String>,
    pub device_flow_client_id: String,
    pub openid_config_url: Option<String>,
}

impl Default for KgSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            id_namespace: DEFAULT_ID_NAMESPACE.to_owned(),
            profiling: false,
            token: None,
            client_id: None,
            client_secret: None,
            client_auth_id: None,
            client_auth_secret: None,
            device_flow_client_id: DEFAULT_DEVICE_FLOW_CLIENT_ID.to_owned(),
            openid_config_url: None,
        }
    }
}

impl std::fmt::Debug for KgSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("KgSettings")
            .field("host", &self.host)
            .field("id_namespace", &self.id_namespace)
            .field("profiling", &self.profiling)
            .field("token", &redact(&self.token))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("client_auth_id", &self.client_auth_id)
            .field("client_auth_secret", &redact(&self.client_auth_secret))
            .field("device_flow_client_id", &self.device_flow_client_id)
            .field("openid_config_url", &self.openid_config_url)
            .finish()
    }
}

impl KgSettings {
    /// Defaults overlaid with `KG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when a variable has the wrong type,
    /// e.g. `KG_PROFILING=maybe`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::extract(Self::figment())
    }

    /// Defaults, then the YAML file at `path`, then `KG_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the file cannot be parsed or a
    /// value has the wrong type.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self, ClientError> {
        figment
            .extract()
            .map_err(|e| ClientError::Config(format!("invalid KG settings: {e}")))
    }

    /// Base URL for `host`: plain HTTP for `localhost*`, HTTPS otherwise.
    #[must_use]
    pub fn endpoint(&self) -> String {
        endpoint_for_host(&self.host)
    }

    /// `client_id` and `client_secret`, when both are set and non-empty.
    #[must_use]
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        non_empty_pair(self.client_id.as_deref(), self.client_secret.as_deref())
    }

    /// `client_auth_id` and `client_auth_secret`, when both are set and
    /// non-empty.
    #[must_use]
    pub fn client_auth_credentials(&self) -> Option<(&str, &str)> {
        non_empty_pair(
            self.client_auth_id.as_deref(),
            self.client_auth_secret.as_deref(),
        )
    }
}

fn non_empty_pair<'a>(id: Option<&'a str>, secret: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    match (id, secret) {
        (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
        _ => None,
    }
}

/// `http://{host}/v3-beta/` for hosts starting with `localhost`,
/// `https://{host}/v3-beta/` for everything else.
#[must_use]
pub fn endpoint_for_host(host: &str) -> String {
    let scheme = if host.starts_with("localhost") {
        "http"
    } else {
        "https"
    };
    format!("{scheme}://{host}/{API_VERSION}/")
}
