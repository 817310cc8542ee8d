use serde::Deserialize;

/// Token endpoint response.
///
/// `Deserialize`-only so access tokens cannot be serialized back out by
/// accident.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body of a token endpoint (RFC 6749 §5.2).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OAuthErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
}

/// Device authorization response (RFC 8628 §3.2).
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceAuthorizationResponse {
    pub device_code: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
}

/// Subset of the `OpenID` Connect discovery document used by the device flow.
#[derive(Debug, Deserialize)]
pub(crate) struct OpenIdConfiguration {
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub device_authorization_endpoint: Option<String>,
}

/// KG envelope around a discovered URL: `{"data": {"endpoint": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct KgEndpointEnvelope {
    #[serde(default)]
    pub data: Option<KgEndpoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KgEndpoint {
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn token_response_with_refresh_token() {
        let json = r#"{"access_token":"at","refresh_token":"rt","token_type":"Bearer","expires_in":300,"scope":"openid"}"#;
        let r: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.access_token, "at");
        assert_eq!(r.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn error_response_tolerates_missing_field() {
        let r: OAuthErrorResponse = serde_json::from_str("{}").unwrap();
        assert!(r.error.is_none());
        let r: OAuthErrorResponse =
            serde_json::from_str(r#"{"error":"slow_down","error_description":"x"}"#).unwrap();
        assert_eq!(r.error.as_deref(), Some("slow_down"));
    }

    #[test]
    fn endpoint_envelope() {
        let r: KgEndpointEnvelope =
            serde_json::from_str(r#"{"data":{"endpoint":"https://iam/token"}}"#).unwrap();
        assert_eq!(
            r.data.and_then(|d| d.endpoint).as_deref(),
            Some("https://iam/token")
        );
        let r: KgEndpointEnvelope = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert!(r.data.is_none());
    }
}
