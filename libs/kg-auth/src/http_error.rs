/// Format a [`kg_http::HttpError`] with a context prefix such as
/// `"device token"` or `"token endpoint discovery"`.
///
/// Status errors carry only the status code; response bodies from the
/// identity provider never reach logs through this path.
#[must_use]
pub fn format_http_error(e: &kg_http::HttpError, prefix: &str) -> String {
    use kg_http::HttpError;

    match e {
        HttpError::HttpStatus { status, .. } => format!("{prefix} HTTP {status}"),
        HttpError::Json(err) => format!("{prefix} JSON parse failed: {err}"),
        HttpError::Timeout(duration) => format!("{prefix} request timed out after {duration:?}"),
        HttpError::Transport(err) => format!("{prefix} transport error: {err}"),
        HttpError::BodyTooLarge { limit } => {
            format!("{prefix} response too large: limit {limit} bytes")
        }
        HttpError::Tls(err) => format!("{prefix} TLS error: {err}"),
        HttpError::RequestBuild(err) => format!("{prefix} request build failed: {err}"),
        HttpError::InvalidHeaderName(err) => format!("{prefix} invalid header name: {err}"),
        HttpError::InvalidHeaderValue(err) => format!("{prefix} invalid header value: {err}"),
        HttpError::FormEncode(err) => format!("{prefix} form encode error: {err}"),
        HttpError::InvalidUri { url, reason, .. } => {
            format!("{prefix} invalid URL '{url}': {reason}")
        }
        HttpError::InvalidScheme { scheme, reason } => {
            format!("{prefix} invalid scheme '{scheme}': {reason}")
        }
        _ => format!("{prefix} request failed"),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_error_has_no_body() {
        let err = kg_http::HttpError::HttpStatus {
            status: http::StatusCode::BAD_REQUEST,
            content_type: Some("application/json".into()),
        };
        assert_eq!(
            format_http_error(&err, "device token"),
            "device token HTTP 400 Bad Request"
        );
    }

    #[test]
    fn timeout_error() {
        let err = kg_http::HttpError::Timeout(Duration::from_secs(30));
        assert_eq!(
            format_http_error(&err, "client credentials"),
            "client credentials request timed out after 30s"
        );
    }

    #[test]
    fn body_limit_error() {
        let err = kg_http::HttpError::BodyTooLarge { limit: 1024 };
        assert_eq!(
            format_http_error(&err, "OIDC discovery"),
            "OIDC discovery response too large: limit 1024 bytes"
        );
    }
}
