use http::StatusCode;
use serde_json::Value;

use crate::error::{ClientError, KgError};
use crate::ids::uuid_from_absolute_id;
use crate::transport::{RequestArgs, Transport};

/// A decoded response together with the request that produced it.
///
/// Keeping the request around lets [`ResultPage`](crate::ResultPage) issue
/// the same call again with a different offset.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    content: Option<Value>,
    request: Option<RequestArgs>,
    status: Option<StatusCode>,
    transport: Transport,
}

impl ResponseContext {
    pub(crate) fn new(
        content: Option<Value>,
        request: RequestArgs,
        status: StatusCode,
        transport: Transport,
    ) -> Self {
        Self {
            content,
            request: Some(request),
            status: Some(status),
            transport,
        }
    }

    /// Context for one entry of a by-id response. It has no request or
    /// status of its own.
    #[must_use]
    pub fn sub_context(&self, content: Value) -> Self {
        Self::detached(content, self.transport.clone())
    }

    pub(crate) fn detached(content: Value, transport: Transport) -> Self {
        Self {
            content: Some(content),
            request: None,
            status: None,
            transport,
        }
    }

    /// Decoded body. `None` when the body was empty or not JSON.
    #[must_use]
    pub fn content(&self) -> Option<&Value> {
        self.content.as_ref()
    }

    #[must_use]
    pub fn request(&self) -> Option<&RequestArgs> {
        self.request.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    #[must_use]
    pub fn id_namespace(&self) -> &str {
        self.transport.id_namespace()
    }

    /// Top-level envelope field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.content.as_ref().and_then(|c| c.get(name))
    }

    #[must_use]
    pub fn error(&self) -> Option<KgError> {
        translate_error(self.content.as_ref(), self.status, self.id_namespace())
    }

    /// `Err` when the response carries an error, `Ok(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with the translated error.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        match self.error() {
            Some(e) => Err(ClientError::Api(e)),
            None => Ok(self),
        }
    }

    pub(crate) fn into_parts(self) -> (Option<Value>, Option<RequestArgs>, Transport) {
        (self.content, self.request, self.transport)
    }
}

/// Error described by a response, if any.
///
/// A non-empty `error` member of the envelope wins; otherwise any status of
/// 400 and above becomes `code` plus the canonical reason phrase.
#[must_use]
pub fn translate_error(
    content: Option<&Value>,
    status: Option<StatusCode>,
    id_namespace: &str,
) -> Option<KgError> {
    let status_code = status.as_ref().map(StatusCode::as_u16);

    match content.and_then(|c| c.get("error")) {
        Some(Value::Object(error)) if !error.is_empty() => {
            let code = error
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|c| u16::try_from(c).ok())
                .or(status_code)
                .unwrap_or(0);
            return Some(KgError {
                code,
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                instance_id: error
                    .get("instanceId")
                    .and_then(Value::as_str)
                    .and_then(|id| uuid_from_absolute_id(id, id_namespace)),
            });
        }
        Some(Value::String(message)) if !message.is_empty() => {
            return Some(KgError {
                code: status_code.unwrap_or(0),
                message: Some(message.clone()),
                instance_id: None,
            });
        }
        _ => {}
    }

    status
        .filter(|s| s.as_u16() >= 400)
        .map(|s| KgError {
            code: s.as_u16(),
            message: s.canonical_reason().map(str::to_owned),
            instance_id: None,
        })
}
