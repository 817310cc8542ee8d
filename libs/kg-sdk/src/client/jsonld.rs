use serde_json::Value;

use crate::error::{ClientError, KgError};
use crate::transport::{QueryParams, Transport};

#[derive(Debug, Clone, Copy)]
pub struct Jsonld<'a> {
    transport: &'a Transport,
}

impl<'a> Jsonld<'a> {
    pub(super) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Ask the KG to normalize `payload` to its JSON-LD conventions.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn normalize_payload(&self, payload: Value) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .post("jsonld/normalizedPayload", Some(payload), QueryParams::new())
            .await?;
        Ok(ctx.error())
    }
}
