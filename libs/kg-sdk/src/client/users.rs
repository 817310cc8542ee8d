use super::single;
use crate::error::{ClientError, KgError};
use crate::models::{JsonLdDocument, TermsOfUse, User};
use crate::result::{KgResult, ResponseObject};
use crate::transport::{QueryParams, Transport};

#[derive(Debug, Clone, Copy)]
pub struct Users<'a> {
    transport: &'a Transport,
}

impl<'a> Users<'a> {
    pub(super) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn accept_terms_of_use(&self, version: &str) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .post(
                &format!("users/termsOfUse/{version}/accept"),
                None,
                QueryParams::new(),
            )
            .await?;
        Ok(ctx.error())
    }

    /// Where the `OpenID` configuration of the KG's identity provider lives,
    /// as `{"endpoint": ...}`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_open_id_config_url(&self) -> Result<KgResult<JsonLdDocument>, ClientError> {
        let ctx = self
            .transport
            .get("users/authorization/config", QueryParams::new())
            .await?;
        single(ctx)
    }

    /// Current terms of use. The endpoint answers with the bare object, not
    /// an envelope. `None` on error or an empty answer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the answer is not terms of use.
    pub async fn get_terms_of_use(&self) -> Result<Option<TermsOfUse>, ClientError> {
        let ctx = self
            .transport
            .get("users/termsOfUse", QueryParams::new())
            .await?;
        if ctx.error().is_some() {
            return Ok(None);
        }
        let terms = ctx
            .content()
            .cloned()
            .map(|content| TermsOfUse::from_response(content, ctx.id_namespace()))
            .transpose()?;
        Ok(terms)
    }

    /// The user behind the current token.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn my_info(&self) -> Result<KgResult<User>, ClientError> {
        let ctx = self.transport.get("users/me", QueryParams::new()).await?;
        single(ctx)
    }
}
