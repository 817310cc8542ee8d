use super::{page, single};
use crate::error::ClientError;
use crate::models::{Pagination, SpaceInformation};
use crate::page::ResultPage;
use crate::result::KgResult;
use crate::transport::{QueryParams, Transport};

#[derive(Debug, Clone, Copy)]
pub struct Spaces<'a> {
    transport: &'a Transport,
}

impl<'a> Spaces<'a> {
    pub(super) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get(
        &self,
        space: &str,
        permissions: bool,
    ) -> Result<KgResult<SpaceInformation>, ClientError> {
        let params = QueryParams::new().with("permissions", permissions);
        let ctx = self
            .transport
            .get(&format!("spaces/{space}"), params)
            .await?;
        single(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn list(
        &self,
        permissions: bool,
        pagination: Pagination,
    ) -> Result<ResultPage<SpaceInformation>, ClientError> {
        let params = pagination
            .apply(QueryParams::new())
            .with("permissions", permissions);
        let ctx = self.transport.get("spaces", params).await?;
        page(ctx)
    }
}
