use super::{by_id, page, string_list};
use crate::error::ClientError;
use crate::models::{Pagination, Stage, TypeInformation};
use crate::page::ResultPage;
use crate::result::ResultsById;
use crate::transport::{QueryParams, Transport};

/// Filters of the type endpoints.
#[derive(Debug, Clone, Default)]
pub struct TypeOptions {
    pub stage: Stage,
    pub space: Option<String>,
    pub with_properties: bool,
    pub with_incoming_links: bool,
}

impl TypeOptions {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with("stage", self.stage)
            .with_opt("space", self.space.as_deref())
            .with("withProperties", self.with_properties)
            .with("withIncomingLinks", self.with_incoming_links)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Types<'a> {
    transport: &'a Transport,
}

impl<'a> Types<'a> {
    pub(super) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Type information for each name, keyed by name.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_by_name(
        &self,
        names: &[&str],
        options: &TypeOptions,
    ) -> Result<ResultsById<TypeInformation>, ClientError> {
        let ctx = self
            .transport
            .post("typesByName", Some(string_list(names)), options.to_params())
            .await?;
        by_id(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn list(
        &self,
        options: &TypeOptions,
        pagination: Pagination,
    ) -> Result<ResultPage<TypeInformation>, ClientError> {
        let params = pagination.apply(options.to_params());
        let ctx = self.transport.get("types", params).await?;
        page(ctx)
    }
}
