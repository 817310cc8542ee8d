use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use super::{page, single};
use crate::error::{ClientError, KgError};
use crate::models::{Instance, JsonLdDocument, Pagination, Stage};
use crate::page::ResultPage;
use crate::result::KgResult;
use crate::transport::{QueryParams, Transport};

/// Execution parameters shared by stored and ad-hoc queries.
#[derive(Debug, Clone, Default)]
pub struct QueryExecution {
    pub stage: Stage,
    /// Run the query for this root instance only.
    pub instance_id: Option<Uuid>,
    pub restrict_to_spaces: Vec<String>,
    /// Extra parameters the query declares, sent as-is.
    pub additional_params: BTreeMap<String, String>,
    pub pagination: Pagination,
}

impl QueryExecution {
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    #[must_use]
    pub fn instance_id(mut self, instance_id: Uuid) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    #[must_use]
    pub fn restrict_to_space(mut self, space: impl Into<String>) -> Self {
        self.restrict_to_spaces.push(space.into());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    fn to_params(&self) -> QueryParams {
        let mut params = self
            .pagination
            .apply(QueryParams::new())
            .with("stage", self.stage)
            .with_opt("instanceId", self.instance_id)
            .with_all("restrictToSpaces", &self.restrict_to_spaces);
        for (key, value) in &self.additional_params {
            params = params.with(key, value);
        }
        params
    }
}

/// Stored query management and execution.
#[derive(Debug, Clone, Copy)]
pub struct Queries<'a> {
    transport: &'a Transport,
}

impl<'a> Queries<'a> {
    pub(super) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Run a stored query.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn execute_query_by_id(
        &self,
        query_id: Uuid,
        execution: &QueryExecution,
    ) -> Result<ResultPage<JsonLdDocument>, ClientError> {
        let ctx = self
            .transport
            .get(&format!("queries/{query_id}/instances"), execution.to_params())
            .await?;
        page(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_query_specification(
        &self,
        query_id: Uuid,
    ) -> Result<KgResult<Instance>, ClientError> {
        let ctx = self
            .transport
            .get(&format!("queries/{query_id}"), QueryParams::new())
            .await?;
        single(ctx)
    }

    /// Stored queries, filtered by root type and free text.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn list_per_root_type(
        &self,
        search: Option<&str>,
        target_type: Option<&str>,
        pagination: Pagination,
    ) -> Result<ResultPage<Instance>, ClientError> {
        let params = pagination
            .apply(QueryParams::new())
            .with_opt("type", target_type)
            .with_opt("search", search);
        let ctx = self.transport.get("queries", params).await?;
        page(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn remove_query(&self, query_id: Uuid) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .delete(&format!("queries/{query_id}"), QueryParams::new())
            .await?;
        Ok(ctx.error())
    }

    /// Create or update a stored query.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn save_query(
        &self,
        payload: Value,
        query_id: Uuid,
        space: Option<&str>,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = QueryParams::new().with_opt("space", space);
        let ctx = self
            .transport
            .put(&format!("queries/{query_id}"), Some(payload), params)
            .await?;
        single(ctx)
    }

    /// Run the query in `payload` without storing it.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn test_query(
        &self,
        payload: Value,
        execution: &QueryExecution,
    ) -> Result<ResultPage<JsonLdDocument>, ClientError> {
        let ctx = self
            .transport
            .post("queries", Some(payload), execution.to_params())
            .await?;
        page(ctx)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn execution_params_flatten_additional_params() {
        let execution = QueryExecution::default()
            .stage(Stage::InProgress)
            .restrict_to_space("common")
            .restrict_to_space("myspace")
            .param("name", "Jane")
            .pagination(Pagination::new(0, 20));
        let params = execution.to_params();

        let restricted: Vec<_> = params
            .iter()
            .filter(|(k, _)| *k == "restrictToSpaces")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(restricted, vec!["common", "myspace"]);
        assert_eq!(params.get("stage"), Some("IN_PROGRESS"));
        assert_eq!(params.get("name"), Some("Jane"));
        assert_eq!(params.get("size"), Some("20"));
        assert_eq!(params.get("instanceId"), None);
    }
}
