use serde_json::Value;
use uuid::Uuid;

use super::{by_id, page, single, string_list};
use crate::error::{ClientError, KgError};
use crate::models::{
    ExtendedResponseConfiguration, Instance, Pagination, ReducedUserInformation, ReleaseStatus,
    ReleaseTreeScope, ResponseConfiguration, Scope, Stage,
};
use crate::page::ResultPage;
use crate::result::{KgResult, ResultsById};
use crate::transport::{QueryParams, Transport};

/// Filters of [`Instances::list`].
#[derive(Debug, Clone, Default)]
pub struct InstanceListOptions {
    pub target_type: String,
    pub stage: Stage,
    pub space: Option<String>,
    pub search_by_label: Option<String>,
    pub filter_property: Option<String>,
    pub filter_value: Option<String>,
    pub response: ResponseConfiguration,
    pub pagination: Pagination,
}

impl InstanceListOptions {
    #[must_use]
    pub fn of_type(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    #[must_use]
    pub fn space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }

    #[must_use]
    pub fn search_by_label(mut self, label: impl Into<String>) -> Self {
        self.search_by_label = Some(label.into());
        self
    }

    /// Keep instances whose `property` matches `value`.
    #[must_use]
    pub fn filter(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter_property = Some(property.into());
        self.filter_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn response(mut self, response: ResponseConfiguration) -> Self {
        self.response = response;
        self
    }

    #[must_use]
    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    fn to_params(&self) -> QueryParams {
        let params = QueryParams::new()
            .with("stage", self.stage)
            .with("type", &self.target_type)
            .with_opt("space", self.space.as_deref())
            .with_opt("searchByLabel", self.search_by_label.as_deref())
            .with_opt("filterProperty", self.filter_property.as_deref())
            .with_opt("filterValue", self.filter_value.as_deref());
        self.pagination.apply(self.response.apply(params))
    }
}

/// Instance endpoints: CRUD, release, scope and invitations.
#[derive(Debug, Clone, Copy)]
pub struct Instances<'a> {
    transport: &'a Transport,
}

impl<'a> Instances<'a> {
    pub(super) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Replace this client's contribution to an instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn contribute_to_full_replacement(
        &self,
        payload: Value,
        instance_id: Uuid,
        config: ExtendedResponseConfiguration,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = config.apply(QueryParams::new());
        let ctx = self
            .transport
            .put(&format!("instances/{instance_id}"), Some(payload), params)
            .await?;
        single(ctx)
    }

    /// Partially update this client's contribution to an instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn contribute_to_partial_replacement(
        &self,
        payload: Value,
        instance_id: Uuid,
        config: ExtendedResponseConfiguration,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = config.apply(QueryParams::new());
        let ctx = self
            .transport
            .patch(&format!("instances/{instance_id}"), Some(payload), params)
            .await?;
        single(ctx)
    }

    /// Create an instance with a server-generated id.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn create_new(
        &self,
        payload: Value,
        space: &str,
        config: ExtendedResponseConfiguration,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = config.apply(QueryParams::new().with("space", space));
        let ctx = self
            .transport
            .post("instances", Some(payload), params)
            .await?;
        single(ctx)
    }

    /// Create an instance with a client-chosen id.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn create_new_with_id(
        &self,
        payload: Value,
        instance_id: Uuid,
        space: &str,
        config: ExtendedResponseConfiguration,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = config.apply(QueryParams::new().with("space", space));
        let ctx = self
            .transport
            .post(&format!("instances/{instance_id}"), Some(payload), params)
            .await?;
        single(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn delete(&self, instance_id: Uuid) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .delete(&format!("instances/{instance_id}"), QueryParams::new())
            .await?;
        Ok(ctx.error())
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_by_id(
        &self,
        instance_id: Uuid,
        stage: Stage,
        config: ExtendedResponseConfiguration,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = config.apply(QueryParams::new().with("stage", stage));
        let ctx = self
            .transport
            .get(&format!("instances/{instance_id}"), params)
            .await?;
        single(ctx)
    }

    /// Read instances by external identifiers, keyed by identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_by_identifiers(
        &self,
        identifiers: &[&str],
        stage: Stage,
        config: ExtendedResponseConfiguration,
    ) -> Result<ResultsById<Instance>, ClientError> {
        let params = config.apply(QueryParams::new().with("stage", stage));
        let ctx = self
            .transport
            .post("instancesByIdentifiers", Some(string_list(identifiers)), params)
            .await?;
        by_id(ctx)
    }

    /// Read instances by UUID, keyed by UUID.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_by_ids(
        &self,
        instance_ids: &[Uuid],
        stage: Stage,
        config: ExtendedResponseConfiguration,
    ) -> Result<ResultsById<Instance>, ClientError> {
        let params = config.apply(QueryParams::new().with("stage", stage));
        let ctx = self
            .transport
            .post("instancesByIds", Some(string_list(instance_ids)), params)
            .await?;
        by_id(ctx)
    }

    /// Instances of `target_type` that point to `instance_id` through
    /// `property`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_incoming_links(
        &self,
        instance_id: Uuid,
        property: &str,
        target_type: &str,
        stage: Stage,
        pagination: Pagination,
    ) -> Result<ResultPage<Instance>, ClientError> {
        let params = QueryParams::new()
            .with("stage", stage)
            .with("property", property)
            .with("type", target_type);
        let ctx = self
            .transport
            .get(
                &format!("instances/{instance_id}/incomingLinks"),
                pagination.apply(params),
            )
            .await?;
        page(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_release_status(
        &self,
        instance_id: Uuid,
        scope: ReleaseTreeScope,
    ) -> Result<KgResult<ReleaseStatus>, ClientError> {
        let params = QueryParams::new().with("releaseTreeScope", scope);
        let ctx = self
            .transport
            .get(&format!("instances/{instance_id}/release/status"), params)
            .await?;
        single(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_release_status_by_ids(
        &self,
        instance_ids: &[Uuid],
        scope: ReleaseTreeScope,
    ) -> Result<ResultsById<ReleaseStatus>, ClientError> {
        let params = QueryParams::new().with("releaseTreeScope", scope);
        let ctx = self
            .transport
            .post(
                "instancesByIds/release/status",
                Some(string_list(instance_ids)),
                params,
            )
            .await?;
        by_id(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn get_scope(
        &self,
        instance_id: Uuid,
        stage: Stage,
        return_permissions: bool,
        apply_restrictions: bool,
    ) -> Result<KgResult<Scope>, ClientError> {
        let params = QueryParams::new()
            .with("stage", stage)
            .with("returnPermissions", return_permissions)
            .with("applyRestrictions", apply_restrictions);
        let ctx = self
            .transport
            .get(&format!("instances/{instance_id}/scope"), params)
            .await?;
        single(ctx)
    }

    /// Invite `user_id` to review the instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn invite_user_for(
        &self,
        instance_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .put(
                &format!("instances/{instance_id}/invitedUsers/{user_id}"),
                None,
                QueryParams::new(),
            )
            .await?;
        Ok(ctx.error())
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn list(
        &self,
        options: &InstanceListOptions,
    ) -> Result<ResultPage<Instance>, ClientError> {
        let ctx = self.transport.get("instances", options.to_params()).await?;
        page(ctx)
    }

    /// Users invited to review the instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn list_invitations(
        &self,
        instance_id: Uuid,
    ) -> Result<KgResult<Vec<ReducedUserInformation>>, ClientError> {
        let ctx = self
            .transport
            .get(
                &format!("instances/{instance_id}/invitedUsers"),
                QueryParams::new(),
            )
            .await?;
        single(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn move_to_space(
        &self,
        instance_id: Uuid,
        space: &str,
        config: ExtendedResponseConfiguration,
    ) -> Result<KgResult<Instance>, ClientError> {
        let params = config.apply(QueryParams::new());
        let ctx = self
            .transport
            .put(&format!("instances/{instance_id}/spaces/{space}"), None, params)
            .await?;
        single(ctx)
    }

    /// Release, or re-release, the instance at `revision` (latest when
    /// `None`).
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn release(
        &self,
        instance_id: Uuid,
        revision: Option<&str>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new().with_opt("revision", revision);
        let ctx = self
            .transport
            .put(&format!("instances/{instance_id}/release"), None, params)
            .await?;
        Ok(ctx.error())
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn revoke_user_invitation(
        &self,
        instance_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .delete(
                &format!("instances/{instance_id}/invitedUsers/{user_id}"),
                QueryParams::new(),
            )
            .await?;
        Ok(ctx.error())
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn unrelease(&self, instance_id: Uuid) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .delete(&format!("instances/{instance_id}/release"), QueryParams::new())
            .await?;
        Ok(ctx.error())
    }
}
