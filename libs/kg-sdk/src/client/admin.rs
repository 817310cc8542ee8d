//! Administrative endpoints: space and type specifications, property
//! definitions, permissions setup and maintenance triggers.

use serde_json::Value;
use uuid::Uuid;

use super::single;
use crate::builder::ClientBuilder;
use crate::error::{ClientError, KgError};
use crate::result::KgResult;
use crate::transport::{QueryParams, Transport};

/// Flags of [`KgAdminClient::create_space_definition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceSpecification {
    /// Release every instance of the space automatically.
    pub autorelease: bool,
    pub client_space: bool,
    pub defer_cache: bool,
}

/// Client for the admin API. Needs a token with admin rights.
#[derive(Debug, Clone)]
pub struct KgAdminClient {
    transport: Transport,
}

impl KgAdminClient {
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    async fn put(
        &self,
        path: &str,
        payload: Option<Value>,
        params: QueryParams,
    ) -> Result<Option<KgError>, ClientError> {
        Ok(self.transport.put(path, payload, params).await?.error())
    }

    async fn delete(
        &self,
        path: &str,
        params: QueryParams,
    ) -> Result<Option<KgError>, ClientError> {
        Ok(self.transport.delete(path, params).await?.error())
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn assign_type_to_space(
        &self,
        space: &str,
        target_type: &str,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new().with("type", target_type);
        self.put(&format!("spaces/{space}/types"), None, params).await
    }

    /// Recompute who invited users may see for this instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn calculate_instance_invitation_scope(
        &self,
        instance_id: Uuid,
    ) -> Result<Option<KgError>, ClientError> {
        self.put(
            &format!("instances/{instance_id}/invitationScope"),
            None,
            QueryParams::new(),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn create_space_definition(
        &self,
        space: &str,
        specification: SpaceSpecification,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with("autorelease", specification.autorelease)
            .with("clientSpace", specification.client_space)
            .with("deferCache", specification.defer_cache);
        self.put(&format!("spaces/{space}/specification"), None, params)
            .await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn create_type_definition(
        &self,
        payload: Value,
        target_type: &str,
        global: Option<bool>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("global", global)
            .with("type", target_type);
        self.put("types/specification", Some(payload), params).await
    }

    /// Upload a property specification, globally or for the calling client.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn define_property(
        &self,
        payload: Value,
        property: &str,
        global: Option<bool>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("global", global)
            .with("property", property);
        self.put("properties", Some(payload), params).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn define_property_for_type(
        &self,
        payload: Value,
        property: &str,
        target_type: &str,
        global: Option<bool>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("global", global)
            .with("property", property)
            .with("type", target_type);
        self.put("propertiesForType", Some(payload), params).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn deprecate_property(
        &self,
        property: &str,
        global: Option<bool>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("global", global)
            .with("property", property);
        self.delete("properties", params).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn deprecate_property_for_type(
        &self,
        property: &str,
        target_type: &str,
        global: Option<bool>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("global", global)
            .with("property", property)
            .with("type", target_type);
        self.delete("propertiesForType", params).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn get_all_role_definitions(&self) -> Result<Option<KgError>, ClientError> {
        let ctx = self
            .transport
            .get("setup/permissions", QueryParams::new())
            .await?;
        Ok(ctx.error())
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn get_claim_for_role(
        &self,
        role: &str,
        space: Option<&str>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new().with_opt("space", space);
        let ctx = self
            .transport
            .get(&format!("setup/permissions/{role}"), params)
            .await?;
        Ok(ctx.error())
    }

    /// Instances that have pending review invitations.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request fails or the response does
    /// not decode.
    pub async fn list_instances_with_invitations(
        &self,
    ) -> Result<KgResult<Vec<Uuid>>, ClientError> {
        let ctx = self
            .transport
            .get("instancesWithInvitations", QueryParams::new())
            .await?;
        single(ctx)
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn register_terms_of_use(
        &self,
        payload: Value,
    ) -> Result<Option<KgError>, ClientError> {
        self.put("setup/termsOfUse", Some(payload), QueryParams::new())
            .await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn remove_space_definition(
        &self,
        space: &str,
    ) -> Result<Option<KgError>, ClientError> {
        self.delete(&format!("spaces/{space}/specification"), QueryParams::new())
            .await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn remove_type_definition(
        &self,
        target_type: Option<&str>,
        global: Option<bool>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("type", target_type)
            .with_opt("global", global);
        self.delete("types/specification", params).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn remove_type_from_space(
        &self,
        space: &str,
        target_type: &str,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new().with("type", target_type);
        self.delete(&format!("spaces/{space}/types"), params).await
    }

    /// Replay the event history of a space.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn rerun_events(&self, space: &str) -> Result<Option<KgError>, ClientError> {
        self.put(&format!("spaces/{space}/eventHistory"), None, QueryParams::new())
            .await
    }

    /// Run inference over a space, or over one `identifier` in it.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn trigger_inference(
        &self,
        space: &str,
        identifier: Option<&str>,
        run_async: bool,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("identifier", identifier)
            .with("async", run_async);
        let ctx = self
            .transport
            .post(&format!("spaces/{space}/inference"), None, params)
            .await?;
        Ok(ctx.error())
    }

    /// Add claims to a role, or remove them when `remove` is set.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent.
    pub async fn update_claim_for_role(
        &self,
        payload: Value,
        role: &str,
        remove: bool,
        space: Option<&str>,
    ) -> Result<Option<KgError>, ClientError> {
        let params = QueryParams::new()
            .with_opt("space", space)
            .with("remove", remove);
        let ctx = self
            .transport
            .patch(&format!("setup/permissions/{role}"), Some(payload), params)
            .await?;
        Ok(ctx.error())
    }
}
