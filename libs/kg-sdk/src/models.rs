//! Request options and response models of the KG API.

use std::fmt;
use std::ops::Deref;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::ids::uuid_from_absolute_id;
use crate::result::{ResponseObject, impl_response_object_via_serde};
use crate::transport::QueryParams;

/// Lifecycle stage an instance is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    InProgress,
    #[default]
    Released,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Released => "RELEASED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part of a release tree a release status refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseTreeScope {
    #[default]
    TopInstanceOnly,
    ChildrenOnly,
}

impl fmt::Display for ReleaseTreeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TopInstanceOnly => "TOP_INSTANCE_ONLY",
            Self::ChildrenOnly => "CHILDREN_ONLY",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    Released,
    Unreleased,
    HasChanged,
}

/// Offset window of a list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub start: u64,
    pub size: u64,
    pub return_total_results: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            start: 0,
            size: 50,
            return_total_results: true,
        }
    }
}

impl Pagination {
    #[must_use]
    pub fn new(start: u64, size: u64) -> Self {
        Self {
            start,
            size,
            ..Self::default()
        }
    }

    /// Skip counting the total. Pages then stop at the first empty one.
    #[must_use]
    pub fn without_total(mut self) -> Self {
        self.return_total_results = false;
        self
    }

    #[must_use]
    pub fn apply(&self, params: QueryParams) -> QueryParams {
        params
            .with("returnTotalResults", self.return_total_results)
            .with("from", self.start)
            .with("size", self.size)
    }
}

/// Optional response shaping flags. Unset flags are not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseConfiguration {
    pub return_alternatives: Option<bool>,
    pub return_embedded: Option<bool>,
    pub return_payload: Option<bool>,
    pub return_permissions: Option<bool>,
}

impl ResponseConfiguration {
    #[must_use]
    pub fn apply(&self, params: QueryParams) -> QueryParams {
        params
            .with_opt("returnPayload", self.return_payload)
            .with_opt("returnPermissions", self.return_permissions)
            .with_opt("returnAlternatives", self.return_alternatives)
            .with_opt("returnEmbedded", self.return_embedded)
    }
}

/// [`ResponseConfiguration`] plus incoming link control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedResponseConfiguration {
    pub response: ResponseConfiguration,
    pub return_incoming_links: Option<bool>,
    pub incoming_links_page_size: Option<u64>,
}

impl ExtendedResponseConfiguration {
    #[must_use]
    pub fn apply(&self, params: QueryParams) -> QueryParams {
        let params = params
            .with_opt("returnIncomingLinks", self.return_incoming_links)
            .with_opt("incomingLinksPageSize", self.incoming_links_page_size);
        self.response.apply(params)
    }
}

/// A JSON-LD object as returned by the KG, with the namespace needed to
/// resolve its identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonLdDocument {
    fields: Map<String, Value>,
    #[serde(skip)]
    id_namespace: String,
}

impl JsonLdDocument {
    #[must_use]
    pub fn new(fields: Map<String, Value>, id_namespace: impl Into<String>) -> Self {
        Self {
            fields,
            id_namespace: id_namespace.into(),
        }
    }

    /// The `@id` member.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.fields.get("@id").and_then(Value::as_str)
    }

    /// UUID part of `@id`.
    #[must_use]
    pub fn uuid(&self) -> Option<Uuid> {
        self.id()
            .and_then(|id| uuid_from_absolute_id(id, &self.id_namespace))
    }

    #[must_use]
    pub fn id_namespace(&self) -> &str {
        &self.id_namespace
    }

    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl Deref for JsonLdDocument {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl ResponseObject for JsonLdDocument {
    fn from_response(value: Value, id_namespace: &str) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields, id_namespace)),
            _ => Err(serde_json::Error::custom("expected a JSON-LD object")),
        }
    }
}

/// A KG instance: a JSON-LD document with a resolved UUID.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Instance {
    document: JsonLdDocument,
    #[serde(skip)]
    uuid: Option<Uuid>,
}

impl Instance {
    #[must_use]
    pub fn new(document: JsonLdDocument) -> Self {
        let uuid = document.uuid();
        Self { document, uuid }
    }

    /// UUID of the instance, `None` when `@id` is missing or foreign.
    #[must_use]
    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    #[must_use]
    pub fn document(&self) -> &JsonLdDocument {
        &self.document
    }

    #[must_use]
    pub fn into_document(self) -> JsonLdDocument {
        self.document
    }
}

impl Deref for Instance {
    type Target = JsonLdDocument;

    fn deref(&self) -> &Self::Target {
        &self.document
    }
}

impl ResponseObject for Instance {
    fn from_response(value: Value, id_namespace: &str) -> Result<Self, serde_json::Error> {
        JsonLdDocument::from_response(value, id_namespace).map(Self::new)
    }
}

/// Release scope of an instance: the instance and what it links to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scope {
    #[serde(rename = "id")]
    pub instance_id: Option<Uuid>,
    pub label: Option<String>,
    pub space: Option<String>,
    pub types: Option<Vec<String>>,
    pub children: Option<Vec<Scope>>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceInformation {
    #[serde(rename = "http://schema.org/identifier")]
    pub identifier: Option<String>,
    #[serde(rename = "http://schema.org/name")]
    pub name: Option<String>,
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/permissions")]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeInformation {
    #[serde(rename = "http://schema.org/identifier")]
    pub identifier: Option<String>,
    #[serde(rename = "http://schema.org/description")]
    pub description: Option<String>,
    #[serde(rename = "http://schema.org/name")]
    pub name: Option<String>,
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/occurrences")]
    pub occurrences: Option<u64>,
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/color")]
    pub color: Option<String>,
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/labelProperty")]
    pub label_property: Option<String>,
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/spaces")]
    pub spaces: Option<Vec<TypeSpace>>,
}

/// Occurrences of a type in one space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSpace {
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/space")]
    pub space: Option<String>,
    #[serde(rename = "https://core.kg.ebrains.eu/vocab/meta/occurrences")]
    pub occurrences: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "http://schema.org/alternateName")]
    pub alternate_name: Option<String>,
    #[serde(rename = "http://schema.org/name")]
    pub name: Option<String>,
    #[serde(rename = "http://schema.org/email")]
    pub email: Option<String>,
    #[serde(rename = "http://schema.org/givenName")]
    pub given_name: Option<String>,
    #[serde(rename = "http://schema.org/familyName")]
    pub family_name: Option<String>,
    #[serde(rename = "http://schema.org/identifier")]
    pub identifiers: Option<Vec<String>>,
}

/// Public subset of a user, as listed for invitations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReducedUserInformation {
    pub alternate_name: Option<String>,
    pub name: Option<String>,
    pub uuid: Option<Uuid>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawReducedUser {
    #[serde(rename = "http://schema.org/alternateName")]
    alternate_name: Option<String>,
    #[serde(rename = "http://schema.org/name")]
    name: Option<String>,
    #[serde(rename = "@id")]
    id: Option<String>,
}

impl ResponseObject for ReducedUserInformation {
    fn from_response(value: Value, id_namespace: &str) -> Result<Self, serde_json::Error> {
        let raw: RawReducedUser = serde_json::from_value(value)?;
        Ok(Self {
            alternate_name: raw.alternate_name,
            name: raw.name,
            uuid: raw
                .id
                .as_deref()
                .and_then(|id| uuid_from_absolute_id(id, id_namespace)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsOfUse {
    #[serde(default)]
    pub accepted: bool,
    pub version: String,
    pub data: String,
}

impl_response_object_via_serde!(
    Stage,
    ReleaseStatus,
    Scope,
    SpaceInformation,
    TypeInformation,
    User,
    TermsOfUse,
);
