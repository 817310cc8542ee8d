#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Async client for the EBRAINS Knowledge Graph REST API.
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use kg_sdk::{ClientBuilder, InstanceListOptions};
//!
//! let client = ClientBuilder::from_env()?.build()?;
//! let page = client
//!     .instances()
//!     .list(&InstanceListOptions::of_type("https://openminds.ebrains.eu/core/Person"))
//!     .await?;
//!
//! let mut people = page.items();
//! while let Some(person) = people.next().await {
//!     println!("{:?}", person?.uuid());
//! }
//! ```
//!
//! Calls resolve for every HTTP status. API failures are reported in the
//! `error` field of [`KgResult`], [`ResultPage`] and [`ResultsById`], or as
//! the returned `Option<KgError>` for calls without a response body.

pub mod builder;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod models;
pub mod page;
pub mod result;
pub mod transport;

pub use builder::ClientBuilder;
pub use client::{
    InstanceListOptions, Instances, Jsonld, KgAdminClient, KgClient, Queries, QueryExecution,
    SpaceSpecification, Spaces, TypeOptions, Types, Users,
};
pub use config::KgSettings;
pub use context::ResponseContext;
pub use error::{ClientError, KgError};
pub use ids::{absolute_id, uuid_from_absolute_id};
pub use models::{
    ExtendedResponseConfiguration, Instance, JsonLdDocument, Pagination, ReducedUserInformation,
    ReleaseStatus, ReleaseTreeScope, ResponseConfiguration, Scope, SpaceInformation, Stage,
    TermsOfUse, TypeInformation, TypeSpace, User,
};
pub use page::{Items, PageAvailability, Pages, ResultPage};
pub use result::{Decoder, KgResult, ResponseMeta, ResponseObject, ResultsById};
pub use transport::{QueryParams, RequestArgs, Transport, TransportConfig};

pub use kg_auth::{SecretString, TokenHandler};
