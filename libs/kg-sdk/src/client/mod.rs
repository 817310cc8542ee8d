//! Endpoint groups of the KG API.
//!
//! [`KgClient`] hands out one lightweight view per group; each view borrows
//! the client's [`Transport`] and turns method arguments into query
//! parameters and payloads.

mod admin;
mod instances;
mod jsonld;
mod queries;
mod spaces;
mod types;
mod users;

pub use admin::{KgAdminClient, SpaceSpecification};
pub use instances::{InstanceListOptions, Instances};
pub use jsonld::Jsonld;
pub use queries::{Queries, QueryExecution};
pub use spaces::Spaces;
pub use types::{TypeOptions, Types};
pub use users::Users;

use serde_json::Value;

use crate::builder::ClientBuilder;
use crate::context::ResponseContext;
use crate::error::ClientError;
use crate::page::ResultPage;
use crate::result::{KgResult, ResponseObject, ResultsById, response_object_decoder};
use crate::transport::Transport;

/// Client for the regular (non-admin) KG API.
#[derive(Debug, Clone)]
pub struct KgClient {
    transport: Transport,
}

impl KgClient {
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

    #[must_use]
    pub fn instances(&self) -> Instances<'_> {
        Instances::new(&self.transport)
    }

    #[must_use]
    pub fn jsonld(&self) -> Jsonld<'_> {
        Jsonld::new(&self.transport)
    }

    #[must_use]
    pub fn queries(&self) -> Queries<'_> {
        Queries::new(&self.transport)
    }

    #[must_use]
    pub fn spaces(&self) -> Spaces<'_> {
        Spaces::new(&self.transport)
    }

    #[must_use]
    pub fn types(&self) -> Types<'_> {
        Types::new(&self.transport)
    }

    #[must_use]
    pub fn users(&self) -> Users<'_> {
        Users::new(&self.transport)
    }
}

fn single<T: ResponseObject + 'static>(ctx: ResponseContext) -> Result<KgResult<T>, ClientError> {
    KgResult::from_context(ctx, &response_object_decoder::<T>())
}

fn page<T: ResponseObject + 'static>(ctx: ResponseContext) -> Result<ResultPage<T>, ClientError> {
    ResultPage::from_context(ctx, response_object_decoder::<T>())
}

fn by_id<T: ResponseObject + 'static>(ctx: ResponseContext) -> Result<ResultsById<T>, ClientError> {
    ResultsById::from_context(ctx, &response_object_decoder::<T>())
}

/// JSON array of strings, the payload shape of the bulk endpoints.
fn string_list<I>(values: I) -> Value
where
    I: IntoIterator,
    I::Item: ToString,
{
    Value::Array(
        values
            .into_iter()
            .map(|v| Value::String(v.to_string()))
            .collect(),
    )
}
