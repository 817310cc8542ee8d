#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Token handling for the KG API client.
//!
//! A [`TokenHandler`] caches one bearer token and refreshes it at most once
//! per burst of concurrent requests. The token itself comes from a
//! [`TokenSource`]: a fixed value, a callback, or one of the `OAuth2` flows
//! in [`oauth2`].

pub mod error;
pub mod handler;
pub mod http_error;
pub mod oauth2;
pub mod secret;

pub use error::TokenError;
pub use handler::{CallableToken, StaticToken, TokenContext, TokenHandler, TokenSource};
pub use oauth2::{ClientCredentials, DeviceFlow, DeviceFlowConfig};
pub use secret::SecretString;
