#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP client infrastructure for the KG client libraries
//!
//! This crate provides a hyper-based HTTP client with:
//! - Automatic TLS via rustls (HTTPS only by default)
//! - Connection pooling
//! - A per-request timeout
//! - User-Agent header injection
//! - Size-limited body reads
//!
//! `send()` resolves for every HTTP status. Only transport, timeout and TLS
//! failures are errors; non-2xx statuses become errors through
//! [`HttpResponse::error_for_status`] or the checked body readers.
//!
//! # Example
//!
//! ```ignore
//! use kg_http::HttpClient;
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .user_agent("my-app/1.0")
//!     .build()?;
//!
//! let data: MyData = client
//!     .get("https://core.kg.ebrains.eu/v3-beta/users/me")
//!     .header("authorization", "Bearer ...")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, HttpClientConfig, TlsRootConfig, TransportSecurity};
pub use error::{HttpError, InvalidUriKind};
pub use request::RequestBuilder;
pub use response::HttpResponse;

pub use http::{Method, StatusCode};
