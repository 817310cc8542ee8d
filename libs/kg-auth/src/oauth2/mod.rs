//! `OAuth2` token sources for the KG API.
//!
//! - [`ClientCredentials`] for service accounts
//! - [`DeviceFlow`] for interactive users on a terminal
//!
//! Both discover their endpoints from the KG itself unless configured
//! explicitly.

pub mod client_credentials;
pub mod device_flow;
pub(crate) mod discovery;
pub mod types;

pub use client_credentials::ClientCredentials;
pub use device_flow::{
    DeviceFlow, DeviceFlowConfig, DeviceFlowState, DevicePoller, DeviceTokens, PollOutcome,
};
