//! Async client for the conferencing-server API.
//!
//! - [`BbbClient`] - signs calls, sends them and normalizes responses
//! - [`ClientConfig`] - server URL, secret, version and HTTP settings
//! - [`ClientError`] - transport, protocol, API and configuration failures
//! - [`PresentationModules`] - documents preloaded by `create`
//!
//! # Flow
//!
//! ```text
//!  call(method, params)
//!          │
//!          ▼ ProtocolPolicy::filter_params
//!  ┌──────────────────┐
//!  │  RequestBuilder  │  sign, place params in query or form body
//!  └────────┬─────────┘
//!           ▼ reqwest
//!  ┌──────────────────┐
//!  │     Exchange     │  url, status, raw body
//!  └────────┬─────────┘
//!           ▼ xml::decode + default_formatting
//!  ┌──────────────────┐
//!  │   ResponseMap    │  returncode FAILED ─▶ ClientError::Api
//!  └────────┬─────────┘
//!           ▼ ProtocolPolicy::format_response
//!      ApiResponse
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bbb_client::{BbbClient, ClientConfig, ParamSet};
//!
//! let config = ClientConfig::new("https://demo.example.com/bigbluebutton/api", "secret")?;
//! let client = BbbClient::connect(config).await?;
//! let meeting = client
//!     .create_meeting("Demo", "demo-1", ParamSet::new().with("record", true), None)
//!     .await?;
//! println!("{:?}", meeting.data.get_str("moderatorPW"));
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod modules;
mod secret;

pub use client::{ApiResponse, BbbClient, Exchange};
pub use config::ClientConfig;
pub use endpoints::DEFAULT_LAYOUTS;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use modules::PresentationModules;

pub use bbb_core::{ResponseMap, Value};
pub use bbb_protocol::{ParamSet, ParamValue, ProtocolVersion};
