//! Wire protocol for the conferencing-server API.
//!
//! This crate turns a logical call (method name plus parameters) into a
//! signed request and a raw XML response into a normalized
//! [`ResponseMap`](bbb_core::ResponseMap). It does no I/O.
//!
//! # Example
//!
//! ```rust
//! use bbb_protocol::{ParamSet, ProtocolPolicy, RequestBuilder, VersionSet, decode_response};
//! use url::Url;
//!
//! let version = VersionSet::supported().resolve("0.81").unwrap();
//! let policy = ProtocolPolicy::for_version(version);
//! let base = Url::parse("https://demo.example.com/bigbluebutton/api").unwrap();
//!
//! let params = ParamSet::new().with("meetingID", "abc-123");
//! let request = RequestBuilder::new(&base, "secret", &policy)
//!     .build("isMeetingRunning", &params, None)
//!     .unwrap();
//! assert!(request.url.as_str().contains("meetingID=abc-123&checksum="));
//!
//! let mut map = decode_response(
//!     "<response><returncode>SUCCESS</returncode><running>true</running></response>",
//! )
//! .unwrap();
//! policy.format_response("isMeetingRunning", &mut map);
//! assert_eq!(map.get_bool("running"), Some(true));
//! ```

pub mod error;
pub mod format;
pub mod params;
pub mod policy;
pub mod request;
pub mod version;
pub mod xml;

use bbb_core::ResponseMap;

pub use error::{
    FormatError, ProtocolError, ProtocolResult, RequestError, VersionError, XmlError,
};
pub use format::{Formatter, default_formatting};
pub use params::{ParamSet, ParamValue};
pub use policy::{Generation, ProtocolPolicy};
pub use request::{RequestBody, RequestBuilder, SignedRequest};
pub use version::{ProtocolVersion, SUPPORTED_VERSIONS, VersionSet};

/// Decodes a response body and applies the formatting every response gets.
///
/// # Errors
///
/// Fails if the body is not XML, if its root holds no fields, or if it has
/// no `returncode`.
pub fn decode_response(body: &str) -> ProtocolResult<ResponseMap> {
    let document = xml::decode(body)?;
    let root = document.root.clone();
    let mut map = document
        .into_map()
        .ok_or(FormatError::NotAMap(root))?;
    default_formatting(&mut map)?;
    Ok(map)
}
