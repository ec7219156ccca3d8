//! Request signing and URL building.
//!
//! Every call except `index` and `check` carries a checksum: the lower-case
//! hex SHA-1 of the method name, the encoded query string and the shared
//! secret concatenated together. 0.64 servers leave the method name out.

use sha1::{Digest, Sha1};
use tracing::debug;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::error::RequestError;
use crate::params::ParamSet;
use crate::policy::ProtocolPolicy;

/// Method returning the server version; sent unsigned to the base URL.
pub const INDEX: &str = "index";
/// Method checking that the server is reachable; sent unsigned to `/check`.
pub const CHECK: &str = "check";
/// The one method whose parameters travel in a form body.
pub const SET_CONFIG_XML: &str = "setConfigXML";

/// Body of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` parameters, checksum first.
    Form(String),
    /// An XML document sent with `application/xml`.
    Xml(String),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Form(_) => "application/x-www-form-urlencoded",
            Self::Xml(_) => "application/xml",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Form(body) | Self::Xml(body) => body,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Form(body) | Self::Xml(body) => body,
        }
    }
}

/// A fully built request: GET when there is no body, POST otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub url: Url,
    pub body: Option<RequestBody>,
}

/// Builds signed requests against one server.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    base: &'a Url,
    secret: &'a str,
    policy: &'a ProtocolPolicy,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(base: &'a Url, secret: &'a str, policy: &'a ProtocolPolicy) -> Self {
        Self {
            base,
            secret,
            policy,
        }
    }

    /// Builds the request for `method`.
    ///
    /// `payload` is an XML document to post alongside the signed query.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if the base URL cannot be
    /// extended with the method name.
    pub fn build(
        &self,
        method: &str,
        params: &ParamSet,
        payload: Option<String>,
    ) -> Result<SignedRequest, RequestError> {
        match method {
            INDEX => {
                return Ok(SignedRequest {
                    url: self.base.clone(),
                    body: payload.map(RequestBody::Xml),
                });
            }
            CHECK => {
                let mut url = self.base.clone();
                url.set_path("/check");
                url.set_query(None);
                url.set_fragment(None);
                return Ok(SignedRequest { url, body: None });
            }
            _ => {}
        }

        let query = self.query_string(params);
        let checksum = self.checksum(method, &query);
        let base = self.base.as_str().trim_end_matches('/');

        let (raw_url, body) = if method == SET_CONFIG_XML {
            let form = if query.is_empty() {
                format!("checksum={}", checksum)
            } else {
                format!("checksum={}&{}", checksum, query)
            };
            (format!("{}/{}", base, method), Some(RequestBody::Form(form)))
        } else {
            let signed = if query.is_empty() {
                format!("checksum={}", checksum)
            } else {
                format!("{}&checksum={}", query, checksum)
            };
            (
                format!("{}/{}?{}", base, method, signed),
                payload.map(RequestBody::Xml),
            )
        };

        let url = Url::parse(&raw_url).map_err(|source| RequestError::InvalidUrl {
            url: raw_url.clone(),
            source,
        })?;
        debug!(method, url = %url, "built signed request");
        Ok(SignedRequest { url, body })
    }

    /// Encodes the set parameters as `key=value` pairs joined with `&`.
    ///
    /// Values are form-encoded (space as `+`); keys are written as given.
    pub fn query_string(&self, params: &ParamSet) -> String {
        let mut pairs: Vec<(&str, String)> = params
            .iter()
            .map(|(key, value)| (key, byte_serialize(value.to_string().as_bytes()).collect()))
            .collect();
        if self.policy.sorts_params() {
            pairs.sort_by(|a, b| a.0.cmp(b.0));
        }
        pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Lower-case hex SHA-1 over `[method] + query + secret`.
    pub fn checksum(&self, method: &str, query: &str) -> String {
        let mut hasher = Sha1::new();
        if self.policy.checksum_includes_method() {
            hasher.update(method.as_bytes());
        }
        hasher.update(query.as_bytes());
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}
