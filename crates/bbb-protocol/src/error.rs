//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Any error raised by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Errors raised by the XML codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// The input holds no element at all.
    #[error("XML document has no root element")]
    MissingRoot,

    /// The input ended while an element was still open.
    #[error("XML document ends inside <{0}>")]
    Unclosed(String),

    /// A second top-level element follows the root.
    #[error("unexpected second root element <{0}>")]
    MultipleRoots(String),

    /// Serializing a document failed.
    #[error("failed to write XML: {0}")]
    Write(String),
}

/// Errors raised while normalizing a decoded response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The response carries no success indicator.
    #[error("response has no returncode")]
    MissingReturnCode,

    /// The success indicator is not a string or flag.
    #[error("returncode is a {0}, expected a string")]
    InvalidReturnCode(&'static str),

    /// The response body is not an element with fields.
    #[error("response root <{0}> has no fields")]
    NotAMap(String),
}

/// Errors raised while resolving a protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The version string is not made of dot-separated numbers.
    #[error("invalid API version {0:?}")]
    Unparseable(String),

    /// The version is older than every supported one.
    #[error("invalid API version {requested}, supported versions: {supported}")]
    BelowMinimum { requested: String, supported: String },
}

/// Errors raised while building a signed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The base URL and method do not form a valid URL.
    #[error("invalid request URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
