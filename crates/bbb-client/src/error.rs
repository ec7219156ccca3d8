//! Client error types.

use std::fmt;

use bbb_protocol::{ProtocolError, RequestError, VersionError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// The category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not be reached or the body could not be read.
    Transport,
    /// The server answered with something that is not a valid response.
    Protocol,
    /// The server answered with `returncode` FAILED.
    Api,
    /// The client was set up wrong.
    Configuration,
}

impl ErrorKind {
    /// Returns true if repeating the call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Api => "api",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`BbbClient`](crate::BbbClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS, timeout or body read failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response could not be decoded or lacks a `returncode`.
    #[error("invalid response from {url}: {message}")]
    Protocol {
        url: String,
        message: String,
        #[source]
        source: Option<ProtocolError>,
    },

    /// The server rejected the call.
    #[error("{}", api_message(.message, .message_key))]
    Api {
        message: String,
        message_key: String,
    },

    /// Invalid settings, detected before any call is made.
    #[error("configuration error: {0}")]
    Configuration(String),
}

fn api_message(message: &str, message_key: &str) -> String {
    if message_key.is_empty() {
        message.to_string()
    } else {
        format!("{}, messageKey: {}", message, message_key)
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Api { .. } => ErrorKind::Api,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// The server's machine-readable error key, for API errors.
    pub fn message_key(&self) -> Option<&str> {
        match self {
            Self::Api { message_key, .. } => Some(message_key),
            _ => None,
        }
    }

    pub(crate) fn protocol(url: impl fmt::Display, source: ProtocolError) -> Self {
        Self::Protocol {
            url: url.to_string(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}

impl From<VersionError> for ClientError {
    fn from(err: VersionError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// A request that cannot be built is reported against the URL it would
/// have used; it is never a configuration error.
impl From<RequestError> for ClientError {
    fn from(err: RequestError) -> Self {
        let url = match &err {
            RequestError::InvalidUrl { url, .. } => url.clone(),
        };
        Self::protocol(url, ProtocolError::Request(err))
    }
}
