//! Client configuration.
//!
//! A [`ClientConfig`] is built in code with the `with_*` setters or loaded
//! from a TOML file:
//!
//! ```toml
//! url = "https://demo.example.com/bigbluebutton/api"
//! secret = "env::BBB_SECRET"
//! version = "0.81"      # optional, detected from the server when absent
//! timeout_secs = 10
//! debug = false
//!
//! [headers]
//! X-Forwarded-For = "10.0.0.1"
//! ```
//!
//! The secret supports references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use bbb_core::TracingConfig;
use serde::Deserialize;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Settings for one server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API endpoint, e.g. `https://host/bigbluebutton/api`.
    pub url: Url,

    /// Shared secret used to sign requests.
    pub secret: String,

    /// Requested API version. `None` means "ask the server".
    pub version: Option<String>,

    /// Connect and read timeout.
    pub timeout: Duration,

    /// Headers added to every request.
    pub headers: BTreeMap<String, String>,

    /// Logs request URLs and response bodies at debug level.
    pub debug: bool,

    /// User agent string.
    pub user_agent: String,
}

impl ClientConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Creates a configuration for the server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if `url` is not an absolute
    /// http(s) URL.
    pub fn new(url: impl AsRef<str>, secret: impl Into<String>) -> ClientResult<Self> {
        let raw = url.as_ref().trim();
        let url = Url::parse(raw)
            .map_err(|e| ClientError::Configuration(format!("invalid server URL {:?}: {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "server URL must use http or https, got {:?}",
                url.scheme()
            )));
        }

        Ok(Self {
            url,
            secret: secret.into(),
            version: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            headers: BTreeMap::new(),
            debug: false,
            user_agent: format!("bbb-client/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the file cannot be read or
    /// parsed, or if the secret reference cannot be resolved.
    pub fn load_from(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| {
            ClientError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;
        file.into_config()
    }

    /// Sets the API version to speak.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Enables request/response logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Log settings that make the `debug` flag's output visible.
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::for_client(self.debug)
    }

    /// The requested version, if one is set and not blank.
    pub fn requested_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

impl PartialEq for ClientConfig {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.secret == other.secret
            && self.version == other.version
            && self.debug == other.debug
            && self.timeout == other.timeout
            && self.headers == other.headers
    }
}

/// On-disk layout of a configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    url: String,
    secret: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl ConfigFile {
    fn into_config(self) -> ClientResult<ClientConfig> {
        let secret = secret::resolve(&self.secret)
            .map_err(|e| ClientError::Configuration(format!("cannot resolve secret: {}", e)))?;

        let mut config = ClientConfig::new(&self.url, secret)?.with_debug(self.debug);
        config.version = self.version;
        config.headers = self.headers;
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        Ok(config)
    }
}
