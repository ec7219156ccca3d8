//! The API client.
//!
//! A call goes through these steps:
//!
//! 1. drop parameters the negotiated version does not accept;
//! 2. build and sign the request;
//! 3. send it (GET, or POST when there is a body);
//! 4. decode the XML body and normalize `returncode`, `messageKey` and
//!    `message`;
//! 5. fail with [`ClientError::Api`] if the server reported a failure;
//! 6. apply the per-method formatting.

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, trace};
use url::Url;

use bbb_core::ResponseMap;
use bbb_protocol::request::INDEX;
use bbb_protocol::{
    ParamSet, ProtocolPolicy, ProtocolVersion, RequestBuilder, SignedRequest, VersionSet,
    decode_response,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// The raw side of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Final URL, after redirects.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response body as received.
    pub body: String,
}

/// A successful, normalized response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// The normalized response fields.
    pub data: ResponseMap,
    /// What was sent and received.
    pub exchange: Exchange,
}

impl ApiResponse {
    pub fn into_data(self) -> ResponseMap {
        self.data
    }
}

/// Client for one conferencing server.
///
/// Holds no per-call state and can be shared between tasks.
#[derive(Debug, Clone)]
pub struct BbbClient {
    config: ClientConfig,
    policy: ProtocolPolicy,
    http: Client,
}

impl BbbClient {
    /// Creates a client, asking the server for its version when the
    /// configuration does not name one.
    ///
    /// # Errors
    ///
    /// Fails if the version is unusable, or if the version query itself
    /// fails.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let http = build_http(&config)?;
        let requested = match config.requested_version() {
            Some(version) => version.to_string(),
            None => detect_version(&http, &config).await?,
        };
        Self::assemble(config, http, &requested)
    }

    /// Creates a client for the version named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if no version is set, if it
    /// is older than every supported one, or if the HTTP client cannot be
    /// built.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let requested = config
            .requested_version()
            .ok_or_else(|| {
                ClientError::Configuration(
                    "no API version configured; use BbbClient::connect to detect it".to_string(),
                )
            })?
            .to_string();
        let http = build_http(&config)?;
        Self::assemble(config, http, &requested)
    }

    fn assemble(config: ClientConfig, http: Client, requested: &str) -> ClientResult<Self> {
        let version = VersionSet::supported().resolve(requested)?;
        let policy = ProtocolPolicy::for_version(version);
        debug!(
            url = %config.url,
            version = %policy.version(),
            generation = policy.generation().as_str(),
            "client ready"
        );
        Ok(Self {
            config,
            policy,
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The version requests are built for.
    pub fn version(&self) -> &ProtocolVersion {
        self.policy.version()
    }

    pub fn policy(&self) -> &ProtocolPolicy {
        &self.policy
    }

    /// Performs a signed call.
    pub async fn call(&self, method: &str, params: ParamSet) -> ClientResult<ApiResponse> {
        self.call_with_body(method, params, None).await
    }

    /// Performs a signed call carrying an XML document.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] when the server cannot be reached;
    /// - [`ClientError::Protocol`] when the body is not a valid response;
    /// - [`ClientError::Api`] when the server reports a failure.
    pub async fn call_with_body(
        &self,
        method: &str,
        params: ParamSet,
        body: Option<String>,
    ) -> ClientResult<ApiResponse> {
        let request = self.signed_request(method, params, body)?;
        let exchange = send(&self.http, &self.config, request).await?;
        let data = self.interpret(method, &exchange)?;
        Ok(ApiResponse { data, exchange })
    }

    /// Performs a signed call and returns the body without decoding it.
    pub async fn call_raw(&self, method: &str, params: ParamSet) -> ClientResult<Exchange> {
        let request = self.signed_request(method, params, None)?;
        send(&self.http, &self.config, request).await
    }

    /// Builds the signed URL for a call without sending it.
    pub fn request_url(&self, method: &str, params: ParamSet) -> ClientResult<Url> {
        Ok(self.signed_request(method, params, None)?.url)
    }

    fn signed_request(
        &self,
        method: &str,
        params: ParamSet,
        body: Option<String>,
    ) -> ClientResult<SignedRequest> {
        let params = self.policy.filter_params(method, params);
        let request = RequestBuilder::new(&self.config.url, &self.config.secret, &self.policy)
            .build(method, &params, body)?;
        Ok(request)
    }

    fn interpret(&self, method: &str, exchange: &Exchange) -> ClientResult<ResponseMap> {
        let mut data = decode_body(exchange)?;
        ensure_success(&data)?;
        self.policy.format_response(method, &mut data);
        Ok(data)
    }
}

/// Decodes a body into a normalized map; an empty body counts as success.
fn decode_body(exchange: &Exchange) -> ClientResult<ResponseMap> {
    if exchange.body.trim().is_empty() {
        let mut data = ResponseMap::new();
        data.insert("returncode", true);
        data.insert("messageKey", "");
        data.insert("message", "");
        return Ok(data);
    }
    decode_response(&exchange.body).map_err(|e| ClientError::protocol(&exchange.url, e))
}

fn ensure_success(data: &ResponseMap) -> ClientResult<()> {
    if data.get_bool("returncode") == Some(true) {
        return Ok(());
    }
    Err(ClientError::Api {
        message: data.get_str("message").unwrap_or_default().to_string(),
        message_key: data.get_str("messageKey").unwrap_or_default().to_string(),
    })
}

fn build_http(config: &ClientConfig) -> ClientResult<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ClientError::Configuration(format!("invalid header name {:?}: {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ClientError::Configuration(format!("invalid value for header {}: {}", name, e))
        })?;
        headers.insert(name, value);
    }

    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| ClientError::Configuration(format!("failed to create HTTP client: {}", e)))
}

async fn send(http: &Client, config: &ClientConfig, request: SignedRequest) -> ClientResult<Exchange> {
    let SignedRequest { url, body } = request;

    if config.debug {
        debug!(url = %url, "sending request");
    }

    let builder = match body {
        Some(body) => {
            if config.debug {
                debug!(content_type = body.content_type(), body = body.as_str(), "request body");
            }
            http.post(url.clone())
                .header(CONTENT_TYPE, body.content_type())
                .body(body.into_string())
        }
        None => http.get(url.clone()),
    };

    let transport = |source| ClientError::Transport {
        url: url.to_string(),
        source,
    };
    let response = builder.send().await.map_err(transport)?;
    let status = response.status().as_u16();
    let final_url = response.url().clone();
    let body = response.text().await.map_err(transport)?;

    if config.debug {
        debug!(status, body = %body, "response received");
    } else {
        trace!(status, bytes = body.len(), "response received");
    }

    Ok(Exchange {
        url: final_url,
        status,
        body,
    })
}

async fn detect_version(http: &Client, config: &ClientConfig) -> ClientResult<String> {
    // The index call is unsigned, so any policy will do.
    let bootstrap = ProtocolPolicy::for_version(
        VersionSet::supported()
            .highest()
            .cloned()
            .ok_or_else(|| ClientError::Configuration("no supported API versions".to_string()))?,
    );
    let request = RequestBuilder::new(&config.url, &config.secret, &bootstrap).build(
        INDEX,
        &ParamSet::new(),
        None,
    )?;
    let exchange = send(http, config, request).await?;
    let data = decode_body(&exchange)?;
    ensure_success(&data)?;
    let version = data.get_str("version").unwrap_or_default().trim().to_string();
    debug!(version = %version, "detected server API version");
    Ok(version)
}
