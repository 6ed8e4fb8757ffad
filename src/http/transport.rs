//! Single-shot HTTP transport
//!
//! A transport performs exactly one HTTP call. It never retries, never
//! follows cursors and never interprets status codes beyond handing them
//! back. The session picks one of two adapters:
//!
//! - [`Transport`] / [`ReqwestTransport`] for async sessions
//! - [`BlockingTransport`] / [`BlockingReqwestTransport`] for blocking sessions
//!
//! Tests substitute their own implementations of either trait.

use crate::config::SessionConfig;
use crate::error::{Error, Result, ResultExt};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use std::time::Duration;

/// A fully resolved HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without the query string
    pub url: String,
    /// Query pairs
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HeaderMap,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Timeout of this one call
    pub timeout: Duration,
}

/// Raw HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body bytes
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Body as lossy UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Failure to obtain any HTTP response
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The call did not complete within the single request timeout
    #[error("request timed out")]
    Timeout,
    /// DNS, TCP or TLS failure
    #[error("connection failed: {0}")]
    Connection(String),
    /// Anything else the HTTP client reported
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Classified result of one transport call
#[derive(Debug)]
pub enum Outcome {
    /// 1xx-2xx response
    Success(HttpResponse),
    /// 3xx response; the transport never follows redirects itself
    Redirect(HttpResponse),
    /// 4xx response
    ClientError(HttpResponse),
    /// 5xx response
    ServerError(HttpResponse),
    /// No response at all
    TransportFailure(TransportError),
}

impl Outcome {
    /// Classify a transport result by status class
    pub fn classify(result: std::result::Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.status.is_server_error() => Outcome::ServerError(response),
            Ok(response) if response.status.is_client_error() => Outcome::ClientError(response),
            Ok(response) if response.status.is_redirection() => Outcome::Redirect(response),
            Ok(response) => Outcome::Success(response),
            Err(err) => Outcome::TransportFailure(err),
        }
    }

    /// Status code, if a response was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Outcome::Success(r)
            | Outcome::Redirect(r)
            | Outcome::ClientError(r)
            | Outcome::ServerError(r) => {
                Some(r.status)
            }
            Outcome::TransportFailure(_) => None,
        }
    }
}

/// Async single-shot transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Blocking single-shot transport
pub trait BlockingTransport: Send + Sync {
    /// Send one request, blocking the calling thread
    fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

// ============================================================================
// Reqwest adapters
// ============================================================================

/// Read the optional root certificate named by the config
fn load_certificate(config: &SessionConfig) -> Result<Option<reqwest::Certificate>> {
    let Some(path) = &config.certificate_path else {
        return Ok(None);
    };
    let pem = std::fs::read(path)
        .with_context(|| format!("reading certificate {}", path.display()))?;
    Ok(Some(reqwest::Certificate::from_pem(&pem)?))
}

/// Build the proxy named by the config
fn load_proxy(config: &SessionConfig) -> Result<Option<reqwest::Proxy>> {
    config
        .requests_proxy
        .as_deref()
        .map(reqwest::Proxy::all)
        .transpose()
        .map_err(Error::from)
}

/// Async transport backed by a pooled [`reqwest::Client`]
///
/// Redirects are returned to the session rather than followed: reqwest
/// strips `Authorization` when a redirect changes host, and the Dashboard
/// redirects to regional shards.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client honouring timeout, proxy and certificate settings
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.single_request_timeout)
            .user_agent(config.user_agent())
            .redirect(reqwest::redirect::Policy::none());

        if let Some(cert) = load_certificate(config)? {
            builder = builder.add_root_certificate(cert);
        }
        if let Some(proxy) = load_proxy(config)? {
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse::new(status, headers, body))
    }
}

/// Blocking transport backed by a pooled [`reqwest::blocking::Client`]
#[derive(Debug, Clone)]
pub struct BlockingReqwestTransport {
    client: reqwest::blocking::Client,
}

impl BlockingReqwestTransport {
    /// Build a client honouring timeout, proxy and certificate settings
    ///
    /// Must not be called from inside an async runtime; reqwest's blocking
    /// client owns its own.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(config.single_request_timeout)
            .user_agent(config.user_agent())
            .redirect(reqwest::redirect::Policy::none());

        if let Some(cert) = load_certificate(config)? {
            builder = builder.add_root_certificate(cert);
        }
        if let Some(proxy) = load_proxy(config)? {
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl BlockingTransport for BlockingReqwestTransport {
    fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        Ok(HttpResponse::new(status, headers, body))
    }
}

/// Default headers sent with every request of a session
pub fn default_headers(config: &SessionConfig, api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| Error::invalid_value("api_key", "contains characters not allowed in a header"))?;
    auth.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth);
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_str(&config.user_agent())
            .map_err(|_| Error::invalid_value("caller", "contains characters not allowed in a header"))?,
    );

    if let Some(geo) = config.be_geo_id.as_deref() {
        headers.insert(
            "x-be-geo-id",
            HeaderValue::from_str(geo)
                .map_err(|_| Error::invalid_value("be_geo_id", "contains characters not allowed in a header"))?,
        );
    }

    Ok(headers)
}
