//! SBI HTTP Client
//!
//! Pooled hyper client for SBI communication. Requests carry absolute URIs
//! so a single client can follow the NRF when its base URI changes.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::{SbiError, SbiResult};
use crate::message::{SbiRequest, SbiResponse};

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// SBI Client configuration
#[derive(Debug, Clone)]
pub struct SbiClientConfig {
    /// Speak HTTP/2 with prior knowledge instead of HTTP/1.1
    pub http2_only: bool,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout, covering the exchange and the body read
    pub request_timeout: Duration,
}

impl Default for SbiClientConfig {
    fn default() -> Self {
        Self {
            http2_only: true,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl SbiClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use HTTP/1.1 (e.g. for non-SBI peers such as a management UI)
    pub fn with_http1(mut self) -> Self {
        self.http2_only = false;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// SBI Client
#[derive(Clone)]
pub struct SbiClient {
    config: SbiClientConfig,
    inner: Client<HttpConnector, Full<Bytes>>,
}

impl SbiClient {
    /// Create a new SBI client
    pub fn new(config: SbiClientConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout));
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        builder.http2_only(config.http2_only);
        let inner = builder.build(connector);

        Self { config, inner }
    }

    /// Send an SBI request and receive a response
    pub async fn send_request(&self, request: SbiRequest) -> SbiResult<SbiResponse> {
        let uri: Uri = request
            .header
            .uri
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("{}: {e}", request.header.uri)))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(SbiError::InvalidUri(request.header.uri));
        }

        let method = match request.header.method.to_uppercase().as_str() {
            "GET" => Method::GET,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            other => return Err(SbiError::InvalidMethod(other.to_string())),
        };

        let body = request
            .http
            .content
            .map(|c| Full::new(Bytes::from(c)))
            .unwrap_or_else(|| Full::new(Bytes::new()));

        let mut req_builder = Request::builder().method(method).uri(uri);
        for (key, value) in &request.http.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }
        let http_request = req_builder
            .body(body)
            .map_err(|e| SbiError::ClientError(e.to_string()))?;

        log::debug!(
            "SBI {} {}",
            http_request.method(),
            http_request.uri()
        );

        tokio::time::timeout(self.config.request_timeout, self.exchange(http_request))
            .await
            .map_err(|_| SbiError::Timeout)?
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> SbiResult<SbiResponse> {
        let response = self
            .inner
            .request(request)
            .await
            .map_err(|e| SbiError::ConnectionError(e.to_string()))?;

        convert_response(response).await
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> SbiResult<SbiResponse> {
        self.send_request(SbiRequest::get(uri)).await
    }

    /// Send a PUT request with JSON body
    pub async fn put_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> SbiResult<SbiResponse> {
        let request = SbiRequest::put(uri).with_json_body(body)?;
        self.send_request(request).await
    }

    /// Send a DELETE request
    pub async fn delete(&self, uri: &str) -> SbiResult<SbiResponse> {
        self.send_request(SbiRequest::delete(uri)).await
    }
}

/// Convert hyper response to SbiResponse
async fn convert_response(response: hyper::Response<Incoming>) -> SbiResult<SbiResponse> {
    let status = response.status().as_u16();

    let mut headers = HashMap::new();
    for (key, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(key.as_str().to_ascii_lowercase(), v.to_string());
        }
    }

    let body_bytes = response
        .into_body()
        .collect()
        .await
        .map_err(|e| SbiError::InvalidResponse(e.to_string()))?
        .to_bytes();

    let content = if body_bytes.is_empty() {
        None
    } else {
        let text = String::from_utf8(body_bytes.to_vec())
            .map_err(|e| SbiError::InvalidResponse(format!("body is not UTF-8: {e}")))?;
        Some(text)
    };

    let mut sbi_response = SbiResponse::with_status(status);
    sbi_response.http.headers = headers;
    sbi_response.http.content = content;

    Ok(sbi_response)
}
