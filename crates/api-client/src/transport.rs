//! Network transport
//!
//! The executor talks to the network through the [`Transport`] trait so the
//! request lifecycle can be exercised without sockets.

use crate::descriptor::HttpMethod;
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Request correlation ID header
pub const X_REQUEST_ID: &str = "X-Request-ID";

/// A fully resolved outgoing request
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Query string parameters
    pub query: Vec<(String, String)>,
    /// Headers, including auth and correlation headers
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A successful response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body; `Null` for empty bodies
    pub body: Value,
}

/// Sends one request; never retries
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, returning the body on 2xx
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
}

impl HttpTransport {
    /// Build a transport with JSON defaults and a hard timeout
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("storefront-api-client/", env!("CARGO_PKG_VERSION"))),
        );

        let inner = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method.into(), &request.url)
            .query(&request.query);

        for (name, value) in &request.headers {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                debug!(header = %name, "Skipping invalid header");
                continue;
            };
            builder = builder.header(name, value);
        }

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);

        if status.is_success() {
            Ok(TransportResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// JSON when possible, otherwise the raw text; empty bodies become `Null`
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
