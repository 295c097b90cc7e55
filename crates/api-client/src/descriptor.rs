//! Request descriptors
//!
//! A [`RequestDescriptor`] describes one call: where it goes, what it sends
//! and which schemas guard each direction. Callers build a fresh descriptor
//! per call and hand it to the executor by value.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use storefront_core::validation::Schema;
use storefront_core::{normalize_error, AppError};
use uuid::Uuid;

/// HTTP methods the executor issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Everything the executor needs for one call
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    /// HTTP method
    pub method: HttpMethod,
    /// JSON body
    pub payload: Option<Value>,
    /// Query string parameters
    pub query: Vec<(String, String)>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Schema the payload must satisfy before anything is sent
    pub outbound_schema: Option<Arc<Schema>>,
    /// Schema the response body must satisfy
    pub inbound_schema: Option<Arc<Schema>>,
    /// Ignore `inbound_schema`
    pub skip_validation: bool,
    /// Per-call retry ceiling, read by the orchestrator
    pub max_retries: Option<u32>,
}

impl RequestDescriptor {
    /// Start a descriptor for `method path`
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            payload: None,
            query: Vec::new(),
            headers: Vec::new(),
            outbound_schema: None,
            inbound_schema: None,
            skip_validation: false,
            max_retries: None,
        }
    }

    /// GET descriptor
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST descriptor
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// PUT descriptor
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// PATCH descriptor
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// DELETE descriptor
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body
    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach a serializable body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, AppError> {
        self.payload = Some(serde_json::to_value(body).map_err(normalize_error)?);
        Ok(self)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Validate the payload against `schema` before sending
    #[must_use]
    pub fn outbound(mut self, schema: Arc<Schema>) -> Self {
        self.outbound_schema = Some(schema);
        self
    }

    /// Validate the response against `schema`
    #[must_use]
    pub fn inbound(mut self, schema: Arc<Schema>) -> Self {
        self.inbound_schema = Some(schema);
        self
    }

    /// Trust the response and skip inbound validation
    #[must_use]
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Override the retry ceiling for this call
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// Correlation data generated for every executed call
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Sent as `X-Request-ID`
    pub request_id: Uuid,
    /// Monotonic start, for elapsed time
    pub started_at: Instant,
    /// Wall-clock start, for logs
    pub started_at_utc: chrono::DateTime<chrono::Utc>,
}

impl RequestMeta {
    /// Fresh metadata for a call starting now
    #[must_use]
    pub fn start() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Instant::now(),
            started_at_utc: chrono::Utc::now(),
        }
    }

    /// Milliseconds since the call started
    #[must_use]
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}
