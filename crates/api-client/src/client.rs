//! Typed request executor
//!
//! [`StorefrontClient::request`] performs exactly one transport call per
//! invocation:
//!
//! 1. validate the outbound payload (fail fast, nothing is sent)
//! 2. attach correlation and auth headers
//! 3. send through the [`Transport`] under the configured timeout
//! 4. validate the inbound body unless the descriptor skips it
//!
//! Every failure leaves as a normalized [`AppError`]. Retries belong to the
//! orchestrator.

use crate::config::ClientConfig;
use crate::descriptor::{HttpMethod, RequestDescriptor, RequestMeta};
use crate::endpoints::{AuthApi, CartApi, ProductsApi, ReviewsApi};
use crate::error::{ApiResult, TransportError};
use crate::session::{MemorySessionStore, SessionStore};
use crate::transport::{HttpTransport, Transport, TransportRequest, X_REQUEST_ID};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use storefront_core::{normalize_error, AppError};
use storefront_core::validation::{validate, ValidationContext};
use tracing::{debug, instrument, warn};

/// API key header for Supabase
const APIKEY_HEADER: &str = "apikey";

/// Storefront API client
///
/// Cheap to clone; clones share the transport, configuration and session
/// store.
#[derive(Clone)]
pub struct StorefrontClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    session: Arc<dyn SessionStore>,
}

impl fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("base_url", &self.config.base_url)
            .field("signed_in", &self.session.get().is_some())
            .finish_non_exhaustive()
    }
}

impl StorefrontClient {
    /// Create a new client with configuration from the environment
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a client over HTTP with an in-memory session
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.timeout).map_err(normalize_error)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            session: Arc::new(MemorySessionStore::new()),
        }
    }

    /// Replace the session store
    #[must_use]
    pub fn with_session_store(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = session;
        self
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Session store shared by this client
    #[must_use]
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Access identity endpoints
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access cart endpoints
    #[must_use]
    pub fn cart(&self) -> CartApi {
        CartApi::new(self.clone())
    }

    /// Access product catalog endpoints
    #[must_use]
    pub fn products(&self) -> ProductsApi {
        ProductsApi::new(self.clone())
    }

    /// Access review endpoints
    #[must_use]
    pub fn reviews(&self) -> ReviewsApi {
        ReviewsApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Executor
    // -------------------------------------------------------------------------

    /// Execute one call described by `descriptor`
    #[instrument(
        skip(self, descriptor),
        fields(method = %descriptor.method, path = %descriptor.path, request_id)
    )]
    pub async fn request(&self, descriptor: RequestDescriptor) -> ApiResult<Value> {
        let meta = RequestMeta::start();
        tracing::Span::current().record("request_id", tracing::field::display(meta.request_id));

        let context = ValidationContext::new(descriptor.method.as_str(), &descriptor.path);

        let body = match descriptor.outbound_schema {
            Some(ref schema) => {
                let payload = descriptor.payload.clone().unwrap_or(Value::Null);
                let checked = validate(schema, &payload, &context).into_result().inspect_err(|e| {
                    debug!(error = %e, "Outbound payload rejected");
                })?;
                Some(checked)
            }
            None => descriptor.payload.clone(),
        };

        let request = TransportRequest {
            method: descriptor.method,
            url: self.config.url_for(&descriptor.path),
            query: descriptor.query.clone(),
            headers: self.headers_for(&descriptor, &meta),
            body,
        };

        debug!(url = %request.url, started_at = %meta.started_at_utc, "Sending request");

        let response =
            match tokio::time::timeout(self.config.timeout, self.transport.send(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    let error = normalize_error(e);
                    warn!(elapsed_ms = meta.elapsed_ms(), error = %error, "Request failed");
                    return Err(error);
                }
                Err(_) => {
                    let error = normalize_error(TransportError::Timeout(self.config.timeout));
                    warn!(elapsed_ms = meta.elapsed_ms(), "Request timed out");
                    return Err(error);
                }
            };

        debug!(
            status = response.status,
            elapsed_ms = meta.elapsed_ms(),
            "Request succeeded"
        );

        match descriptor.inbound_schema {
            Some(ref schema) if !descriptor.skip_validation => {
                validate(schema, &response.body, &context)
                    .into_result()
                    .inspect_err(|e| warn!(error = %e, "Response failed schema validation"))
            }
            _ => Ok(response.body),
        }
    }

    /// Execute and deserialize the (validated) body
    pub async fn request_as<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> ApiResult<T> {
        let value = self.request(descriptor).await?;
        serde_json::from_value(value).map_err(|e| {
            warn!(error = %e, "Response body does not match the expected type");
            decode_error(&e)
        })
    }

    /// Perform a GET request
    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.request(RequestDescriptor::get(path)).await
    }

    /// Perform a POST request
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.request(RequestDescriptor::post(path).json(body)?).await
    }

    /// Perform a PUT request
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.request(RequestDescriptor::put(path).json(body)?).await
    }

    /// Perform a PATCH request
    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.request(RequestDescriptor::patch(path).json(body)?).await
    }

    /// Perform a DELETE request
    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.request(RequestDescriptor::new(HttpMethod::Delete, path)).await
    }

    fn headers_for(&self, descriptor: &RequestDescriptor, meta: &RequestMeta) -> Vec<(String, String)> {
        let mut headers = vec![(X_REQUEST_ID.to_string(), meta.request_id.to_string())];

        if let Some(ref key) = self.config.anon_key {
            headers.push((APIKEY_HEADER.to_string(), key.clone()));
        }

        let bearer = self
            .live_session_token()
            .or_else(|| self.config.anon_key.clone());
        if let Some(token) = bearer {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        headers.extend(descriptor.headers.iter().cloned());
        headers
    }

    /// Token of the stored session; an expired session is cleared instead
    fn live_session_token(&self) -> Option<String> {
        let session = self.session.get()?;
        if session.is_expired() {
            debug!("Session expired; clearing and falling back to the anon key");
            self.session.clear();
            return None;
        }
        Some(session.access_token)
    }
}

/// A body that passed (or skipped) the schema but does not fit `T`
fn decode_error(error: &serde_json::Error) -> AppError {
    let issue = format!("response: {error}");
    AppError::validation(
        format!("Validation failed: {issue}"),
        vec![issue],
        serde_json::Map::from_iter([("response".to_string(), Value::String(error.to_string()))]),
    )
}
