//! Scripted transport for tests
//!
//! Routes are matched on method and path (the URL minus the base and query
//! string). Unrouted requests fail as if no response arrived.

use crate::descriptor::HttpMethod;
use crate::error::TransportError;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

type RouteKey = (HttpMethod, String);

/// In-memory [`Transport`] with canned responses
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<RouteKey, VecDeque<(u16, Value)>>>,
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicU32,
    delay: Duration,
}

impl MockTransport {
    /// Transport with no routes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a response for `method path`
    ///
    /// Queued responses are served in order; the last one repeats.
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, path.trim_start_matches('/').to_string()))
            .or_default()
            .push_back((status, body));
    }

    /// Total requests received
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received for `method path`
    pub fn calls_to(&self, method: HttpMethod, path: &str) -> usize {
        let path = path.trim_start_matches('/');
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|request| request.method == method && route_path(&request.url) == path)
            .count()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn next_response(&self, key: &RouteKey) -> Option<(u16, Value)> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let key = (request.method, route_path(&request.url).to_string());
        match self.next_response(&key) {
            Some((status, body)) if (200..300).contains(&status) => {
                Ok(TransportResponse { status, body })
            }
            Some((status, body)) => Err(TransportError::Status { status, body }),
            None => Err(TransportError::no_response(format!(
                "no route for {} {}",
                request.method, request.url
            ))),
        }
    }
}

/// Path portion of `url` after the host, without the query string
fn route_path(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    after_scheme
        .split_once('/')
        .map_or("", |(_, path)| path)
}
