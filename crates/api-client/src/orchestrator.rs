//! Query and mutation orchestration
//!
//! Wraps fetch functions with:
//! - a query cache keyed by [`QueryKey`]
//! - de-duplication of concurrent fetches for the same key
//! - the retry policy, applied between attempts
//! - error normalization on every failure
//! - session invalidation on 401
//!
//! Each invocation moves `idle → pending → success | error`; callers only
//! observe the terminal state of a query. Mutations expose their current
//! state while in flight.

use crate::client::StorefrontClient;
use crate::descriptor::RequestDescriptor;
use crate::session::SessionStore;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use storefront_core::cache::{QueryCache, QueryKey};
use storefront_core::retry::{RetryConfig, RetryPolicy, StatusRetryPolicy};
use storefront_core::{normalize_error, AppError, RawFailure};
use tracing::{debug, info, warn};

/// Queries invalidated when the session is dropped
pub const USER_QUERY_KEY: &str = "user";

type Settled = Result<(Value, u32), (AppError, u32)>;
type SharedFetch = Shared<BoxFuture<'static, Settled>>;

/// Lifecycle status of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Not started
    #[default]
    Idle,
    /// In flight (including retries)
    Pending,
    /// Settled with data
    Success,
    /// Settled with a normalized error
    Error,
}

/// Terminal result of a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Lifecycle status
    pub status: Status,
    /// Data on success
    pub data: Option<T>,
    /// Normalized error on failure
    pub error: Option<AppError>,
    /// Fetch attempts made; 0 for cache hits
    pub attempts: u32,
    /// Served from the cache without a fetch
    pub from_cache: bool,
}

impl<T> QueryState<T> {
    fn success(data: T, attempts: u32, from_cache: bool) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            error: None,
            attempts,
            from_cache,
        }
    }

    fn failure(error: AppError, attempts: u32) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error: Some(error),
            attempts,
            from_cache: false,
        }
    }

    /// Still in flight
    pub fn is_loading(&self) -> bool {
        self.status == Status::Pending
    }

    /// Settled with data
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Settled with an error
    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Convert into a `Result`
    pub fn into_result(self) -> Result<T, AppError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(AppError::unknown("Query has not settled")),
        }
    }
}

/// Per-query overrides
#[derive(Clone, Default)]
pub struct QueryOptions {
    stale_time: Option<Duration>,
    max_attempts: Option<u32>,
    refetch: bool,
}

impl QueryOptions {
    /// Keep the result fresh for `stale_time` instead of the cache default
    #[must_use]
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Cap attempts for this query below the policy's ceiling
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Ignore a fresh cache entry and fetch again
    #[must_use]
    pub fn refetch(mut self) -> Self {
        self.refetch = true;
        self
    }

    /// Options honoring the descriptor's retry override
    #[must_use]
    pub fn for_descriptor(descriptor: &RequestDescriptor) -> Self {
        match descriptor.max_retries {
            Some(retries) => Self::default().max_attempts(retries.saturating_add(1)),
            None => Self::default(),
        }
    }
}

/// Caps another policy's attempt ceiling
struct AttemptCeiling {
    inner: Arc<dyn RetryPolicy>,
    max_attempts: u32,
}

impl RetryPolicy for AttemptCeiling {
    fn should_retry(&self, attempt: u32, error: &AppError) -> bool {
        attempt < self.max_attempts && self.inner.should_retry(attempt, error)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.inner.delay_for(attempt)
    }
}

/// Runs queries and mutations
#[derive(Clone)]
pub struct Orchestrator {
    cache: Arc<QueryCache>,
    in_flight: Arc<Mutex<HashMap<QueryKey, SharedFetch>>>,
    retry: Arc<dyn RetryPolicy>,
    session: Arc<dyn SessionStore>,
    dedupe: bool,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("cache", &self.cache.stats())
            .field("dedupe", &self.dedupe)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator with the default retry policy and a 60s cache
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self {
            cache: Arc::new(QueryCache::default()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            retry: Arc::new(StatusRetryPolicy::new(RetryConfig::default())),
            session,
            dedupe: true,
        }
    }

    /// Orchestrator sharing `client`'s session store, retry config and cache TTL
    pub fn for_client(client: &StorefrontClient) -> Self {
        let config = client.config();
        Self::new(Arc::clone(client.session()))
            .with_cache(QueryCache::new(config.cache_ttl))
            .with_retry_config(config.retry.clone())
    }

    /// Replace the query retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    /// Replace the query retry policy with a [`StatusRetryPolicy`]
    #[must_use]
    pub fn with_retry_config(self, config: RetryConfig) -> Self {
        self.with_retry_policy(Arc::new(StatusRetryPolicy::new(config)))
    }

    /// Replace the cache
    #[must_use]
    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Turn de-duplication of concurrent fetches on or off
    #[must_use]
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// The query cache
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Drop cached entries under `prefix`
    pub fn invalidate(&self, prefix: impl Into<QueryKey>) -> usize {
        self.cache.invalidate(&prefix.into())
    }

    /// Number of fetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run a query with default options
    pub async fn run_query<T, E, F, Fut>(&self, key: impl Into<QueryKey>, fetch: F) -> QueryState<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: Into<RawFailure> + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.run_query_with(key, QueryOptions::default(), fetch).await
    }

    /// Run a raw request as a query through `client`
    ///
    /// The descriptor's `max_retries`, when set, caps the attempts.
    pub async fn run_request(
        &self,
        client: &StorefrontClient,
        key: impl Into<QueryKey>,
        descriptor: RequestDescriptor,
    ) -> QueryState<Value> {
        let options = QueryOptions::for_descriptor(&descriptor);
        let client = client.clone();
        self.run_query_with(key, options, move || {
            let client = client.clone();
            let descriptor = descriptor.clone();
            async move { client.request(descriptor).await }
        })
        .await
    }

    /// Run a query
    ///
    /// A fresh cache entry is returned without fetching. Otherwise the call
    /// joins an in-flight fetch for the same key or starts one.
    pub async fn run_query_with<T, E, F, Fut>(
        &self,
        key: impl Into<QueryKey>,
        options: QueryOptions,
        fetch: F,
    ) -> QueryState<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: Into<RawFailure> + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = key.into();

        if !options.refetch {
            if let Some(cached) = self.cache.get_value(&key) {
                debug!(key = %key, "Query served from cache");
                return decode(cached, 0, true);
            }
        }

        let fetch = move || {
            let pending = fetch();
            async move {
                let data = pending.await.map_err(normalize_error)?;
                serde_json::to_value(data).map_err(normalize_error)
            }
        };

        let settled = if self.dedupe {
            self.join_or_start(&key, &options, fetch).await
        } else {
            self.start(&key, &options, fetch).await
        };

        match settled {
            Ok((value, attempts)) => decode(value, attempts, false),
            Err((error, attempts)) => QueryState::failure(error, attempts),
        }
    }

    fn join_or_start<F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetch: F,
    ) -> SharedFetch
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = in_flight.get(key) {
            debug!(key = %key, "Joining in-flight query");
            return existing.clone();
        }

        let shared = self.start(key, options, fetch);
        in_flight.insert(key.clone(), shared.clone());
        shared
    }

    /// Spawn the fetch loop; it settles even if every waiter goes away
    fn start<F, Fut>(&self, key: &QueryKey, options: &QueryOptions, fetch: F) -> SharedFetch
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        let policy: Arc<dyn RetryPolicy> = match options.max_attempts {
            Some(max_attempts) => Arc::new(AttemptCeiling {
                inner: Arc::clone(&self.retry),
                max_attempts,
            }),
            None => Arc::clone(&self.retry),
        };
        let key = key.clone();
        let stale_time = options.stale_time;
        let this = self.clone();

        let handle = tokio::spawn(async move {
            let settled = with_retry(policy.as_ref(), &key, fetch).await;
            match settled {
                Ok((ref value, _)) => this.cache.set_value(&key, value.clone(), stale_time),
                Err((ref error, _)) if error.is_unauthorized() => this.drop_session(),
                Err(_) => {}
            }
            this.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            settled
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err((normalize_error(e.to_string()), 0)))
        }
        .boxed()
        .shared()
    }

    /// Wrap a mutation function
    ///
    /// Mutations are not retried unless [`Mutation::with_retry`] says so.
    pub fn run_mutation<V, T, E, F, Fut>(&self, mutate: F) -> Mutation<V, T>
    where
        V: Clone + Send + 'static,
        T: Clone + Send + Sync + 'static,
        E: Into<RawFailure> + Send + 'static,
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let run: MutationFn<V, T> = Arc::new(move |vars: V| {
            let pending = mutate(vars);
            async move { pending.await.map_err(normalize_error) }.boxed()
        });

        Mutation {
            run,
            state: Arc::new(RwLock::new(MutationState::default())),
            retry: Arc::new(StatusRetryPolicy::new(RetryConfig::no_retry())),
            invalidates: Vec::new(),
            orchestrator: self.clone(),
        }
    }

    /// Clear the session and every identity query
    fn drop_session(&self) {
        info!("Unauthorized; clearing session");
        self.session.clear();
        self.cache.invalidate(&QueryKey::from(USER_QUERY_KEY));
    }
}

async fn with_retry<F, Fut>(policy: &dyn RetryPolicy, key: &QueryKey, fetch: F) -> Settled
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Value, AppError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetch().await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => {
                if !policy.should_retry(attempt, &error) {
                    debug!(key = %key, attempt, error = %error, "Query failed, not retrying");
                    return Err((error, attempt));
                }
                let delay = policy.delay_for(attempt);
                debug!(
                    key = %key,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "Query failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value, attempts: u32, from_cache: bool) -> QueryState<T> {
    match serde_json::from_value(value) {
        Ok(data) => QueryState::success(data, attempts, from_cache),
        Err(e) => QueryState::failure(normalize_error(e), attempts),
    }
}

type MutationFn<V, T> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<T, AppError>> + Send + Sync>;

#[derive(Debug, Clone)]
struct MutationState<T> {
    status: Status,
    data: Option<T>,
    error: Option<AppError>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
        }
    }
}

/// A mutation bound to an orchestrator
pub struct Mutation<V, T> {
    run: MutationFn<V, T>,
    state: Arc<RwLock<MutationState<T>>>,
    retry: Arc<dyn RetryPolicy>,
    invalidates: Vec<QueryKey>,
    orchestrator: Orchestrator,
}

impl<V, T> Clone for Mutation<V, T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            state: Arc::clone(&self.state),
            retry: Arc::clone(&self.retry),
            invalidates: self.invalidates.clone(),
            orchestrator: self.orchestrator.clone(),
        }
    }
}

impl<V, T> Mutation<V, T>
where
    V: Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Invalidate queries under `key` after every successful run
    #[must_use]
    pub fn invalidates(mut self, key: impl Into<QueryKey>) -> Self {
        self.invalidates.push(key.into());
        self
    }

    /// Retry with a [`StatusRetryPolicy`] built from `config`
    #[must_use]
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = Arc::new(StatusRetryPolicy::new(config));
        self
    }

    /// Run the mutation with `vars`
    ///
    /// Begins a fresh `pending` cycle regardless of the previous outcome.
    pub async fn mutate(&self, vars: V) -> Result<T, AppError> {
        self.set_state(Status::Pending, None, None);

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            match (self.run)(vars.clone()).await {
                Ok(data) => break Ok(data),
                Err(error) if self.retry.should_retry(attempt, &error) => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(attempt, delay_ms = delay.as_millis(), error = %error, "Mutation failed, will retry");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => break Err(error),
            }
        };

        match outcome {
            Ok(data) => {
                for key in &self.invalidates {
                    let dropped = self.orchestrator.cache.invalidate(key);
                    debug!(key = %key, dropped, "Invalidated after mutation");
                }
                self.set_state(Status::Success, Some(data.clone()), None);
                Ok(data)
            }
            Err(error) => {
                if error.is_unauthorized() {
                    self.orchestrator.drop_session();
                }
                warn!(attempts = attempt, error = %error, "Mutation failed");
                self.set_state(Status::Error, None, Some(error.clone()));
                Err(error)
            }
        }
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.read_state().status
    }

    /// In flight
    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    /// Last run succeeded
    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    /// Last run failed
    pub fn is_error(&self) -> bool {
        self.status() == Status::Error
    }

    /// Data from the last successful run
    pub fn data(&self) -> Option<T> {
        self.read_state().data
    }

    /// Error from the last failed run
    pub fn error(&self) -> Option<AppError> {
        self.read_state().error
    }

    /// Back to idle
    pub fn reset(&self) {
        self.set_state(Status::Idle, None, None);
    }

    fn read_state(&self) -> MutationState<T> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, status: Status, data: Option<T>, error: Option<AppError>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            MutationState { status, data, error };
    }
}

impl<V, T> fmt::Debug for Mutation<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("invalidates", &self.invalidates)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, Session};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn orchestrator(session: Arc<MemorySessionStore>, max_attempts: u32) -> Orchestrator {
        Orchestrator::new(session)
            .with_retry_config(RetryConfig::default().with_max_attempts(max_attempts).without_backoff())
    }

    fn counting<T: Send + 'static>(
        counter: &Arc<AtomicU32>,
        result: impl Fn() -> Result<T, Value> + Clone + Send + Sync + 'static,
    ) -> impl Fn() -> BoxFuture<'static, Result<T, Value>> + Clone + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let outcome = result();
            async move { outcome }.boxed()
        }
    }

    #[tokio::test]
    async fn test_server_error_is_attempted_three_times() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);

        let state: QueryState<Value> = orchestrator
            .run_query("products", counting(&counter, || Err(json!({"status": 500}))))
            .await;

        assert!(state.is_error());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(state.attempts, 3);
        assert_eq!(state.error.unwrap().status, Some(500));
    }

    #[tokio::test]
    async fn test_descriptor_retry_override_caps_attempts() {
        use crate::config::ClientConfig;
        use crate::descriptor::HttpMethod;
        use crate::testing::MockTransport;

        let transport = Arc::new(MockTransport::new());
        transport.respond(HttpMethod::Get, "products", 503, json!({"message": "busy"}));
        let client = StorefrontClient::with_transport(
            ClientConfig::default().with_base_url("http://api.test"),
            transport.clone(),
        );
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 5);

        let state = orchestrator
            .run_request(&client, "products", RequestDescriptor::get("products").max_retries(1))
            .await;

        assert!(state.is_error());
        assert_eq!(state.attempts, 2);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_attempted_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);

        let state: QueryState<Value> = orchestrator
            .run_query(["products", "9"], counting(&counter, || Err(json!({"status": 404}))))
            .await;

        assert!(state.is_error());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_is_attempted_once_and_clears_session() {
        let counter = Arc::new(AtomicU32::new(0));
        let session = Arc::new(MemorySessionStore::new());
        session.set(Session::new(json!({"id": "u1"}), "token"));
        let orchestrator = orchestrator(session.clone(), 10);
        orchestrator
            .cache()
            .set_value(&QueryKey::from(["user", "profile"]), json!({"id": "u1"}), None);

        let state: QueryState<Value> = orchestrator
            .run_query("orders", counting(&counter, || Err(json!({"status": 401}))))
            .await;

        assert!(state.is_error());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(session.get().is_none());
        assert!(orchestrator.cache().get_value(&QueryKey::from(["user", "profile"])).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_one_fetch() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);

        let fetch = {
            let counter = Arc::clone(&counter);
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, AppError>(vec![1, 2, 3])
                }
            }
        };

        let (a, b) = tokio::join!(
            orchestrator.run_query_with(["products", "1"], QueryOptions::default().refetch(), fetch.clone()),
            orchestrator.run_query_with(["products", "1"], QueryOptions::default().refetch(), fetch),
        );

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(a.data, Some(vec![1, 2, 3]));
        assert_eq!(b.data, Some(vec![1, 2, 3]));
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_without_dedupe_each_query_fetches() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 1).with_dedupe(false);
        let fetch = counting(&counter, || Ok(1));

        let (_a, _b): (QueryState<i32>, QueryState<i32>) = tokio::join!(
            orchestrator.run_query_with("n", QueryOptions::default().refetch(), fetch.clone()),
            orchestrator.run_query_with("n", QueryOptions::default().refetch(), fetch),
        );
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_fetch() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);

        let first: QueryState<String> = orchestrator
            .run_query("greeting", counting(&counter, || Ok("hi".to_string())))
            .await;
        let second: QueryState<String> = orchestrator
            .run_query("greeting", counting(&counter, || Ok("hi".to_string())))
            .await;

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.attempts, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_attempt_override() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 5);

        let state: QueryState<Value> = orchestrator
            .run_query_with(
                "flaky",
                QueryOptions::default().max_attempts(2),
                counting(&counter, || Err(json!({"status": 503}))),
            )
            .await;

        assert!(state.is_error());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mutation_lifecycle_and_invalidation() {
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);
        orchestrator.cache().set_value(&QueryKey::from("cart"), json!({"items": []}), None);

        let mutation = orchestrator
            .run_mutation(|qty: u32| async move { Ok::<_, AppError>(qty * 2) })
            .invalidates("cart");

        assert_eq!(mutation.status(), Status::Idle);
        assert_eq!(mutation.mutate(4).await.unwrap(), 8);
        assert!(mutation.is_success());
        assert_eq!(mutation.data(), Some(8));
        assert!(orchestrator.cache().get_value(&QueryKey::from("cart")).is_none());

        mutation.reset();
        assert_eq!(mutation.status(), Status::Idle);
    }

    #[tokio::test]
    async fn test_mutation_error_is_normalized_and_not_retried_by_default() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);
        let calls = Arc::clone(&counter);

        let mutation = orchestrator.run_mutation(move |_: ()| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("boom") }
        });

        let err = mutation.mutate(()).await.unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(mutation.is_error());
        assert_eq!(mutation.error().unwrap().message, "boom");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutation_retries_server_errors_when_configured() {
        let counter = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator(Arc::new(MemorySessionStore::new()), 3);
        let calls = Arc::clone(&counter);

        let mutation = orchestrator
            .run_mutation(move |_: ()| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(json!({"status": 502}))
                    } else {
                        Ok("done")
                    }
                }
            })
            .with_retry(RetryConfig::cart_mutation().without_backoff());

        assert_eq!(mutation.mutate(()).await.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_mutation_unauthorized_clears_session() {
        let session = Arc::new(MemorySessionStore::new());
        session.set(Session::new(json!({}), "token"));
        let orchestrator = orchestrator(session.clone(), 3);

        let mutation =
            orchestrator.run_mutation(|_: ()| async { Err::<(), _>(json!({"status": 401})) });
        mutation.mutate(()).await.unwrap_err();

        assert!(session.get().is_none());
    }
}
