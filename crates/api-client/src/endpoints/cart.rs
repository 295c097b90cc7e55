//! Cart API endpoints and per-line operation tracking
//!
//! Routes:
//! - `GET cart`
//! - `POST cart/items`
//! - `PATCH cart/items/{id}`
//! - `DELETE cart/items/{id}`
//!
//! [`CartLineTracker`] wraps the line mutations with busy markers so
//! operations on different lines never block each other.

use crate::client::StorefrontClient;
use crate::descriptor::RequestDescriptor;
use crate::error::ApiResult;
use crate::orchestrator::{Mutation, Orchestrator};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_core::busy::BusySet;
use storefront_core::pricing::{CartTotals, PricedLine};
use storefront_core::retry::RetryConfig;
use storefront_core::validation::{Field, FieldType, Schema};
use storefront_core::AppError;
use tracing::debug;

/// Query key for the cart; invalidated by every cart mutation
pub const CART_QUERY_KEY: &str = "cart";

/// Code returned when an operation targets a line that is already busy
pub const ITEM_BUSY_CODE: &str = "ITEM_BUSY";

fn cart_line_fields() -> Vec<Field> {
    vec![
        Field::integer("id"),
        Field::integer("quantity").default_value(json!(1)).min(1.0),
        Field::number("unit_price").default_value(json!(0)).min(0.0),
        Field::integer("variant_id").optional().nullable(),
        Field::any("variants").optional().nullable(),
    ]
}

/// Server-shaped cart line
pub static CART_LINE_SCHEMA: Lazy<Arc<Schema>> =
    Lazy::new(|| Arc::new(Schema::object("cart_line", cart_line_fields())));

/// Server-shaped cart
pub static CART_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object(
        "cart",
        [Field::array("items", FieldType::object(cart_line_fields())).default_value(json!([]))],
    ))
});

static ADD_ITEM_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(
        Schema::object(
            "add_to_cart",
            [
                Field::integer("variant_id").min(1.0),
                Field::integer("quantity").default_value(json!(1)).min(1.0),
            ],
        )
        .strict(),
    )
});

static UPDATE_ITEM_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object("update_cart_item", [Field::integer("quantity").min(1.0)]).strict())
});

/// One line in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Line id
    pub id: i64,
    /// Always ≥ 1 for a persisted line
    pub quantity: u32,
    /// Price of one unit
    pub unit_price: f64,
    /// Product variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    /// Embedded variant/product reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Value>,
}

impl PricedLine for CartLine {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> f64 {
        self.unit_price
    }
}

/// The shopper's cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in the cart
    #[serde(default)]
    pub items: Vec<CartLine>,
}

impl Cart {
    /// Subtotal, shipping, tax and total
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals::from_lines(&self.items)
    }

    /// Line by id
    #[must_use]
    pub fn line(&self, id: i64) -> Option<&CartLine> {
        self.items.iter().find(|line| line.id == id)
    }
}

/// Cart API interface
#[derive(Debug, Clone)]
pub struct CartApi {
    client: StorefrontClient,
}

impl CartApi {
    /// Create a new cart API interface
    pub(crate) fn new(client: StorefrontClient) -> Self {
        Self { client }
    }

    /// Fetch the cart
    ///
    /// GET /cart
    pub async fn get_cart(&self) -> ApiResult<Cart> {
        self.client
            .request_as(RequestDescriptor::get("cart").inbound(Arc::clone(&CART_SCHEMA)))
            .await
    }

    /// Add a variant to the cart
    ///
    /// POST /cart/items
    pub async fn add_to_cart(&self, variant_id: i64, quantity: u32) -> ApiResult<CartLine> {
        let descriptor = RequestDescriptor::post("cart/items")
            .payload(json!({"variant_id": variant_id, "quantity": quantity}))
            .outbound(Arc::clone(&ADD_ITEM_SCHEMA))
            .inbound(Arc::clone(&CART_LINE_SCHEMA));
        self.client.request_as(descriptor).await
    }

    /// Set a line's quantity
    ///
    /// PATCH /cart/items/{id}
    pub async fn update_cart_item(&self, item_id: i64, quantity: u32) -> ApiResult<CartLine> {
        let descriptor = RequestDescriptor::patch(format!("cart/items/{item_id}"))
            .payload(json!({"quantity": quantity}))
            .outbound(Arc::clone(&UPDATE_ITEM_SCHEMA))
            .inbound(Arc::clone(&CART_LINE_SCHEMA));
        self.client.request_as(descriptor).await
    }

    /// Remove a line
    ///
    /// DELETE /cart/items/{id}
    pub async fn remove_cart_item(&self, item_id: i64) -> ApiResult<()> {
        self.client
            .request(RequestDescriptor::delete(format!("cart/items/{item_id}")).skip_validation())
            .await
            .map(|_| ())
    }
}

/// Per-line quantity and removal operations with busy tracking
///
/// A line is busy from the moment an operation starts until it settles.
/// A second operation on a busy line is rejected with `ITEM_BUSY` (409)
/// instead of being queued.
#[derive(Debug, Clone)]
pub struct CartLineTracker {
    busy: BusySet<i64>,
    update: Mutation<(i64, u32), CartLine>,
    remove: Mutation<i64, ()>,
}

impl CartLineTracker {
    /// Tracker over `cart`, retrying with `retry`
    pub fn new(cart: &CartApi, orchestrator: &Orchestrator, retry: RetryConfig) -> Self {
        let api = cart.clone();
        let update = orchestrator
            .run_mutation(move |(item_id, quantity): (i64, u32)| {
                let api = api.clone();
                async move { api.update_cart_item(item_id, quantity).await }
            })
            .invalidates(CART_QUERY_KEY)
            .with_retry(retry.clone());

        let api = cart.clone();
        let remove = orchestrator
            .run_mutation(move |item_id: i64| {
                let api = api.clone();
                async move { api.remove_cart_item(item_id).await }
            })
            .invalidates(CART_QUERY_KEY)
            .with_retry(retry);

        Self {
            busy: BusySet::new(),
            update,
            remove,
        }
    }

    /// Tracker using the client's cart mutation retry config
    pub fn for_client(client: &StorefrontClient, orchestrator: &Orchestrator) -> Self {
        Self::new(
            &client.cart(),
            orchestrator,
            client.config().mutation_retry.clone(),
        )
    }

    /// Set a line's quantity; zero or less removes the line
    ///
    /// Returns the updated line, or `None` when the line was removed.
    pub async fn update_quantity(&self, item_id: i64, quantity: i64) -> ApiResult<Option<CartLine>> {
        if quantity <= 0 {
            debug!(item_id, quantity, "Non-positive quantity, removing line");
            return self.remove_item(item_id).await.map(|()| None);
        }

        let quantity = u32::try_from(quantity).map_err(|_| {
            AppError::validation(
                "Validation failed: quantity: too large",
                vec!["quantity: too large".to_string()],
                serde_json::Map::from_iter([("quantity".to_string(), json!("too large"))]),
            )
        })?;

        let _guard = self.begin(item_id)?;
        self.update.mutate((item_id, quantity)).await.map(Some)
    }

    /// Remove a line
    pub async fn remove_item(&self, item_id: i64) -> ApiResult<()> {
        let _guard = self.begin(item_id)?;
        self.remove.mutate(item_id).await
    }

    /// Whether `item_id` has an operation in flight
    #[must_use]
    pub fn is_busy(&self, item_id: i64) -> bool {
        self.busy.is_busy(&item_id)
    }

    /// Lines with an operation in flight
    #[must_use]
    pub fn busy_items(&self) -> Vec<i64> {
        self.busy.busy_ids()
    }

    fn begin(&self, item_id: i64) -> ApiResult<storefront_core::busy::BusyGuard<i64>> {
        self.busy.begin(item_id).ok_or_else(|| {
            debug!(item_id, "Line is busy, rejecting operation");
            AppError::http(409, "This item is already being updated").with_code(ITEM_BUSY_CODE)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::descriptor::HttpMethod;
    use crate::session::MemorySessionStore;
    use crate::testing::MockTransport;
    use std::time::Duration;
    use storefront_core::cache::QueryKey;
    use storefront_core::validation::{validate, ValidationContext};

    fn setup(transport: MockTransport) -> (Arc<MockTransport>, CartLineTracker, Orchestrator) {
        let transport = Arc::new(transport);
        let client = StorefrontClient::with_transport(
            ClientConfig::default().with_base_url("http://api.test"),
            transport.clone(),
        );
        let orchestrator = Orchestrator::new(Arc::new(MemorySessionStore::new()));
        let tracker = CartLineTracker::new(
            &client.cart(),
            &orchestrator,
            RetryConfig::cart_mutation().without_backoff(),
        );
        (transport, tracker, orchestrator)
    }

    #[test]
    fn test_cart_line_defaults() {
        let ctx = ValidationContext::new("GET", "cart");
        let result = validate(&CART_LINE_SCHEMA, &json!({"id": 1, "variants": {"name": "Tee"}}), &ctx);

        assert!(result.is_valid);
        assert_eq!(
            result.data.unwrap(),
            json!({"id": 1, "quantity": 1, "unit_price": 0, "variants": {"name": "Tee"}})
        );
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart {
            items: vec![
                CartLine { id: 1, quantity: 2, unit_price: 100.0, variant_id: None, variants: None },
                CartLine { id: 2, quantity: 1, unit_price: 50.0, variant_id: None, variants: None },
            ],
        };
        let totals = cart.totals();
        assert!((totals.total - 324.99).abs() < 1e-9);
        assert_eq!(cart.line(2).map(|l| l.quantity), Some(1));
    }

    #[tokio::test]
    async fn test_update_clears_busy_on_success() {
        let (transport, tracker, _) = setup(MockTransport::new());
        transport.respond(HttpMethod::Patch, "cart/items/7", 200, json!({"id": 7, "quantity": 3, "unit_price": 9.5}));

        let line = tracker.update_quantity(7, 3).await.unwrap().unwrap();
        assert_eq!(line.quantity, 3);
        assert!(!tracker.is_busy(7));
    }

    #[tokio::test]
    async fn test_update_clears_busy_on_failure() {
        let (transport, tracker, _) = setup(MockTransport::new());
        transport.respond(HttpMethod::Patch, "cart/items/7", 500, json!({"message": "db down"}));

        let err = tracker.update_quantity(7, 3).await.unwrap_err();
        assert_eq!(err.status, Some(500));
        assert!(!tracker.is_busy(7));
        // 1 attempt + 3 retries
        assert_eq!(transport.calls_to(HttpMethod::Patch, "cart/items/7"), 4);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes() {
        let (transport, tracker, _) = setup(MockTransport::new());
        transport.respond(HttpMethod::Delete, "cart/items/4", 204, Value::Null);

        let via_update = tracker.update_quantity(4, 0).await.unwrap();
        assert!(via_update.is_none());
        assert_eq!(transport.calls_to(HttpMethod::Delete, "cart/items/4"), 1);
        assert_eq!(transport.calls_to(HttpMethod::Patch, "cart/items/4"), 0);
        assert!(!tracker.is_busy(4));

        tracker.remove_item(4).await.unwrap();
        assert_eq!(transport.calls_to(HttpMethod::Delete, "cart/items/4"), 2);
        assert!(!tracker.is_busy(4));
    }

    #[tokio::test]
    async fn test_negative_quantity_removes() {
        let (transport, tracker, _) = setup(MockTransport::new());
        transport.respond(HttpMethod::Delete, "cart/items/4", 204, Value::Null);

        tracker.update_quantity(4, -2).await.unwrap();
        assert_eq!(transport.calls_to(HttpMethod::Delete, "cart/items/4"), 1);
    }

    #[tokio::test]
    async fn test_same_line_is_rejected_while_busy() {
        let (transport, tracker, _) = setup(MockTransport::new().with_delay(Duration::from_millis(50)));
        transport.respond(HttpMethod::Patch, "cart/items/1", 200, json!({"id": 1, "quantity": 2, "unit_price": 1}));

        let (first, second) = tokio::join!(tracker.update_quantity(1, 2), async {
            tokio::task::yield_now().await;
            assert!(tracker.is_busy(1));
            assert!(!tracker.is_busy(2));
            tracker.update_quantity(1, 5).await
        });

        assert!(first.is_ok());
        let err = second.unwrap_err();
        assert_eq!(err.status, Some(409));
        assert_eq!(err.code.as_deref(), Some(ITEM_BUSY_CODE));
        assert_eq!(transport.calls_to(HttpMethod::Patch, "cart/items/1"), 1);
        assert!(!tracker.is_busy(1));
    }

    #[tokio::test]
    async fn test_different_lines_run_concurrently() {
        let (transport, tracker, _) = setup(MockTransport::new().with_delay(Duration::from_millis(20)));
        transport.respond(HttpMethod::Patch, "cart/items/1", 200, json!({"id": 1, "quantity": 2}));
        transport.respond(HttpMethod::Delete, "cart/items/2", 204, Value::Null);

        let (a, b) = tokio::join!(tracker.update_quantity(1, 2), tracker.remove_item(2));
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(tracker.busy_items().is_empty());
    }

    #[tokio::test]
    async fn test_success_invalidates_cart_query() {
        let (transport, tracker, orchestrator) = setup(MockTransport::new());
        transport.respond(HttpMethod::Delete, "cart/items/3", 204, Value::Null);
        orchestrator.cache().set_value(&QueryKey::from(CART_QUERY_KEY), json!({"items": []}), None);

        tracker.remove_item(3).await.unwrap();
        assert!(orchestrator.cache().get_value(&QueryKey::from(CART_QUERY_KEY)).is_none());
    }
}
