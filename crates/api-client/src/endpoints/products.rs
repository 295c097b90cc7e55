//! Product catalog endpoints
//!
//! - `GET products` with filters and pagination
//! - `GET products/{id}`

use crate::client::StorefrontClient;
use crate::descriptor::RequestDescriptor;
use crate::error::ApiResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_core::cache::QueryKey;
use storefront_core::validation::{Field, FieldType, Schema};

/// Largest page the API serves
pub const MAX_PAGE_SIZE: u32 = 50;

fn product_fields() -> Vec<Field> {
    vec![
        Field::integer("id"),
        Field::string("name").min_length(1),
        Field::string("description").optional().nullable(),
        Field::number("price").default_value(json!(0)).min(0.0),
        Field::string("category").optional().nullable(),
        Field::string("image_url").optional().nullable(),
        Field::number("rating").optional().nullable().min(0.0).max(5.0),
        Field::integer("stock").default_value(json!(0)).min(0.0),
        Field::array("variants", FieldType::Any).default_value(json!([])),
    ]
}

static PRODUCT_SCHEMA: Lazy<Arc<Schema>> =
    Lazy::new(|| Arc::new(Schema::object("product", product_fields())));

static PRODUCT_PAGE_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object(
        "product_page",
        [
            Field::array("data", FieldType::object(product_fields())).default_value(json!([])),
            Field::integer("page").default_value(json!(1)).min(1.0),
            Field::integer("total").default_value(json!(0)).min(0.0),
        ],
    ))
});

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Long description
    #[serde(default)]
    pub description: Option<String>,
    /// Base price
    pub price: f64,
    /// Category slug
    #[serde(default)]
    pub category: Option<String>,
    /// Primary image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Average review rating
    #[serde(default)]
    pub rating: Option<f64>,
    /// Units in stock
    pub stock: i64,
    /// Purchasable variants
    #[serde(default)]
    pub variants: Vec<Value>,
}

impl Product {
    /// Whether any stock is left
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// One page of products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    /// Products on this page
    pub data: Vec<Product>,
    /// 1-based page number
    pub page: u32,
    /// Total products matching the filters
    pub total: u64,
}

/// Sort orders the catalog supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Newest first
    Newest,
    /// Cheapest first
    PriceAsc,
    /// Most expensive first
    PriceDesc,
    /// Best rated first
    Rating,
}

impl ProductSort {
    /// Query-string value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Rating => "rating",
        }
    }
}

/// Parameters for listing products
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListProductsParams {
    /// 1-based page
    pub page: Option<u32>,
    /// Page size (max 50)
    pub limit: Option<u32>,
    /// Filter by category
    pub category: Option<String>,
    /// Free-text search
    pub search: Option<String>,
    /// Sort order
    pub sort: Option<ProductSort>,
}

impl ListProductsParams {
    /// Create new params with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    /// Set page size, capped at [`MAX_PAGE_SIZE`]
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.clamp(1, MAX_PAGE_SIZE));
        self
    }

    /// Filter by category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Search by text
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Sort order
    #[must_use]
    pub fn with_sort(mut self, sort: ProductSort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Cache key covering every filter, e.g. `[products, list, 2, 20, shoes, -, -]`
    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        let segment = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        QueryKey::from(["products", "list"])
            .push(segment(self.page.map(|p| p.to_string())))
            .push(segment(self.limit.map(|l| l.to_string())))
            .push(segment(self.category.clone()))
            .push(segment(self.search.clone()))
            .push(segment(self.sort.map(|s| s.as_str().to_string())))
    }

    fn apply(&self, mut descriptor: RequestDescriptor) -> RequestDescriptor {
        if let Some(page) = self.page {
            descriptor = descriptor.query("page", page);
        }
        if let Some(limit) = self.limit {
            descriptor = descriptor.query("limit", limit);
        }
        if let Some(ref category) = self.category {
            descriptor = descriptor.query("category", category);
        }
        if let Some(ref search) = self.search {
            descriptor = descriptor.query("search", search);
        }
        if let Some(sort) = self.sort {
            descriptor = descriptor.query("sort", sort.as_str());
        }
        descriptor
    }
}

/// Products API interface
#[derive(Debug, Clone)]
pub struct ProductsApi {
    client: StorefrontClient,
}

impl ProductsApi {
    /// Create a new products API interface
    pub(crate) fn new(client: StorefrontClient) -> Self {
        Self { client }
    }

    /// List products with filters and pagination
    ///
    /// GET /products
    pub async fn list(&self, params: &ListProductsParams) -> ApiResult<ProductPage> {
        let descriptor = params.apply(RequestDescriptor::get("products"));
        self.client
            .request_as(descriptor.inbound(Arc::clone(&PRODUCT_PAGE_SCHEMA)))
            .await
    }

    /// Get a single product by ID
    ///
    /// GET /products/{id}
    pub async fn get(&self, id: i64) -> ApiResult<Product> {
        self.client
            .request_as(
                RequestDescriptor::get(format!("products/{id}")).inbound(Arc::clone(&PRODUCT_SCHEMA)),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::descriptor::HttpMethod;
    use crate::testing::MockTransport;

    #[test]
    fn test_params_builder() {
        let params = ListProductsParams::new()
            .with_page(0)
            .with_limit(500)
            .with_category("shoes")
            .with_sort(ProductSort::PriceAsc);

        assert_eq!(params.page, Some(1));
        assert_eq!(params.limit, Some(MAX_PAGE_SIZE));

        let descriptor = params.apply(RequestDescriptor::get("products"));
        assert_eq!(
            descriptor.query,
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "50".to_string()),
                ("category".to_string(), "shoes".to_string()),
                ("sort".to_string(), "price_asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_key_tracks_filters() {
        let a = ListProductsParams::new().with_page(1).query_key();
        let b = ListProductsParams::new().with_page(2).query_key();
        assert_ne!(a, b);
        assert!(a.starts_with(&QueryKey::from("products")));
    }

    #[tokio::test]
    async fn test_list_applies_defaults() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            HttpMethod::Get,
            "products",
            200,
            json!({"data": [{"id": "3", "name": "Tee", "price": "19.90"}], "total": 1}),
        );
        let client = StorefrontClient::with_transport(
            ClientConfig::default().with_base_url("http://api.test"),
            transport.clone(),
        );

        let page = client.products().list(&ListProductsParams::new()).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.data[0].id, 3);
        assert!((page.data[0].price - 19.9).abs() < 1e-9);
        assert!(!page.data[0].in_stock());
    }

    #[tokio::test]
    async fn test_get_rejects_negative_price() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(HttpMethod::Get, "products/1", 200, json!({"id": 1, "name": "Bad", "price": -1}));
        let client = StorefrontClient::with_transport(
            ClientConfig::default().with_base_url("http://api.test"),
            transport.clone(),
        );

        let err = client.products().get(1).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.message.contains("price: must be ≥ 0"));
    }
}
