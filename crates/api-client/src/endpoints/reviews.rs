//! Product review endpoints
//!
//! - `GET products/{id}/reviews`
//! - `POST products/{id}/reviews`

use crate::client::StorefrontClient;
use crate::descriptor::RequestDescriptor;
use crate::error::ApiResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use storefront_core::validation::{Field, FieldType, Schema};

/// Shortest accepted review comment
pub const MIN_COMMENT_LENGTH: usize = 10;

/// Longest accepted review comment
pub const MAX_COMMENT_LENGTH: usize = 1000;

fn review_fields() -> Vec<Field> {
    vec![
        Field::integer("id"),
        Field::integer("product_id"),
        Field::integer("rating").min(1.0).max(5.0),
        Field::string("comment").default_value(json!("")),
        Field::string("author").optional().nullable(),
        Field::string("created_at").optional().nullable(),
    ]
}

static REVIEW_SCHEMA: Lazy<Arc<Schema>> =
    Lazy::new(|| Arc::new(Schema::object("review", review_fields())));

static REVIEW_LIST_SCHEMA: Lazy<Arc<Schema>> =
    Lazy::new(|| Arc::new(Schema::array("reviews", FieldType::object(review_fields()))));

static NEW_REVIEW_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(
        Schema::object(
            "new_review",
            [
                Field::integer("rating").min(1.0).max(5.0),
                Field::string("comment")
                    .min_length(MIN_COMMENT_LENGTH)
                    .max_length(MAX_COMMENT_LENGTH),
            ],
        )
        .strict(),
    )
});

/// A published review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Review id
    pub id: i64,
    /// Reviewed product
    pub product_id: i64,
    /// 1 to 5
    pub rating: u8,
    /// Free text
    pub comment: String,
    /// Display name of the reviewer
    #[serde(default)]
    pub author: Option<String>,
    /// RFC 3339 creation time
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A review to submit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    /// 1 to 5
    pub rating: u8,
    /// Between 10 and 1000 characters
    pub comment: String,
}

/// Reviews API interface
#[derive(Debug, Clone)]
pub struct ReviewsApi {
    client: StorefrontClient,
}

impl ReviewsApi {
    /// Create a new reviews API interface
    pub(crate) fn new(client: StorefrontClient) -> Self {
        Self { client }
    }

    /// Reviews for a product
    ///
    /// GET /products/{id}/reviews
    pub async fn list(&self, product_id: i64) -> ApiResult<Vec<Review>> {
        self.client
            .request_as(
                RequestDescriptor::get(format!("products/{product_id}/reviews"))
                    .inbound(Arc::clone(&REVIEW_LIST_SCHEMA)),
            )
            .await
    }

    /// Submit a review
    ///
    /// POST /products/{id}/reviews
    pub async fn create(&self, product_id: i64, review: &NewReview) -> ApiResult<Review> {
        let descriptor = RequestDescriptor::post(format!("products/{product_id}/reviews"))
            .json(review)?
            .outbound(Arc::clone(&NEW_REVIEW_SCHEMA))
            .inbound(Arc::clone(&REVIEW_SCHEMA));
        self.client.request_as(descriptor).await
    }
}
