//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for a specific set of backend endpoints.
//!
//! | Module | Routes | Description |
//! |--------|--------|-------------|
//! | `auth` | `auth/*` | Login, signup, logout, current user |
//! | `cart` | `cart`, `cart/items/*` | Cart lines and per-line tracking |
//! | `products` | `products`, `products/{id}` | Catalog browsing |
//! | `reviews` | `products/{id}/reviews` | Product reviews |

pub mod auth;
pub mod cart;
pub mod products;
pub mod reviews;

pub use auth::AuthApi;
pub use cart::{CartApi, CartLineTracker};
pub use products::ProductsApi;
pub use reviews::ReviewsApi;
