//! API client for the storefront backend
//!
//! This crate provides the request lifecycle layer between storefront
//! consumers and the Supabase-backed API.
//!
//! # Features
//!
//! - **Environment-based configuration**: defaults, a TOML file, then environment variables
//! - **Schema-validated I/O**: outbound payloads and inbound bodies are checked and coerced
//! - **Normalized errors**: every failure surfaces as one [`AppError`] shape
//! - **Orchestration**: cached, de-duplicated queries with status-driven retries
//! - **Per-line cart tracking**: busy markers that can never get stuck
//! - **Request correlation**: every call carries a unique `X-Request-ID`
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_api_client::{Orchestrator, StorefrontClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StorefrontClient::new()?;
//!     let orchestrator = Orchestrator::for_client(&client);
//!
//!     let cart = client.cart();
//!     let state = orchestrator
//!         .run_query("cart", move || {
//!             let cart = cart.clone();
//!             async move { cart.get_cart().await }
//!         })
//!         .await;
//!
//!     let cart = state.into_result()?;
//!     println!("Total: {:.2}", cart.totals().total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod descriptor;
pub mod endpoints;
pub mod error;
pub mod orchestrator;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use client::StorefrontClient;
pub use config::{ClientConfig, Environment};
pub use descriptor::{HttpMethod, RequestDescriptor};
pub use error::{ApiResult, TransportError};
pub use orchestrator::{Mutation, Orchestrator, QueryOptions, QueryState, Status};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use storefront_core::AppError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::StorefrontClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::descriptor::{HttpMethod, RequestDescriptor};
    pub use crate::endpoints::{AuthApi, CartApi, CartLineTracker, ProductsApi, ReviewsApi};
    pub use crate::error::ApiResult;
    pub use crate::orchestrator::{Mutation, Orchestrator, QueryOptions, QueryState, Status};
    pub use crate::session::{MemorySessionStore, Session, SessionStore};
    pub use storefront_core::AppError;
}
