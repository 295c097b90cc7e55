//! Core building blocks for the storefront API client
//!
//! This crate holds the pieces of the request lifecycle that do not touch the
//! network:
//!
//! - **Error handling**: one normalized [`AppError`] shape and the
//!   normalizer every failure passes through
//! - **Form errors**: splitting an error into field and banner messages
//! - **Validation**: declarative JSON schemas with coercion and defaults
//! - **Retry**: status-driven retry policy with exponential backoff
//! - **Cache**: query results keyed by composite keys
//! - **Busy tracking**: per-item in-flight markers with guaranteed cleanup
//! - **Pricing**: cart subtotal, shipping, tax and total
//!
//! # Example
//!
//! ```rust
//! use storefront_core::forms::organize_form_errors;
//! use storefront_core::normalize_error;
//! use serde_json::json;
//!
//! let error = normalize_error(json!({
//!     "status": 422,
//!     "data": {"message": "Validation failed", "fieldErrors": {"email": "bad"}}
//! }));
//!
//! let split = organize_form_errors(&error);
//! assert_eq!(split.field("email"), Some("bad"));
//! assert_eq!(split.server_error.as_deref(), Some("Validation failed"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod busy;
pub mod cache;
pub mod error;
pub mod forms;
pub mod pricing;
pub mod retry;
pub mod validation;

pub use error::{exit_codes, normalize_error, AppError, ErrorKind, RawFailure};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::busy::{BusyGuard, BusySet};
    pub use crate::cache::{QueryCache, QueryKey};
    pub use crate::error::{exit_codes, normalize_error, AppError, ErrorKind, RawFailure};
    pub use crate::forms::{organize_form_errors, FormErrorSplit};
    pub use crate::pricing::{CartTotals, PricedLine};
    pub use crate::retry::{RetryConfig, RetryPolicy, StatusRetryPolicy};
    pub use crate::validation::{
        validate, validate_into, Field, FieldType, Schema, ValidationContext, ValidationResult,
    };
}
