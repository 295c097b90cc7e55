//! CLI utilities for storefront tools
//!
//! Provides shared CLI functionality:
//! - Terminal output formatting
//! - Status messages
//! - Rendering of cart totals and form errors

#![warn(missing_docs)]

pub mod output;

pub use output::{OutputFormat, Status};
