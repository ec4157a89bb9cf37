//! Request middleware.
//!
//! Middleware wraps every dispatched request. The crate ships
//! [`TracingMiddleware`], which logs each request with credential-bearing
//! headers and parameters masked.

mod core;
mod tracing;

pub use core::Middleware;
pub use tracing::{is_sensitive_key, mask_value, TracingMiddleware};
