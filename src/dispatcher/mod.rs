//! # Dispatcher Module
//!
//! The dispatcher hands a resolved request to the handler registered for the
//! route's [`Family`](crate::spec::Family).
//!
//! ## Overview
//!
//! Every route is bound to a `(family, operation id)` pair. The dispatcher keeps
//! one [`FamilyHandler`] per family in a lookup table; the handler interprets the
//! operation id. There is no per-route handler registration and no subtype
//! polymorphism on the route itself.
//!
//! ## Request Flow
//!
//! 1. Router resolves method and path to a [`RouteMatch`](crate::router::RouteMatch)
//! 2. The server builds a [`HandlerRequest`] from the match and the raw request
//! 3. Middleware `before` hooks run; the first early response short-circuits
//! 4. The family handler runs on the calling coroutine
//! 5. Middleware `after` hooks see the response and the handler latency
//!
//! ## Error Handling
//!
//! - A family without a handler answers 500
//! - A handler panic is caught and answers a generic 500
//!   (`{"error":{"code":"InternalError","message":"internal server error"}}`);
//!   the panic message is logged, never returned
//!
//! ```rust
//! use mockzure::dispatcher::{Dispatcher, FamilyHandler, HandlerRequest, HandlerResponse};
//! use mockzure::spec::Family;
//! use std::sync::Arc;
//!
//! struct Health;
//!
//! impl FamilyHandler for Health {
//!     fn handle(&self, _req: &HandlerRequest) -> HandlerResponse {
//!         HandlerResponse::json(200, serde_json::json!({ "status": "ok" }))
//!     }
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(Family::Identity, Arc::new(Health));
//! assert!(dispatcher.has_handler(Family::Identity));
//! ```

mod core;

#[cfg(test)]
mod tests;

pub use core::{
    Dispatcher, FamilyHandler, HandlerRequest, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
};
