use crate::ids::RequestId;
use crate::mappers::error_body;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use crate::spec::{Family, RouteMeta};
use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage. Names are lowercase on requests.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request data handed to a [`FamilyHandler`].
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Concrete request path (no query string)
    pub path: String,
    /// Resolved route
    pub route: Arc<RouteMeta>,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    /// Fields of an `application/x-www-form-urlencoded` body
    pub form: ParamVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Build a request from a router match.
    #[must_use]
    pub fn from_match(
        request_id: RequestId,
        method: Method,
        path: &str,
        route_match: RouteMatch,
        headers: HeaderVec,
    ) -> Self {
        Self {
            request_id,
            method,
            path: path.to_string(),
            route: route_match.route,
            path_params: route_match.path_params,
            query_params: route_match.query_params,
            headers,
            form: ParamVec::new(),
            body: None,
        }
    }

    /// Get a path parameter by name ("last write wins")
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name ("last write wins")
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a form field by name
    #[inline]
    #[must_use]
    pub fn get_form_param(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameters merged with path parameters; path parameters win.
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        let mut merged: HashMap<String, String> = self
            .query_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        for (k, v) in &self.path_params {
            merged.insert(k.to_string(), v.clone());
        }
        merged
    }
}

/// Response produced by a handler.
///
/// A `Value::Null` body is written as an empty body (204, 302).
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// A response with no body.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Value::Null)
    }

    /// `302 Found` to `location`.
    #[must_use]
    pub fn redirect(location: String) -> Self {
        let mut resp = Self::empty(302);
        resp.set_header("location", location);
        resp
    }

    /// `{error:{code, message}}` in the resource-management/directory shape.
    #[must_use]
    pub fn family_error(status: u16, code: &str, message: &str) -> Self {
        Self::json(status, error_body(code, message))
    }

    /// Generic 500 that leaks nothing about the fault.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::family_error(500, "InternalError", "internal server error")
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Serves every route of one [`Family`].
pub trait FamilyHandler: Send + Sync {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse;
}

/// Routes resolved requests to the handler registered for the route's family.
///
/// Handlers run synchronously on the connection's coroutine. A panicking
/// handler is contained here and answered with a generic 500.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<Family, Arc<dyn FamilyHandler>>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a family, replacing any previous one.
    pub fn register(&mut self, family: Family, handler: Arc<dyn FamilyHandler>) {
        if self.handlers.insert(family, handler).is_some() {
            info!(family = %family, "Replaced family handler");
        } else {
            debug!(family = %family, total_handlers = self.handlers.len(), "Family handler registered");
        }
    }

    /// Add middleware to the processing pipeline, in order.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn has_handler(&self, family: Family) -> bool {
        self.handlers.contains_key(&family)
    }

    /// Run middleware and the family handler for one request.
    #[must_use]
    pub fn dispatch(&self, request: &HandlerRequest) -> HandlerResponse {
        let mut early_resp: Option<HandlerResponse> = None;
        for mw in &self.middlewares {
            let resp = mw.before(request);
            if early_resp.is_none() {
                early_resp = resp;
            }
        }

        let (mut resp, latency) = match early_resp {
            Some(r) => (r, Duration::ZERO),
            None => {
                let start = Instant::now();
                (self.invoke(request), start.elapsed())
            }
        };

        for mw in &self.middlewares {
            mw.after(request, &mut resp, latency);
        }
        resp
    }

    fn invoke(&self, request: &HandlerRequest) -> HandlerResponse {
        let family = request.route.family;
        let Some(handler) = self.handlers.get(&family) else {
            error!(
                request_id = %request.request_id,
                family = %family,
                "No handler registered for family"
            );
            return HandlerResponse::internal_error();
        };

        debug!(
            request_id = %request.request_id,
            family = %family,
            operation_id = %request.route.operation_id,
            "Dispatching to family handler"
        );

        match catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
            Ok(resp) => resp,
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    request_id = %request.request_id,
                    family = %family,
                    operation_id = %request.route.operation_id,
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                HandlerResponse::internal_error()
            }
        }
    }
}
