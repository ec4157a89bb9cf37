use super::request::{parse_request, ParsedRequest};
use super::response::{write_handler_response, HeaderLines};
use crate::context::MockContext;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::ids::RequestId;
use crate::router::Resolution;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const HEALTH_PATH: &str = "/health";
pub const STATS_PATH: &str = "/mock/azure/stats";
pub const CLEAR_PATH: &str = "/mock/azure/data/clear";
pub const RESET_PATH: &str = "/mock/azure/data/reset";

/// The `may_minihttp` service: parse, resolve, dispatch, write.
///
/// Cloned once per connection; the clone's header scratch belongs to that
/// connection alone.
#[derive(Clone)]
pub struct AppService {
    pub context: Arc<MockContext>,
    headers: HeaderLines,
}

impl AppService {
    #[must_use]
    pub fn new(context: Arc<MockContext>) -> Self {
        Self {
            context,
            headers: HeaderLines::default(),
        }
    }

    /// Serve one parsed request. Pure with respect to the socket, which makes
    /// the whole pipeline testable without a server.
    #[must_use]
    pub fn handle(&self, req: &ParsedRequest) -> HandlerResponse {
        if req.method == Method::GET {
            match req.path.as_str() {
                HEALTH_PATH => return health_endpoint(),
                STATS_PATH => return self.stats_endpoint(),
                _ => {}
            }
        }
        match req.path.as_str() {
            CLEAR_PATH | RESET_PATH if req.method != Method::POST => {
                let mut resp = HandlerResponse::family_error(
                    405,
                    "MethodNotAllowed",
                    &format!("method {} is not allowed on {}", req.method, req.path),
                );
                resp.set_header("allow", Method::POST.to_string());
                return resp;
            }
            CLEAR_PATH => return self.clear_endpoint(),
            RESET_PATH => return self.reset_endpoint(),
            _ => {}
        }

        match self.context.router.resolve(&req.method, &req.path) {
            Resolution::Matched(mut route_match) => {
                route_match.query_params = req.query.clone();
                let request_id = RequestId::from_header_or_new(req.header("x-request-id"));
                let mut handler_req = HandlerRequest::from_match(
                    request_id,
                    req.method.clone(),
                    &req.path,
                    route_match,
                    req.headers.clone(),
                );
                handler_req.form = req.form.clone();
                handler_req.body = req.json.clone();

                let mut resp = self.context.dispatcher.dispatch(&handler_req);
                resp.set_header("x-request-id", request_id.to_string());
                resp
            }
            Resolution::MethodNotAllowed { allowed } => {
                debug!(method = %req.method, path = %req.path, "Method not allowed");
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut resp = HandlerResponse::family_error(
                    405,
                    "MethodNotAllowed",
                    &format!("method {} is not allowed on {}", req.method, req.path),
                );
                resp.set_header("allow", allow);
                resp
            }
            Resolution::NotFound => {
                debug!(method = %req.method, path = %req.path, "No route matched");
                HandlerResponse::family_error(
                    404,
                    "NotFound",
                    &format!("no route for {} {}", req.method, req.path),
                )
            }
        }
    }

    fn stats_endpoint(&self) -> HandlerResponse {
        match serde_json::to_value(self.context.store.stats()) {
            Ok(body) => HandlerResponse::json(200, body),
            Err(e) => {
                warn!(error = %e, "Failed to encode stats");
                HandlerResponse::internal_error()
            }
        }
    }

    fn clear_endpoint(&self) -> HandlerResponse {
        self.context.store.clear();
        data_changed("Mock data cleared successfully")
    }

    fn reset_endpoint(&self) -> HandlerResponse {
        match self.context.store.reset() {
            Ok(()) => data_changed("Mock data reset to defaults successfully"),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to reset mock data");
                HandlerResponse::internal_error()
            }
        }
    }
}

fn data_changed(message: &str) -> HandlerResponse {
    HandlerResponse::json(200, json!({ "message": message, "status": "success" }))
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
#[must_use]
pub fn health_endpoint() -> HandlerResponse {
    HandlerResponse::json(200, json!({ "status": "ok" }))
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = match parse_request(req) {
            Ok(parsed) => self.handle(&parsed),
            Err(e) => {
                warn!(error = %e, "Rejecting request with invalid method");
                HandlerResponse::family_error(400, "BadRequest", "invalid HTTP method")
            }
        };
        write_handler_response(res, &response, &mut self.headers);
        Ok(())
    }
}
