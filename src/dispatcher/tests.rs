use super::*;
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::Router;
use crate::spec::{build_routes, Family, OperationDescriptor, SpecDocument};
use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Echo;

impl FamilyHandler for Echo {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        HandlerResponse::json(
            200,
            json!({
                "operation": req.route.operation_id.as_ref(),
                "name": req.get_path_param("name"),
            }),
        )
    }
}

struct Boom;

impl FamilyHandler for Boom {
    fn handle(&self, _req: &HandlerRequest) -> HandlerResponse {
        panic!("secret internal detail");
    }
}

#[derive(Default)]
struct Counting {
    before: AtomicUsize,
    after: AtomicUsize,
}

impl Middleware for Counting {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.before.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

struct Deny;

impl Middleware for Deny {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        Some(HandlerResponse::family_error(403, "Denied", "no"))
    }
}

fn request(family: Family, path: &str) -> HandlerRequest {
    let doc = SpecDocument {
        family,
        name: "test".into(),
        operations: vec![OperationDescriptor::new("/things/{name}", "get", Some("things_get"))],
    };
    let router = Router::new(build_routes(&[doc]));
    let m = router.route(&Method::GET, path).unwrap();
    HandlerRequest::from_match(RequestId::new(), Method::GET, path, m, HeaderVec::new())
}

#[test]
fn test_dispatch_by_family() {
    let mut d = Dispatcher::new();
    d.register(Family::Directory, Arc::new(Echo));
    let resp = d.dispatch(&request(Family::Directory, "/things/a"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"operation": "things_get", "name": "a"}));
    assert_eq!(resp.get_header("Content-Type"), Some("application/json"));
}

#[test]
fn test_missing_family_handler_is_500() {
    let d = Dispatcher::new();
    let resp = d.dispatch(&request(Family::Identity, "/things/a"));
    assert_eq!(resp.status, 500);
}

#[test]
fn test_panic_becomes_generic_500() {
    let mut d = Dispatcher::new();
    d.register(Family::ResourceManagement, Arc::new(Boom));
    let resp = d.dispatch(&request(Family::ResourceManagement, "/things/a"));
    assert_eq!(resp.status, 500);
    assert_eq!(
        resp.body,
        json!({"error": {"code": "InternalError", "message": "internal server error"}})
    );
    assert!(!resp.body.to_string().contains("secret"));
}

#[test]
fn test_middleware_hooks_and_early_response() {
    let counting = Arc::new(Counting::default());
    let mut d = Dispatcher::new();
    d.register(Family::Directory, Arc::new(Echo));
    d.add_middleware(Arc::clone(&counting) as Arc<dyn Middleware>);
    let _ = d.dispatch(&request(Family::Directory, "/things/a"));
    assert_eq!(counting.before.load(Ordering::SeqCst), 1);
    assert_eq!(counting.after.load(Ordering::SeqCst), 1);

    d.add_middleware(Arc::new(Deny));
    let resp = d.dispatch(&request(Family::Directory, "/things/a"));
    assert_eq!(resp.status, 403);
    // every hook still runs
    assert_eq!(counting.before.load(Ordering::SeqCst), 2);
    assert_eq!(counting.after.load(Ordering::SeqCst), 2);
}

#[test]
fn test_params_map_path_wins() {
    let mut req = request(Family::Directory, "/things/a");
    req.query_params.push((Arc::from("name"), "query".to_string()));
    req.query_params.push((Arc::from("$top"), "3".to_string()));
    let merged = req.params_map();
    assert_eq!(merged.get("name").map(String::as_str), Some("a"));
    assert_eq!(merged.get("$top").map(String::as_str), Some("3"));
}

#[test]
fn test_response_helpers() {
    let r = HandlerResponse::redirect("https://app/cb?code=x".into());
    assert_eq!(r.status, 302);
    assert_eq!(r.get_header("Location"), Some("https://app/cb?code=x"));
    assert!(r.body.is_null());
    let mut e = HandlerResponse::empty(204);
    e.set_header("x-a", "1".into());
    e.set_header("X-A", "2".into());
    assert_eq!(e.headers.len(), 1);
    assert_eq!(e.get_header("x-a"), Some("2"));
}
