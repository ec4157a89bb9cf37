//! Route resolution over the shipped description files plus the identity
//! document.

mod common;

use common::fixtures::{repo_path, SUB};
use http::Method;
use mockzure::identity::builtin_document;
use mockzure::router::{Resolution, Router};
use mockzure::spec::{build_routes, DirectorySpecSource, Family, OperationDescriptor, SpecDocument};

fn shipped_router() -> Router {
    let mut documents = DirectorySpecSource::new(repo_path("specs"))
        .load()
        .unwrap()
        .documents;
    documents.push(builtin_document());
    Router::new(build_routes(&documents))
}

fn matched(router: &Router, method: Method, path: &str) -> (Family, String) {
    match router.resolve(&method, path) {
        Resolution::Matched(m) => (m.route.family, m.route.operation_id.to_string()),
        other => panic!("{method} {path}: expected a match, got {other:?}"),
    }
}

#[test]
fn test_shipped_specs_load_every_family() {
    let loaded = DirectorySpecSource::new(repo_path("specs")).load().unwrap();
    assert_eq!(loaded.summary.failed, 0);
    let families: Vec<Family> = loaded.documents.iter().map(|d| d.family).collect();
    assert!(families.contains(&Family::ResourceManagement));
    assert!(families.contains(&Family::Directory));
}

#[test]
fn test_resource_management_routes() {
    let router = shipped_router();
    let vm = format!(
        "/subscriptions/{SUB}/resourceGroups/rg-dev/providers/Microsoft.Compute/virtualMachines/web-dev-01"
    );
    assert_eq!(
        matched(&router, Method::GET, &vm),
        (Family::ResourceManagement, "VirtualMachines_Get".to_string())
    );

    let Resolution::Matched(m) = router.resolve(&Method::POST, &format!("{vm}/start")) else {
        panic!("start should route");
    };
    assert_eq!(m.get_path_param("resourceGroupName"), Some("rg-dev"));
    assert_eq!(m.get_path_param("vmName"), Some("web-dev-01"));
    assert_eq!(m.get_path_param("subscriptionId"), Some(SUB));
}

#[test]
fn test_directory_routes() {
    let router = shipped_router();
    let (family, _) = matched(&router, Method::GET, "/users");
    assert_eq!(family, Family::Directory);
    let Resolution::Matched(m) = router.resolve(&Method::PATCH, "/users/alice@dev.local") else {
        panic!("user patch should route");
    };
    assert_eq!(m.get_path_param("user-id"), Some("alice@dev.local"));
}

#[test]
fn test_identity_exact_routes_beat_tenant_patterns() {
    let router = shipped_router();
    let (family, op) = matched(&router, Method::POST, "/oauth2/v2.0/token");
    assert_eq!(family, Family::Identity);
    assert_eq!(op, "oauth2_token");

    let Resolution::Matched(m) = router.resolve(&Method::POST, "/contoso/oauth2/v2.0/token") else {
        panic!("tenant token should route");
    };
    assert_eq!(m.get_path_param("tenant"), Some("contoso"));
}

#[test]
fn test_wrong_method_lists_allowed() {
    let router = shipped_router();
    let list = format!("/subscriptions/{SUB}/providers/Microsoft.Compute/virtualMachines");
    match router.resolve(&Method::DELETE, &list) {
        Resolution::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::GET]),
        other => panic!("expected 405, got {other:?}"),
    }

    let group = format!("/subscriptions/{SUB}/resourcegroups/rg-dev");
    match router.resolve(&Method::POST, &group) {
        Resolution::MethodNotAllowed { allowed } => {
            for m in [Method::GET, Method::PUT, Method::DELETE, Method::HEAD] {
                assert!(allowed.contains(&m), "{m} missing from {allowed:?}");
            }
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_unknown_paths_are_not_found() {
    let router = shipped_router();
    assert!(matches!(
        router.resolve(&Method::GET, "/subscriptions"),
        Resolution::NotFound
    ));
    assert!(matches!(
        router.resolve(&Method::GET, "/nope/nope/nope/nope/nope/nope"),
        Resolution::NotFound
    ));
}

#[test]
fn test_operations_without_ids_get_synthesized_ids() {
    let doc = SpecDocument {
        family: Family::Directory,
        name: "inline".to_string(),
        operations: vec![
            OperationDescriptor::new("/groups", "get", None),
            OperationDescriptor::new("/groups/{id}", "get", None),
        ],
    };
    let router = Router::new(build_routes(&[doc]));
    assert_eq!(
        matched(&router, Method::GET, "/groups/g1").1,
        "get__groups_{id}"
    );
    assert_eq!(matched(&router, Method::GET, "/groups").1, "get__groups");
}
