//! Full request pipeline through `AppService::handle`, over the shipped
//! `specs/` directory and `config.yaml`.

mod common;

use common::fixtures::{
    get, repo_path, request, shipped_context, ALICE_APP_ID, SANDMAN_ID, SANDMAN_SECRET, SUB,
};
use mockzure::security::basic_header;
use mockzure::server::AppService;
use mockzure::spec::DirectorySpecSource;
use mockzure::telemetry::RedactionLevel;
use mockzure::MockContext;
use std::io::Write;
use std::sync::Arc;
use serde_json::{json, Value};

fn service() -> AppService {
    AppService::new(shipped_context())
}

fn vm_path(rg: &str, name: &str) -> String {
    format!(
        "/subscriptions/{SUB}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{name}"
    )
}

fn alice_bearer() -> String {
    format!("Bearer mock_access_token_{ALICE_APP_ID}")
}

#[test]
fn test_health_and_stats() {
    let svc = service();
    let health = svc.handle(&get("/health"));
    assert_eq!(health.status, 200);
    assert_eq!(health.body, json!({"status": "ok"}));

    let stats = svc.handle(&get("/mock/azure/stats"));
    assert_eq!(stats.status, 200);
    assert_eq!(
        stats.body,
        json!({"total_vms": 3, "running_vms": 2, "stopped_vms": 1, "total_users": 2})
    );
}

#[test]
fn test_unknown_vm_is_resource_not_found() {
    let resp = service().handle(&get(&vm_path("rg-dev", "nope")));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body["error"]["code"], "ResourceNotFound");
    let message = resp.body["error"]["message"].as_str().unwrap();
    assert!(message.ends_with("not found: nope"), "{message}");
}

#[test]
fn test_wrong_method_is_405_not_404() {
    let target = format!("/subscriptions/{SUB}/providers/Microsoft.Compute/virtualMachines");
    let resp = service().handle(&request("DELETE", &target, &[], ""));
    assert_eq!(resp.status, 405);
    assert_eq!(resp.body["error"]["code"], "MethodNotAllowed");
    assert_eq!(resp.get_header("allow"), Some("GET"));
}

#[test]
fn test_unknown_path_is_404() {
    let resp = service().handle(&get("/definitely/not/a/route"));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body["error"]["code"], "NotFound");
}

#[test]
fn test_vm_detail_and_instance_view() {
    let svc = service();
    let plain = svc.handle(&get(&vm_path("rg-dev", "web-dev-01")));
    assert_eq!(plain.status, 200);
    assert_eq!(plain.body["name"], "web-dev-01");
    assert_eq!(plain.body["type"], "Microsoft.Compute/virtualMachines");
    assert!(plain.body["properties"].get("instanceView").is_none());

    let expanded = svc.handle(&get(&format!(
        "{}?$expand=instanceView",
        vm_path("rg-dev", "batch-dev-01")
    )));
    assert_eq!(expanded.status, 200);
    let statuses = &expanded.body["properties"]["instanceView"]["statuses"];
    assert_eq!(statuses[0]["code"], "PowerState/deallocated");
    assert_eq!(statuses[0]["level"], "Info");
    assert_eq!(statuses[1]["code"], "ProvisioningState/Succeeded");
}

#[test]
fn test_vm_in_other_group_is_not_found() {
    let resp = service().handle(&get(&vm_path("rg-prod", "web-dev-01")));
    assert_eq!(resp.status, 404);
}

#[test]
fn test_anonymous_lists_are_unfiltered() {
    let svc = service();
    let groups = svc.handle(&get(&format!("/subscriptions/{SUB}/resourcegroups")));
    assert_eq!(groups.status, 200);
    assert_eq!(groups.body["value"].as_array().unwrap().len(), 2);

    let vms = svc.handle(&get(&format!(
        "/subscriptions/{SUB}/providers/Microsoft.Compute/virtualMachines"
    )));
    assert_eq!(vms.body["value"].as_array().unwrap().len(), 3);
}

#[test]
fn test_empty_list_is_an_empty_value_array() {
    let resp = service().handle(&get(&format!(
        "/subscriptions/{SUB}/resourceGroups/rg-empty/providers/Microsoft.Compute/virtualMachines"
    )));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"value": []}));
}

#[test]
fn test_scoped_principal_sees_only_its_groups() {
    let svc = service();
    let bearer = alice_bearer();
    let vms = svc.handle(&request(
        "GET",
        &format!("/subscriptions/{SUB}/providers/Microsoft.Compute/virtualMachines"),
        &[("authorization", &bearer)],
        "",
    ));
    assert_eq!(vms.status, 200);
    let names: Vec<&str> = vms.body["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|vm| vm["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["web-dev-01", "batch-dev-01"]);

    let groups = svc.handle(&request(
        "GET",
        &format!("/subscriptions/{SUB}/resourcegroups"),
        &[("authorization", &bearer)],
        "",
    ));
    assert_eq!(groups.body["value"].as_array().unwrap().len(), 1);
    assert_eq!(groups.body["value"][0]["name"], "rg-dev");
}

#[test]
fn test_scoped_principal_permissions() {
    let svc = service();
    let bearer = alice_bearer();
    let auth = [("authorization", bearer.as_str())];

    let start = svc.handle(&request(
        "POST",
        &format!("{}/start", vm_path("rg-dev", "web-dev-01")),
        &auth,
        "",
    ));
    assert_eq!(start.status, 200);
    assert_eq!(start.body, json!({"status": "Succeeded"}));

    let power_off = svc.handle(&request(
        "POST",
        &format!("{}/powerOff", vm_path("rg-dev", "web-dev-01")),
        &auth,
        "",
    ));
    assert_eq!(power_off.status, 403);
    assert_eq!(power_off.body["error"]["code"], "AuthorizationFailed");

    let delete = svc.handle(&request("DELETE", &vm_path("rg-dev", "web-dev-01"), &auth, ""));
    assert_eq!(delete.status, 403);

    let other_group = svc.handle(&request("GET", &vm_path("rg-prod", "db-prod-01"), &auth, ""));
    assert_eq!(other_group.status, 403);
}

#[test]
fn test_full_access_principal_with_basic_credentials() {
    let svc = service();
    let basic = basic_header(SANDMAN_ID, SANDMAN_SECRET);
    let resp = svc.handle(&request(
        "DELETE",
        &vm_path("rg-prod", "db-prod-01"),
        &[("authorization", &basic)],
        "",
    ));
    assert_eq!(resp.status, 204);
    assert_eq!(resp.body, Value::Null);

    // writes are acknowledged, never persisted
    let still_there = svc.handle(&get(&vm_path("rg-prod", "db-prod-01")));
    assert_eq!(still_there.status, 200);
}

#[test]
fn test_bad_credentials_degrade_to_anonymous() {
    let basic = basic_header(SANDMAN_ID, "wrong");
    let resp = service().handle(&request(
        "GET",
        &vm_path("rg-prod", "db-prod-01"),
        &[("authorization", &basic)],
        "",
    ));
    assert_eq!(resp.status, 200);
}

#[test]
fn test_operation_status_always_succeeded() {
    let resp = service().handle(&get(&format!(
        "/subscriptions/{SUB}/providers/Microsoft.Compute/locations/eastus/operations/op-42"
    )));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"id": "op-42", "status": "Succeeded"}));
}

#[test]
fn test_directory_users() {
    let svc = service();
    let list = svc.handle(&get("/users"));
    assert_eq!(list.status, 200);
    assert_eq!(
        list.body["@odata.context"],
        "https://graph.microsoft.com/v1.0/$metadata#users"
    );
    assert_eq!(list.body["value"].as_array().unwrap().len(), 2);

    let top = svc.handle(&get("/users?$top=1"));
    assert_eq!(top.body["value"].as_array().unwrap().len(), 1);

    let by_upn = svc.handle(&get("/users/bob@dev.local"));
    assert_eq!(by_upn.status, 200);
    assert_eq!(by_upn.body["id"], "22222222-2222-2222-2222-222222222222");
    assert!(by_upn.body.get("jobTitle").is_none());

    let missing = svc.handle(&get("/users/nobody"));
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["error"]["code"], "ItemNotFound");
}

#[test]
fn test_directory_service_principal_has_no_secret() {
    let resp = service().handle(&get(&format!("/servicePrincipals/{SANDMAN_ID}")));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["appId"], SANDMAN_ID);
    let text = resp.body.to_string();
    assert!(!text.contains(SANDMAN_SECRET));
}

#[test]
fn test_request_id_is_echoed() {
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let resp = service().handle(&request("GET", "/users", &[("x-request-id", id)], ""));
    assert_eq!(resp.get_header("x-request-id"), Some(id));
}

#[test]
fn test_discovery_document_uses_host() {
    let resp = service().handle(&get("/.well-known/openid-configuration"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["issuer"], "http://localhost:8090");
    assert_eq!(
        resp.body["token_endpoint"],
        "http://localhost:8090/oauth2/v2.0/token"
    );

    let tenant = service().handle(&get("/contoso/v2.0/.well-known/openid-configuration"));
    assert_eq!(tenant.status, 200);
}

#[test]
fn test_token_endpoint_rejects_get() {
    let resp = service().handle(&get("/oauth2/v2.0/token"));
    assert_eq!(resp.status, 405);
    assert_eq!(resp.get_header("allow"), Some("POST"));
}

#[test]
fn test_preregistered_client_is_listed() {
    let resp = service().handle(&get("/mock/azure/apps"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["count"], 1);
    assert_eq!(resp.body["value"][0]["client_id"], "local-web-app");
    assert!(resp.body["value"][0].get("client_secret").is_none());
}

fn stats(svc: &AppService) -> Value {
    svc.handle(&get("/mock/azure/stats")).body
}

#[test]
fn test_clear_then_reset() {
    let svc = service();
    let cleared = svc.handle(&request("POST", "/mock/azure/data/clear", &[], ""));
    assert_eq!(cleared.status, 200);
    assert_eq!(
        cleared.body,
        json!({"message": "Mock data cleared successfully", "status": "success"})
    );
    assert_eq!(
        stats(&svc),
        json!({"total_vms": 0, "running_vms": 0, "stopped_vms": 0, "total_users": 0})
    );
    assert_eq!(svc.handle(&get(&vm_path("rg-dev", "web-dev-01"))).status, 404);
    assert_eq!(svc.handle(&get("/users")).body["value"], json!([]));
    // resource groups and service principals survive a clear
    let groups = svc.handle(&get(&format!("/subscriptions/{SUB}/resourcegroups")));
    assert_eq!(groups.body["value"].as_array().unwrap().len(), 2);
    let basic = basic_header(SANDMAN_ID, SANDMAN_SECRET);
    let authed = svc.handle(&request(
        "GET",
        &format!("/subscriptions/{SUB}/resourcegroups"),
        &[("authorization", &basic)],
        "",
    ));
    assert_eq!(authed.status, 200);

    let reset = svc.handle(&request("POST", "/mock/azure/data/reset", &[], ""));
    assert_eq!(reset.status, 200);
    assert_eq!(reset.body["message"], "Mock data reset to defaults successfully");
    assert_eq!(
        stats(&svc),
        json!({"total_vms": 3, "running_vms": 2, "stopped_vms": 1, "total_users": 2})
    );
}

#[test]
fn test_data_endpoints_are_post_only() {
    let svc = service();
    for path in ["/mock/azure/data/clear", "/mock/azure/data/reset"] {
        let resp = svc.handle(&get(path));
        assert_eq!(resp.status, 405, "{path}");
        assert_eq!(resp.get_header("allow"), Some("POST"));
    }
    assert_eq!(stats(&svc)["total_vms"], 3);
}

#[test]
fn test_reset_rereads_the_data_file() {
    let shipped = std::fs::read_to_string(repo_path("config.yaml")).unwrap();
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(shipped.as_bytes()).unwrap();
    file.flush().unwrap();

    let specs = DirectorySpecSource::new(repo_path("specs")).load().unwrap();
    let ctx = MockContext::load(file.path(), specs.documents, RedactionLevel::Credentials).unwrap();
    let svc = AppService::new(Arc::new(ctx));
    assert_eq!(stats(&svc)["total_users"], 2);

    // keep only the user list header, dropping every user entry
    let trimmed = shipped.replace("users:\n", "users: []\nold_users:\n");
    std::fs::write(file.path(), trimmed).unwrap();
    let reset = svc.handle(&request("POST", "/mock/azure/data/reset", &[], ""));
    assert_eq!(reset.status, 200);
    assert_eq!(stats(&svc)["total_users"], 0);
    assert_eq!(stats(&svc)["total_vms"], 3);

    std::fs::write(file.path(), "users: [unterminated").unwrap();
    let failed = svc.handle(&request("POST", "/mock/azure/data/reset", &[], ""));
    assert_eq!(failed.status, 500);
    assert_eq!(stats(&svc)["total_vms"], 3);
}
