//! Family handlers for the resource-management and directory APIs.
//!
//! Both run the same pipeline: authenticate, check permissions (resource
//! management only), map through the family's [`FamilyResponseMapper`], render.

use crate::dispatcher::{FamilyHandler, HandlerRequest, HandlerResponse};
use crate::mappers::{FamilyResponseMapper, MapError, MapRequest};
use crate::security::{request_scope, request_verb, AuthorizationGate, ScopedData, ServicePrincipal};
use crate::store::{DataAccess, MockStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Authenticate the request's `Authorization` header.
///
/// Bad credentials degrade to anonymous unless the gate rejects them, in
/// which case the caller gets a ready 401.
fn authenticate(
    gate: &AuthorizationGate,
    req: &HandlerRequest,
) -> Result<Option<Arc<ServicePrincipal>>, HandlerResponse> {
    match gate.authenticate(req.get_header("authorization")) {
        Ok(principal) => Ok(principal),
        Err(e) if gate.reject_invalid_credentials() => {
            debug!(request_id = %req.request_id, error = %e, "Rejecting invalid credentials");
            let mut resp = HandlerResponse::family_error(401, "AuthenticationFailed", &e.to_string());
            resp.set_header("www-authenticate", "Basic, Bearer".to_string());
            Err(resp)
        }
        Err(e) => {
            warn!(
                request_id = %req.request_id,
                error = %e,
                "Invalid credentials, continuing as anonymous"
            );
            Ok(None)
        }
    }
}

fn render(
    mapper: &dyn FamilyResponseMapper,
    result: Result<Option<Value>, MapError>,
) -> HandlerResponse {
    match result {
        Ok(Some(body)) => HandlerResponse::json(200, body),
        Ok(None) => HandlerResponse::empty(204),
        Err(e) => {
            debug!(family = %mapper.family(), error = %e, "Mapping failed");
            HandlerResponse::json(e.status(), e.to_body(mapper.family()))
        }
    }
}

fn map_with(
    mapper: &dyn FamilyResponseMapper,
    req: &HandlerRequest,
    data: &dyn DataAccess,
) -> Result<Option<Value>, MapError> {
    let params = req.params_map();
    let map_req = MapRequest {
        operation_id: &req.route.operation_id,
        path_pattern: &req.route.path_pattern,
        method: &req.method,
        params: &params,
    };
    mapper.map(&map_req, data)
}

/// Resource-management family: scope and verb checks for authenticated
/// principals, subscription-wide lists filtered to readable groups.
pub struct ResourceManagementHandler {
    gate: Arc<AuthorizationGate>,
    store: Arc<MockStore>,
    mapper: Arc<dyn FamilyResponseMapper>,
}

impl ResourceManagementHandler {
    #[must_use]
    pub fn new(
        gate: Arc<AuthorizationGate>,
        store: Arc<MockStore>,
        mapper: Arc<dyn FamilyResponseMapper>,
    ) -> Self {
        Self {
            gate,
            store,
            mapper,
        }
    }
}

impl FamilyHandler for ResourceManagementHandler {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        let principal = match authenticate(&self.gate, req) {
            Ok(p) => p,
            Err(resp) => return resp,
        };

        let snapshot = self.store.snapshot();
        let Some(principal) = principal else {
            // anonymous access is allowed and unfiltered
            return render(
                self.mapper.as_ref(),
                map_with(self.mapper.as_ref(), req, snapshot.as_ref()),
            );
        };

        let resource_group = req
            .get_path_param("resourceGroupName")
            .or_else(|| req.get_query_param("resourceGroupName"))
            .filter(|rg| !rg.is_empty());
        let scope = request_scope(resource_group);
        let verb = request_verb(&req.method, &req.route.operation_id, &req.path);
        // subscription-wide reads are filtered below instead of denied
        let filtered_read = resource_group.is_none() && verb == "read";
        if !filtered_read && !principal.permitted(scope, verb) {
            warn!(
                request_id = %req.request_id,
                application_id = %principal.application_id,
                scope,
                verb,
                "Permission denied"
            );
            return HandlerResponse::family_error(
                403,
                "AuthorizationFailed",
                &format!(
                    "The client '{}' does not have permission to perform '{verb}' on scope '{scope}'",
                    principal.application_id
                ),
            );
        }

        let scoped = ScopedData::new(snapshot.as_ref(), &principal);
        render(self.mapper.as_ref(), map_with(self.mapper.as_ref(), req, &scoped))
    }
}

/// Directory family: authenticates, applies no scope check.
pub struct DirectoryHandler {
    gate: Arc<AuthorizationGate>,
    store: Arc<MockStore>,
    mapper: Arc<dyn FamilyResponseMapper>,
}

impl DirectoryHandler {
    #[must_use]
    pub fn new(
        gate: Arc<AuthorizationGate>,
        store: Arc<MockStore>,
        mapper: Arc<dyn FamilyResponseMapper>,
    ) -> Self {
        Self {
            gate,
            store,
            mapper,
        }
    }
}

impl FamilyHandler for DirectoryHandler {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        if let Err(resp) = authenticate(&self.gate, req) {
            return resp;
        }
        let snapshot = self.store.snapshot();
        render(
            self.mapper.as_ref(),
            map_with(self.mapper.as_ref(), req, snapshot.as_ref()),
        )
    }
}
