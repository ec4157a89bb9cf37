use super::discovery::{issuer, DiscoveryDocument};
use super::oauth2::{
    AuthorizeOutcome, AuthorizeRequest, OAuth2Server, OAuthError, RegisteredCaller, TokenRequest,
};
use crate::dispatcher::{FamilyHandler, HandlerRequest, HandlerResponse};
use crate::security::AuthorizationGate;
use crate::spec::{Family, OperationDescriptor, SpecDocument};
use crate::store::MockStore;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub const OP_DISCOVERY: &str = "oidc_discovery";
pub const OP_AUTHORIZE: &str = "oauth2_authorize";
pub const OP_TOKEN: &str = "oauth2_token";
pub const OP_USERINFO: &str = "oidc_userinfo";
pub const OP_LIST_APPS: &str = "apps_list";
pub const OP_REGISTER_APP: &str = "apps_register";

const ROUTES: [(&str, &str, &str); 12] = [
    ("/.well-known/openid-configuration", "get", OP_DISCOVERY),
    ("/{tenant}/v2.0/.well-known/openid-configuration", "get", OP_DISCOVERY),
    ("/oauth2/v2.0/authorize", "get", OP_AUTHORIZE),
    ("/{tenant}/oauth2/v2.0/authorize", "get", OP_AUTHORIZE),
    ("/mock/azure/entra/authorize", "get", OP_AUTHORIZE),
    ("/oauth2/v2.0/token", "post", OP_TOKEN),
    ("/{tenant}/oauth2/v2.0/token", "post", OP_TOKEN),
    ("/mock/azure/entra/token", "post", OP_TOKEN),
    ("/oidc/userinfo", "get", OP_USERINFO),
    ("/mock/azure/entra/userinfo", "get", OP_USERINFO),
    ("/mock/azure/apps", "get", OP_LIST_APPS),
    ("/mock/azure/apps", "post", OP_REGISTER_APP),
];

/// Identity endpoints as a code-defined document, compiled like any other.
#[must_use]
pub fn builtin_document() -> SpecDocument {
    SpecDocument {
        family: Family::Identity,
        name: "identity (built-in)".to_string(),
        operations: ROUTES
            .iter()
            .map(|(path, method, op)| {
                OperationDescriptor::new(path, method, Some(*op)).with_tags(&["identity"])
            })
            .collect(),
    }
}

fn oauth_error(err: &OAuthError) -> HandlerResponse {
    let mut resp = HandlerResponse::json(err.status(), err.to_body());
    if let OAuthError::InvalidToken(_) = err {
        resp.set_header("www-authenticate", format!("Bearer error=\"{}\"", err.error_code()));
    }
    resp
}

fn to_json<T: Serialize>(status: u16, value: &T) -> HandlerResponse {
    match serde_json::to_value(value) {
        Ok(body) => HandlerResponse::json(status, body),
        Err(e) => {
            warn!(error = %e, "Failed to encode identity response");
            HandlerResponse::internal_error()
        }
    }
}

/// Serves the identity family from the OAuth2 server.
pub struct IdentityHandler {
    oauth: Arc<OAuth2Server>,
    gate: Arc<AuthorizationGate>,
    store: Arc<MockStore>,
}

impl IdentityHandler {
    #[must_use]
    pub fn new(oauth: Arc<OAuth2Server>, gate: Arc<AuthorizationGate>, store: Arc<MockStore>) -> Self {
        Self { oauth, gate, store }
    }

    fn issuer(req: &HandlerRequest) -> String {
        issuer(req.get_header("host"), req.get_header("x-forwarded-proto"))
    }

    fn authorize(&self, req: &HandlerRequest) -> HandlerResponse {
        let param = |name: &str| req.get_query_param(name).map(str::to_string);
        let request = AuthorizeRequest {
            client_id: param("client_id"),
            redirect_uri: param("redirect_uri"),
            response_type: param("response_type"),
            scope: param("scope"),
            state: param("state"),
            user_id: param("user_id"),
        };
        match self.oauth.authorize(&request, self.store.snapshot().as_ref()) {
            Ok(AuthorizeOutcome::SelectUser(prompt)) => HandlerResponse::json(200, prompt),
            Ok(AuthorizeOutcome::Redirect(location)) => HandlerResponse::redirect(location),
            Err(e) => oauth_error(&e),
        }
    }

    fn token(&self, req: &HandlerRequest) -> HandlerResponse {
        let request = if !req.form.is_empty() {
            TokenRequest::from_pairs(req.form.iter().map(|(k, v)| (k.as_ref(), v.as_str())))
        } else if let Some(body) = &req.body {
            match serde_json::from_value::<TokenRequest>(body.clone()) {
                Ok(r) => r,
                Err(_) => {
                    return oauth_error(&OAuthError::InvalidRequest(
                        "malformed token request body".to_string(),
                    ))
                }
            }
        } else {
            TokenRequest::default()
        };
        match self
            .oauth
            .token(&request, &Self::issuer(req), &self.gate, self.store.snapshot().as_ref())
        {
            Ok(tokens) => to_json(200, &tokens),
            Err(e) => oauth_error(&e),
        }
    }

    fn userinfo(&self, req: &HandlerRequest) -> HandlerResponse {
        match self
            .oauth
            .userinfo(req.get_header("authorization"), self.store.snapshot().as_ref())
        {
            Ok(info) => to_json(200, &info),
            Err(e) => oauth_error(&e),
        }
    }

    fn register_app(&self, req: &HandlerRequest) -> HandlerResponse {
        let caller = req
            .body
            .clone()
            .map(serde_json::from_value::<RegisteredCaller>)
            .transpose();
        let caller = match caller {
            Ok(Some(c)) => c,
            Ok(None) | Err(_) => {
                return oauth_error(&OAuthError::InvalidRequest(
                    "invalid client payload".to_string(),
                ))
            }
        };
        match self.oauth.register_caller(caller) {
            Ok(view) => to_json(201, &view),
            Err(e) => oauth_error(&e),
        }
    }

    fn list_apps(&self) -> HandlerResponse {
        let callers = self.oauth.list_callers();
        let count = callers.len();
        match serde_json::to_value(&callers) {
            Ok(value) => HandlerResponse::json(200, json!({ "value": value, "count": count })),
            Err(e) => {
                warn!(error = %e, "Failed to encode caller list");
                HandlerResponse::internal_error()
            }
        }
    }
}

impl FamilyHandler for IdentityHandler {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        match req.route.operation_id.as_ref() {
            OP_DISCOVERY => to_json(200, &DiscoveryDocument::new(&Self::issuer(req))),
            OP_AUTHORIZE => self.authorize(req),
            OP_TOKEN => self.token(req),
            OP_USERINFO => self.userinfo(req),
            OP_REGISTER_APP => self.register_app(req),
            OP_LIST_APPS => self.list_apps(),
            other => {
                warn!(operation_id = other, "Identity operation has no implementation");
                oauth_error(&OAuthError::InvalidRequest(format!(
                    "unknown identity operation: {other}"
                )))
            }
        }
    }
}
