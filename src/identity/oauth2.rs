use super::token::{now_unix, split_name, unsigned_jwt, IdTokenClaims, EXPIRES_IN};
use crate::ids::{access_token, authorization_code, refresh_token};
use crate::security::{AuthError, AuthorizationGate};
use crate::store::{DataAccess, User};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Protocol errors. Every variant maps to a 4xx; none is a server fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),
    #[error("invalid_client: {0}")]
    InvalidClient(String),
    #[error("invalid_token: {0}")]
    InvalidToken(String),
}

impl OAuthError {
    /// The RFC 6749 error token.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::UnsupportedResponseType(_) => "unsupported_response_type",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidToken(_) => "invalid_token",
        }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            OAuthError::InvalidRequest(d)
            | OAuthError::UnsupportedResponseType(d)
            | OAuthError::UnsupportedGrantType(d)
            | OAuthError::InvalidGrant(d)
            | OAuthError::InvalidClient(d)
            | OAuthError::InvalidToken(d) => d,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            OAuthError::InvalidClient(_) | OAuthError::InvalidToken(_) => 401,
            _ => 400,
        }
    }

    /// `{error, error_description}`
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({ "error": self.error_code(), "error_description": self.detail() })
    }
}

fn invalid_request(msg: &str) -> OAuthError {
    OAuthError::InvalidRequest(msg.to_string())
}

/// A code issued by `authorize` and not yet redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub subject: String,
    pub issued_at: u64,
}

/// A client application allowed to run the code flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegisteredCaller {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub name: String,
}

impl RegisteredCaller {
    /// An empty allow-list accepts any redirect target.
    #[must_use]
    pub fn allows_redirect(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.is_empty() || self.redirect_uris.iter().any(|r| r == redirect_uri)
    }
}

/// A registered caller as returned to clients: no secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerView {
    pub client_id: String,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub name: String,
}

impl From<&RegisteredCaller> for CallerView {
    fn from(c: &RegisteredCaller) -> Self {
        Self {
            client_id: c.client_id.clone(),
            redirect_uris: c.redirect_uris.clone(),
            scopes: c.scopes.clone(),
            name: c.name.clone(),
        }
    }
}

/// Parameters of an authorize request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    /// Present once the user has been picked.
    pub user_id: Option<String>,
}

/// What `authorize` asks the server to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizeOutcome {
    /// No user picked yet: list candidates. No state was created.
    SelectUser(Value),
    /// Code issued: redirect here.
    Redirect(String),
}

/// Fields of a token request, from a form or JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
}

impl TokenRequest {
    /// Build from `(name, value)` pairs; unknown names are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut req = Self::default();
        for (k, v) in pairs {
            let slot = match k {
                "grant_type" => &mut req.grant_type,
                "code" => &mut req.code,
                "client_id" => &mut req.client_id,
                "client_secret" => &mut req.client_secret,
                "redirect_uri" => &mut req.redirect_uri,
                "scope" => &mut req.scope,
                _ => continue,
            };
            *slot = Some(v.to_string());
        }
        req
    }

    /// Grant type, inferring `authorization_code` from a bare `code`.
    fn effective_grant(&self) -> Option<&str> {
        match non_empty(&self.grant_type) {
            Some(g) => Some(g),
            None if non_empty(&self.code).is_some() => Some("authorization_code"),
            None => None,
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Token endpoint success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Subject bound to an access token issued by a code redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    subject: String,
    client_id: String,
}

/// `/oidc/userinfo` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub user_principal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_location: Option<String>,
    pub roles: Vec<String>,
    pub account_enabled: bool,
}

impl UserInfo {
    /// Profile for a subject with no stored user.
    fn unknown(subject: &str) -> Self {
        let claims = IdTokenClaims::for_subject("", "", subject, None, 0);
        Self {
            sub: claims.sub,
            name: claims.name,
            email: claims.email.clone(),
            given_name: claims.given_name,
            family_name: claims.family_name,
            user_principal_name: claims.email,
            job_title: None,
            department: None,
            office_location: None,
            roles: Vec::new(),
            account_enabled: false,
        }
    }
}

impl From<&User> for UserInfo {
    fn from(u: &User) -> Self {
        let (given_name, family_name) = split_name(&u.display_name);
        Self {
            sub: u.id.clone(),
            name: u.display_name.clone(),
            email: u.mail.clone().unwrap_or_else(|| u.user_principal_name.clone()),
            given_name,
            family_name,
            user_principal_name: u.user_principal_name.clone(),
            job_title: u.job_title.clone(),
            department: u.department.clone(),
            office_location: u.office_location.clone(),
            roles: u.roles.clone(),
            account_enabled: u.account_enabled,
        }
    }
}

/// In-memory OAuth2 / OIDC authorization server.
///
/// Three tables, each behind its own readers-writer lock: issued codes,
/// registered callers and issued access tokens. Locks are held only for the
/// single lookup, insert or remove, never while a response is built.
#[derive(Debug, Default)]
pub struct OAuth2Server {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    callers: RwLock<HashMap<String, RegisteredCaller>>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl OAuth2Server {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate an authorize request and, once a user is picked, issue a code.
    ///
    /// # Errors
    ///
    /// - `invalid_request` for a missing `client_id`/`redirect_uri`, a redirect
    ///   target outside the caller's allow-list or unparsable, or an unknown `user_id`
    /// - `unsupported_response_type` for anything but `code`
    pub fn authorize(
        &self,
        req: &AuthorizeRequest,
        data: &dyn DataAccess,
    ) -> Result<AuthorizeOutcome, OAuthError> {
        let client_id = non_empty(&req.client_id).ok_or_else(|| invalid_request("client_id is required"))?;
        let redirect_uri =
            non_empty(&req.redirect_uri).ok_or_else(|| invalid_request("redirect_uri is required"))?;
        match non_empty(&req.response_type) {
            Some("code") => {}
            Some(other) => {
                return Err(OAuthError::UnsupportedResponseType(format!(
                    "response_type '{other}' is not supported"
                )))
            }
            None => return Err(invalid_request("response_type is required")),
        }
        if let Some(caller) = self.callers.read().get(client_id) {
            if !caller.allows_redirect(redirect_uri) {
                warn!(client_id, redirect_uri, "Redirect target not registered for caller");
                return Err(invalid_request("unauthorized redirect_uri"));
            }
        }
        let mut target = Url::parse(redirect_uri).map_err(|_| invalid_request("invalid redirect_uri"))?;

        let Some(user_id) = non_empty(&req.user_id) else {
            let users: Vec<Value> = data
                .users()
                .into_iter()
                .map(|u| {
                    json!({
                        "id": u.id,
                        "displayName": u.display_name,
                        "userPrincipalName": u.user_principal_name,
                    })
                })
                .collect();
            return Ok(AuthorizeOutcome::SelectUser(json!({
                "client_id": client_id,
                "redirect_uri": redirect_uri,
                "response_type": "code",
                "scope": req.scope.clone().unwrap_or_default(),
                "state": req.state.clone().unwrap_or_default(),
                "users": users,
            })));
        };
        if data.find_user(user_id).is_none() {
            return Err(invalid_request("unknown user_id"));
        }

        let code = authorization_code();
        let record = AuthorizationCode {
            code: code.clone(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scope: req.scope.clone().unwrap_or_default(),
            subject: user_id.to_string(),
            issued_at: now_unix(),
        };
        self.codes.write().insert(code.clone(), record);
        info!(client_id, subject = user_id, "Authorization code issued");

        {
            let mut query = target.query_pairs_mut();
            query.append_pair("code", &code);
            if let Some(state) = non_empty(&req.state) {
                query.append_pair("state", state);
            }
        }
        Ok(AuthorizeOutcome::Redirect(target.to_string()))
    }

    /// Token endpoint.
    ///
    /// # Errors
    ///
    /// Any [`OAuthError`]; see the variant docs on each grant.
    pub fn token(
        &self,
        req: &TokenRequest,
        issuer: &str,
        gate: &AuthorizationGate,
        data: &dyn DataAccess,
    ) -> Result<TokenResponse, OAuthError> {
        match req.effective_grant() {
            Some("authorization_code") => self.redeem(req, issuer, data),
            Some("client_credentials") => Self::client_credentials(req, gate),
            Some(other) => Err(OAuthError::UnsupportedGrantType(format!(
                "grant_type '{other}' is not supported"
            ))),
            None => Err(invalid_request("code or grant_type required")),
        }
    }

    /// Exchange an authorization code. The code is removed from the table before
    /// anything else is checked, so it can succeed at most once.
    fn redeem(
        &self,
        req: &TokenRequest,
        issuer: &str,
        data: &dyn DataAccess,
    ) -> Result<TokenResponse, OAuthError> {
        let code = non_empty(&req.code).ok_or_else(|| invalid_request("code is required"))?;
        let Some(record) = self.codes.write().remove(code) else {
            debug!("Unknown or already redeemed authorization code");
            return Err(OAuthError::InvalidGrant("invalid code".to_string()));
        };

        if let Some(client_id) = non_empty(&req.client_id) {
            if client_id != record.client_id {
                return Err(OAuthError::InvalidGrant("client_id does not match code".to_string()));
            }
        }
        if let Some(redirect_uri) = non_empty(&req.redirect_uri) {
            if redirect_uri != record.redirect_uri {
                return Err(OAuthError::InvalidGrant(
                    "redirect_uri does not match code".to_string(),
                ));
            }
        }
        if let Some(secret) = req.client_secret.as_deref() {
            let expected = self
                .callers
                .read()
                .get(&record.client_id)
                .map(|c| c.client_secret.clone())
                .filter(|s| !s.is_empty());
            if expected.is_some_and(|e| e != secret) {
                return Err(OAuthError::InvalidClient("client authentication failed".to_string()));
            }
        }

        let claims = IdTokenClaims::for_subject(
            issuer,
            &record.client_id,
            &record.subject,
            data.find_user(&record.subject),
            now_unix(),
        );
        let id_token = unsigned_jwt(&claims)
            .map_err(|e| invalid_request(&format!("cannot encode id_token: {e}")))?;
        let access_token = access_token(&record.code);
        self.sessions.write().insert(
            access_token.clone(),
            Session {
                subject: record.subject.clone(),
                client_id: record.client_id.clone(),
            },
        );
        info!(client_id = %record.client_id, subject = %record.subject, "Authorization code redeemed");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: EXPIRES_IN,
            refresh_token: Some(refresh_token(&record.code)),
            scope: Some(record.scope),
            id_token: Some(id_token),
        })
    }

    /// Service-principal grant: checks the application id and secret directly.
    fn client_credentials(
        req: &TokenRequest,
        gate: &AuthorizationGate,
    ) -> Result<TokenResponse, OAuthError> {
        let client_id = non_empty(&req.client_id).ok_or_else(|| invalid_request("client_id is required"))?;
        let secret = req.client_secret.as_deref().unwrap_or_default();
        let principal = gate.verify_secret(client_id, secret).map_err(|e| match e {
            AuthError::PrincipalUnavailable => {
                OAuthError::InvalidClient("service account not found or disabled".to_string())
            }
            _ => OAuthError::InvalidClient("invalid client credentials".to_string()),
        })?;
        info!(application_id = %principal.application_id, "Client credentials token issued");
        Ok(TokenResponse {
            access_token: access_token(&principal.application_id),
            token_type: "Bearer",
            expires_in: EXPIRES_IN,
            refresh_token: None,
            scope: req.scope.clone(),
            id_token: None,
        })
    }

    /// Profile of the subject an access token was issued for.
    ///
    /// # Errors
    ///
    /// `invalid_token` for a missing or non-bearer header or a token this
    /// server did not issue through a code redemption.
    pub fn userinfo(
        &self,
        authorization: Option<&str>,
        data: &dyn DataAccess,
    ) -> Result<UserInfo, OAuthError> {
        let header = authorization
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OAuthError::InvalidToken("authorization header required".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::InvalidToken("bearer token required".to_string()))?;
        let session = self
            .sessions
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| OAuthError::InvalidToken("unknown access token".to_string()))?;
        debug!(client_id = %session.client_id, subject = %session.subject, "Userinfo lookup");
        Ok(match data.find_user(&session.subject) {
            Some(user) => UserInfo::from(user),
            None => UserInfo::unknown(&session.subject),
        })
    }

    /// Add or replace a caller. Scopes default to `openid profile email`.
    ///
    /// # Errors
    ///
    /// `invalid_request` for an empty `client_id`.
    pub fn register_caller(&self, mut caller: RegisteredCaller) -> Result<CallerView, OAuthError> {
        caller.client_id = caller.client_id.trim().to_string();
        if caller.client_id.is_empty() {
            return Err(invalid_request("client_id is required"));
        }
        if caller.scopes.is_empty() {
            caller.scopes = DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect();
        }
        let view = CallerView::from(&caller);
        self.callers.write().insert(caller.client_id.clone(), caller);
        info!(client_id = %view.client_id, "Caller registered");
        Ok(view)
    }

    /// Registered callers, ordered by client id.
    #[must_use]
    pub fn list_callers(&self) -> Vec<CallerView> {
        let mut all: Vec<CallerView> = self.callers.read().values().map(CallerView::from).collect();
        all.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        all
    }

    /// Number of codes issued and not yet redeemed.
    #[must_use]
    pub fn pending_codes(&self) -> usize {
        self.codes.read().len()
    }
}
