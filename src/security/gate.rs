use super::credentials::{parse_authorization, AuthError, Credential};
use super::principal::{CredentialRecord, ServicePrincipal, WILDCARD};
use crate::store::{DataAccess, ResourceGroup, User, VirtualMachine};
use http::Method;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Authenticates requests as service principals and answers permission checks.
///
/// Credential and principal tables each sit behind their own readers-writer
/// lock. Locks are held only for the lookup or insert itself.
#[derive(Debug, Default)]
pub struct AuthorizationGate {
    credentials: RwLock<HashMap<String, CredentialRecord>>,
    principals: RwLock<HashMap<String, Arc<ServicePrincipal>>>,
    reject_invalid_credentials: bool,
}

impl AuthorizationGate {
    /// `reject_invalid_credentials` turns a present-but-bad credential into a
    /// 401 instead of an anonymous request.
    #[must_use]
    pub fn new(reject_invalid_credentials: bool) -> Self {
        Self {
            reject_invalid_credentials,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn reject_invalid_credentials(&self) -> bool {
        self.reject_invalid_credentials
    }

    /// Add a principal with its secret.
    ///
    /// Both write locks are held together so a reader never sees a credential
    /// without its principal.
    pub fn register(&self, principal: ServicePrincipal, secret: &str) -> Arc<ServicePrincipal> {
        let principal = Arc::new(principal);
        let app_id = principal.application_id.clone();
        let mut credentials = self.credentials.write();
        let mut principals = self.principals.write();
        credentials.insert(
            app_id.clone(),
            CredentialRecord {
                application_id: app_id.clone(),
                secret: secret.to_string(),
            },
        );
        principals.insert(app_id, Arc::clone(&principal));
        principal
    }

    #[must_use]
    pub fn principal(&self, application_id: &str) -> Option<Arc<ServicePrincipal>> {
        self.principals.read().get(application_id).cloned()
    }

    /// All registered principals, ordered by application id.
    #[must_use]
    pub fn principals(&self) -> Vec<Arc<ServicePrincipal>> {
        let mut all: Vec<_> = self.principals.read().values().cloned().collect();
        all.sort_by(|a, b| a.application_id.cmp(&b.application_id));
        all
    }

    fn enabled_principal(&self, application_id: &str) -> Result<Arc<ServicePrincipal>, AuthError> {
        self.principal(application_id)
            .filter(|p| p.enabled)
            .ok_or(AuthError::PrincipalUnavailable)
    }

    /// Check an application id / secret pair by exact match.
    ///
    /// An account registered without a secret never authenticates.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown id or wrong secret,
    /// [`AuthError::PrincipalUnavailable`] for a disabled principal.
    pub fn verify_secret(
        &self,
        application_id: &str,
        secret: &str,
    ) -> Result<Arc<ServicePrincipal>, AuthError> {
        let matches = self
            .credentials
            .read()
            .get(application_id)
            .is_some_and(|c| !c.secret.is_empty() && c.secret == secret);
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        self.enabled_principal(application_id)
    }

    /// Authenticate from an `Authorization` header.
    ///
    /// An absent or blank header is `Ok(None)`: the caller decides whether
    /// anonymous access is acceptable.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when a credential is present but not valid.
    pub fn authenticate(
        &self,
        header: Option<&str>,
    ) -> Result<Option<Arc<ServicePrincipal>>, AuthError> {
        let Some(header) = header.filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };
        let principal = match parse_authorization(header)? {
            Credential::MockBearer(app_id) => self.enabled_principal(&app_id)?,
            Credential::Bearer(_) => return Err(AuthError::InvalidCredentials),
            Credential::Basic {
                application_id,
                secret,
            } => self.verify_secret(&application_id, &secret)?,
        };
        debug!(application_id = %principal.application_id, "Service principal authenticated");
        Ok(Some(principal))
    }
}

/// Verb checked against a principal's permissions for a resource-management request.
#[must_use]
pub fn request_verb(method: &Method, operation_id: &str, path: &str) -> &'static str {
    if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
        return "read";
    }
    if *method == Method::PUT || *method == Method::PATCH {
        return "write";
    }
    if *method == Method::DELETE {
        return "delete";
    }
    let op = operation_id.to_ascii_lowercase();
    let last = path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let names = |needle: &str| op.ends_with(needle) || last == needle;
    if names("restart") {
        "restart"
    } else if names("start") {
        "start"
    } else if names("deallocate") || names("poweroff") || names("stop") {
        "stop"
    } else {
        "write"
    }
}

/// Permission scope for a request: the resource group, or `*` when the
/// request is not bound to one.
#[must_use]
pub fn request_scope(resource_group: Option<&str>) -> &str {
    resource_group.filter(|s| !s.is_empty()).unwrap_or(WILDCARD)
}

/// Data view limited to the resource groups a principal may read.
pub struct ScopedData<'a> {
    inner: &'a dyn DataAccess,
    principal: &'a ServicePrincipal,
}

impl<'a> ScopedData<'a> {
    #[must_use]
    pub fn new(inner: &'a dyn DataAccess, principal: &'a ServicePrincipal) -> Self {
        Self { inner, principal }
    }
}

impl DataAccess for ScopedData<'_> {
    fn resource_groups(&self) -> Vec<&ResourceGroup> {
        self.inner
            .resource_groups()
            .into_iter()
            .filter(|rg| self.principal.permitted(&rg.name, "read"))
            .collect()
    }

    fn virtual_machines(&self) -> Vec<&VirtualMachine> {
        self.inner
            .virtual_machines()
            .into_iter()
            .filter(|vm| self.principal.permitted(&vm.resource_group, "read"))
            .collect()
    }

    fn users(&self) -> Vec<&User> {
        self.inner.users()
    }

    fn service_principals(&self) -> Vec<&ServicePrincipal> {
        self.inner.service_principals()
    }
}
