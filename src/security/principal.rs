use serde::{Deserialize, Serialize};

/// Wildcard accepted for both scope and verb.
pub const WILDCARD: &str = "*";

/// One scoped permission entry of a service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Resource group name or `*`.
    pub scope: String,
    /// Verbs such as `read`, `write`, `start`, or `*`.
    pub verbs: Vec<String>,
}

impl Permission {
    #[must_use]
    pub fn new(scope: &str, verbs: &[&str]) -> Self {
        Self {
            scope: scope.to_string(),
            verbs: verbs.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    fn covers(&self, scope: &str, verb: &str) -> bool {
        (self.scope == scope || self.scope == WILDCARD)
            && self.verbs.iter().any(|v| v == verb || v == WILDCARD)
    }
}

/// Evaluate a permission set: true iff some entry has scope in `{scope, "*"}`
/// and a verb in `{verb, "*"}`. An empty set permits nothing.
#[must_use]
pub fn permitted(permissions: &[Permission], scope: &str, verb: &str) -> bool {
    permissions.iter().any(|p| p.covers(scope, verb))
}

/// A non-interactive caller identity.
///
/// Carries no secret material; see [`CredentialRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePrincipal {
    /// Directory object id.
    pub object_id: String,
    pub application_id: String,
    pub display_name: String,
    pub description: String,
    pub enabled: bool,
    pub permissions: Vec<Permission>,
    pub graph_permissions: Vec<String>,
}

impl ServicePrincipal {
    #[must_use]
    pub fn permitted(&self, scope: &str, verb: &str) -> bool {
        permitted(&self.permissions, scope, verb)
    }
}

/// Secret half of a service account, held only by the authorization gate.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub application_id: String,
    pub secret: String,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("application_id", &self.application_id)
            .field("secret", &"***")
            .finish()
    }
}
