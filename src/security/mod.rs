//! # Security Module
//!
//! Service-principal authentication and scoped permission checks.
//!
//! ## Credentials
//!
//! Two `Authorization` header shapes are accepted:
//!
//! - `Basic base64(applicationId:secret)`, checked by exact match against the
//!   configured service accounts.
//! - `Bearer mock_access_token_<applicationId>`, accepted for any enabled
//!   principal.
//!
//! **The bearer format is guessable by design.** Anyone who knows an
//! application id can act as that principal. This is a local development mock;
//! do not reuse this scheme in anything reachable by untrusted clients.
//!
//! ## Permissions
//!
//! A [`ServicePrincipal`] carries `[{scope, verbs}]` entries where scope is a
//! resource group name or `*` and verbs may include `*`. [`permitted`] is true
//! iff some entry covers both the scope and the verb; an empty set permits
//! nothing.
//!
//! Secrets live only in the [`AuthorizationGate`]'s credential table and never
//! reach response mappers.

mod credentials;
mod gate;
mod principal;

pub use credentials::{basic_header, parse_authorization, AuthError, Credential, MOCK_TOKEN_PREFIX};
pub use gate::{request_scope, request_verb, AuthorizationGate, ScopedData};
pub use principal::{permitted, CredentialRecord, Permission, ServicePrincipal, WILDCARD};
