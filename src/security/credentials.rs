use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

/// Prefix of every bearer token the mock issues to a service principal.
pub const MOCK_TOKEN_PREFIX: &str = "mock_access_token_";

/// Authentication failures. None of these are ever answered with a 5xx.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid basic auth encoding")]
    InvalidEncoding,
    #[error("invalid basic auth format")]
    InvalidFormat,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("service account not found or disabled")]
    PrincipalUnavailable,
    #[error("unsupported authentication method")]
    UnsupportedScheme,
}

/// A credential extracted from an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// `Bearer mock_access_token_<applicationId>`; holds the application id.
    MockBearer(String),
    /// Any other bearer token.
    Bearer(String),
    Basic { application_id: String, secret: String },
}

/// Parse an `Authorization` header value.
///
/// The basic pair is split on the first `:` so secrets may contain colons.
///
/// # Errors
///
/// Returns [`AuthError`] for undecodable basic credentials or unknown schemes.
pub fn parse_authorization(header: &str) -> Result<Credential, AuthError> {
    let header = header.trim();
    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        return Ok(match token.strip_prefix(MOCK_TOKEN_PREFIX) {
            Some(app_id) if !app_id.is_empty() => Credential::MockBearer(app_id.to_string()),
            _ => Credential::Bearer(token.to_string()),
        });
    }
    if let Some(encoded) = header.strip_prefix("Basic ") {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::InvalidEncoding)?;
        let decoded = String::from_utf8(bytes).map_err(|_| AuthError::InvalidEncoding)?;
        let (application_id, secret) = decoded.split_once(':').ok_or(AuthError::InvalidFormat)?;
        return Ok(Credential::Basic {
            application_id: application_id.to_string(),
            secret: secret.to_string(),
        });
    }
    Err(AuthError::UnsupportedScheme)
}

/// Build a basic `Authorization` header value.
#[must_use]
pub fn basic_header(application_id: &str, secret: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{application_id}:{secret}"))
    )
}
