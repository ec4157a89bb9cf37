use crate::store::User;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifetime advertised for every issued token, in seconds.
pub const EXPIRES_IN: u64 = 3600;

const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

const DEFAULT_EMAIL: &str = "unknown@dev.local";
const DEFAULT_NAME: &str = "Unknown User";
const DEFAULT_GIVEN_NAME: &str = "Unknown";
const DEFAULT_FAMILY_NAME: &str = "User";

/// Seconds since the Unix epoch.
#[must_use]
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Split a display name into given and family names.
///
/// The first word is the given name and the rest the family name; missing
/// parts fall back to `Unknown` / `User`.
#[must_use]
pub fn split_name(display_name: &str) -> (String, String) {
    let mut words = display_name.split_whitespace();
    let given = words.next().unwrap_or(DEFAULT_GIVEN_NAME).to_string();
    let rest: Vec<&str> = words.collect();
    let family = if rest.is_empty() {
        DEFAULT_FAMILY_NAME.to_string()
    } else {
        rest.join(" ")
    };
    (given, family)
}

/// Profile claims of the identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub email: String,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub iat: u64,
    pub exp: u64,
}

impl IdTokenClaims {
    /// Claims for `subject`, filled from the stored profile when there is one.
    #[must_use]
    pub fn for_subject(issuer: &str, audience: &str, subject: &str, user: Option<&User>, now: u64) -> Self {
        let (email, name, given_name, family_name) = match user {
            Some(u) => {
                let (given, family) = split_name(&u.display_name);
                (u.user_principal_name.clone(), u.display_name.clone(), given, family)
            }
            None => (
                DEFAULT_EMAIL.to_string(),
                DEFAULT_NAME.to_string(),
                DEFAULT_GIVEN_NAME.to_string(),
                DEFAULT_FAMILY_NAME.to_string(),
            ),
        };
        Self {
            iss: issuer.to_string(),
            aud: audience.to_string(),
            sub: subject.to_string(),
            email,
            name,
            given_name,
            family_name,
            iat: now,
            exp: now + EXPIRES_IN,
        }
    }
}

/// Encode claims as an unsigned three-segment token: `header.payload.` with an
/// empty signature.
///
/// # Errors
///
/// Fails only if `claims` cannot be serialized to JSON.
pub fn unsigned_jwt<T: Serialize>(claims: &T) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(claims)?;
    Ok(format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    ))
}

/// Decode the payload segment of a token produced by [`unsigned_jwt`].
#[must_use]
pub fn decode_claims(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Alice Admin"), ("Alice".into(), "Admin".into()));
        assert_eq!(
            split_name("Mary Jane Watson"),
            ("Mary".into(), "Jane Watson".into())
        );
        assert_eq!(split_name("Cher"), ("Cher".into(), "User".into()));
        assert_eq!(split_name("  "), ("Unknown".into(), "User".into()));
    }

    #[test]
    fn test_claims_defaults_for_unknown_subject() {
        let c = IdTokenClaims::for_subject("http://localhost:8090", "app", "ghost", None, 100);
        assert_eq!(c.email, "unknown@dev.local");
        assert_eq!(c.name, "Unknown User");
        assert_eq!(c.exp, 100 + EXPIRES_IN);
    }

    #[test]
    fn test_unsigned_jwt_shape() {
        let user = User {
            id: "1".into(),
            display_name: "Alice Admin".into(),
            user_principal_name: "alice@dev.local".into(),
            ..Default::default()
        };
        let claims = IdTokenClaims::for_subject("http://h", "client", "1", Some(&user), 10);
        let token = unsigned_jwt(&claims).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], "");
        assert!(!token.contains('='));
        let header = URL_SAFE_NO_PAD.decode(parts[0]).unwrap();
        assert_eq!(header, UNSIGNED_HEADER.as_bytes());
        let decoded = decode_claims(&token).unwrap();
        assert_eq!(decoded["sub"], "1");
        assert_eq!(decoded["email"], "alice@dev.local");
        assert_eq!(decoded["given_name"], "Alice");
        assert_eq!(decoded["family_name"], "Admin");
    }
}
