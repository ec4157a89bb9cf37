//! Identifiers the mock mints: request ids, authorization codes and the
//! guessable access/refresh token strings.

use crate::security::MOCK_TOKEN_PREFIX;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

const CODE_PREFIX: &str = "code_";
const REFRESH_TOKEN_PREFIX: &str = "mock_refresh_token_";

/// Correlation id carried through dispatch and echoed as `x-request-id`.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// The caller's `x-request-id` when it is a ULID, otherwise a fresh id.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// A fresh single-use authorization code, `code_<ULID>`.
#[must_use]
pub fn authorization_code() -> String {
    format!("{CODE_PREFIX}{}", Ulid::new())
}

/// Access token naming `subject`: a redeemed code or a service principal's
/// application id.
#[must_use]
pub fn access_token(subject: &str) -> String {
    format!("{MOCK_TOKEN_PREFIX}{subject}")
}

/// Refresh token handed out with a redeemed code. Never accepted back.
#[must_use]
pub fn refresh_token(code: &str) -> String {
    format!("{REFRESH_TOKEN_PREFIX}{code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_from_header() {
        let id = RequestId::new();
        assert_eq!(RequestId::from_header_or_new(Some(&id.to_string())), id);
        assert_eq!(
            RequestId::from_header_or_new(Some(&format!(" {id} "))),
            id
        );
        assert_ne!(RequestId::from_header_or_new(Some("not-a-ulid")), id);
        assert_ne!(RequestId::from_header_or_new(None), id);
    }

    #[test]
    fn test_authorization_codes_are_unique() {
        let a = authorization_code();
        let b = authorization_code();
        assert!(a.starts_with("code_"));
        assert_eq!(a.len(), "code_".len() + 26);
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_strings() {
        assert_eq!(access_token("app-1"), "mock_access_token_app-1");
        assert_eq!(refresh_token("code_x"), "mock_refresh_token_code_x");
    }
}
