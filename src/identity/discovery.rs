use serde::Serialize;

/// OpenID Provider metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub response_types_supported: Vec<&'static str>,
    pub id_token_signing_alg_values_supported: Vec<&'static str>,
    pub scopes_supported: Vec<&'static str>,
}

impl DiscoveryDocument {
    #[must_use]
    pub fn new(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{issuer}/oauth2/v2.0/authorize"),
            token_endpoint: format!("{issuer}/oauth2/v2.0/token"),
            userinfo_endpoint: format!("{issuer}/oidc/userinfo"),
            response_types_supported: vec!["code"],
            id_token_signing_alg_values_supported: vec!["none"],
            scopes_supported: vec!["openid", "profile", "email", "User.Read"],
        }
    }
}

/// Issuer URL as seen by the client: `http(s)://<Host>`.
///
/// `https` only when `X-Forwarded-Proto` says so.
#[must_use]
pub fn issuer(host: Option<&str>, forwarded_proto: Option<&str>) -> String {
    let scheme = match forwarded_proto {
        Some(p) if p.trim().eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    let host = host.map(str::trim).filter(|h| !h.is_empty()).unwrap_or("localhost");
    format!("{scheme}://{host}")
}
