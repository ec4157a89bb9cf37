//! # Identity Module
//!
//! An in-memory OIDC / OAuth2 provider: discovery, the authorization-code flow
//! with interactive user selection, the client-credentials grant for service
//! principals, userinfo, and caller (app) registration.
//!
//! ## Flow
//!
//! ```text
//! GET /oauth2/v2.0/authorize?client_id&redirect_uri&response_type=code
//!     -> 200 JSON prompt listing users (no state created)
//! GET /oauth2/v2.0/authorize?...&user_id=1
//!     -> 302 redirect_uri?code=code_<ULID>&state=...
//! POST /oauth2/v2.0/token  grant_type=authorization_code&code=...
//!     -> access_token, refresh_token, id_token (code removed, single use)
//! ```
//!
//! ## Not for production
//!
//! **The `id_token` is unsigned** (`alg: none`, empty signature) and access
//! tokens follow the guessable `mock_access_token_<id>` format. Nothing issued
//! here is a trustworthy credential. Do not carry this scheme into anything
//! facing real clients.
//!
//! Identity routes are not read from description files: [`builtin_document`]
//! supplies them and they are compiled with every other route.

mod discovery;
mod handler;
mod oauth2;
mod token;

pub use discovery::{issuer, DiscoveryDocument};
pub use handler::{
    builtin_document, IdentityHandler, OP_AUTHORIZE, OP_DISCOVERY, OP_LIST_APPS, OP_REGISTER_APP,
    OP_TOKEN, OP_USERINFO,
};
pub use oauth2::{
    AuthorizationCode, AuthorizeOutcome, AuthorizeRequest, CallerView, OAuth2Server, OAuthError,
    RegisteredCaller, TokenRequest, TokenResponse, UserInfo,
};
pub use token::{decode_claims, split_name, unsigned_jwt, IdTokenClaims, EXPIRES_IN};
