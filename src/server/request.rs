use crate::dispatcher::HeaderVec;
use crate::router::ParamVec;
use http::Method;
use may_minihttp::Request;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parsed HTTP request data used by `AppService`.
///
/// Everything is owned so the value can outlive the `may_minihttp` request
/// buffer and be built directly in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Parsed query string parameters, in order of appearance
    pub query: ParamVec,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Raw request body
    pub raw_body: String,
    /// Fields of a form-encoded body
    pub form: ParamVec,
    /// Body parsed as JSON, when it is not form-encoded and parses
    pub json: Option<Value>,
}

impl ParsedRequest {
    /// Build from already-extracted parts. `target` may carry a query string.
    ///
    /// # Errors
    ///
    /// Fails when `method` is not a valid HTTP method token.
    pub fn from_parts(
        method: &str,
        target: &str,
        headers: HeaderVec,
        raw_body: String,
    ) -> Result<Self, http::method::InvalidMethod> {
        let method = Method::from_bytes(method.as_bytes())?;
        let path = target.split('?').next().unwrap_or("/").to_string();
        let query = parse_query_params(target);

        let is_form = headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("content-type")
                && v.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE)
        });
        let (form, json) = if raw_body.trim().is_empty() {
            (ParamVec::new(), None)
        } else if is_form {
            (parse_form(&raw_body), None)
        } else {
            (ParamVec::new(), serde_json::from_str(&raw_body).ok())
        };

        Ok(Self {
            method,
            path,
            query,
            headers,
            raw_body,
            form,
            json,
        })
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse query string parameters from a request target.
///
/// Extracts everything after the `?` and URL-decodes names and values.
#[must_use]
pub fn parse_query_params(target: &str) -> ParamVec {
    match target.split_once('?') {
        Some((_, query)) => parse_form(query),
        None => ParamVec::new(),
    }
}

/// Decode an `application/x-www-form-urlencoded` payload.
#[must_use]
pub fn parse_form(payload: &str) -> ParamVec {
    url::form_urlencoded::parse(payload.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// Extract the request from a `may_minihttp::Request`.
///
/// # Errors
///
/// Fails when the method token is not a valid HTTP method.
pub fn parse_request(req: Request) -> Result<ParsedRequest, http::method::InvalidMethod> {
    let method = req.method().to_string();
    let target = req.path().to_string();

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase().as_str()),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let mut raw_body = String::new();
    if let Err(e) = req.body().read_to_string(&mut raw_body) {
        debug!(error = %e, "Request body unreadable, treating as empty");
        raw_body.clear();
    }

    debug!(
        method = %method,
        target = %target,
        headers_count = headers.len(),
        body_size_bytes = raw_body.len(),
        "HTTP request parsed"
    );

    ParsedRequest::from_parts(&method, &target, headers, raw_body)
}
