use crate::dispatcher::HandlerResponse;
use may_minihttp::Response;
use serde_json::Value;
use tracing::error;

/// Reason phrase for the status codes the mock produces.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Serialize a response body. `Null` is written as an empty body.
#[must_use]
pub fn encode_body(body: &Value) -> Vec<u8> {
    if body.is_null() {
        return Vec::new();
    }
    match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to encode response body");
            Vec::new()
        }
    }
}

/// Header lines that never vary, written without allocating.
#[must_use]
pub fn static_header(name: &str, value: &str) -> Option<&'static str> {
    let line = match (name, value) {
        ("content-type", "application/json") => "content-type: application/json",
        ("www-authenticate", "Basic, Bearer") => "www-authenticate: Basic, Bearer",
        ("allow", "GET") => "allow: GET",
        ("allow", "POST") => "allow: POST",
        _ => return None,
    };
    Some(line)
}

/// Owns the per-request header lines of the response being written on one
/// connection.
///
/// `may_minihttp` only accepts `&'static str` headers but encodes the
/// response as soon as `call` returns, before the next request on that
/// connection is read. Lines are kept here until then and dropped on the next
/// [`HeaderLines::clear`], so memory stays bounded by one response.
#[derive(Debug, Default)]
pub struct HeaderLines {
    lines: Vec<Box<str>>,
}

impl Clone for HeaderLines {
    /// Each connection starts with empty scratch space.
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl HeaderLines {
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[allow(unsafe_code)]
    fn hold(&mut self, line: String) -> &'static str {
        let line = line.into_boxed_str();
        let ptr: *const str = &*line;
        self.lines.push(line);
        // SAFETY: the boxed str's heap data is never moved or freed until
        // `clear` or drop, and both happen only after may_minihttp has copied
        // the response headers into its write buffer.
        unsafe { &*ptr }
    }
}

/// Write status, headers and body into the `may_minihttp` response.
///
/// Fixed headers use [`static_header`]; the rest are held in `scratch`, which
/// is cleared first so it only ever holds this response's lines.
pub fn write_handler_response(res: &mut Response, hr: &HandlerResponse, scratch: &mut HeaderLines) {
    scratch.clear();
    res.status_code(usize::from(hr.status), status_reason(hr.status));
    for (name, value) in &hr.headers {
        let line = match static_header(name, value) {
            Some(line) => line,
            None => scratch.hold(format!("{name}: {value}")),
        };
        res.header(line);
    }
    res.body_vec(encode_body(&hr.body));
}
