use std::borrow::Cow;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::telemetry::RedactionLevel;

const MASK: &str = "***";
const SENSITIVE_KEYS: [&str; 5] = ["secret", "password", "token", "api-key", "api_key"];

/// True for header or parameter names whose values must not be logged.
#[must_use]
pub fn is_sensitive_key(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lower.contains(k))
}

/// Value of a header or parameter as it may appear in logs.
///
/// `Authorization` keeps its scheme (`Bearer ***`, `Basic ***`).
#[must_use]
pub fn mask_value<'a>(name: &str, value: &'a str, level: RedactionLevel) -> Cow<'a, str> {
    if level == RedactionLevel::None {
        return Cow::Borrowed(value);
    }
    if name.eq_ignore_ascii_case("authorization") {
        return match value.split_once(' ') {
            Some((scheme, _)) => Cow::Owned(format!("{scheme} {MASK}")),
            None => Cow::Borrowed(MASK),
        };
    }
    if is_sensitive_key(name) {
        return Cow::Borrowed(MASK);
    }
    Cow::Borrowed(value)
}

fn masked<'a, I>(pairs: I, level: RedactionLevel) -> Vec<(String, String)>
where
    I: IntoIterator<Item = &'a (std::sync::Arc<str>, String)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), mask_value(k, v, level).into_owned()))
        .collect()
}

/// Request logging with credential masking.
pub struct TracingMiddleware {
    redaction: RedactionLevel,
}

impl TracingMiddleware {
    #[must_use]
    pub fn new(redaction: RedactionLevel) -> Self {
        Self { redaction }
    }
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self::new(RedactionLevel::Credentials)
    }
}

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            operation_id = %req.route.operation_id,
            headers = ?masked(&req.headers, self.redaction),
            query = ?masked(&req.query_params, self.redaction),
            form = ?masked(&req.form, self.redaction),
            "Request received"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        if res.status >= 500 {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                family = %req.route.family,
                operation_id = %req.route.operation_id,
                status = res.status,
                latency_ms,
                "Request failed"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                family = %req.route.family,
                operation_id = %req.route.operation_id,
                status = res.status,
                latency_ms,
                "Request completed"
            );
        }
    }
}
