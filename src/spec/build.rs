use super::types::{Family, OperationDescriptor, RouteMeta, SpecDocument};
use crate::router::{CompileError, PathPattern};
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Methods the route table accepts. Anything else in a document is skipped.
pub const ROUTABLE_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// Deterministic operation id for operations that declare none.
///
/// `GET /users/{id}` becomes `get__users_{id}`. A literal `_` or `~` in the
/// path is prefixed with `~`, so `/a_b` (`get__a~_b`) and `/a/b` (`get__a_b`)
/// stay distinct.
#[must_use]
pub fn synthesize_operation_id(method: &Method, path: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    id.reserve(path.len() + 1);
    id.push('_');
    for c in path.chars() {
        match c {
            '/' => id.push('_'),
            '_' | '~' => {
                id.push('~');
                id.push(c);
            }
            _ => id.push(c),
        }
    }
    id
}

fn parse_method(raw: &str) -> Result<Method, CompileError> {
    let upper = raw.to_ascii_uppercase();
    ROUTABLE_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| CompileError::UnsupportedMethod(raw.to_string()))
}

/// Compile one operation descriptor into a route.
///
/// # Errors
///
/// Returns a [`CompileError`] when the method is not routable or the path
/// pattern is malformed.
pub fn compile_operation(
    family: Family,
    document: &Arc<str>,
    op: &OperationDescriptor,
) -> Result<RouteMeta, CompileError> {
    let method = parse_method(&op.method)?;
    let pattern = PathPattern::compile(&op.path)?;
    let operation_id = match op.operation_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => synthesize_operation_id(&method, pattern.as_str()),
    };
    Ok(RouteMeta {
        method,
        path_pattern: Arc::from(pattern.as_str()),
        pattern,
        family,
        operation_id: Arc::from(operation_id.as_str()),
        tags: op.tags.clone(),
        document: Arc::clone(document),
    })
}

/// Compile every operation of every document into a flat, ordered route list.
///
/// Malformed operations are logged and skipped. A (method, pattern) pair seen
/// twice keeps its first occurrence.
#[must_use]
pub fn build_routes(documents: &[SpecDocument]) -> Vec<RouteMeta> {
    let mut routes = Vec::new();
    let mut seen: HashSet<(Method, Arc<str>)> = HashSet::new();
    let mut skipped = 0usize;

    for doc in documents {
        let doc_name: Arc<str> = Arc::from(doc.name.as_str());
        for op in &doc.operations {
            match compile_operation(doc.family, &doc_name, op) {
                Ok(route) => {
                    let key = (route.method.clone(), Arc::clone(&route.path_pattern));
                    if !seen.insert(key) {
                        warn!(
                            document = %doc.name,
                            method = %route.method,
                            path = %route.path_pattern,
                            "Duplicate operation ignored"
                        );
                        continue;
                    }
                    routes.push(route);
                }
                Err(error) => {
                    skipped += 1;
                    warn!(
                        document = %doc.name,
                        family = %doc.family,
                        method = %op.method,
                        path = %op.path,
                        error = %error,
                        "Skipping malformed operation"
                    );
                }
            }
        }
    }

    info!(
        documents = documents.len(),
        routes_count = routes.len(),
        skipped,
        "Route compilation complete"
    );
    routes
}
