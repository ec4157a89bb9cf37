//! Router core module - hot path for request routing.
//!
//! The table is built once by [`Router::new`] and never mutated afterwards, so
//! [`Router::resolve`] takes `&self` and needs no locking.

use super::pattern::normalize_path;
use crate::spec::RouteMeta;
use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path/query parameters before heap allocation.
/// ARM paths rarely carry more than four placeholders.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for the request path.
///
/// Param names use `Arc<str>` because they come from the compiled route table;
/// values are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL (e.g., `{vmName}` → `("vmName", "web-01")`)
    pub path_params: ParamVec,
    /// Query string parameters (populated by the server)
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: `?a=1&a=2` yields `2`.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query and path parameters in one map. Path parameters win on a name clash.
    #[must_use]
    pub fn merged_params(&self) -> HashMap<String, String> {
        self.query_params
            .iter()
            .chain(self.path_params.iter())
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug, Clone)]
pub enum Resolution {
    Matched(RouteMatch),
    NotFound,
    /// Some route's pattern matches the path, none for this method.
    MethodNotAllowed { allowed: Vec<Method> },
}

#[derive(Debug, Clone)]
struct PrefixGroup {
    prefix: Arc<str>,
    routes: Vec<Arc<RouteMeta>>,
}

/// Route table with exact-path lookup and prefix-grouped parameterized routes.
///
/// - Exact routes (no placeholders) are keyed by their literal path.
/// - Parameterized routes are grouped by the literal text before their first
///   placeholder and evaluated in compile order.
#[derive(Debug, Clone, Default)]
pub struct Router {
    exact: HashMap<Arc<str>, Vec<Arc<RouteMeta>>>,
    /// Sorted by prefix length, longest first.
    groups: Vec<PrefixGroup>,
    all: Vec<Arc<RouteMeta>>,
}

impl Router {
    /// Register a compiled route set.
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let mut exact: HashMap<Arc<str>, Vec<Arc<RouteMeta>>> = HashMap::new();
        let mut groups: Vec<PrefixGroup> = Vec::new();
        let mut all = Vec::with_capacity(routes.len());

        for route in routes {
            let route = Arc::new(route);
            all.push(Arc::clone(&route));
            if route.is_exact() {
                exact
                    .entry(Arc::clone(&route.path_pattern))
                    .or_default()
                    .push(route);
                continue;
            }
            let prefix = route.pattern.literal_prefix();
            match groups.iter_mut().find(|g| g.prefix.as_ref() == prefix) {
                Some(group) => group.routes.push(route),
                None => groups.push(PrefixGroup {
                    prefix: Arc::from(prefix),
                    routes: vec![route],
                }),
            }
        }

        // Stable sort keeps first-seen order among equal-length prefixes.
        groups.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        info!(
            routes_count = all.len(),
            exact_paths = exact.len(),
            prefix_groups = groups.len(),
            "Routing table loaded"
        );

        Self { exact, groups, all }
    }

    /// Every route in compile order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteMeta>> {
        self.all.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.all.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Resolve a request.
    ///
    /// Exact routes are tried first. On a miss, parameterized groups whose
    /// prefix matches the path are tried longest prefix first, routes in
    /// compile order; the first route matching both method and pattern wins.
    /// When only other methods match the path the answer is
    /// [`Resolution::MethodNotAllowed`].
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let path = normalize_path(path);
        let mut allowed: Vec<Method> = Vec::new();

        if let Some(candidates) = self.exact.get(path) {
            if let Some(route) = candidates.iter().find(|r| r.method == *method) {
                debug!(method = %method, path = %path, route_pattern = %route.path_pattern, "Exact route matched");
                return Resolution::Matched(RouteMatch {
                    route: Arc::clone(route),
                    path_params: ParamVec::new(),
                    query_params: ParamVec::new(),
                });
            }
            allowed.extend(candidates.iter().map(|r| r.method.clone()));
        }

        for group in self
            .groups
            .iter()
            .filter(|g| path.starts_with(g.prefix.as_ref()))
        {
            for route in &group.routes {
                let Some(params) = route.pattern.match_path(path) else {
                    continue;
                };
                if route.method == *method {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.path_pattern,
                        path_params = ?params,
                        "Parameterized route matched"
                    );
                    return Resolution::Matched(RouteMatch {
                        route: Arc::clone(route),
                        path_params: params,
                        query_params: ParamVec::new(),
                    });
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method.clone());
                }
            }
        }

        if allowed.is_empty() {
            debug!(method = %method, path = %path, "No route matched");
            Resolution::NotFound
        } else {
            debug!(method = %method, path = %path, allowed = ?allowed, "Method not allowed");
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Convenience wrapper returning only a successful match.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        match self.resolve(method, path) {
            Resolution::Matched(m) => Some(m),
            _ => None,
        }
    }
}
