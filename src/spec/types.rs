use crate::router::PathPattern;
use http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One of the virtualized API surfaces.
///
/// Every document, route and handler is tagged with exactly one family; the
/// dispatcher selects the handler through this tag instead of branching on
/// route shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    ResourceManagement,
    Directory,
    Identity,
}

impl Family {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::ResourceManagement => "resource_management",
            Family::Directory => "directory",
            Family::Identity => "identity",
        }
    }

    /// Error code used for not-found responses of this family.
    #[must_use]
    pub fn not_found_code(&self) -> &'static str {
        match self {
            Family::ResourceManagement => "ResourceNotFound",
            Family::Directory => "ItemNotFound",
            Family::Identity => "invalid_request",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (path, method) operation as declared by a description document.
///
/// `method` is kept as declared; the route compiler decides whether it is routable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub path: String,
    pub method: String,
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
}

impl OperationDescriptor {
    #[must_use]
    pub fn new(path: &str, method: &str, operation_id: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            operation_id: operation_id.map(str::to_string),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }
}

/// Normalized content of one loaded description file.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    pub family: Family,
    /// File stem or title, used in diagnostics only.
    pub name: String,
    pub operations: Vec<OperationDescriptor>,
}

/// A compiled, immutable route.
///
/// The handler binding is the `(family, operation_id)` pair; the dispatcher
/// resolves the family to a handler and the handler interprets the operation id.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    pub path_pattern: Arc<str>,
    pub pattern: PathPattern,
    pub family: Family,
    pub operation_id: Arc<str>,
    pub tags: Vec<String>,
    pub document: Arc<str>,
}

impl RouteMeta {
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.pattern.is_exact()
    }
}
