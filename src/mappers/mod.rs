//! # Mappers Module
//!
//! Family response mappers turn a resolved operation plus merged request
//! parameters into a payload shaped like the real API's response.
//!
//! Mappers read data only through [`DataAccess`](crate::store::DataAccess) and
//! never see credentials. A mapper returns `Ok(None)` for operations that
//! answer without a body (deletes).

mod directory;
mod operation_status;
mod resource_manager;

pub use directory::DirectoryMapper;
pub use operation_status::operation_status;
pub use resource_manager::{classify, ResourceKind, ResourceManagerMapper};

use crate::spec::Family;
use crate::store::DataAccess;
use http::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Everything a mapper knows about the request.
#[derive(Debug, Clone, Copy)]
pub struct MapRequest<'a> {
    pub operation_id: &'a str,
    pub path_pattern: &'a str,
    pub method: &'a Method,
    /// Query parameters merged with path parameters (path wins).
    pub params: &'a HashMap<String, String>,
}

impl<'a> MapRequest<'a> {
    /// A parameter value, treating empty strings as absent.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("{0}")]
    Internal(String),
}

impl MapError {
    #[must_use]
    pub fn not_found(kind: &'static str, name: &str) -> Self {
        MapError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            MapError::NotFound { .. } => 404,
            _ => 500,
        }
    }

    /// `{error:{code, message}}` using the family's vocabulary.
    #[must_use]
    pub fn to_body(&self, family: Family) -> Value {
        let code = match self {
            MapError::NotFound { .. } => family.not_found_code(),
            _ => "InternalError",
        };
        error_body(code, &self.to_string())
    }
}

/// Error payload shared by the resource-management and directory families.
#[must_use]
pub fn error_body(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

/// Maps one family's operations to payloads.
pub trait FamilyResponseMapper: Send + Sync {
    fn family(&self) -> Family;

    /// # Errors
    ///
    /// [`MapError::NotFound`] when a detail lookup misses; other variants for
    /// requests the mapper cannot answer.
    fn map(&self, req: &MapRequest<'_>, data: &dyn DataAccess) -> Result<Option<Value>, MapError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_bodies() {
        let e = MapError::not_found("virtual machine", "web-9");
        assert_eq!(e.status(), 404);
        assert_eq!(
            e.to_body(Family::ResourceManagement),
            json!({"error": {"code": "ResourceNotFound", "message": "virtual machine not found: web-9"}})
        );
        assert_eq!(e.to_body(Family::Directory)["error"]["code"], "ItemNotFound");
        let e = MapError::UnsupportedMethod("TRACE".into());
        assert_eq!(e.status(), 500);
        assert_eq!(e.to_body(Family::Directory)["error"]["code"], "InternalError");
    }

    #[test]
    fn test_empty_param_is_absent() {
        let mut params = HashMap::new();
        params.insert("resourceGroupName".to_string(), String::new());
        let req = MapRequest {
            operation_id: "x",
            path_pattern: "/x",
            method: &Method::GET,
            params: &params,
        };
        assert_eq!(req.param("resourceGroupName"), None);
    }
}
