use super::types::{Family, OperationDescriptor, SpecDocument};
use anyhow::Context;
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Files in the identity directory that describe endpoints served by the
/// OAuth2 state machine itself.
const IDENTITY_SKIP: [&str; 2] = ["oidc-configuration.json", "oidc-jwks.json"];

/// Supplies decoded description documents to the route compiler.
pub trait SpecSource {
    /// Load every document this source knows about.
    ///
    /// # Errors
    ///
    /// Returns an error only when the source as a whole is unusable; single
    /// bad files are skipped by implementations.
    fn documents(&self) -> anyhow::Result<Vec<SpecDocument>>;
}

/// An in-memory source, handy for tests and for the built-in identity document.
impl SpecSource for Vec<SpecDocument> {
    fn documents(&self) -> anyhow::Result<Vec<SpecDocument>> {
        Ok(self.clone())
    }
}

/// Counters reported after a directory load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub placeholders: usize,
    pub failed: usize,
    pub identity_documents: usize,
}

/// Result of loading a spec directory.
#[derive(Debug, Default)]
pub struct LoadedSpecs {
    pub documents: Vec<SpecDocument>,
    pub summary: LoadSummary,
}

/// Reads `arm/`, `graph/` and `identity/` below a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySpecSource {
    root: PathBuf,
}

impl DirectorySpecSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load all three family directories.
    ///
    /// A missing directory contributes nothing. Placeholder and undecodable
    /// files are skipped and counted.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing family directory cannot be listed.
    pub fn load(&self) -> anyhow::Result<LoadedSpecs> {
        let mut out = LoadedSpecs::default();

        for path in list_files(&self.root.join("arm"), &["json"])? {
            self.load_file(&path, Family::ResourceManagement, &mut out);
        }
        for path in list_files(&self.root.join("graph"), &["yaml", "yml", "json"])? {
            self.load_file(&path, Family::Directory, &mut out);
        }
        for path in list_files(&self.root.join("identity"), &["yaml", "yml", "json"])? {
            let skip = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| IDENTITY_SKIP.contains(&n));
            if skip {
                continue;
            }
            match read_document(&path) {
                Ok(Some(_)) => out.summary.identity_documents += 1,
                Ok(None) => out.summary.placeholders += 1,
                Err(error) => {
                    out.summary.failed += 1;
                    warn!(file = %path.display(), error = %error, "Failed to read identity document");
                }
            }
        }

        info!(
            root = %self.root.display(),
            loaded = out.summary.loaded,
            placeholders = out.summary.placeholders,
            failed = out.summary.failed,
            identity_documents = out.summary.identity_documents,
            "Spec documents loaded"
        );
        Ok(out)
    }

    fn load_file(&self, path: &Path, family: Family, out: &mut LoadedSpecs) {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let decoded = read_document(path)
            .and_then(|v| v.map(|value| document_from_value(family, &name, value)).transpose());
        match decoded {
            Ok(Some(doc)) => {
                debug!(
                    file = %path.display(),
                    family = %family,
                    operations = doc.operations.len(),
                    "Spec document decoded"
                );
                out.summary.loaded += 1;
                out.documents.push(doc);
            }
            Ok(None) => {
                debug!(file = %path.display(), "Skipping placeholder spec file");
                out.summary.placeholders += 1;
            }
            Err(error) => {
                out.summary.failed += 1;
                warn!(file = %path.display(), family = %family, error = %error, "Failed to decode spec file");
            }
        }
    }
}

impl SpecSource for DirectorySpecSource {
    fn documents(&self) -> anyhow::Result<Vec<SpecDocument>> {
        Ok(self.load()?.documents)
    }
}

fn list_files(dir: &Path, extensions: &[&str]) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e.to_ascii_lowercase().as_str()));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A placeholder is a file saved from a failed download, e.g. `404: Not Found`.
#[must_use]
pub fn is_placeholder(content: &str) -> bool {
    content.trim_start().starts_with("404")
}

/// Read and decode a YAML or JSON file. `Ok(None)` for placeholders.
fn read_document(path: &Path) -> anyhow::Result<Option<Value>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if is_placeholder(&content) {
        return Ok(None);
    }
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let value = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(Some(value))
}

fn strip_unknown_verbs(val: &mut Value) {
    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    matches!(
                        lk.as_str(),
                        "summary" | "description" | "servers" | "parameters" | "$ref"
                    ) || METHODS.contains(&lk.as_str())
                        || k.starts_with("x-")
                });
            }
        }
    }
}

/// Turn a decoded description document into a [`SpecDocument`].
///
/// Swagger 2.0 documents (top-level `swagger` key) are walked directly;
/// everything else is decoded as OpenAPI 3.
///
/// # Errors
///
/// Returns an error if an OpenAPI 3 document does not decode.
pub fn document_from_value(
    family: Family,
    name: &str,
    mut value: Value,
) -> anyhow::Result<SpecDocument> {
    let operations = if value.get("swagger").is_some() {
        swagger_operations(name, &value)
    } else {
        strip_unknown_verbs(&mut value);
        let spec: OpenApiV3Spec =
            serde_json::from_value(value).with_context(|| format!("decoding OpenAPI document {name}"))?;
        openapi_operations(&spec)
    };
    Ok(SpecDocument {
        family,
        name: name.to_string(),
        operations,
    })
}

fn openapi_operations(spec: &OpenApiV3Spec) -> Vec<OperationDescriptor> {
    let mut ops = Vec::new();
    if let Some(paths) = spec.paths.as_ref() {
        for (path, item) in paths {
            for (method, operation) in item.methods() {
                ops.push(OperationDescriptor {
                    path: path.clone(),
                    method: method.as_str().to_string(),
                    operation_id: operation.operation_id.clone(),
                    tags: operation.tags.clone(),
                });
            }
        }
    }
    ops
}

fn swagger_operations(name: &str, value: &Value) -> Vec<OperationDescriptor> {
    let mut ops = Vec::new();
    let Some(paths) = value.get("paths").and_then(Value::as_object) else {
        return ops;
    };
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            warn!(document = %name, path = %path, "Path item is not an object");
            continue;
        };
        for (key, op) in item {
            let method = key.to_ascii_lowercase();
            if !METHODS.contains(&method.as_str()) {
                continue;
            }
            let Some(op) = op.as_object() else {
                warn!(document = %name, path = %path, method = %method, "Operation is not an object");
                continue;
            };
            let tags = op
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            ops.push(OperationDescriptor {
                path: path.clone(),
                method,
                operation_id: op
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                tags,
            });
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "x-ms-extra": {} }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("x-ms-extra").is_some());
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("404: Not Found"));
        assert!(is_placeholder("\n404"));
        assert!(!is_placeholder("{\"swagger\": \"2.0\"}"));
    }

    #[test]
    fn test_swagger_walk() {
        let v = json!({
            "swagger": "2.0",
            "info": {"title": "Compute", "version": "2023-03-01"},
            "paths": {
                "/subscriptions/{subscriptionId}/providers/Microsoft.Compute/virtualMachines": {
                    "get": {"operationId": "VirtualMachines_ListAll", "tags": ["VirtualMachines"]},
                    "parameters": []
                }
            }
        });
        let doc = document_from_value(Family::ResourceManagement, "compute", v).unwrap();
        assert_eq!(doc.operations.len(), 1);
        assert_eq!(doc.operations[0].method, "get");
        assert_eq!(
            doc.operations[0].operation_id.as_deref(),
            Some("VirtualMachines_ListAll")
        );
        assert_eq!(doc.operations[0].tags, vec!["VirtualMachines".to_string()]);
    }

    #[test]
    fn test_openapi_walk() {
        let v: Value = serde_yaml::from_str(
            r#"
openapi: 3.1.0
info:
  title: Directory
  version: "1.0"
paths:
  /users/{user-id}:
    get:
      operationId: users.user.GetUser
      tags: [users.user]
      responses:
        "200": { description: OK }
"#,
        )
        .unwrap();
        let doc = document_from_value(Family::Directory, "users", v).unwrap();
        assert_eq!(doc.operations.len(), 1);
        assert_eq!(doc.operations[0].path, "/users/{user-id}");
        assert!(doc.operations[0].method.eq_ignore_ascii_case("get"));
    }

    #[test]
    fn test_directory_load_counts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("arm")).unwrap();
        std::fs::create_dir_all(dir.path().join("identity")).unwrap();
        std::fs::write(
            dir.path().join("arm/good.json"),
            r#"{"swagger":"2.0","paths":{"/a":{"get":{"operationId":"A_Get"}}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("arm/missing.json"), "404: Not Found").unwrap();
        std::fs::write(dir.path().join("arm/broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("identity/oidc-jwks.json"), "{}").unwrap();

        let loaded = DirectorySpecSource::new(dir.path()).load().unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.summary.loaded, 1);
        assert_eq!(loaded.summary.placeholders, 1);
        assert_eq!(loaded.summary.failed, 1);
        assert_eq!(loaded.summary.identity_documents, 0);
    }
}
