//! Brace-parameterized path patterns.
//!
//! A pattern such as `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
//! is split on `/`. A segment that is exactly `{name}` captures one request
//! segment under `name`; every other segment must match literally.

use super::core::ParamVec;
use std::sync::Arc;
use thiserror::Error;

/// Why an operation could not be turned into a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("pattern must start with '/': {0}")]
    NotAbsolute(String),
    #[error("empty placeholder in pattern {0}")]
    EmptyPlaceholder(String),
    #[error("placeholder must span a whole segment in pattern {pattern}: {segment}")]
    PartialPlaceholder { pattern: String, segment: String },
    #[error("duplicate placeholder {name} in pattern {pattern}")]
    DuplicateName { pattern: String, name: String },
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Box<str>),
    Param(Arc<str>),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: Arc<str>,
    segments: Vec<Segment>,
    param_count: usize,
}

/// Segments of a normalized path. `/` has none; a trailing slash is dropped.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let empty = trimmed.is_empty();
    trimmed.split('/').filter(move |_| !empty)
}

/// Strip one trailing slash unless the path is the root.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Fails when the pattern is relative, a placeholder is empty or shares a
    /// segment with literal text, or a placeholder name repeats.
    pub fn compile(pattern: &str) -> Result<Self, CompileError> {
        if !pattern.starts_with('/') {
            return Err(CompileError::NotAbsolute(pattern.to_string()));
        }
        let normalized = normalize_path(pattern);
        let mut compiled = Vec::new();
        let mut names: Vec<Arc<str>> = Vec::new();

        for segment in segments(normalized) {
            let is_placeholder = segment.starts_with('{') && segment.ends_with('}');
            if is_placeholder {
                let name = &segment[1..segment.len() - 1];
                if name.is_empty() {
                    return Err(CompileError::EmptyPlaceholder(pattern.to_string()));
                }
                if name.contains('{') || name.contains('}') {
                    return Err(CompileError::PartialPlaceholder {
                        pattern: pattern.to_string(),
                        segment: segment.to_string(),
                    });
                }
                if names.iter().any(|n| n.as_ref() == name) {
                    return Err(CompileError::DuplicateName {
                        pattern: pattern.to_string(),
                        name: name.to_string(),
                    });
                }
                let name: Arc<str> = Arc::from(name);
                names.push(Arc::clone(&name));
                compiled.push(Segment::Param(name));
            } else if segment.contains('{') || segment.contains('}') {
                return Err(CompileError::PartialPlaceholder {
                    pattern: pattern.to_string(),
                    segment: segment.to_string(),
                });
            } else {
                compiled.push(Segment::Literal(Box::from(segment)));
            }
        }

        Ok(Self {
            raw: Arc::from(normalized),
            segments: compiled,
            param_count: names.len(),
        })
    }

    /// The normalized source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern has no placeholders.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.param_count == 0
    }

    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_ref()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Literal text before the first placeholder, e.g. `/users/` for `/users/{id}`.
    #[must_use]
    pub fn literal_prefix(&self) -> &str {
        match self.raw.find('{') {
            Some(pos) => &self.raw[..pos],
            None => &self.raw,
        }
    }

    /// Match a concrete path.
    ///
    /// Succeeds only when segment counts are equal, every literal segment is
    /// equal and every placeholder binds a non-empty segment. On failure no
    /// parameters are returned.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let mut params = ParamVec::new();
        let mut actual = segments(normalize_path(path));
        for expected in &self.segments {
            let seg = actual.next()?;
            match expected {
                Segment::Literal(lit) => {
                    if lit.as_ref() != seg {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if seg.is_empty() {
                        return None;
                    }
                    params.push((Arc::clone(name), seg.to_string()));
                }
            }
        }
        if actual.next().is_some() {
            return None;
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(p: &ParamVec, name: &str) -> Option<String> {
        p.iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.clone())
    }

    #[test]
    fn test_literal_pattern_is_exact_equality() {
        let p = PathPattern::compile("/providers/Microsoft.Compute/operations").unwrap();
        assert!(p.is_exact());
        assert!(p.match_path("/providers/Microsoft.Compute/operations").is_some());
        assert!(p.match_path("/providers/Microsoft.Compute/operations/").is_some());
        assert!(p.match_path("/providers/Microsoft.Compute").is_none());
        assert!(p.match_path("/providers/microsoft.compute/operations").is_none());
    }

    #[test]
    fn test_segment_counts_must_be_equal() {
        let p = PathPattern::compile("/a/{x}").unwrap();
        assert!(p.match_path("/a/b/c").is_none());
        assert!(p.match_path("/a").is_none());
        assert!(p.match_path("/a/").is_none());
        let params = p.match_path("/a/b").unwrap();
        assert_eq!(bound(&params, "x").as_deref(), Some("b"));
    }

    #[test]
    fn test_adjacent_placeholders_bind_one_segment_each() {
        let p = PathPattern::compile("/x/{a}/{b}").unwrap();
        let params = p.match_path("/x/1/2").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(bound(&params, "a").as_deref(), Some("1"));
        assert_eq!(bound(&params, "b").as_deref(), Some("2"));
        assert!(p.match_path("/x/1").is_none());
    }

    #[test]
    fn test_no_partial_binds() {
        let p = PathPattern::compile("/users/{id}/posts").unwrap();
        assert!(p.match_path("/users/7/comments").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let p = PathPattern::compile("/").unwrap();
        assert!(p.is_exact());
        assert!(p.match_path("/").is_some());
        assert!(p.match_path("/a").is_none());
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            PathPattern::compile("/a/{x}/b/{x}"),
            Err(CompileError::DuplicateName { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/a/{}"),
            Err(CompileError::EmptyPlaceholder(_))
        ));
        assert!(matches!(
            PathPattern::compile("/files/{name}.json"),
            Err(CompileError::PartialPlaceholder { .. })
        ));
        assert!(matches!(
            PathPattern::compile("users"),
            Err(CompileError::NotAbsolute(_))
        ));
    }

    #[test]
    fn test_literal_prefix() {
        let p = PathPattern::compile("/subscriptions/{subscriptionId}/resourcegroups").unwrap();
        assert_eq!(p.literal_prefix(), "/subscriptions/");
        let p = PathPattern::compile("/{tenant}/v2.0/.well-known/openid-configuration").unwrap();
        assert_eq!(p.literal_prefix(), "/");
        assert_eq!(p.param_names(), vec!["tenant"]);
    }
}
